//! Invoice creation, listing and staff-edit tests.

mod common;

use chrono::{Datelike, Utc};
use common::TestApp;
use rust_decimal::Decimal;
use serde_json::json;

fn decimal(value: &serde_json::Value) -> Decimal {
    value
        .as_str()
        .expect("expected decimal string")
        .parse()
        .expect("invalid decimal")
}

#[tokio::test]
async fn create_invoice_computes_totals_and_number() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Acme Industries").await;
    let client_id = client["client_id"].as_str().unwrap();

    let invoice = app.seed_invoice(client_id).await;

    let year = Utc::now().year();
    assert_eq!(
        invoice["invoice_number"].as_str().unwrap(),
        format!("INV-{}-00001", year)
    );
    assert_eq!(invoice["status"], "pending");
    assert_eq!(invoice["currency"], "INR");
    assert_eq!(decimal(&invoice["subtotal"]), Decimal::from(2000));
    assert_eq!(decimal(&invoice["tax_amount"]), Decimal::from(180));
    assert_eq!(decimal(&invoice["total_amount"]), Decimal::from(2180));
    assert_eq!(invoice["lines"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invoice_numbers_increment_within_year() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Numbering Co").await;
    let client_id = client["client_id"].as_str().unwrap();

    let first = app.seed_invoice(client_id).await;
    let second = app.seed_invoice(client_id).await;

    let year = Utc::now().year();
    assert_eq!(
        first["invoice_number"].as_str().unwrap(),
        format!("INV-{}-00001", year)
    );
    assert_eq!(
        second["invoice_number"].as_str().unwrap(),
        format!("INV-{}-00002", year)
    );
}

#[tokio::test]
async fn create_invoice_requires_lines() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Empty Lines Ltd").await;
    let client_id = client["client_id"].as_str().unwrap();

    let response = app
        .as_admin(app.client.post(app.url("/invoices")))
        .json(&json!({ "client_id": client_id, "lines": [] }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn create_invoice_requires_line_description() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Blank Desc Ltd").await;
    let client_id = client["client_id"].as_str().unwrap();

    let response = app
        .as_admin(app.client.post(app.url("/invoices")))
        .json(&json!({
            "client_id": client_id,
            "lines": [{ "description": "  ", "quantity": 1, "unit_price": 100 }]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn create_invoice_for_missing_client_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .as_admin(app.client.post(app.url("/invoices")))
        .json(&json!({
            "client_id": "99999999-9999-9999-9999-999999999999",
            "lines": [{ "description": "Work", "quantity": 1, "unit_price": 100 }]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn client_role_cannot_create_invoices() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Tenant Co").await;
    let client_id = client["client_id"].as_str().unwrap();

    let response = app
        .as_client(app.client.post(app.url("/invoices")), client_id)
        .json(&json!({
            "client_id": client_id,
            "lines": [{ "description": "Work", "quantity": 1, "unit_price": 100 }]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn client_role_list_is_scoped_to_own_invoices() {
    let app = TestApp::spawn().await;
    let client_a = app.seed_client("Client A").await;
    let client_b = app.seed_client("Client B").await;
    let a_id = client_a["client_id"].as_str().unwrap();
    let b_id = client_b["client_id"].as_str().unwrap();

    app.seed_invoice(a_id).await;
    app.seed_invoice(b_id).await;
    app.seed_invoice(b_id).await;

    let response = app
        .as_client(app.client.get(app.url("/invoices")), a_id)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total"], 1);
    for invoice in body["invoices"].as_array().unwrap() {
        assert_eq!(invoice["client_id"].as_str().unwrap(), a_id);
    }

    // Staff sees everything.
    let response = app
        .as_staff(app.client.get(app.url("/invoices")))
        .send()
        .await
        .expect("Failed to execute request");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn cross_client_read_is_forbidden() {
    let app = TestApp::spawn().await;
    let client_a = app.seed_client("Owner").await;
    let client_b = app.seed_client("Intruder").await;
    let a_id = client_a["client_id"].as_str().unwrap();
    let b_id = client_b["client_id"].as_str().unwrap();

    let invoice = app.seed_invoice(a_id).await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let response = app
        .as_client(
            app.client.get(app.url(&format!("/invoices/{}", invoice_id))),
            b_id,
        )
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn staff_can_mark_invoice_overdue() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Late Payer Ltd").await;
    let client_id = client["client_id"].as_str().unwrap();
    let invoice = app.seed_invoice(client_id).await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let response = app
        .as_staff(
            app.client
                .patch(app.url(&format!("/invoices/{}", invoice_id))),
        )
        .json(&json!({ "status": "overdue", "due_date": "2026-08-01" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "overdue");
    assert_eq!(body["due_date"], "2026-08-01");
}

#[tokio::test]
async fn staff_cannot_set_webhook_owned_statuses() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Sneaky Staff Ltd").await;
    let client_id = client["client_id"].as_str().unwrap();
    let invoice = app.seed_invoice(client_id).await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    for status in ["paid", "refunded"] {
        let response = app
            .as_staff(
                app.client
                    .patch(app.url(&format!("/invoices/{}", invoice_id))),
            )
            .json(&json!({ "status": status }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), 400, "status {} should be rejected", status);
    }

    let detail = app.get_invoice(invoice_id).await;
    assert_eq!(detail["status"], "pending");
}
