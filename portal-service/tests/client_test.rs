//! Client management and audit trail tests.

mod common;

use chrono::{Datelike, Utc};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn create_client_allocates_number() {
    let app = TestApp::spawn().await;

    let first = app.seed_client("First Co").await;
    let second = app.seed_client("Second Co").await;

    let year = Utc::now().year();
    assert_eq!(
        first["client_number"].as_str().unwrap(),
        format!("CL-{}-00001", year)
    );
    assert_eq!(
        second["client_number"].as_str().unwrap(),
        format!("CL-{}-00002", year)
    );
    assert_eq!(first["status"], "active");
    assert_eq!(first["currency"], "INR");
}

#[tokio::test]
async fn client_numbers_do_not_share_invoice_counter() {
    let app = TestApp::spawn().await;

    let client = app.seed_client("Isolated Co").await;
    let client_id = client["client_id"].as_str().unwrap();
    app.seed_invoice(client_id).await;

    // Both counters started fresh; one invoice and one client each.
    let year = Utc::now().year();
    let second_client = app.seed_client("Second Isolated Co").await;
    assert_eq!(
        second_client["client_number"].as_str().unwrap(),
        format!("CL-{}-00002", year)
    );
}

#[tokio::test]
async fn staff_cannot_create_clients() {
    let app = TestApp::spawn().await;

    let response = app
        .as_staff(app.client.post(app.url("/clients")))
        .json(&json!({ "name": "Not Allowed Co" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn create_client_requires_name() {
    let app = TestApp::spawn().await;

    let response = app
        .as_admin(app.client.post(app.url("/clients")))
        .json(&json!({ "name": "" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn admin_can_suspend_client() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Suspend Me Co").await;
    let client_id = client["client_id"].as_str().unwrap();

    let response = app
        .as_admin(
            app.client
                .patch(app.url(&format!("/clients/{}", client_id))),
        )
        .json(&json!({ "status": "suspended" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "suspended");
}

#[tokio::test]
async fn suspended_clients_invoices_remain_readable() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Historical Co").await;
    let client_id = client["client_id"].as_str().unwrap();
    let invoice = app.seed_invoice(client_id).await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    app.as_admin(
        app.client
            .patch(app.url(&format!("/clients/{}", client_id))),
    )
    .json(&json!({ "status": "suspended" }))
    .send()
    .await
    .expect("Failed to execute request");

    // The billing core still serves the invoice as historical data.
    let detail = app.get_invoice(invoice_id).await;
    assert_eq!(detail["invoice_number"], invoice["invoice_number"]);
}

#[tokio::test]
async fn mutations_land_in_the_audit_log() {
    let app = TestApp::spawn().await;
    let client = app.seed_client("Audited Co").await;
    let client_id = client["client_id"].as_str().unwrap();
    app.seed_invoice(client_id).await;

    let response = app
        .as_admin(app.client.get(app.url("/admin/audit")))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let entries: Vec<serde_json::Value> = response.json().await.unwrap();
    let actions: Vec<&str> = entries
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();

    assert!(actions.contains(&"client.created"));
    assert!(actions.contains(&"invoice.created"));
}

#[tokio::test]
async fn audit_log_is_admin_only() {
    let app = TestApp::spawn().await;

    let response = app
        .as_staff(app.client.get(app.url("/admin/audit")))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 403);
}
