//! Webhook reconciliation tests: signature checks, idempotency, atomicity
//! and out-of-order deliveries.

mod common;

use common::{captured_event, failed_event, refund_event, TestApp};
use rust_decimal::Decimal;
use serde_json::json;

/// Create a client + invoice and initiate payment against a stubbed
/// gateway order. Returns (invoice_id, client_id).
async fn invoice_with_order(app: &TestApp, order_id: &str) -> (String, String) {
    app.mock_gateway_order(order_id).await;
    let client = app.seed_client("Webhook Customer").await;
    let client_id = client["client_id"].as_str().unwrap().to_string();
    let invoice = app.seed_invoice(&client_id).await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap().to_string();
    app.initiate_payment(&invoice_id, &client_id).await;
    (invoice_id, client_id)
}

#[tokio::test]
async fn captured_payment_marks_invoice_paid() {
    let app = TestApp::spawn().await;
    let (invoice_id, _) = invoice_with_order(&app, "order_wh_1").await;

    let body = captured_event("order_wh_1", "pay_wh_1", 218000);
    let signature = app.sign_webhook(&body);

    let response = app.deliver_webhook(&body, &signature).await;
    assert_eq!(response.status(), 200);

    let detail = app.get_invoice(&invoice_id).await;
    assert_eq!(detail["status"], "paid");

    let payments = detail["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["gateway_payment_id"], "pay_wh_1");
    let amount: Decimal = payments[0]["amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(amount, Decimal::from(2180));
}

#[tokio::test]
async fn duplicate_delivery_records_exactly_one_payment() {
    let app = TestApp::spawn().await;
    let (invoice_id, _) = invoice_with_order(&app, "order_wh_dup").await;

    let body = captured_event("order_wh_dup", "pay_wh_dup", 218000);
    let signature = app.sign_webhook(&body);

    let first = app.deliver_webhook(&body, &signature).await;
    assert_eq!(first.status(), 200);

    // The gateway retries the exact same delivery.
    let second = app.deliver_webhook(&body, &signature).await;
    assert_eq!(second.status(), 200);

    let detail = app.get_invoice(&invoice_id).await;
    assert_eq!(detail["status"], "paid");
    assert_eq!(detail["payments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tampered_body_is_rejected_without_side_effects() {
    let app = TestApp::spawn().await;
    let (invoice_id, _) = invoice_with_order(&app, "order_wh_tamper").await;

    let body = captured_event("order_wh_tamper", "pay_wh_tamper", 218000);
    let signature = app.sign_webhook(&body);

    // One altered byte, signature left as-is.
    let tampered = body.replace("218000", "218001");
    let response = app.deliver_webhook(&tampered, &signature).await;
    assert_eq!(response.status(), 400);

    let detail = app.get_invoice(&invoice_id).await;
    assert_eq!(detail["status"], "pending");
    assert!(detail["payments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/webhooks/razorpay"))
        .header("content-type", "application/json")
        .body(captured_event("order_x", "pay_x", 100))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn store_failure_rolls_back_payment_and_status() {
    let app = TestApp::spawn().await;
    let (invoice_id, _) = invoice_with_order(&app, "order_wh_crash").await;

    let body = captured_event("order_wh_crash", "pay_wh_crash", 218000);
    let signature = app.sign_webhook(&body);

    // Simulate a crash between the payment insert and the status flip.
    // The delivery must NOT be acknowledged, so the gateway retries.
    app.store.inject_payment_commit_failure();
    let response = app.deliver_webhook(&body, &signature).await;
    assert_eq!(response.status(), 500);

    let detail = app.get_invoice(&invoice_id).await;
    assert_eq!(detail["status"], "pending");
    assert!(detail["payments"].as_array().unwrap().is_empty());

    // The retry succeeds once the store recovers.
    let retry = app.deliver_webhook(&body, &signature).await;
    assert_eq!(retry.status(), 200);

    let detail = app.get_invoice(&invoice_id).await;
    assert_eq!(detail["status"], "paid");
    assert_eq!(detail["payments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_payment_releases_invoice_for_retry() {
    let app = TestApp::spawn().await;
    let (invoice_id, _) = invoice_with_order(&app, "order_wh_fail").await;

    // Staff had marked it overdue in the meantime.
    let response = app
        .as_staff(
            app.client
                .patch(app.url(&format!("/invoices/{}", invoice_id))),
        )
        .json(&json!({ "status": "overdue" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let body = failed_event("order_wh_fail", "pay_wh_fail");
    let signature = app.sign_webhook(&body);
    let response = app.deliver_webhook(&body, &signature).await;
    assert_eq!(response.status(), 200);

    let detail = app.get_invoice(&invoice_id).await;
    assert_eq!(detail["status"], "pending");
}

#[tokio::test]
async fn stale_failure_after_capture_does_not_regress_paid_invoice() {
    let app = TestApp::spawn().await;
    let (invoice_id, _) = invoice_with_order(&app, "order_wh_stale").await;

    let capture = captured_event("order_wh_stale", "pay_wh_stale", 218000);
    let signature = app.sign_webhook(&capture);
    app.deliver_webhook(&capture, &signature).await;

    // A failure for the same order arrives late, out of order.
    let failure = failed_event("order_wh_stale", "pay_wh_stale_2");
    let signature = app.sign_webhook(&failure);
    let response = app.deliver_webhook(&failure, &signature).await;
    assert_eq!(response.status(), 200);

    let detail = app.get_invoice(&invoice_id).await;
    assert_eq!(detail["status"], "paid");
}

#[tokio::test]
async fn refund_marks_invoice_refunded() {
    let app = TestApp::spawn().await;
    let (invoice_id, _) = invoice_with_order(&app, "order_wh_refund").await;

    let capture = captured_event("order_wh_refund", "pay_wh_refund", 218000);
    let signature = app.sign_webhook(&capture);
    app.deliver_webhook(&capture, &signature).await;

    let refund = refund_event("pay_wh_refund");
    let signature = app.sign_webhook(&refund);
    let response = app.deliver_webhook(&refund, &signature).await;
    assert_eq!(response.status(), 200);

    let detail = app.get_invoice(&invoice_id).await;
    assert_eq!(detail["status"], "refunded");
}

#[tokio::test]
async fn refund_for_unknown_payment_is_acknowledged() {
    let app = TestApp::spawn().await;

    let refund = refund_event("pay_never_seen");
    let signature = app.sign_webhook(&refund);
    let response = app.deliver_webhook(&refund, &signature).await;

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn capture_for_unknown_order_is_acknowledged() {
    let app = TestApp::spawn().await;

    // Test traffic or an unrelated order: nothing to reconcile, still 200
    // so the gateway does not retry-storm.
    let body = captured_event("order_unknown", "pay_unknown", 5000);
    let signature = app.sign_webhook(&body);
    let response = app.deliver_webhook(&body, &signature).await;

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn unrecognized_event_types_are_acknowledged() {
    let app = TestApp::spawn().await;

    let body = json!({
        "entity": "event",
        "event": "subscription.activated",
        "payload": {}
    })
    .to_string();
    let signature = app.sign_webhook(&body);

    let response = app.deliver_webhook(&body, &signature).await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn end_to_end_invoice_payment_flow() {
    let app = TestApp::spawn().await;
    app.mock_gateway_order("order_e2e").await;

    // Create invoice with 2 lines: 2 x 500 @ 18% and 1 x 1000 @ 0%.
    let client = app.seed_client("E2E Customer").await;
    let client_id = client["client_id"].as_str().unwrap();
    let invoice = app.seed_invoice(client_id).await;
    let invoice_id = invoice["invoice_id"].as_str().unwrap();

    let subtotal: Decimal = invoice["subtotal"].as_str().unwrap().parse().unwrap();
    let tax: Decimal = invoice["tax_amount"].as_str().unwrap().parse().unwrap();
    let total: Decimal = invoice["total_amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(subtotal, Decimal::from(2000));
    assert_eq!(tax, Decimal::from(180));
    assert_eq!(total, Decimal::from(2180));

    // Initiate payment: order created and stored.
    let pay = app.initiate_payment(invoice_id, client_id).await;
    assert_eq!(pay["order_id"], "order_e2e");
    assert_eq!(pay["amount"], 218000);

    // Gateway confirms the capture with 218000 minor units.
    let body = captured_event("order_e2e", "pay_e2e", 218000);
    let signature = app.sign_webhook(&body);
    let response = app.deliver_webhook(&body, &signature).await;
    assert_eq!(response.status(), 200);

    let detail = app.get_invoice(invoice_id).await;
    assert_eq!(detail["status"], "paid");
    let payments = detail["payments"].as_array().unwrap();
    assert_eq!(payments.len(), 1);
    let amount: Decimal = payments[0]["amount"].as_str().unwrap().parse().unwrap();
    assert_eq!(amount, Decimal::from(2180));
}
