//! Webhook reconciler.
//!
//! Applies the gateway's authoritative payment events to local state
//! exactly once. Signature verification happens before anything else is
//! parsed; the payment insert and the invoice status flip are one atomic
//! store operation; replays are detected by the unique gateway payment id.
//!
//! Acknowledgement contract: `Ok(())` means the delivery may be answered
//! with 200 (including legitimate no-ops such as unknown orders and
//! replays). Errors propagate so infrastructure failures surface as 5xx
//! and the gateway retries the delivery.

use crate::billing::webhook::{GatewayEvent, WebhookEnvelope};
use crate::models::{InvoiceStatus, NewPayment};
use crate::services::audit::{AuditRecorder, WEBHOOK_ACTOR};
use crate::services::gateway::GatewayClient;
use crate::services::metrics::{PAYMENTS_TOTAL, WEBHOOK_EVENTS_TOTAL};
use crate::services::store::Store;
use portal_core::error::AppError;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct WebhookReconciler {
    store: Arc<dyn Store>,
    gateway: GatewayClient,
    audit: AuditRecorder,
}

impl WebhookReconciler {
    pub fn new(store: Arc<dyn Store>, gateway: GatewayClient, audit: AuditRecorder) -> Self {
        Self {
            store,
            gateway,
            audit,
        }
    }

    /// Verify and apply one webhook delivery.
    ///
    /// `body` must be the exact raw request bytes; the signature covers
    /// them, not any re-serialization.
    pub async fn handle(&self, body: &[u8], header_signature: &str) -> Result<(), AppError> {
        if !self.gateway.verify_webhook_signature(body, header_signature) {
            WEBHOOK_EVENTS_TOTAL
                .with_label_values(&["unknown", "rejected"])
                .inc();
            tracing::warn!("Webhook rejected: signature mismatch");
            return Err(AppError::InvalidSignature);
        }

        let envelope: WebhookEnvelope = serde_json::from_slice(body).map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Malformed webhook payload: {}", e))
        })?;
        let event_name = envelope.event.clone();

        tracing::info!(event = %event_name, "Processing gateway webhook");

        match GatewayEvent::from_envelope(envelope) {
            GatewayEvent::PaymentCaptured {
                order_id,
                payment_id,
                amount_minor,
            } => {
                self.apply_capture(&event_name, &order_id, &payment_id, amount_minor)
                    .await
            }
            GatewayEvent::PaymentFailed { order_id } => {
                self.apply_failure(&event_name, &order_id).await
            }
            GatewayEvent::RefundCreated {
                refund_id,
                payment_id,
            } => self.apply_refund(&event_name, &refund_id, &payment_id).await,
            GatewayEvent::Ignored { event } => {
                WEBHOOK_EVENTS_TOTAL
                    .with_label_values(&[event.as_str(), "ignored"])
                    .inc();
                tracing::debug!(event = %event, "Unhandled webhook event type");
                Ok(())
            }
        }
    }

    async fn apply_capture(
        &self,
        event_name: &str,
        order_id: &str,
        payment_id: &str,
        amount_minor: u64,
    ) -> Result<(), AppError> {
        let Some(invoice) = self.store.find_invoice_by_gateway_order(order_id).await? else {
            // Gateway orders can exist without a matching invoice (test
            // traffic, unrelated orders); acknowledge and move on.
            WEBHOOK_EVENTS_TOTAL
                .with_label_values(&[event_name, "no_match"])
                .inc();
            tracing::warn!(order_id = %order_id, "Webhook: no invoice for gateway order");
            return Ok(());
        };

        if self
            .store
            .find_payment_by_gateway_id(payment_id)
            .await?
            .is_some()
        {
            WEBHOOK_EVENTS_TOTAL
                .with_label_values(&[event_name, "replay"])
                .inc();
            tracing::info!(payment_id = %payment_id, "Webhook replay, payment already recorded");
            return Ok(());
        }

        let amount = Decimal::from(amount_minor) / Decimal::ONE_HUNDRED;
        let new_payment = NewPayment {
            invoice_id: invoice.invoice_id,
            gateway_order_id: order_id.to_string(),
            gateway_payment_id: payment_id.to_string(),
            amount,
        };

        let payment = match self.store.record_payment_marking_paid(&new_payment).await {
            Ok(payment) => payment,
            Err(AppError::Conflict(_)) => {
                // Lost a race against a concurrent delivery of the same
                // event; the constraint did its job, nothing to redo.
                WEBHOOK_EVENTS_TOTAL
                    .with_label_values(&[event_name, "replay"])
                    .inc();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        WEBHOOK_EVENTS_TOTAL
            .with_label_values(&[event_name, "applied"])
            .inc();
        PAYMENTS_TOTAL
            .with_label_values(&[invoice.currency.as_str()])
            .inc();

        tracing::info!(
            invoice_id = %invoice.invoice_id,
            payment_id = %payment.payment_id,
            amount = %payment.amount,
            "Invoice paid via webhook"
        );

        self.audit
            .record(
                WEBHOOK_ACTOR,
                "invoice.paid",
                "Invoice",
                &invoice.invoice_id.to_string(),
                Some(json!({
                    "gateway_payment_id": payment_id,
                    "amount": payment.amount,
                })),
            )
            .await?;

        Ok(())
    }

    async fn apply_failure(&self, event_name: &str, order_id: &str) -> Result<(), AppError> {
        // A failure arriving after a successful capture for the same order
        // is stale; applying it would regress a paid invoice.
        if self
            .store
            .find_payment_by_gateway_order(order_id)
            .await?
            .is_some()
        {
            WEBHOOK_EVENTS_TOTAL
                .with_label_values(&[event_name, "stale"])
                .inc();
            tracing::info!(order_id = %order_id, "Ignoring failure for already-settled order");
            return Ok(());
        }

        let Some(invoice) = self.store.find_invoice_by_gateway_order(order_id).await? else {
            WEBHOOK_EVENTS_TOTAL
                .with_label_values(&[event_name, "no_match"])
                .inc();
            return Ok(());
        };

        // Back to pending releases the invoice for another attempt.
        self.store
            .update_invoice_terms(invoice.invoice_id, Some(InvoiceStatus::Pending), None)
            .await?;

        WEBHOOK_EVENTS_TOTAL
            .with_label_values(&[event_name, "applied"])
            .inc();

        self.audit
            .record(
                WEBHOOK_ACTOR,
                "invoice.payment_failed",
                "Invoice",
                &invoice.invoice_id.to_string(),
                Some(json!({ "gateway_order_id": order_id })),
            )
            .await?;

        Ok(())
    }

    async fn apply_refund(
        &self,
        event_name: &str,
        refund_id: &str,
        payment_id: &str,
    ) -> Result<(), AppError> {
        let Some(payment) = self.store.find_payment_by_gateway_id(payment_id).await? else {
            WEBHOOK_EVENTS_TOTAL
                .with_label_values(&[event_name, "no_match"])
                .inc();
            tracing::warn!(payment_id = %payment_id, "Webhook: refund for unknown payment");
            return Ok(());
        };

        self.store
            .update_invoice_terms(payment.invoice_id, Some(InvoiceStatus::Refunded), None)
            .await?;

        WEBHOOK_EVENTS_TOTAL
            .with_label_values(&[event_name, "applied"])
            .inc();

        self.audit
            .record(
                WEBHOOK_ACTOR,
                "invoice.refunded",
                "Invoice",
                &payment.invoice_id.to_string(),
                Some(json!({
                    "gateway_refund_id": refund_id,
                    "gateway_payment_id": payment_id,
                })),
            )
            .await?;

        Ok(())
    }
}
