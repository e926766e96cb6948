//! Payment model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A settled payment against an invoice.
///
/// Rows exist only for captured payments; gateway failures never produce
/// one. `gateway_payment_id` is unique and serves as the webhook
/// idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub amount: Decimal,
    pub status: String,
    pub paid_utc: DateTime<Utc>,
}

/// Input for recording a captured payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub invoice_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub amount: Decimal,
}
