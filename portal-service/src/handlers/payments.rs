//! Payment initiation endpoint.

use crate::middleware::Actor;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use portal_core::error::AppError;
use serde::Serialize;
use uuid::Uuid;

/// Response after starting a gateway payment; everything the checkout
/// widget needs.
#[derive(Debug, Serialize)]
pub struct PayInvoiceResponse {
    pub order_id: String,
    /// Amount in smallest currency unit (paise for INR).
    pub amount: u64,
    pub currency: String,
    pub key_id: String,
    pub invoice_number: String,
    pub client_name: String,
}

pub async fn pay_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<PayInvoiceResponse>, AppError> {
    let initiation = state.invoices.initiate_payment(&actor, invoice_id).await?;

    Ok(Json(PayInvoiceResponse {
        order_id: initiation.order_id,
        amount: initiation.amount_minor,
        currency: initiation.currency,
        key_id: initiation.key_id,
        invoice_number: initiation.invoice_number,
        client_name: initiation.client_name,
    }))
}
