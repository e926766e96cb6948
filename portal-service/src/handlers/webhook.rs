//! Gateway webhook endpoint.

use crate::AppState;
use axum::{extract::State, http::HeaderMap, Json};
use portal_core::error::AppError;
use serde_json::{json, Value};

pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

/// Receive a gateway webhook delivery.
///
/// The body is taken as the raw string so the signature check covers the
/// exact bytes the gateway signed. A missing or bad signature rejects the
/// delivery before any parsing; everything past that point acknowledges
/// with 200 unless an infrastructure failure should trigger a gateway
/// retry.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    state.reconciler.handle(body.as_bytes(), signature).await?;

    Ok(Json(json!({ "received": true })))
}
