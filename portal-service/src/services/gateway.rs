//! Razorpay payment gateway client.
//!
//! Wraps the one outbound network call the billing core makes (order
//! creation) and webhook signature verification. The call is a single
//! attempt with a bounded timeout; retry policy belongs to the caller's
//! user, not this client.

use crate::config::RazorpayConfig;
use portal_core::error::AppError;
use portal_core::utils::signature;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Razorpay API client.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    config: RazorpayConfig,
}

/// Request to create a gateway order.
#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    /// Amount in smallest currency unit (paise for INR).
    amount: u64,
    currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<serde_json::Value>,
}

/// Gateway order as returned by the orders API.
#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorResponse {
    error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    code: String,
    description: String,
}

impl GatewayClient {
    pub fn new(config: RazorpayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build gateway HTTP client");

        Self { client, config }
    }

    /// Check if gateway credentials are set.
    pub fn is_configured(&self) -> bool {
        !self.config.key_id.is_empty() && !self.config.key_secret.expose_secret().is_empty()
    }

    /// Public key id the checkout widget needs.
    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    /// Create a new order with the gateway.
    ///
    /// # Arguments
    /// * `amount` - Amount in smallest currency unit (paise for INR)
    /// * `currency` - Currency code (e.g., "INR")
    /// * `receipt` - Optional receipt id for tracking
    /// * `notes` - Optional notes attached to the order
    pub async fn create_order(
        &self,
        amount: u64,
        currency: &str,
        receipt: Option<String>,
        notes: Option<serde_json::Value>,
    ) -> Result<GatewayOrder, AppError> {
        if !self.is_configured() {
            return Err(AppError::GatewayError(anyhow::anyhow!(
                "Gateway credentials not configured"
            )));
        }

        let request = CreateOrderRequest {
            amount,
            currency: currency.to_string(),
            receipt,
            notes,
        };

        let url = format!("{}/orders", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::GatewayError(anyhow::anyhow!("Order request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::GatewayError(anyhow::anyhow!("Order response failed: {}", e)))?;

        tracing::debug!(status = %status, body = %body, "Gateway create_order response");

        if status.is_success() {
            let order: GatewayOrder = serde_json::from_str(&body).map_err(|e| {
                AppError::GatewayError(anyhow::anyhow!("Malformed order response: {}", e))
            })?;
            tracing::info!(
                order_id = %order.id,
                amount = order.amount,
                currency = %order.currency,
                "Gateway order created"
            );
            Ok(order)
        } else {
            let error: GatewayErrorResponse =
                serde_json::from_str(&body).unwrap_or_else(|_| GatewayErrorResponse {
                    error: GatewayErrorDetail {
                        code: "UNKNOWN".to_string(),
                        description: body.clone(),
                    },
                });
            tracing::error!(
                code = %error.error.code,
                description = %error.error.description,
                "Gateway order creation failed"
            );
            Err(AppError::GatewayError(anyhow::anyhow!(
                "Gateway error: {} - {}",
                error.error.code,
                error.error.description
            )))
        }
    }

    /// Verify a webhook signature over the exact raw body bytes.
    ///
    /// The gateway signs `HMAC-SHA256(request_body, webhook_secret)`.
    /// Comparison is constant-time.
    pub fn verify_webhook_signature(&self, body: &[u8], header_signature: &str) -> bool {
        match signature::verify_payload(
            self.config.webhook_secret.expose_secret(),
            body,
            header_signature,
        ) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(error = %e, "Webhook signature verification errored");
                false
            }
        }
    }
}
