//! Gateway webhook event model.
//!
//! Razorpay posts a JSON envelope whose shape depends on the event type.
//! Rather than reaching into untyped JSON, the envelope is decoded into
//! [`GatewayEvent`], a tagged union with an explicit `Ignored` variant for
//! event types this service does not act on.

use serde::Deserialize;

/// Raw webhook envelope as posted by the gateway.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
    #[serde(default)]
    pub created_at: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<EntityWrapper<PaymentEntity>>,
    pub refund: Option<EntityWrapper<RefundEntity>>,
}

#[derive(Debug, Deserialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

/// Gateway payment entity, as embedded in payment.* events.
#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    /// Amount in minor units (paise for INR).
    pub amount: u64,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub order_id: Option<String>,
}

/// Gateway refund entity, as embedded in refund.* events.
#[derive(Debug, Deserialize)]
pub struct RefundEntity {
    pub id: String,
    pub payment_id: String,
    pub amount: Option<u64>,
}

/// The events the reconciler acts on.
#[derive(Debug)]
pub enum GatewayEvent {
    PaymentCaptured {
        order_id: String,
        payment_id: String,
        amount_minor: u64,
    },
    PaymentFailed {
        order_id: String,
    },
    RefundCreated {
        refund_id: String,
        payment_id: String,
    },
    /// Anything else: acknowledged without action.
    Ignored {
        event: String,
    },
}

impl GatewayEvent {
    /// Classify a decoded envelope.
    ///
    /// Payment events without an order id (e.g. payments made outside an
    /// order flow) carry nothing this service can reconcile against, so
    /// they fold into `Ignored` rather than failing the delivery.
    pub fn from_envelope(envelope: WebhookEnvelope) -> Self {
        match envelope.event.as_str() {
            "payment.captured" => {
                if let Some(payment) = envelope.payload.payment.map(|w| w.entity) {
                    if let Some(order_id) = payment.order_id {
                        return GatewayEvent::PaymentCaptured {
                            order_id,
                            payment_id: payment.id,
                            amount_minor: payment.amount,
                        };
                    }
                }
                GatewayEvent::Ignored {
                    event: envelope.event,
                }
            }
            "payment.failed" => {
                if let Some(order_id) = envelope
                    .payload
                    .payment
                    .and_then(|w| w.entity.order_id)
                {
                    return GatewayEvent::PaymentFailed { order_id };
                }
                GatewayEvent::Ignored {
                    event: envelope.event,
                }
            }
            "refund.created" => {
                if let Some(refund) = envelope.payload.refund.map(|w| w.entity) {
                    return GatewayEvent::RefundCreated {
                        refund_id: refund.id,
                        payment_id: refund.payment_id,
                    };
                }
                GatewayEvent::Ignored {
                    event: envelope.event,
                }
            }
            _ => GatewayEvent::Ignored {
                event: envelope.event,
            },
        }
    }
}
