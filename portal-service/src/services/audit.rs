//! Audit recorder.
//!
//! Every state-changing operation appends one record. Webhook-originated
//! changes use [`WEBHOOK_ACTOR`] since no human initiated them.

use crate::models::NewAuditEntry;
use crate::services::store::Store;
use portal_core::error::AppError;
use std::sync::Arc;

/// Sentinel actor id for changes applied by the webhook reconciler.
pub const WEBHOOK_ACTOR: &str = "gateway-webhook";

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn Store>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        actor_id: &str,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        changes: Option<serde_json::Value>,
    ) -> Result<(), AppError> {
        self.store
            .append_audit(&NewAuditEntry {
                actor_id: actor_id.to_string(),
                action: action.to_string(),
                entity_type: entity_type.to_string(),
                entity_id: entity_id.to_string(),
                changes,
            })
            .await
    }
}
