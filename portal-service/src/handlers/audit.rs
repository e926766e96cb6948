//! Audit log read endpoint.

use crate::middleware::{Actor, Role};
use crate::models::AuditEntry;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use portal_core::error::AppError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListAuditQuery {
    pub limit: Option<i64>,
}

pub async fn list_audit(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListAuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    if actor.role != Role::CompanyAdmin {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Only admins can read the audit log"
        )));
    }

    let entries = state.store.list_audit(query.limit.unwrap_or(100)).await?;
    Ok(Json(entries))
}
