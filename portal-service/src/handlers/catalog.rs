//! Service catalog endpoints.

use crate::middleware::Actor;
use crate::models::{CreateService, Service, UpdateService};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use portal_core::error::AppError;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Request to create a catalog service.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
}

/// Request to update a catalog service.
#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListServicesQuery {
    #[serde(default)]
    pub active_only: bool,
}

pub async fn create_service(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    payload.validate()?;

    let service = state
        .catalog
        .create_service(
            &actor,
            CreateService {
                name: payload.name,
                description: payload.description,
                unit_price: payload.unit_price,
                tax_rate: payload.tax_rate,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn list_services(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListServicesQuery>,
) -> Result<Json<Vec<Service>>, AppError> {
    let services = state
        .catalog
        .list_services(&actor, query.active_only)
        .await?;
    Ok(Json(services))
}

pub async fn update_service(
    State(state): State<AppState>,
    actor: Actor,
    Path(service_id): Path<Uuid>,
    Json(payload): Json<UpdateServiceRequest>,
) -> Result<Json<Service>, AppError> {
    let service = state
        .catalog
        .update_service(
            &actor,
            service_id,
            UpdateService {
                name: payload.name,
                description: payload.description,
                unit_price: payload.unit_price,
                tax_rate: payload.tax_rate,
                active: payload.active,
            },
        )
        .await?;

    Ok(Json(service))
}
