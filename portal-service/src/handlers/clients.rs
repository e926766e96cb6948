//! Client management endpoints.

use crate::middleware::Actor;
use crate::models::{Client, ClientStatus, CreateClient, UpdateClient};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use portal_core::error::AppError;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

fn default_currency() -> String {
    "INR".to_string()
}

/// Request to create a client.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub billing_address: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Request to update a client.
#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub billing_address: Option<String>,
    pub currency: Option<String>,
    pub status: Option<ClientStatus>,
}

pub async fn create_client(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    payload.validate()?;

    let client = state
        .clients
        .create_client(
            &actor,
            CreateClient {
                name: payload.name,
                billing_address: payload.billing_address,
                currency: payload.currency,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn list_clients(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Client>>, AppError> {
    let clients = state.clients.list_clients(&actor).await?;
    Ok(Json(clients))
}

pub async fn get_client(
    State(state): State<AppState>,
    actor: Actor,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    let client = state.clients.get_client(&actor, client_id).await?;
    Ok(Json(client))
}

pub async fn update_client(
    State(state): State<AppState>,
    actor: Actor,
    Path(client_id): Path<Uuid>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .clients
        .update_client(
            &actor,
            client_id,
            UpdateClient {
                name: payload.name,
                billing_address: payload.billing_address,
                currency: payload.currency,
                status: payload.status,
            },
        )
        .await?;

    Ok(Json(client))
}
