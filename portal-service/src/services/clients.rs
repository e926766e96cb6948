//! Client account management.

use crate::billing::sequence::SequenceGenerator;
use crate::middleware::{Actor, Role};
use crate::models::{Client, CreateClient, UpdateClient};
use crate::services::audit::AuditRecorder;
use crate::services::store::Store;
use portal_core::error::AppError;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn Store>,
    sequences: SequenceGenerator,
    audit: AuditRecorder,
}

impl ClientService {
    pub fn new(store: Arc<dyn Store>, sequences: SequenceGenerator, audit: AuditRecorder) -> Self {
        Self {
            store,
            sequences,
            audit,
        }
    }

    /// Create a client with a freshly allocated `CL-` number.
    /// Admin only.
    pub async fn create_client(
        &self,
        actor: &Actor,
        input: CreateClient,
    ) -> Result<Client, AppError> {
        if actor.role != Role::CompanyAdmin {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only admins can create clients"
            )));
        }
        if input.name.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Name is required")));
        }

        let client_number = self.sequences.next_client_number().await?;
        let client = self.store.create_client(&input, &client_number).await?;

        self.audit
            .record(
                &actor.actor_id,
                "client.created",
                "Client",
                &client.client_id.to_string(),
                Some(json!({
                    "client_number": client.client_number,
                    "name": client.name,
                })),
            )
            .await?;

        Ok(client)
    }

    pub async fn list_clients(&self, actor: &Actor) -> Result<Vec<Client>, AppError> {
        if !actor.role.is_company() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only staff can list clients"
            )));
        }
        self.store.list_clients().await
    }

    pub async fn get_client(&self, actor: &Actor, client_id: Uuid) -> Result<Client, AppError> {
        if !actor.role.is_company() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only staff can view clients"
            )));
        }
        self.store
            .get_client(client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))
    }

    /// Update client details or suspend/reactivate. Admin only.
    pub async fn update_client(
        &self,
        actor: &Actor,
        client_id: Uuid,
        input: UpdateClient,
    ) -> Result<Client, AppError> {
        if actor.role != Role::CompanyAdmin {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only admins can update clients"
            )));
        }

        let client = self
            .store
            .update_client(client_id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

        self.audit
            .record(
                &actor.actor_id,
                "client.updated",
                "Client",
                &client.client_id.to_string(),
                Some(json!({
                    "name": input.name,
                    "status": input.status.map(|s| s.as_str()),
                })),
            )
            .await?;

        Ok(client)
    }
}
