//! Service catalog management.

use crate::middleware::Actor;
use crate::models::{CreateService, Service, UpdateService};
use crate::services::audit::AuditRecorder;
use crate::services::store::Store;
use portal_core::error::AppError;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    audit: AuditRecorder,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, audit: AuditRecorder) -> Self {
        Self { store, audit }
    }

    pub async fn create_service(
        &self,
        actor: &Actor,
        input: CreateService,
    ) -> Result<Service, AppError> {
        if !actor.role.is_company() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only staff can manage the catalog"
            )));
        }
        validate_pricing(input.unit_price, input.tax_rate)?;

        let service = self.store.create_service(&input).await?;

        self.audit
            .record(
                &actor.actor_id,
                "service.created",
                "Service",
                &service.service_id.to_string(),
                Some(json!({ "name": service.name, "unit_price": service.unit_price })),
            )
            .await?;

        Ok(service)
    }

    pub async fn list_services(
        &self,
        _actor: &Actor,
        active_only: bool,
    ) -> Result<Vec<Service>, AppError> {
        self.store.list_services(active_only).await
    }

    pub async fn update_service(
        &self,
        actor: &Actor,
        service_id: Uuid,
        input: UpdateService,
    ) -> Result<Service, AppError> {
        if !actor.role.is_company() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only staff can manage the catalog"
            )));
        }
        validate_pricing(
            input.unit_price.unwrap_or(Decimal::ZERO),
            input.tax_rate.unwrap_or(Decimal::ZERO),
        )?;

        let service = self
            .store
            .update_service(service_id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Service not found")))?;

        self.audit
            .record(
                &actor.actor_id,
                "service.updated",
                "Service",
                &service.service_id.to_string(),
                Some(json!({ "name": service.name, "active": service.active })),
            )
            .await?;

        Ok(service)
    }
}

fn validate_pricing(unit_price: Decimal, tax_rate: Decimal) -> Result<(), AppError> {
    if unit_price < Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Unit price cannot be negative"
        )));
    }
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Tax rate must be between 0 and 100"
        )));
    }
    Ok(())
}
