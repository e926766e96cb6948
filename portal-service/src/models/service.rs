//! Catalog service model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A catalog entry staff can bill against.
///
/// Invoice lines that reference a service copy its price and tax rate at
/// line-creation time; editing the catalog never rewrites issued invoices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub service_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a catalog service.
#[derive(Debug, Clone)]
pub struct CreateService {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

/// Input for updating a catalog service.
#[derive(Debug, Clone, Default)]
pub struct UpdateService {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub active: Option<bool>,
}
