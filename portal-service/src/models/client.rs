//! Client (tenant) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Client account status.
///
/// Suspension is enforced at authentication, upstream of this service; the
/// billing core keeps serving a suspended client's invoices as historical
/// data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Suspended,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Suspended => "suspended",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "suspended" => ClientStatus::Suspended,
            _ => ClientStatus::Active,
        }
    }
}

/// Client row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub client_number: String,
    pub name: String,
    pub billing_address: Option<String>,
    pub currency: String,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a client.
#[derive(Debug, Clone)]
pub struct CreateClient {
    pub name: String,
    pub billing_address: Option<String>,
    pub currency: String,
}

/// Input for updating a client.
#[derive(Debug, Clone, Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub billing_address: Option<String>,
    pub currency: Option<String>,
    pub status: Option<ClientStatus>,
}
