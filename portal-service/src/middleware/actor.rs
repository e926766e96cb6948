//! Actor context extractor.
//!
//! Authentication and role resolution happen upstream; the authenticating
//! front end forwards the resolved identity in request headers. Suspended
//! clients are rejected there and never reach this service.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use portal_core::error::AppError;
use uuid::Uuid;

/// Role of the acting identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    CompanyAdmin,
    CompanyStaff,
    Client,
}

impl Role {
    /// Staff-side roles that may manage clients, services and invoices.
    pub fn is_company(&self) -> bool {
        matches!(self, Role::CompanyAdmin | Role::CompanyStaff)
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "company_admin" => Some(Role::CompanyAdmin),
            "company_staff" => Some(Role::CompanyStaff),
            "client" => Some(Role::Client),
            _ => None,
        }
    }
}

/// Authenticated actor extracted from request headers.
#[derive(Debug, Clone)]
pub struct Actor {
    pub actor_id: String,
    pub role: Role,
    /// Set for client-role actors; scopes what they may read and pay.
    pub client_id: Option<Uuid>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id = parts
            .headers
            .get("X-Actor-Id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing X-Actor-Id header")))?
            .to_string();

        let role = parts
            .headers
            .get("X-Actor-Role")
            .and_then(|v| v.to_str().ok())
            .and_then(Role::parse)
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing or unknown X-Actor-Role header"))
            })?;

        let client_id = parts
            .headers
            .get("X-Client-Id")
            .and_then(|v| v.to_str().ok())
            .map(|s| {
                Uuid::parse_str(s).map_err(|_| {
                    AppError::Unauthorized(anyhow::anyhow!("Malformed X-Client-Id header"))
                })
            })
            .transpose()?;

        if role == Role::Client && client_id.is_none() {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Client-role actor without X-Client-Id header"
            )));
        }

        let span = tracing::Span::current();
        span.record("actor_id", actor_id.as_str());

        Ok(Actor {
            actor_id,
            role,
            client_id,
        })
    }
}
