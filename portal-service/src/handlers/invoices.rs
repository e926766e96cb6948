//! Invoice endpoints.

use crate::middleware::Actor;
use crate::models::{Client, Invoice, InvoiceStatus, LineItem, ListInvoicesFilter, Payment};
use crate::services::invoices::{InvoiceTermsPatch, NewInvoice, NewInvoiceLine};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use portal_core::error::AppError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request to create an invoice.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub lines: Vec<LineItemRequest>,
    pub due_date: Option<NaiveDate>,
    /// Defaults to the client's currency.
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LineItemRequest {
    pub service_id: Option<Uuid>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub status: Option<InvoiceStatus>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Staff edit of status and/or due date.
#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceRequest {
    pub status: Option<InvoiceStatus>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetailResponse {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub lines: Vec<LineItem>,
    pub payments: Vec<Payment>,
    pub client: ClientSummary,
}

#[derive(Debug, Serialize)]
pub struct ClientSummary {
    pub client_id: Uuid,
    pub client_number: String,
    pub name: String,
}

impl From<Client> for ClientSummary {
    fn from(c: Client) -> Self {
        Self {
            client_id: c.client_id,
            client_number: c.client_number,
            name: c.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListInvoicesResponse {
    pub invoices: Vec<Invoice>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

pub async fn create_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    payload.validate()?;

    let input = NewInvoice {
        client_id: payload.client_id,
        lines: payload
            .lines
            .into_iter()
            .map(|l| NewInvoiceLine {
                service_id: l.service_id,
                description: l.description,
                quantity: l.quantity,
                unit_price: l.unit_price,
                tax_rate: l.tax_rate,
            })
            .collect(),
        due_date: payload.due_date,
        currency: payload.currency,
    };

    let (invoice, lines) = state.invoices.create_invoice(&actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse { invoice, lines }),
    ))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<ListInvoicesResponse>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);

    let filter = ListInvoicesFilter {
        status: query.status,
        client_id: None,
        page,
        page_size,
    };

    let (invoices, total) = state.invoices.list_invoices(&actor, filter).await?;
    let pages = (total + page_size - 1) / page_size;

    Ok(Json(ListInvoicesResponse {
        invoices,
        total,
        page,
        pages,
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceDetailResponse>, AppError> {
    let detail = state.invoices.get_invoice(&actor, invoice_id).await?;

    Ok(Json(InvoiceDetailResponse {
        invoice: detail.invoice,
        lines: detail.lines,
        payments: detail.payments,
        client: detail.client.into(),
    }))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<Json<Invoice>, AppError> {
    let patch = InvoiceTermsPatch {
        status: payload.status,
        due_date: payload.due_date,
    };

    let invoice = state
        .invoices
        .update_invoice_terms(&actor, invoice_id, patch)
        .await?;

    Ok(Json(invoice))
}
