//! Invoice operations: creation, reads, staff edits and payment initiation.

use crate::billing::sequence::SequenceGenerator;
use crate::billing::totals::{calc_invoice_totals, line_total, LineAmounts};
use crate::middleware::{Actor, Role};
use crate::models::{
    Client, Invoice, InvoiceStatus, LineItem, ListInvoicesFilter, Payment,
};
use crate::services::audit::AuditRecorder;
use crate::services::gateway::GatewayClient;
use crate::services::metrics::INVOICES_TOTAL;
use crate::services::store::Store;
use chrono::{NaiveDate, Utc};
use portal_core::error::AppError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Input line for invoice creation. Price and tax are already resolved
/// (copied from the catalog when a service is referenced).
#[derive(Debug, Clone)]
pub struct NewInvoiceLine {
    pub service_id: Option<Uuid>,
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

/// Input for invoice creation.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub client_id: Uuid,
    pub lines: Vec<NewInvoiceLine>,
    pub due_date: Option<NaiveDate>,
    /// Defaults to the owning client's currency.
    pub currency: Option<String>,
}

/// Staff edit of invoice terms.
#[derive(Debug, Clone, Default)]
pub struct InvoiceTermsPatch {
    pub status: Option<InvoiceStatus>,
    pub due_date: Option<NaiveDate>,
}

/// An invoice with everything the detail view needs.
#[derive(Debug, Clone)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub lines: Vec<LineItem>,
    pub payments: Vec<Payment>,
    pub client: Client,
}

/// Everything the caller needs to render the gateway checkout widget.
#[derive(Debug, Clone)]
pub struct PaymentInitiation {
    pub order_id: String,
    pub amount_minor: u64,
    pub currency: String,
    pub key_id: String,
    pub invoice_number: String,
    pub client_name: String,
}

#[derive(Clone)]
pub struct InvoiceService {
    store: Arc<dyn Store>,
    sequences: SequenceGenerator,
    gateway: GatewayClient,
    audit: AuditRecorder,
}

impl InvoiceService {
    pub fn new(
        store: Arc<dyn Store>,
        sequences: SequenceGenerator,
        gateway: GatewayClient,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            store,
            sequences,
            gateway,
            audit,
        }
    }

    /// Create an invoice with status `pending` and a freshly allocated
    /// number. Totals are computed from the lines, never taken from input.
    pub async fn create_invoice(
        &self,
        actor: &Actor,
        input: NewInvoice,
    ) -> Result<(Invoice, Vec<LineItem>), AppError> {
        if !actor.role.is_company() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only staff can create invoices"
            )));
        }

        validate_lines(&input.lines)?;

        let client = self
            .store
            .get_client(input.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

        let currency = input.currency.unwrap_or_else(|| client.currency.clone());

        let amounts: Vec<LineAmounts> = input
            .lines
            .iter()
            .map(|l| LineAmounts {
                quantity: l.quantity,
                unit_price: l.unit_price,
                tax_rate: l.tax_rate,
            })
            .collect();
        let totals = calc_invoice_totals(&amounts);

        let invoice_number = self.sequences.next_invoice_number().await?;

        let now = Utc::now();
        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number: invoice_number.clone(),
            client_id: client.client_id,
            status: InvoiceStatus::Pending.as_str().to_string(),
            currency,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total_amount: totals.total_amount,
            due_date: input.due_date,
            gateway_order_id: None,
            issued_utc: now,
            created_utc: now,
        };

        let lines: Vec<LineItem> = input
            .lines
            .into_iter()
            .enumerate()
            .map(|(index, l)| LineItem {
                line_item_id: Uuid::new_v4(),
                invoice_id: invoice.invoice_id,
                service_id: l.service_id,
                description: l.description,
                quantity: l.quantity,
                unit_price: l.unit_price,
                tax_rate: l.tax_rate,
                line_total: line_total(l.quantity, l.unit_price),
                sort_order: index as i32,
                created_utc: now,
            })
            .collect();

        self.store.insert_invoice(&invoice, &lines).await?;

        INVOICES_TOTAL
            .with_label_values(&[invoice.status.as_str()])
            .inc();

        self.audit
            .record(
                &actor.actor_id,
                "invoice.created",
                "Invoice",
                &invoice.invoice_id.to_string(),
                Some(json!({
                    "invoice_number": invoice_number,
                    "total_amount": invoice.total_amount,
                })),
            )
            .await?;

        Ok((invoice, lines))
    }

    /// Fetch an invoice with lines, payments and the owning client.
    /// Client-role actors may only read their own invoices.
    pub async fn get_invoice(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
    ) -> Result<InvoiceDetail, AppError> {
        let invoice = self
            .store
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        ensure_can_read(actor, &invoice)?;

        let lines = self.store.get_line_items(invoice_id).await?;
        let payments = self.store.list_payments(invoice_id).await?;
        let client = self
            .store
            .get_client(invoice.client_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("Invoice references missing client"))
            })?;

        Ok(InvoiceDetail {
            invoice,
            lines,
            payments,
            client,
        })
    }

    /// List invoices. Client-role actors are always scoped to their own
    /// client, whatever filter they ask for.
    pub async fn list_invoices(
        &self,
        actor: &Actor,
        mut filter: ListInvoicesFilter,
    ) -> Result<(Vec<Invoice>, i64), AppError> {
        if actor.role == Role::Client {
            filter.client_id = actor.client_id;
        }
        self.store.list_invoices(&filter).await
    }

    /// Staff edit of status and/or due date.
    ///
    /// `paid` and `refunded` belong to the webhook reconciler and cannot be
    /// set here; settled invoices cannot be re-statused at all.
    pub async fn update_invoice_terms(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        patch: InvoiceTermsPatch,
    ) -> Result<Invoice, AppError> {
        if !actor.role.is_company() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Only staff can edit invoices"
            )));
        }

        let invoice = self
            .store
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        if let Some(status) = patch.status {
            if !status.staff_assignable() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Status {} can only be set by payment reconciliation",
                    status.as_str()
                )));
            }
            if matches!(
                invoice.status(),
                InvoiceStatus::Paid | InvoiceStatus::Refunded
            ) {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Cannot change status of a settled invoice"
                )));
            }
        }

        let updated = self
            .store
            .update_invoice_terms(invoice_id, patch.status, patch.due_date)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        self.audit
            .record(
                &actor.actor_id,
                "invoice.updated",
                "Invoice",
                &invoice_id.to_string(),
                Some(json!({
                    "status": patch.status.map(|s| s.as_str()),
                    "due_date": patch.due_date,
                })),
            )
            .await?;

        Ok(updated)
    }

    /// Start a gateway payment for an invoice.
    ///
    /// Creates a gateway order sized in minor units and stores its id on
    /// the invoice. Invoice status is untouched; only a verified webhook
    /// moves it to `paid`.
    pub async fn initiate_payment(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
    ) -> Result<PaymentInitiation, AppError> {
        let invoice = self
            .store
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        ensure_can_read(actor, &invoice)?;

        if invoice.status() == InvoiceStatus::Paid {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice already paid"
            )));
        }

        let client = self
            .store
            .get_client(invoice.client_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("Invoice references missing client"))
            })?;

        let amount_minor = to_minor_units(invoice.total_amount)?;

        // Nothing is persisted until the gateway call succeeds, so a
        // timeout or rejection leaves the invoice untouched and retryable.
        let order = self
            .gateway
            .create_order(
                amount_minor,
                &invoice.currency,
                Some(invoice.invoice_number.clone()),
                Some(json!({
                    "invoice_id": invoice.invoice_id,
                    "client_id": invoice.client_id,
                })),
            )
            .await?;

        self.store
            .set_gateway_order(invoice.invoice_id, &order.id)
            .await?;

        self.audit
            .record(
                &actor.actor_id,
                "invoice.payment_initiated",
                "Invoice",
                &invoice.invoice_id.to_string(),
                Some(json!({ "gateway_order_id": order.id })),
            )
            .await?;

        Ok(PaymentInitiation {
            order_id: order.id,
            amount_minor,
            currency: invoice.currency,
            key_id: self.gateway.key_id().to_string(),
            invoice_number: invoice.invoice_number,
            client_name: client.name,
        })
    }
}

fn ensure_can_read(actor: &Actor, invoice: &Invoice) -> Result<(), AppError> {
    if actor.role == Role::Client && actor.client_id != Some(invoice.client_id) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Invoice belongs to a different client"
        )));
    }
    Ok(())
}

fn validate_lines(lines: &[NewInvoiceLine]) -> Result<(), AppError> {
    if lines.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "At least one line item is required"
        )));
    }
    for line in lines {
        if line.description.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Line item description is required"
            )));
        }
        if line.quantity < 1 {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Line item quantity must be positive"
            )));
        }
        if line.unit_price < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Line item unit price cannot be negative"
            )));
        }
        if line.tax_rate < Decimal::ZERO || line.tax_rate > Decimal::ONE_HUNDRED {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Line item tax rate must be between 0 and 100"
            )));
        }
    }
    Ok(())
}

/// Convert a 2-decimal-place total into gateway minor units.
fn to_minor_units(total: Decimal) -> Result<u64, AppError> {
    (total * Decimal::ONE_HUNDRED)
        .round()
        .to_u64()
        .ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Invoice total {} out of range", total))
        })
}
