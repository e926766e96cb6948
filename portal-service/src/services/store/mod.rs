//! Storage abstraction.
//!
//! Components receive an `Arc<dyn Store>` at construction instead of
//! reaching for a shared global. [`postgres::PgStore`] is the production
//! implementation; [`memory::InMemoryStore`] backs the test suite and can
//! inject commit failures to exercise rollback behavior.

pub mod memory;
pub mod postgres;

use crate::models::{
    AuditEntry, Client, CreateClient, CreateService, Invoice, InvoiceStatus, LineItem,
    ListInvoicesFilter, NewAuditEntry, NewPayment, Payment, Service, UpdateClient, UpdateService,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use portal_core::error::AppError;
use uuid::Uuid;

#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    /// Atomically bump and return the counter for `(prefix, year)`.
    ///
    /// The first call for a pair returns 1. Concurrent callers always
    /// observe distinct values.
    async fn next_sequence(&self, prefix: &str, year: i32) -> Result<u32, AppError>;

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    async fn create_client(
        &self,
        input: &CreateClient,
        client_number: &str,
    ) -> Result<Client, AppError>;

    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError>;

    async fn list_clients(&self) -> Result<Vec<Client>, AppError>;

    async fn update_client(
        &self,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError>;

    // -------------------------------------------------------------------------
    // Catalog services
    // -------------------------------------------------------------------------

    async fn create_service(&self, input: &CreateService) -> Result<Service, AppError>;

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, AppError>;

    async fn list_services(&self, active_only: bool) -> Result<Vec<Service>, AppError>;

    async fn update_service(
        &self,
        service_id: Uuid,
        input: &UpdateService,
    ) -> Result<Option<Service>, AppError>;

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    /// Persist an invoice together with its line items in one transaction.
    ///
    /// A unique violation on the invoice number maps to `Conflict` so the
    /// caller can retry with a fresh number.
    async fn insert_invoice(&self, invoice: &Invoice, lines: &[LineItem])
        -> Result<(), AppError>;

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError>;

    async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<LineItem>, AppError>;

    /// Returns the page of invoices plus the total match count.
    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<(Vec<Invoice>, i64), AppError>;

    async fn update_invoice_terms(
        &self,
        invoice_id: Uuid,
        status: Option<InvoiceStatus>,
        due_date: Option<NaiveDate>,
    ) -> Result<Option<Invoice>, AppError>;

    async fn set_gateway_order(&self, invoice_id: Uuid, order_id: &str) -> Result<(), AppError>;

    async fn find_invoice_by_gateway_order(
        &self,
        order_id: &str,
    ) -> Result<Option<Invoice>, AppError>;

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    async fn find_payment_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<Payment>, AppError>;

    async fn find_payment_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, AppError>;

    /// Insert the payment row and flip its invoice to `paid` as one atomic
    /// unit; neither write is visible without the other.
    ///
    /// A duplicate `gateway_payment_id` maps to `Conflict` (idempotent
    /// replay detected at the constraint, e.g. when two deliveries race).
    async fn record_payment_marking_paid(&self, payment: &NewPayment)
        -> Result<Payment, AppError>;

    async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError>;

    // -------------------------------------------------------------------------
    // Audit log
    // -------------------------------------------------------------------------

    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), AppError>;

    async fn list_audit(&self, limit: i64) -> Result<Vec<AuditEntry>, AppError>;
}
