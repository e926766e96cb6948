//! In-memory store.
//!
//! Backs the integration test suite and local development without a
//! database. Mutations take a single mutex, which gives the same
//! all-or-nothing visibility the Postgres implementation gets from
//! transactions. `fail_payment_commit` simulates an infrastructure failure
//! between the payment insert and the status flip, for rollback tests.

use super::Store;
use crate::models::{
    AuditEntry, Client, CreateClient, CreateService, Invoice, InvoiceStatus, LineItem,
    ListInvoicesFilter, NewAuditEntry, NewPayment, Payment, Service, UpdateClient, UpdateService,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use portal_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    sequences: HashMap<(String, i32), u32>,
    clients: HashMap<Uuid, Client>,
    services: HashMap<Uuid, Service>,
    invoices: HashMap<Uuid, Invoice>,
    line_items: HashMap<Uuid, Vec<LineItem>>,
    payments: Vec<Payment>,
    audit: Vec<AuditEntry>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    fail_payment_commit: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `record_payment_marking_paid` fail after the payment
    /// insert, forcing a rollback.
    pub fn inject_payment_commit_failure(&self) {
        self.fail_payment_commit.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn next_sequence(&self, prefix: &str, year: i32) -> Result<u32, AppError> {
        let mut inner = self.lock();
        let counter = inner
            .sequences
            .entry((prefix.to_string(), year))
            .or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn create_client(
        &self,
        input: &CreateClient,
        client_number: &str,
    ) -> Result<Client, AppError> {
        let mut inner = self.lock();
        if inner
            .clients
            .values()
            .any(|c| c.client_number == client_number)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Client number {} already taken",
                client_number
            )));
        }

        let client = Client {
            client_id: Uuid::new_v4(),
            client_number: client_number.to_string(),
            name: input.name.clone(),
            billing_address: input.billing_address.clone(),
            currency: input.currency.clone(),
            status: "active".to_string(),
            created_utc: Utc::now(),
        };
        inner.clients.insert(client.client_id, client.clone());
        Ok(client)
    }

    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.lock().clients.get(&client_id).cloned())
    }

    async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let mut clients: Vec<Client> = self.lock().clients.values().cloned().collect();
        clients.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(clients)
    }

    async fn update_client(
        &self,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let mut inner = self.lock();
        let Some(client) = inner.clients.get_mut(&client_id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            client.name = name.clone();
        }
        if let Some(address) = &input.billing_address {
            client.billing_address = Some(address.clone());
        }
        if let Some(currency) = &input.currency {
            client.currency = currency.clone();
        }
        if let Some(status) = input.status {
            client.status = status.as_str().to_string();
        }
        Ok(Some(client.clone()))
    }

    async fn create_service(&self, input: &CreateService) -> Result<Service, AppError> {
        let service = Service {
            service_id: Uuid::new_v4(),
            name: input.name.clone(),
            description: input.description.clone(),
            unit_price: input.unit_price,
            tax_rate: input.tax_rate,
            active: true,
            created_utc: Utc::now(),
        };
        self.lock()
            .services
            .insert(service.service_id, service.clone());
        Ok(service)
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, AppError> {
        Ok(self.lock().services.get(&service_id).cloned())
    }

    async fn list_services(&self, active_only: bool) -> Result<Vec<Service>, AppError> {
        let mut services: Vec<Service> = self
            .lock()
            .services
            .values()
            .filter(|s| !active_only || s.active)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn update_service(
        &self,
        service_id: Uuid,
        input: &UpdateService,
    ) -> Result<Option<Service>, AppError> {
        let mut inner = self.lock();
        let Some(service) = inner.services.get_mut(&service_id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            service.name = name.clone();
        }
        if let Some(description) = &input.description {
            service.description = Some(description.clone());
        }
        if let Some(unit_price) = input.unit_price {
            service.unit_price = unit_price;
        }
        if let Some(tax_rate) = input.tax_rate {
            service.tax_rate = tax_rate;
        }
        if let Some(active) = input.active {
            service.active = active;
        }
        Ok(Some(service.clone()))
    }

    async fn insert_invoice(
        &self,
        invoice: &Invoice,
        lines: &[LineItem],
    ) -> Result<(), AppError> {
        let mut inner = self.lock();
        if inner
            .invoices
            .values()
            .any(|i| i.invoice_number == invoice.invoice_number)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice number {} already taken",
                invoice.invoice_number
            )));
        }
        inner.invoices.insert(invoice.invoice_id, invoice.clone());
        inner.line_items.insert(invoice.invoice_id, lines.to_vec());
        Ok(())
    }

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.lock().invoices.get(&invoice_id).cloned())
    }

    async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<LineItem>, AppError> {
        Ok(self
            .lock()
            .line_items
            .get(&invoice_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<(Vec<Invoice>, i64), AppError> {
        let inner = self.lock();
        let mut matches: Vec<Invoice> = inner
            .invoices
            .values()
            .filter(|i| {
                filter
                    .status
                    .map(|s| i.status == s.as_str())
                    .unwrap_or(true)
                    && filter.client_id.map(|c| i.client_id == c).unwrap_or(true)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));

        let total = matches.len() as i64;
        let limit = filter.page_size.clamp(1, 100) as usize;
        let offset = ((filter.page.max(1) - 1) as usize) * limit;
        let page = matches.into_iter().skip(offset).take(limit).collect();

        Ok((page, total))
    }

    async fn update_invoice_terms(
        &self,
        invoice_id: Uuid,
        status: Option<InvoiceStatus>,
        due_date: Option<NaiveDate>,
    ) -> Result<Option<Invoice>, AppError> {
        let mut inner = self.lock();
        let Some(invoice) = inner.invoices.get_mut(&invoice_id) else {
            return Ok(None);
        };
        if let Some(status) = status {
            invoice.status = status.as_str().to_string();
        }
        if let Some(due_date) = due_date {
            invoice.due_date = Some(due_date);
        }
        Ok(Some(invoice.clone()))
    }

    async fn set_gateway_order(&self, invoice_id: Uuid, order_id: &str) -> Result<(), AppError> {
        let mut inner = self.lock();
        if let Some(invoice) = inner.invoices.get_mut(&invoice_id) {
            invoice.gateway_order_id = Some(order_id.to_string());
        }
        Ok(())
    }

    async fn find_invoice_by_gateway_order(
        &self,
        order_id: &str,
    ) -> Result<Option<Invoice>, AppError> {
        Ok(self
            .lock()
            .invoices
            .values()
            .find(|i| i.gateway_order_id.as_deref() == Some(order_id))
            .cloned())
    }

    async fn find_payment_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<Payment>, AppError> {
        Ok(self
            .lock()
            .payments
            .iter()
            .find(|p| p.gateway_payment_id == gateway_payment_id)
            .cloned())
    }

    async fn find_payment_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, AppError> {
        Ok(self
            .lock()
            .payments
            .iter()
            .find(|p| p.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn record_payment_marking_paid(
        &self,
        payment: &NewPayment,
    ) -> Result<Payment, AppError> {
        let mut inner = self.lock();

        if inner
            .payments
            .iter()
            .any(|p| p.gateway_payment_id == payment.gateway_payment_id)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Payment {} already recorded",
                payment.gateway_payment_id
            )));
        }

        let recorded = Payment {
            payment_id: Uuid::new_v4(),
            invoice_id: payment.invoice_id,
            gateway_order_id: payment.gateway_order_id.clone(),
            gateway_payment_id: payment.gateway_payment_id.clone(),
            amount: payment.amount,
            status: "succeeded".to_string(),
            paid_utc: Utc::now(),
        };
        inner.payments.push(recorded.clone());

        // Simulated crash between the two writes: roll back the insert and
        // surface an infrastructure error, like an aborted transaction would.
        if self.fail_payment_commit.swap(false, Ordering::SeqCst) {
            inner.payments.pop();
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Simulated failure before status update"
            )));
        }

        if let Some(invoice) = inner.invoices.get_mut(&payment.invoice_id) {
            invoice.status = InvoiceStatus::Paid.as_str().to_string();
        }

        Ok(recorded)
    }

    async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        Ok(self
            .lock()
            .payments
            .iter()
            .filter(|p| p.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), AppError> {
        let record = AuditEntry {
            audit_id: Uuid::new_v4(),
            actor_id: entry.actor_id.clone(),
            action: entry.action.clone(),
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id.clone(),
            changes: entry.changes.clone(),
            created_utc: Utc::now(),
        };
        self.lock().audit.push(record);
        Ok(())
    }

    async fn list_audit(&self, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
        let inner = self.lock();
        let mut entries: Vec<AuditEntry> = inner.audit.clone();
        entries.reverse();
        entries.truncate(limit.clamp(1, 500) as usize);
        Ok(entries)
    }
}
