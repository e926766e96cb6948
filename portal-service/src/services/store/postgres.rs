//! Postgres-backed store.

use super::Store;
use crate::config::DatabaseConfig;
use crate::models::{
    AuditEntry, Client, CreateClient, CreateService, Invoice, InvoiceStatus, LineItem,
    ListInvoicesFilter, NewAuditEntry, NewPayment, Payment, Service, UpdateClient, UpdateService,
};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use chrono::NaiveDate;
use portal_core::error::AppError;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, invoice_number, client_id, status, currency, \
     subtotal, tax_amount, total_amount, due_date, gateway_order_id, issued_utc, created_utc";

const CLIENT_COLUMNS: &str =
    "client_id, client_number, name, billing_address, currency, status, created_utc";

const SERVICE_COLUMNS: &str =
    "service_id, name, description, unit_price, tax_rate, active, created_utc";

const LINE_ITEM_COLUMNS: &str = "line_item_id, invoice_id, service_id, description, quantity, \
     unit_price, tax_rate, line_total, sort_order, created_utc";

const PAYMENT_COLUMNS: &str =
    "payment_id, invoice_id, gateway_order_id, gateway_payment_id, amount, status, paid_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool.
    #[instrument(skip(config), fields(service = "portal-service"))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(config.url.expose_secret())
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn next_sequence(&self, prefix: &str, year: i32) -> Result<u32, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["next_sequence"])
            .start_timer();

        // Single-statement upsert keeps the bump atomic under concurrency.
        let counter: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO id_sequences (prefix, year, counter)
            VALUES ($1, $2, 1)
            ON CONFLICT (prefix, year)
            DO UPDATE SET counter = id_sequences.counter + 1
            RETURNING counter
            "#,
        )
        .bind(prefix)
        .bind(year)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to advance sequence: {}", e))
        })?;

        timer.observe_duration();

        Ok(counter as u32)
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(client_number = %client_number))]
    async fn create_client(
        &self,
        input: &CreateClient,
        client_number: &str,
    ) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client_id = Uuid::new_v4();
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (client_id, client_number, name, billing_address, currency, status)
            VALUES ($1, $2, $3, $4, $5, 'active')
            RETURNING {CLIENT_COLUMNS}
            "#,
        ))
        .bind(client_id)
        .bind(client_number)
        .bind(&input.name)
        .bind(&input.billing_address)
        .bind(&input.currency)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Client number {} already taken",
                    client_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create client: {}", e)),
        })?;

        timer.observe_duration();

        info!(client_id = %client.client_id, client_number = %client.client_number, "Client created");

        Ok(client)
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE client_id = $1",
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    #[instrument(skip(self))]
    async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY created_utc DESC",
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        timer.observe_duration();

        Ok(clients)
    }

    #[instrument(skip(self, input), fields(client_id = %client_id))]
    async fn update_client(
        &self,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client"])
            .start_timer();

        let status = input.status.map(|s| s.as_str().to_string());

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = COALESCE($2, name),
                billing_address = COALESCE($3, billing_address),
                currency = COALESCE($4, currency),
                status = COALESCE($5, status)
            WHERE client_id = $1
            RETURNING {CLIENT_COLUMNS}
            "#,
        ))
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.billing_address)
        .bind(&input.currency)
        .bind(&status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update client: {}", e)))?;

        timer.observe_duration();

        Ok(client)
    }

    // -------------------------------------------------------------------------
    // Catalog services
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input))]
    async fn create_service(&self, input: &CreateService) -> Result<Service, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_service"])
            .start_timer();

        let service_id = Uuid::new_v4();
        let service = sqlx::query_as::<_, Service>(&format!(
            r#"
            INSERT INTO services (service_id, name, description, unit_price, tax_rate, active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {SERVICE_COLUMNS}
            "#,
        ))
        .bind(service_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.unit_price)
        .bind(input.tax_rate)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create service: {}", e)))?;

        timer.observe_duration();

        info!(service_id = %service.service_id, name = %service.name, "Catalog service created");

        Ok(service)
    }

    #[instrument(skip(self), fields(service_id = %service_id))]
    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, AppError> {
        let service = sqlx::query_as::<_, Service>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE service_id = $1",
        ))
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get service: {}", e)))?;

        Ok(service)
    }

    #[instrument(skip(self))]
    async fn list_services(&self, active_only: bool) -> Result<Vec<Service>, AppError> {
        let services = sqlx::query_as::<_, Service>(&format!(
            r#"
            SELECT {SERVICE_COLUMNS}
            FROM services
            WHERE ($1::bool = FALSE OR active = TRUE)
            ORDER BY name
            "#,
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list services: {}", e)))?;

        Ok(services)
    }

    #[instrument(skip(self, input), fields(service_id = %service_id))]
    async fn update_service(
        &self,
        service_id: Uuid,
        input: &UpdateService,
    ) -> Result<Option<Service>, AppError> {
        let service = sqlx::query_as::<_, Service>(&format!(
            r#"
            UPDATE services
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                unit_price = COALESCE($4, unit_price),
                tax_rate = COALESCE($5, tax_rate),
                active = COALESCE($6, active)
            WHERE service_id = $1
            RETURNING {SERVICE_COLUMNS}
            "#,
        ))
        .bind(service_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.unit_price)
        .bind(input.tax_rate)
        .bind(input.active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update service: {}", e)))?;

        Ok(service)
    }

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    #[instrument(skip(self, invoice, lines), fields(invoice_number = %invoice.invoice_number))]
    async fn insert_invoice(
        &self,
        invoice: &Invoice,
        lines: &[LineItem],
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_invoice"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO invoices (
                invoice_id, invoice_number, client_id, status, currency,
                subtotal, tax_amount, total_amount, due_date, gateway_order_id, issued_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(invoice.invoice_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.client_id)
        .bind(&invoice.status)
        .bind(&invoice.currency)
        .bind(invoice.subtotal)
        .bind(invoice.tax_amount)
        .bind(invoice.total_amount)
        .bind(invoice.due_date)
        .bind(&invoice.gateway_order_id)
        .bind(invoice.issued_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Invoice number {} already taken",
                    invoice.invoice_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to insert invoice: {}", e)),
        })?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO line_items (
                    line_item_id, invoice_id, service_id, description, quantity,
                    unit_price, tax_rate, line_total, sort_order
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(line.line_item_id)
            .bind(line.invoice_id)
            .bind(line.service_id)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.tax_rate)
            .bind(line.line_total)
            .bind(line.sort_order)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert line item: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice: {}", e))
        })?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            "Invoice created"
        );

        Ok(())
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1",
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<LineItem>, AppError> {
        let line_items = sqlx::query_as::<_, LineItem>(&format!(
            r#"
            SELECT {LINE_ITEM_COLUMNS}
            FROM line_items
            WHERE invoice_id = $1
            ORDER BY sort_order, created_utc
            "#,
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        Ok(line_items)
    }

    #[instrument(skip(self, filter))]
    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<(Vec<Invoice>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100);
        let offset = (filter.page.max(1) - 1) * limit;
        let status_str = filter.status.map(|s| s.as_str().to_string());

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
            ORDER BY created_utc DESC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(&status_str)
        .bind(filter.client_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM invoices
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
            "#,
        )
        .bind(&status_str)
        .bind(filter.client_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count invoices: {}", e)))?;

        timer.observe_duration();

        Ok((invoices, total))
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn update_invoice_terms(
        &self,
        invoice_id: Uuid,
        status: Option<InvoiceStatus>,
        due_date: Option<NaiveDate>,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice_terms"])
            .start_timer();

        let status_str = status.map(|s| s.as_str().to_string());

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = COALESCE($2, status),
                due_date = COALESCE($3, due_date)
            WHERE invoice_id = $1
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .bind(&status_str)
        .bind(due_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id, order_id = %order_id))]
    async fn set_gateway_order(&self, invoice_id: Uuid, order_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE invoices SET gateway_order_id = $2 WHERE invoice_id = $1")
            .bind(invoice_id)
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to store gateway order: {}", e))
            })?;

        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn find_invoice_by_gateway_order(
        &self,
        order_id: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE gateway_order_id = $1",
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to find invoice by order: {}", e))
        })?;

        Ok(invoice)
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(gateway_payment_id = %gateway_payment_id))]
    async fn find_payment_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_payment_id = $1",
        ))
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find payment: {}", e)))?;

        Ok(payment)
    }

    #[instrument(skip(self), fields(gateway_order_id = %gateway_order_id))]
    async fn find_payment_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_order_id = $1",
        ))
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find payment: {}", e)))?;

        Ok(payment)
    }

    #[instrument(skip(self, payment), fields(invoice_id = %payment.invoice_id))]
    async fn record_payment_marking_paid(
        &self,
        payment: &NewPayment,
    ) -> Result<Payment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment_marking_paid"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let payment_id = Uuid::new_v4();
        let recorded = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (
                payment_id, invoice_id, gateway_order_id, gateway_payment_id, amount, status
            )
            VALUES ($1, $2, $3, $4, $5, 'succeeded')
            RETURNING {PAYMENT_COLUMNS}
            "#,
        ))
        .bind(payment_id)
        .bind(payment.invoice_id)
        .bind(&payment.gateway_order_id)
        .bind(&payment.gateway_payment_id)
        .bind(payment.amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Payment {} already recorded",
                    payment.gateway_payment_id
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to insert payment: {}", e)),
        })?;

        sqlx::query("UPDATE invoices SET status = 'paid' WHERE invoice_id = $1")
            .bind(payment.invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to mark invoice paid: {}", e))
            })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit payment: {}", e))
        })?;

        timer.observe_duration();

        info!(
            payment_id = %recorded.payment_id,
            invoice_id = %recorded.invoice_id,
            amount = %recorded.amount,
            "Payment recorded and invoice marked paid"
        );

        Ok(recorded)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1 ORDER BY paid_utc",
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        Ok(payments)
    }

    // -------------------------------------------------------------------------
    // Audit log
    // -------------------------------------------------------------------------

    #[instrument(skip(self, entry), fields(action = %entry.action))]
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (audit_id, actor_id, action, entity_type, entity_id, changes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.changes)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to append audit: {}", e)))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_audit(&self, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT audit_id, actor_id, action, entity_type, entity_id, changes, created_utc
            FROM audit_log
            ORDER BY created_utc DESC
            LIMIT $1
            "#,
        )
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list audit log: {}", e)))?;

        Ok(entries)
    }
}
