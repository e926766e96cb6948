//! Application startup and lifecycle management.

use crate::billing::sequence::SequenceGenerator;
use crate::config::Config;
use crate::handlers;
use crate::services::store::postgres::PgStore;
use crate::services::{
    init_metrics, AuditRecorder, CatalogService, ClientService, GatewayClient, InvoiceService,
    Store, WebhookReconciler,
};
use crate::AppState;
use axum::middleware::from_fn;
use axum::{
    routing::{get, patch, post},
    Router,
};
use portal_core::error::AppError;
use portal_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application against Postgres (production path).
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let store = PgStore::connect(&config.database).await?;
        store.run_migrations().await?;
        Self::with_store(config, Arc::new(store)).await
    }

    /// Build the application against an explicit store implementation.
    ///
    /// The test suite passes an in-memory store here; production goes
    /// through [`Application::build`].
    pub async fn with_store(config: Config, store: Arc<dyn Store>) -> Result<Self, AppError> {
        init_metrics();

        let gateway = GatewayClient::new(config.razorpay.clone());
        if gateway.is_configured() {
            tracing::info!("Payment gateway client initialized");
        } else {
            tracing::warn!(
                "Payment gateway credentials not configured - payment features will be limited"
            );
        }

        let audit = AuditRecorder::new(store.clone());
        let sequences = SequenceGenerator::new(store.clone());
        let invoices = InvoiceService::new(
            store.clone(),
            sequences.clone(),
            gateway.clone(),
            audit.clone(),
        );
        let clients = ClientService::new(store.clone(), sequences, audit.clone());
        let catalog = CatalogService::new(store.clone(), audit.clone());
        let reconciler = WebhookReconciler::new(store.clone(), gateway, audit);

        let state = AppState {
            config: config.clone(),
            store,
            invoices,
            clients,
            catalog,
            reconciler,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            // Client management (staff side)
            .route(
                "/clients",
                get(handlers::clients::list_clients).post(handlers::clients::create_client),
            )
            .route(
                "/clients/:id",
                get(handlers::clients::get_client).patch(handlers::clients::update_client),
            )
            // Service catalog
            .route(
                "/services",
                get(handlers::catalog::list_services).post(handlers::catalog::create_service),
            )
            .route("/services/:id", patch(handlers::catalog::update_service))
            // Invoices and payments
            .route(
                "/invoices",
                get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
            )
            .route(
                "/invoices/:id",
                get(handlers::invoices::get_invoice).patch(handlers::invoices::update_invoice),
            )
            .route("/invoices/:id/pay", post(handlers::payments::pay_invoice))
            // Gateway callbacks
            .route("/webhooks/razorpay", post(handlers::webhook::receive_webhook))
            // Audit trail (admin side)
            .route("/admin/audit", get(handlers::audit::list_audit))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        // Port 0 gives a random port, which the test suite relies on.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Portal service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
