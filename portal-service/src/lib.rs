pub mod billing;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use config::Config;
use services::{CatalogService, ClientService, InvoiceService, Store, WebhookReconciler};
use std::sync::Arc;

pub use startup::Application;

/// Shared application state.
///
/// The store and gateway client are constructed once at startup and handed
/// to each component; nothing reaches for a process-wide singleton.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub invoices: InvoiceService,
    pub clients: ClientService,
    pub catalog: CatalogService,
    pub reconciler: WebhookReconciler,
}
