pub mod audit;
pub mod catalog;
pub mod clients;
pub mod gateway;
pub mod invoices;
pub mod metrics;
pub mod reconciler;
pub mod store;

pub use audit::AuditRecorder;
pub use catalog::CatalogService;
pub use clients::ClientService;
pub use gateway::GatewayClient;
pub use invoices::InvoiceService;
pub use metrics::{get_metrics, init_metrics};
pub use reconciler::WebhookReconciler;
pub use store::Store;
