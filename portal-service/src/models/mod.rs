//! Data model for the billing portal.

mod audit;
mod client;
mod invoice;
mod line_item;
mod payment;
mod service;

pub use audit::{AuditEntry, NewAuditEntry};
pub use client::{Client, ClientStatus, CreateClient, UpdateClient};
pub use invoice::{Invoice, InvoiceStatus, ListInvoicesFilter};
pub use line_item::LineItem;
pub use payment::{NewPayment, Payment};
pub use service::{CreateService, Service, UpdateService};
