//! Human-readable identifier sequences.
//!
//! Invoice numbers look like `INV-2026-00042`, client numbers like
//! `CL-2026-00007`. Counters restart at 1 each calendar year and are
//! allocated from an atomic store-side sequence, so concurrent creations
//! cannot hand out the same number. The unique index on the number column
//! stays as the last line of defense; a violation there surfaces as a
//! retryable conflict.

use crate::services::store::Store;
use chrono::{Datelike, Utc};
use portal_core::error::AppError;
use std::sync::Arc;

pub const INVOICE_PREFIX: &str = "INV";
pub const CLIENT_PREFIX: &str = "CL";

const COUNTER_WIDTH: usize = 5;

/// Render `<prefix>-<year>-<zero-padded counter>`.
pub fn format_number(prefix: &str, year: i32, counter: u32) -> String {
    format!("{}-{}-{:0width$}", prefix, year, counter, width = COUNTER_WIDTH)
}

/// Extract the counter from an identifier, if it matches `prefix` and `year`.
pub fn parse_counter(number: &str, prefix: &str, year: i32) -> Option<u32> {
    let rest = number.strip_prefix(prefix)?.strip_prefix('-')?;
    let (number_year, counter) = rest.split_once('-')?;
    if number_year.parse::<i32>().ok()? != year {
        return None;
    }
    if counter.len() != COUNTER_WIDTH {
        return None;
    }
    counter.parse().ok()
}

/// Allocates the next invoice/client number for the current year.
#[derive(Clone)]
pub struct SequenceGenerator {
    store: Arc<dyn Store>,
}

impl SequenceGenerator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn next_invoice_number(&self) -> Result<String, AppError> {
        self.next(INVOICE_PREFIX).await
    }

    pub async fn next_client_number(&self) -> Result<String, AppError> {
        self.next(CLIENT_PREFIX).await
    }

    async fn next(&self, prefix: &str) -> Result<String, AppError> {
        let year = Utc::now().year();
        let counter = self.store.next_sequence(prefix, year).await?;
        Ok(format_number(prefix, year, counter))
    }
}
