//! The persistence seam between the chat handler and a concrete ledger

use async_trait::async_trait;
use financier_core::LedgerRow;
use tokio::sync::Mutex;

use crate::error::Result;

/// Rows shown by the `/recent` command
pub const RECENT_LIMIT: usize = 9;

/// A ledger stored newest-first.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert `row` as the new first data row.
    async fn append(&self, row: &LedgerRow) -> Result<()>;

    /// Up to `limit` rows, newest first. Blank rows are skipped.
    async fn recent(&self, limit: usize) -> Result<Vec<LedgerRow>>;

    /// Every data row, newest first.
    async fn all_rows(&self) -> Result<Vec<LedgerRow>>;
}

/// Process-local ledger, handy for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<LedgerRow>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with rows already in newest-first order
    pub fn with_rows(rows: Vec<LedgerRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn append(&self, row: &LedgerRow) -> Result<()> {
        self.rows.lock().await.insert(0, row.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LedgerRow>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|r| !r.is_blank())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn all_rows(&self) -> Result<Vec<LedgerRow>> {
        Ok(self.rows.lock().await.clone())
    }
}
