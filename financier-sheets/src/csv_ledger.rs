//! Local CSV ledger.
//!
//! Layout mirrors the spreadsheet: `date,category,amount,comment`, newest row
//! first, directly under the header.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use financier_core::LedgerRow;
use tokio::sync::Mutex;
use tokio::task;

use crate::error::Result;
use crate::store::LedgerStore;

const HEADER: [&str; 4] = ["date", "category", "amount", "comment"];

pub struct CsvLedger {
    path: PathBuf,
    // serializes read-modify-write in append
    write_lock: Mutex<()>,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` on the blocking pool with an owned copy of the path.
    async fn with_file<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || f(&path)).await?
    }
}

fn read_rows(path: &Path) -> Result<Vec<LedgerRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cells: Vec<&str> = record.iter().collect();
        rows.push(LedgerRow::from_cells(cells.as_slice()));
    }
    Ok(rows)
}

fn write_rows(path: &Path, rows: &[LedgerRow]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        wtr.write_record(HEADER)?;
        for row in rows {
            wtr.write_record(row.to_cells())?;
        }
        wtr.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl LedgerStore for CsvLedger {
    async fn append(&self, row: &LedgerRow) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let row = row.clone();
        let count = self
            .with_file(move |path| {
                let mut rows = read_rows(path)?;
                rows.insert(0, row);
                write_rows(path, &rows)?;
                Ok(rows.len())
            })
            .await?;
        tracing::debug!(path = %self.path.display(), rows = count, "appended csv row");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LedgerRow>> {
        let rows = self.with_file(read_rows).await?;
        Ok(rows.into_iter().filter(|r| !r.is_blank()).take(limit).collect())
    }

    async fn all_rows(&self) -> Result<Vec<LedgerRow>> {
        self.with_file(read_rows).await
    }
}
