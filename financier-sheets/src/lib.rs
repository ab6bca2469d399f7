//! financier-sheets: ledger storage backends (Google Sheets, local CSV, in-memory)

pub mod csv_ledger;
pub mod error;
pub mod service_account;
pub mod sheets;
pub mod store;

pub use csv_ledger::CsvLedger;
pub use error::{Result, StoreError};
pub use service_account::{ServiceAccountKey, TokenProvider};
pub use sheets::{SheetsLedger, SheetsSettings};
pub use store::{LedgerStore, MemoryLedger, RECENT_LIMIT};
