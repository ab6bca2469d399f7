//! financier-core: expense text parsing, ledger rows and monthly statistics

pub mod expense;
pub mod format;
pub mod parser;
pub mod stats;

pub use expense::{LedgerRow, ParsedExpense, parse_ledger_date};
pub use format::{example_formats, format_row, format_stats};
pub use parser::{ParseError, extract_comment, extract_date, parse_expense, split_amount_category};
pub use stats::{MonthlyAggregate, monthly_stats, summarize};
