//! Expense records: the parser's output and its persisted ledger form

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A successfully parsed chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedExpense {
    pub amount: f64,
    /// Never empty; joined from the tokens after the amount
    pub category: String,
    /// Serialized as YYYY-MM-DD
    pub date: NaiveDate,
    /// Empty when the message carried no quoted span
    pub comment: String,
}

impl ParsedExpense {
    /// ISO form of the date (YYYY-MM-DD)
    pub fn date_iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Convert into the row shape written to the ledger
    pub fn to_row(&self) -> LedgerRow {
        LedgerRow {
            date: self.date_iso(),
            category: self.category.clone(),
            amount: self.amount.to_string(),
            comment: self.comment.clone(),
        }
    }
}

/// One stored ledger row in column order: date, category, amount, comment.
///
/// Everything is kept as text because spreadsheet cells round-trip that way;
/// the amount is re-parsed on read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerRow {
    pub date: String,
    pub category: String,
    pub amount: String,
    pub comment: String,
}

impl LedgerRow {
    pub fn new(
        date: impl Into<String>,
        category: impl Into<String>,
        amount: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            category: category.into(),
            amount: amount.into(),
            comment: comment.into(),
        }
    }

    /// Build a row from raw cells. Missing cells become empty strings.
    pub fn from_cells<S: AsRef<str>>(cells: &[S]) -> Self {
        let cell = |i: usize| {
            cells
                .get(i)
                .map(|c| c.as_ref().trim().to_string())
                .unwrap_or_default()
        };
        Self {
            date: cell(0),
            category: cell(1),
            amount: cell(2),
            comment: cell(3),
        }
    }

    pub fn to_cells(&self) -> [String; 4] {
        [
            self.date.clone(),
            self.category.clone(),
            self.amount.clone(),
            self.comment.clone(),
        ]
    }

    /// True when every cell is blank
    pub fn is_blank(&self) -> bool {
        self.date.is_empty()
            && self.category.is_empty()
            && self.amount.is_empty()
            && self.comment.is_empty()
    }

    /// Numeric amount, if the stored text parses
    pub fn amount_value(&self) -> Option<f64> {
        self.amount.trim().parse::<f64>().ok()
    }

    pub fn date_value(&self) -> Option<NaiveDate> {
        parse_ledger_date(&self.date)
    }
}

impl From<&ParsedExpense> for LedgerRow {
    fn from(expense: &ParsedExpense) -> Self {
        expense.to_row()
    }
}

/// Parse a stored date cell.
///
/// Accepts YYYY-MM-DD (what the parser writes) and DD.MM.YYYY / DD.MM.YY
/// (what a spreadsheet displays for user-entered dates).
pub fn parse_ledger_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }

    let mut it = s.split('.');
    let day: u32 = it.next()?.trim().parse().ok()?;
    let month: u32 = it.next()?.trim().parse().ok()?;
    let mut year: i32 = it.next()?.trim().parse().ok()?;
    if it.next().is_some() {
        return None;
    }
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_row_column_order() {
        let expense = ParsedExpense {
            amount: 450.0,
            category: "coffee".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            comment: "with colleague".to_string(),
        };
        let row = expense.to_row();
        assert_eq!(
            row.to_cells(),
            ["2025-09-01", "coffee", "450", "with colleague"].map(String::from)
        );
    }

    #[test]
    fn test_fractional_amount_text() {
        let expense = ParsedExpense {
            amount: 12.5,
            category: "bus".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            comment: String::new(),
        };
        assert_eq!(LedgerRow::from(&expense).amount, "12.5");
    }

    #[test]
    fn test_from_cells_is_defensive() {
        let row = LedgerRow::from_cells(["01.09.2025", " coffee ", "450"].as_slice());
        assert_eq!(row.category, "coffee");
        assert_eq!(row.comment, "");

        let empty: [&str; 0] = [];
        assert!(LedgerRow::from_cells(empty.as_slice()).is_blank());
    }

    #[test]
    fn test_amount_value() {
        assert_eq!(LedgerRow::new("", "a", " 10.5 ", "").amount_value(), Some(10.5));
        assert_eq!(LedgerRow::new("", "a", "ten", "").amount_value(), None);
        assert_eq!(LedgerRow::new("", "a", "", "").amount_value(), None);
    }

    #[test]
    fn test_parse_ledger_date_forms() {
        let d = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(parse_ledger_date("2025-09-01"), Some(d));
        assert_eq!(parse_ledger_date("01.09.2025"), Some(d));
        assert_eq!(parse_ledger_date("1.9.25"), Some(d));
        assert_eq!(parse_ledger_date("31.02.2025"), None);
        assert_eq!(parse_ledger_date("01.09"), None);
        assert_eq!(parse_ledger_date("yesterday"), None);
        assert_eq!(parse_ledger_date(""), None);
    }

    #[test]
    fn test_serialize_date_as_iso() {
        let expense = ParsedExpense {
            amount: 1.0,
            category: "x".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            comment: String::new(),
        };
        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["date"], "2025-09-01");
    }
}
