//! Chat-facing text for ledger rows and statistics

use crate::expense::LedgerRow;
use crate::stats::MonthlyAggregate;

/// One ledger row as a chat line, optionally numbered.
pub fn format_row(row: &LedgerRow, index: Option<usize>) -> String {
    let amount = match row.amount_value() {
        Some(v) => format!("{v:.0}"),
        None => row.amount.trim().to_string(),
    };

    let mut parts = Vec::new();
    if let Some(i) = index {
        parts.push(format!("{i}."));
    }
    parts.push(format!("💰 {amount:>6}\t"));
    parts.push(format!("📂 {}\t", row.category.trim()));

    let date = row.date.trim();
    if !date.is_empty() {
        parts.push(format!("📅 {date:>10}\t"));
    }
    let comment = row.comment.trim();
    if !comment.is_empty() {
        parts.push(format!("💬 {comment}"));
    }

    parts.join(" ")
}

pub fn format_stats(stats: Option<&MonthlyAggregate>) -> String {
    let Some(stats) = stats else {
        return "📊 No data for the current month".to_string();
    };

    let mut out = String::from("📈 Stats for the current month\n\n");
    out.push_str(&format!("💰 Total: {:.0}\n", stats.total));
    out.push_str(&format!("📅 Per day: {:.0}\n\n", stats.per_day_average));
    out.push_str("📂 Categories:\n");
    for (category, subtotal) in &stats.category_totals {
        out.push_str(&format!("• {category} - {subtotal:.0}\n"));
    }
    out
}

/// Inputs shown by the `/example` command
pub fn example_formats() -> &'static [&'static str] {
    &[
        "450 coffee",
        r#"500 Transport "Taxi""#,
        "450 coffee 01.09.25",
        "450 coffee 01/09/25",
        "450 coffee 01-09-25",
        "450 coffee 01.09",
        r#"450 coffee 01.09.25 "beer""#,
        r#"450 coffee "beer" 01.09.25"#,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expense;
    use chrono::NaiveDate;

    #[test]
    fn test_format_row_full() {
        let row = LedgerRow::new("2025-09-01", "coffee", "450", "with colleague");
        assert_eq!(
            format_row(&row, Some(1)),
            "1. 💰    450\t 📂 coffee\t 📅 2025-09-01\t 💬 with colleague"
        );
    }

    #[test]
    fn test_format_row_skips_empty_fields() {
        let row = LedgerRow::new("", "taxi", "99.6", "");
        assert_eq!(format_row(&row, None), "💰    100\t 📂 taxi\t");
    }

    #[test]
    fn test_format_row_keeps_unparsable_amount() {
        let row = LedgerRow::new("", "taxi", "n/a", "");
        assert_eq!(format_row(&row, None), "💰    n/a\t 📂 taxi\t");
    }

    #[test]
    fn test_format_stats() {
        assert_eq!(format_stats(None), "📊 No data for the current month");

        let stats = MonthlyAggregate {
            total: 18.0,
            per_day_average: 9.0,
            category_totals: vec![("A".to_string(), 15.0), ("B".to_string(), 3.0)],
        };
        assert_eq!(
            format_stats(Some(&stats)),
            "📈 Stats for the current month\n\n💰 Total: 18\n📅 Per day: 9\n\n📂 Categories:\n• A - 15\n• B - 3\n"
        );
    }

    #[test]
    fn test_examples_all_parse() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 20).unwrap();
        for text in example_formats() {
            let parsed = parse_expense(text, today);
            assert!(parsed.is_ok(), "example {text:?} failed: {parsed:?}");
        }
    }
}
