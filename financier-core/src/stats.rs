//! Monthly statistics over stored ledger rows.
//!
//! Malformed rows are skipped rather than failing the whole summary: the
//! ledger is hand-editable and may hold legacy entries.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::expense::LedgerRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyAggregate {
    pub total: f64,
    /// Total divided by the number of distinct days with entries
    pub per_day_average: f64,
    /// Descending by subtotal; ties keep first-seen order
    pub category_totals: Vec<(String, f64)>,
}

impl MonthlyAggregate {
    pub fn category_total(&self, category: &str) -> Option<f64> {
        self.category_totals
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, t)| *t)
    }
}

/// Summarize the rows that fall in `today`'s month and year.
///
/// Returns `None` when no usable row is left, which is different from a
/// month whose amounts add up to zero.
pub fn monthly_stats(rows: &[LedgerRow], today: NaiveDate) -> Option<MonthlyAggregate> {
    let in_month: Vec<&LedgerRow> = rows
        .iter()
        .filter(|row| {
            row.date_value()
                .is_some_and(|d| d.year() == today.year() && d.month() == today.month())
        })
        .collect();

    summarize_iter(in_month)
}

/// Summarize rows that the caller already filtered.
pub fn summarize(rows: &[LedgerRow]) -> Option<MonthlyAggregate> {
    summarize_iter(rows.iter())
}

fn summarize_iter<'a>(rows: impl IntoIterator<Item = &'a LedgerRow>) -> Option<MonthlyAggregate> {
    let mut total = 0.0;
    let mut used = 0usize;
    let mut days: HashSet<String> = HashSet::new();
    let mut category_totals: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(amount) = row.amount_value().filter(|a| a.is_finite()) else {
            continue;
        };
        used += 1;
        total += amount;

        if let Some(day) = day_key(row) {
            days.insert(day);
        }

        let category = row.category.trim();
        if category.is_empty() {
            continue;
        }
        match index.get(category) {
            Some(&i) => category_totals[i].1 += amount,
            None => {
                index.insert(category.to_string(), category_totals.len());
                category_totals.push((category.to_string(), amount));
            }
        }
    }

    if used == 0 {
        return None;
    }

    // stable: equal subtotals stay in first-seen order
    category_totals.sort_by(|a, b| b.1.total_cmp(&a.1));

    let day_count = days.len().max(1);
    Some(MonthlyAggregate {
        total,
        per_day_average: total / day_count as f64,
        category_totals,
    })
}

// Same day written in two formats counts once.
fn day_key(row: &LedgerRow) -> Option<String> {
    if let Some(d) = row.date_value() {
        return Some(d.to_string());
    }
    let raw = row.date.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}
