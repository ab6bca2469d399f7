//! Free-text expense parser.
//!
//! Input looks like `450 coffee 01.09.25 "with colleague"`. Stages run in a
//! fixed order, each taking what the previous one left behind:
//!
//! 1. comment: the first `"…"`, `'…'`, `` `…` `` or `<…>` span
//! 2. date: `DD.MM[.YY[YY]]`, also with `/` or `-` as the delimiter
//! 3. amount and category: first token is the amount, the rest is the category

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use thiserror::Error;

use crate::expense::ParsedExpense;

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|'([^']*)'|`([^`]*)`|<([^>]*)>"#).expect("comment regex")
});

// One alternative per delimiter so the optional year must reuse the same one.
// Unanchored: the first date-shaped run anywhere in the text is the token.
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(\d{1,2})\.(\d{1,2})(?:\.(\d{2,4}))?",
        r"|(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?",
        r"|(\d{1,2})-(\d{1,2})(?:-(\d{2,4}))?",
    ))
    .expect("date regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Message must contain at least amount and category")]
    IncompleteMessage,
}

/// Parse one chat message into an expense.
///
/// `today` fills in a missing date and a missing year.
pub fn parse_expense(text: &str, today: NaiveDate) -> Result<ParsedExpense, ParseError> {
    let (rest, comment) = extract_comment(text);
    let (rest, date) = extract_date(&rest, today)?;
    let (amount, category) = split_amount_category(&rest)?;

    Ok(ParsedExpense {
        amount,
        category,
        date,
        comment,
    })
}

/// Remove the leftmost quoted span. Returns `(remainder, comment)`.
pub fn extract_comment(text: &str) -> (String, String) {
    let Some(caps) = COMMENT_RE.captures(text) else {
        return (text.to_string(), String::new());
    };

    let whole = caps.get(0).map_or(0..0, |m| m.range());
    let comment = (1..=4)
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let rest = format!("{}{}", &text[..whole.start], &text[whole.end..]);
    (rest.trim().to_string(), comment)
}

/// Remove the first date token and resolve it against `today`.
///
/// The token is removed with a literal replace, so any other occurrence of the
/// same substring goes too.
pub fn extract_date(text: &str, today: NaiveDate) -> Result<(String, NaiveDate), ParseError> {
    let Some(caps) = DATE_RE.captures(text) else {
        return Ok((text.to_string(), today));
    };

    let token = caps.get(0).map_or("", |m| m.as_str()).to_string();
    let date = resolve_date(&caps, today)
        .ok_or_else(|| ParseError::InvalidDateFormat(token.clone()))?;

    let rest = text.replace(&token, "");
    Ok((rest.trim().to_string(), date))
}

fn resolve_date(caps: &Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
    // groups (1,2,3), (4,5,6), (7,8,9): day, month, optional year
    let base = [1, 4, 7].into_iter().find(|&i| caps.get(i).is_some())?;

    let day: u32 = caps.get(base)?.as_str().parse().ok()?;
    let month: u32 = caps.get(base + 1)?.as_str().parse().ok()?;
    let year = match caps.get(base + 2) {
        Some(y) => {
            let y: i32 = y.as_str().parse().ok()?;
            if y < 100 { y + 2000 } else { y }
        }
        None => today.year(),
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Split `"<amount> <category words...>"`.
pub fn split_amount_category(text: &str) -> Result<(f64, String), ParseError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(ParseError::IncompleteMessage);
    }

    let amount: f64 = tokens[0]
        .parse()
        .map_err(|_| ParseError::InvalidAmount(tokens[0].to_string()))?;

    Ok((amount, tokens[1..].join(" ")))
}
