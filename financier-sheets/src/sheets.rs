//! Google Sheets ledger.
//!
//! Two worksheets:
//! - `data`: rows of (date, category, amount, comment), newest on top
//! - `service`: cell B2 holds the 1-based index of the first data row
//!
//! New rows are inserted at that index so the sheet's header and any
//! formulas above it stay put.

use async_trait::async_trait;
use chrono::Local;
use financier_core::LedgerRow;
use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{Result, StoreError};
use crate::service_account::{ServiceAccountKey, TokenProvider};
use crate::store::LedgerStore;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Upper bound on rows read for statistics
const MAX_ROWS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct SheetsSettings {
    /// Inline service-account JSON key
    pub service_account_json: String,
    pub spreadsheet_id: String,
    pub data_sheet: String,
    pub service_sheet: String,
}

pub struct SheetsLedger {
    client: reqwest::Client,
    tokens: TokenProvider,
    spreadsheet_id: String,
    data_sheet: String,
    service_sheet: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl SheetsLedger {
    pub fn new(settings: SheetsSettings) -> Result<Self> {
        if settings.spreadsheet_id.trim().is_empty() {
            return Err(StoreError::NotConfigured("spreadsheet id".to_string()));
        }
        if settings.service_account_json.trim().is_empty() {
            return Err(StoreError::NotConfigured("service account json".to_string()));
        }

        let key = ServiceAccountKey::from_json(&settings.service_account_json)?;
        let client = reqwest::Client::new();
        Ok(Self {
            tokens: TokenProvider::new(key, client.clone()),
            client,
            spreadsheet_id: settings.spreadsheet_id,
            data_sheet: settings.data_sheet,
            service_sheet: settings.service_sheet,
        })
    }

    /// Write a timestamped marker into A1 of `worksheet`. Returns the value written.
    pub async fn check(&self, worksheet: &str) -> Result<String> {
        let value = format!(
            "Health check OK @ {}",
            Local::now().format("%Y-%m-%dT%H:%M:%S")
        );
        self.put_values(&a1_range(worksheet, "A1"), vec![vec![value.clone()]], "RAW")
            .await?;
        tracing::info!(worksheet, %value, "sheets health check written");
        Ok(value)
    }

    /// 1-based index of the first data row, read from `service!B2`
    pub async fn first_data_row(&self) -> Result<usize> {
        let values = self.get_values(&a1_range(&self.service_sheet, "B2")).await?;
        let raw = values
            .first()
            .and_then(|r| r.first())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        parse_first_row(&raw, &self.service_sheet)
    }

    async fn read_data(&self, first: usize, count: usize) -> Result<Vec<LedgerRow>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let last = first + count - 1;
        let range = a1_range(&self.data_sheet, &format!("A{first}:D{last}"));
        let values = self.get_values(&range).await?;
        Ok(values
            .iter()
            .map(|cells| LedgerRow::from_cells(cells.as_slice()))
            .collect())
    }

    async fn sheet_id(&self, title: &str) -> Result<i64> {
        let mut url = self.spreadsheet_url(&[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");
        let resp = self.authed(self.client.get(url)).await?.send().await?;
        let meta: SpreadsheetMeta = ok_or_api_error(resp).await?.json().await?;

        meta.sheets
            .into_iter()
            .map(|s| s.properties)
            .find(|p| p.title == title)
            .map(|p| p.sheet_id)
            .ok_or_else(|| StoreError::NotConfigured(format!("worksheet '{title}' not found")))
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.spreadsheet_url(&["values", range])?;
        let resp = self.authed(self.client.get(url)).await?.send().await?;
        let body: ValueRange = ok_or_api_error(resp).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn put_values(
        &self,
        range: &str,
        values: Vec<Vec<String>>,
        input_option: &str,
    ) -> Result<()> {
        let mut url = self.spreadsheet_url(&["values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", input_option);
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        let resp = self.authed(self.client.put(url)).await?.json(&body).send().await?;
        ok_or_api_error(resp).await?;
        Ok(())
    }

    async fn insert_blank_row(&self, sheet_id: i64, row_index: usize) -> Result<()> {
        let url = self.batch_update_url()?;
        let body = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row_index - 1,
                        "endIndex": row_index,
                    },
                    "inheritFromBefore": false,
                }
            }]
        });
        let resp = self.authed(self.client.post(url)).await?.json(&body).send().await?;
        ok_or_api_error(resp).await?;
        Ok(())
    }

    async fn authed(&self, req: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(req.bearer_auth(token))
    }

    fn spreadsheet_url(&self, extra: &[&str]) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API)
            .map_err(|e| StoreError::NotConfigured(format!("sheets url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::NotConfigured("sheets url".to_string()))?
            .push(&self.spreadsheet_id)
            .extend(extra);
        Ok(url)
    }

    // `{id}:batchUpdate` is a single path segment with a colon in it
    fn batch_update_url(&self) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API)
            .map_err(|e| StoreError::NotConfigured(format!("sheets url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::NotConfigured("sheets url".to_string()))?
            .push(&format!("{}:batchUpdate", self.spreadsheet_id));
        Ok(url)
    }
}

#[async_trait]
impl LedgerStore for SheetsLedger {
    async fn append(&self, row: &LedgerRow) -> Result<()> {
        let first = self.first_data_row().await?;
        let sheet_id = self.sheet_id(&self.data_sheet).await?;

        self.insert_blank_row(sheet_id, first).await?;
        let range = a1_range(&self.data_sheet, &format!("A{first}:D{first}"));
        self.put_values(&range, vec![row.to_cells().to_vec()], "USER_ENTERED")
            .await?;

        tracing::info!(row = first, category = %row.category, amount = %row.amount, "expense row inserted");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LedgerRow>> {
        let first = self.first_data_row().await?;
        let rows = self.read_data(first, limit).await?;
        Ok(rows.into_iter().filter(|r| !r.is_blank()).collect())
    }

    async fn all_rows(&self) -> Result<Vec<LedgerRow>> {
        let first = self.first_data_row().await?;
        let rows = self.read_data(first, MAX_ROWS + 1).await?;
        tracing::debug!(rows = rows.len(), "read ledger rows");
        Ok(rows)
    }
}

async fn ok_or_api_error(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        body,
    })
}

fn cell_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A1 range with the sheet title quoted, e.g. `'data'!A5:D13`
pub fn a1_range(sheet: &str, cells: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), cells)
}

fn parse_first_row(raw: &str, service_sheet: &str) -> Result<usize> {
    if raw.is_empty() {
        return Err(StoreError::BadFirstRow(format!(
            "{service_sheet}!B2 is empty; cannot determine first data row"
        )));
    }
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(StoreError::BadFirstRow(format!(
            "Invalid first data row in {service_sheet}!B2: {raw}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SheetsSettings {
        SheetsSettings {
            service_account_json: r#"{"client_email":"bot@p","private_key":"k"}"#.to_string(),
            spreadsheet_id: "sheet-123".to_string(),
            data_sheet: "data".to_string(),
            service_sheet: "service".to_string(),
        }
    }

    #[test]
    fn test_a1_range_quotes_titles() {
        assert_eq!(a1_range("data", "A5:D13"), "'data'!A5:D13");
        assert_eq!(a1_range("Bob's sheet", "A1"), "'Bob''s sheet'!A1");
    }

    #[test]
    fn test_parse_first_row() {
        assert_eq!(parse_first_row("5", "service").unwrap(), 5);
        assert!(matches!(parse_first_row("", "service"), Err(StoreError::BadFirstRow(_))));
        assert!(matches!(parse_first_row("0", "service"), Err(StoreError::BadFirstRow(_))));

        let err = parse_first_row("five", "service").unwrap_err();
        assert_eq!(err.to_string(), "Invalid first data row in service!B2: five");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(json!("450")), "450");
        assert_eq!(cell_text(json!(450)), "450");
        assert_eq!(cell_text(Value::Null), "");
    }

    #[test]
    fn test_urls() {
        let ledger = SheetsLedger::new(settings()).unwrap();
        let url = ledger.spreadsheet_url(&["values", "'data'!A1:D9"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/'data'!A1:D9"
        );
        assert_eq!(
            ledger.batch_update_url().unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123:batchUpdate"
        );
    }

    #[test]
    fn test_requires_configuration() {
        let mut s = settings();
        s.spreadsheet_id = String::new();
        assert!(matches!(SheetsLedger::new(s), Err(StoreError::NotConfigured(_))));

        let mut s = settings();
        s.service_account_json = " ".to_string();
        assert!(matches!(SheetsLedger::new(s), Err(StoreError::NotConfigured(_))));
    }
}
