use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, Utc};
use chrono_tz::Tz;
use financier_sheets::{CsvLedger, LedgerStore, SheetsLedger, SheetsSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{default_csv_path, ensure_financier_home};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramSection,
    pub sheets: SheetsSection,
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub bot_token: Option<String>,
    /// When set, only this chat may log expenses
    pub allowed_chat_id: Option<i64>,
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSection {
    /// Inline service-account JSON (the key file contents)
    pub service_account_json: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub worksheet: String,
    pub service_worksheet: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Used when Sheets is not configured (default: ~/.financier/expenses.csv)
    pub csv_path: Option<String>,
    /// IANA timezone for "today"; machine local time when unset
    pub timezone: Option<String>,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: None,
            allowed_chat_id: None,
            poll_timeout_secs: 30,
        }
    }
}

impl Default for SheetsSection {
    fn default() -> Self {
        Self {
            service_account_json: None,
            spreadsheet_id: None,
            worksheet: "data".to_string(),
            service_worksheet: "service".to_string(),
        }
    }
}

impl Config {
    /// Overlay values from the process environment (after `.env` is loaded).
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|k| std::env::var(k).ok())
    }

    pub fn apply_env_with(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(v);
        }
        if let Some(v) = get("ALLOWED_CHAT_ID") {
            let id = v
                .trim()
                .parse::<i64>()
                .with_context(|| format!("ALLOWED_CHAT_ID is not an integer: {v}"))?;
            self.telegram.allowed_chat_id = Some(id);
        }
        if let Some(v) = get("GOOGLE_SERVICE_ACCOUNT_JSON") {
            self.sheets.service_account_json = Some(v);
        }
        if let Some(v) = get("GOOGLE_SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = Some(v);
        }
        if let Some(v) = get("GOOGLE_WORKSHEET_NAME") {
            self.sheets.worksheet = v;
        }
        if let Some(v) = get("GOOGLE_WORKSHEET_NAME_SERVICE") {
            self.sheets.service_worksheet = v;
        }
        if let Some(v) = get("FINANCIER_CSV_PATH") {
            self.storage.csv_path = Some(v);
        }
        if let Some(v) = get("FINANCIER_TIMEZONE") {
            self.storage.timezone = Some(v);
        }
        Ok(())
    }

    pub fn sheets_settings(&self) -> Option<SheetsSettings> {
        let json = self.sheets.service_account_json.as_ref()?;
        let id = self.sheets.spreadsheet_id.as_ref()?;
        Some(SheetsSettings {
            service_account_json: json.clone(),
            spreadsheet_id: id.clone(),
            data_sheet: self.sheets.worksheet.clone(),
            service_sheet: self.sheets.service_worksheet.clone(),
        })
    }

    pub fn bot_token(&self) -> Result<&str> {
        match self.telegram.bot_token.as_deref() {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => bail!("TELEGRAM_BOT_TOKEN is not set"),
        }
    }

    /// Configured IANA timezone; `None` means machine local time.
    pub fn timezone(&self) -> Result<Option<Tz>> {
        self.storage
            .timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|_| anyhow::anyhow!("invalid timezone: {name}"))
            })
            .transpose()
    }

    /// Today's date in the configured timezone
    pub fn today(&self) -> Result<NaiveDate> {
        Ok(today_in(self.timezone()?))
    }

    pub fn csv_path(&self) -> Result<PathBuf> {
        match &self.storage.csv_path {
            Some(p) => Ok(PathBuf::from(p)),
            None => default_csv_path(),
        }
    }

    /// Google Sheets when credentials and a spreadsheet id are present, else CSV.
    pub fn open_store(&self) -> Result<Box<dyn LedgerStore>> {
        if let Some(settings) = self.sheets_settings() {
            tracing::info!(spreadsheet = %settings.spreadsheet_id, "using google sheets ledger");
            let ledger = SheetsLedger::new(settings).context("configure google sheets")?;
            return Ok(Box::new(ledger));
        }
        let path = self.csv_path()?;
        tracing::info!(path = %path.display(), "using csv ledger");
        Ok(Box::new(CsvLedger::new(path)))
    }
}

pub fn today_in(tz: Option<Tz>) -> NaiveDate {
    match tz {
        Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
        None => Local::now().date_naive(),
    }
}

const CONFIG_FILE: &str = "config.toml";

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_financier_home()?.join(CONFIG_FILE))
}

/// File config (if any) with environment overrides applied
pub fn load_config() -> Result<Config> {
    let mut cfg = read_config(&config_path()?)?;
    cfg.apply_env()?;
    Ok(cfg)
}

/// A missing file reads as the defaults.
fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str::<Config>(&s).with_context(|| format!("parse {}", path.display()))
}

/// Write a default config unless one is already there.
/// Returns the path and whether a file was written.
pub fn init_config() -> Result<(PathBuf, bool)> {
    let path = config_path()?;
    let written = write_default_config(&path)?;
    Ok((path, written))
}

fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let s = toml::to_string_pretty(&Config::default()).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.sheets.worksheet, "data");
        assert_eq!(cfg.sheets.service_worksheet, "service");
        assert_eq!(cfg.telegram.poll_timeout_secs, 30);
        assert!(cfg.sheets_settings().is_none());
        assert!(cfg.bot_token().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("ALLOWED_CHAT_ID", " -100500 "),
            ("GOOGLE_SPREADSHEET_ID", "sheet-1"),
            ("GOOGLE_SERVICE_ACCOUNT_JSON", "{}"),
            ("GOOGLE_WORKSHEET_NAME", "Expenses"),
            ("FINANCIER_TIMEZONE", ""),
        ]);
        let mut cfg = Config::default();
        cfg.apply_env_with(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(cfg.bot_token().unwrap(), "123:abc");
        assert_eq!(cfg.telegram.allowed_chat_id, Some(-100500));
        assert_eq!(cfg.storage.timezone, None);

        let sheets = cfg.sheets_settings().unwrap();
        assert_eq!(sheets.spreadsheet_id, "sheet-1");
        assert_eq!(sheets.data_sheet, "Expenses");
        assert_eq!(sheets.service_sheet, "service");
    }

    #[test]
    fn test_bad_chat_id_is_error() {
        let vars = env(&[("ALLOWED_CHAT_ID", "me")]);
        let mut cfg = Config::default();
        assert!(cfg.apply_env_with(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
[telegram]
allowed_chat_id = 42

[storage]
timezone = "Europe/Moscow"
"#,
        )
        .unwrap();
        assert_eq!(cfg.telegram.allowed_chat_id, Some(42));
        assert_eq!(cfg.telegram.poll_timeout_secs, 30);
        assert_eq!(cfg.sheets.worksheet, "data");
        assert!(cfg.today().is_ok());
    }

    #[test]
    fn test_invalid_timezone() {
        let mut cfg = Config::default();
        cfg.storage.timezone = Some("Mars/Olympus".to_string());
        assert_eq!(
            cfg.timezone().unwrap_err().to_string(),
            "invalid timezone: Mars/Olympus"
        );
        assert!(cfg.today().is_err());
    }

    #[test]
    fn test_default_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        assert!(write_default_config(&path).unwrap());
        let edited = fs::read_to_string(&path).unwrap().replace("\"data\"", "\"Expenses\"");
        fs::write(&path, edited).unwrap();
        assert!(!write_default_config(&path).unwrap());

        let cfg = read_config(&path).unwrap();
        assert_eq!(cfg.sheets.worksheet, "Expenses");
        assert_eq!(cfg.sheets.service_worksheet, "service");
        assert_eq!(cfg.telegram.poll_timeout_secs, 30);
    }

    #[test]
    fn test_missing_config_file_reads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = read_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg.sheets.worksheet, "data");
    }

    #[test]
    fn test_csv_store_when_sheets_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.storage.csv_path = Some(dir.path().join("x.csv").display().to_string());
        assert_eq!(cfg.csv_path().unwrap(), dir.path().join("x.csv"));
        assert!(cfg.open_store().is_ok());
    }
}
