//! Where the bot keeps its files: `config.toml` and the default CSV ledger.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::PathBuf;

/// `$FINANCIER_HOME` if set, else `$HOME/.financier`
pub fn financier_home() -> Result<PathBuf> {
    resolve_home(|k| std::env::var(k).ok())
}

fn resolve_home(get: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    let get = |k: &str| get(k).filter(|v| !v.trim().is_empty());

    if let Some(dir) = get("FINANCIER_HOME") {
        return Ok(PathBuf::from(dir));
    }
    match get("HOME") {
        Some(home) => Ok(PathBuf::from(home).join(".financier")),
        None => bail!("neither FINANCIER_HOME nor HOME is set"),
    }
}

pub fn ensure_financier_home() -> Result<PathBuf> {
    let dir = financier_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_csv_path() -> Result<PathBuf> {
    Ok(ensure_financier_home()?.join("expenses.csv"))
}
