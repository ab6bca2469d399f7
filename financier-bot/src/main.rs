use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use financier_core::{format_row, format_stats, monthly_stats, parse_expense};
use financier_sheets::{RECENT_LIMIT, SheetsLedger};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod config;
mod handler;
mod state;
mod telegram;

#[derive(Parser, Debug)]
#[command(name = "financier", version, about = "Expense logging bot backed by Google Sheets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the Telegram bot (long polling)
    Run,

    /// Parse a message and print the result as JSON without saving it
    Parse {
        /// Message text, e.g. '450 coffee 01.09.25 "with colleague"'
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Parse a message and append it to the ledger
    Add {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Print the most recent ledger rows
    Recent {
        #[arg(long, default_value_t = RECENT_LIMIT)]
        limit: usize,
    },

    /// Print statistics for the current month
    Stats,

    /// Write a health-check marker into the spreadsheet
    Check {
        /// Worksheet to write A1 into (default: the data worksheet)
        #[arg(long)]
        worksheet: Option<String>,
    },

    /// Write a default config.toml into the financier home directory
    InitConfig,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig => {
            let (path, written) = config::init_config()?;
            if written {
                println!("Wrote {}", path.display());
            } else {
                println!("Config already exists: {}", path.display());
            }
        }

        Command::Parse { text } => {
            let cfg = config::load_config()?;
            let expense = parse_expense(&text.join(" "), cfg.today()?)?;
            println!("{}", serde_json::to_string_pretty(&expense)?);
        }

        Command::Add { text } => {
            let cfg = config::load_config()?;
            let expense = parse_expense(&text.join(" "), cfg.today()?)?;
            let row = expense.to_row();
            let store = cfg.open_store()?;
            store.append(&row).await.context("append expense")?;
            println!("Saved: {}", format_row(&row, None));
        }

        Command::Recent { limit } => {
            let cfg = config::load_config()?;
            let store = cfg.open_store()?;
            let rows = store.recent(limit).await.context("read recent expenses")?;
            if rows.is_empty() {
                println!("No expenses yet");
            }
            for (i, row) in rows.iter().enumerate() {
                println!("{}", format_row(row, Some(i + 1)));
            }
        }

        Command::Stats => {
            let cfg = config::load_config()?;
            let store = cfg.open_store()?;
            let rows = store.all_rows().await.context("read ledger")?;
            println!("{}", format_stats(monthly_stats(&rows, cfg.today()?).as_ref()));
        }

        Command::Check { worksheet } => {
            let cfg = config::load_config()?;
            let Some(settings) = cfg.sheets_settings() else {
                bail!("Missing GOOGLE_SPREADSHEET_ID or GOOGLE_SERVICE_ACCOUNT_JSON");
            };
            let worksheet = worksheet.unwrap_or_else(|| settings.data_sheet.clone());
            let ledger = SheetsLedger::new(settings)?;
            let value = ledger
                .check(&worksheet)
                .await
                .with_context(|| format!("write to {worksheet}!A1"))?;
            println!("Successfully wrote to {worksheet}!A1: {value}");
        }

        Command::Run => {
            let cfg = config::load_config()?;
            let store = cfg.open_store()?;
            telegram::run_bot(&cfg, store.as_ref()).await?;
        }
    }

    Ok(())
}
