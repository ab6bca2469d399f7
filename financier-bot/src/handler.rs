//! Chat message handling: commands, access control, expense logging.

use chrono::NaiveDate;
use financier_core::{example_formats, format_row, format_stats, monthly_stats, parse_expense};
use financier_sheets::{LedgerStore, RECENT_LIMIT};

pub struct ChatContext<'a> {
    pub store: &'a dyn LedgerStore,
    pub allowed_chat_id: Option<i64>,
    pub today: NaiveDate,
}

impl ChatContext<'_> {
    fn is_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chat_id.is_none_or(|allowed| allowed == chat_id)
    }
}

/// Produce the reply for one incoming text message, or `None` to stay silent.
pub async fn handle_message(ctx: &ChatContext<'_>, chat_id: i64, text: &str) -> Option<String> {
    let text = text.trim();
    let command = command_name(text);

    if !ctx.is_allowed(chat_id) {
        tracing::warn!(chat_id, "message from chat outside allow-list");
        return (command == Some("start")).then(|| "Access denied for this chat.".to_string());
    }

    let reply = match command {
        Some("start") => {
            tracing::info!(chat_id, "/start");
            format!(
                "Hi! Your chat_id: {chat_id}.\nSend an amount and a category, e.g. '450 coffee'.\nSee /example for more formats."
            )
        }
        Some("example") => {
            let mut out = String::from("Examples:\n");
            for e in example_formats() {
                out.push_str(&format!("• {e}\n"));
            }
            out
        }
        Some("recent") => recent_reply(ctx).await,
        Some("stats") => stats_reply(ctx).await,
        Some(other) => format!("Unknown command: /{other}\nTry /example, /recent or /stats."),
        None => expense_reply(ctx, chat_id, text).await,
    };
    Some(reply)
}

/// `/stats@SomeBot args` -> `stats`
fn command_name(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?.strip_prefix('/')?;
    Some(first.split('@').next().unwrap_or(first))
}

async fn expense_reply(ctx: &ChatContext<'_>, chat_id: i64, text: &str) -> String {
    let expense = match parse_expense(text, ctx.today) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(chat_id, error = %e, "rejected message");
            return format!("❌ {e}\nSend /example to see supported formats.");
        }
    };

    let row = expense.to_row();
    if let Err(e) = ctx.store.append(&row).await {
        tracing::error!(chat_id, error = %e, "failed to save expense");
        return "⚠️ Could not save the expense, please try again later.".to_string();
    }
    tracing::info!(chat_id, amount = expense.amount, category = %expense.category, date = %row.date, "expense saved");

    let mut reply = format!("✅ Saved\n{}", format_row(&row, None));
    match ctx.store.all_rows().await {
        Ok(rows) => {
            reply.push_str("\n\n");
            reply.push_str(&format_stats(monthly_stats(&rows, ctx.today).as_ref()));
        }
        Err(e) => tracing::warn!(error = %e, "saved, but failed to read stats"),
    }
    reply
}

async fn recent_reply(ctx: &ChatContext<'_>) -> String {
    match ctx.store.recent(RECENT_LIMIT).await {
        Ok(rows) if rows.is_empty() => "No expenses yet".to_string(),
        Ok(rows) => {
            let lines: Vec<String> = rows
                .iter()
                .enumerate()
                .map(|(i, r)| format_row(r, Some(i + 1)))
                .collect();
            format!("🧾 Recent expenses:\n\n{}", lines.join("\n"))
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to read recent expenses");
            "⚠️ Could not read recent expenses.".to_string()
        }
    }
}

async fn stats_reply(ctx: &ChatContext<'_>) -> String {
    match ctx.store.all_rows().await {
        Ok(rows) => format_stats(monthly_stats(&rows, ctx.today).as_ref()),
        Err(e) => {
            tracing::error!(error = %e, "failed to read ledger for stats");
            "⚠️ Could not compute statistics.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use financier_core::LedgerRow;
    use financier_sheets::{MemoryLedger, StoreError};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 20).unwrap()
    }

    fn ctx(store: &dyn LedgerStore, allowed: Option<i64>) -> ChatContext<'_> {
        ChatContext {
            store,
            allowed_chat_id: allowed,
            today: today(),
        }
    }

    struct BrokenLedger;

    #[async_trait]
    impl LedgerStore for BrokenLedger {
        async fn append(&self, _row: &LedgerRow) -> financier_sheets::Result<()> {
            Err(StoreError::NotConfigured("test".to_string()))
        }
        async fn recent(&self, _limit: usize) -> financier_sheets::Result<Vec<LedgerRow>> {
            Err(StoreError::NotConfigured("test".to_string()))
        }
        async fn all_rows(&self) -> financier_sheets::Result<Vec<LedgerRow>> {
            Err(StoreError::NotConfigured("test".to_string()))
        }
    }

    #[test]
    fn test_command_name() {
        assert_eq!(command_name("/start"), Some("start"));
        assert_eq!(command_name("/stats@FinancierBot now"), Some("stats"));
        assert_eq!(command_name("450 coffee"), None);
        assert_eq!(command_name(""), None);
    }

    #[tokio::test]
    async fn test_access_control() {
        let store = MemoryLedger::new();
        let c = ctx(&store, Some(1));

        assert_eq!(
            handle_message(&c, 2, "/start").await.as_deref(),
            Some("Access denied for this chat.")
        );
        assert_eq!(handle_message(&c, 2, "450 coffee").await, None);
        assert!(store.all_rows().await.unwrap().is_empty());

        let reply = handle_message(&c, 1, "/start").await.unwrap();
        assert!(reply.contains("chat_id: 1"));
    }

    #[tokio::test]
    async fn test_expense_saved_with_stats() {
        let store = MemoryLedger::new();
        let c = ctx(&store, None);

        let reply = handle_message(&c, 7, r#"450 coffee 01.09.25 "with colleague""#)
            .await
            .unwrap();
        assert!(reply.starts_with("✅ Saved"));
        assert!(reply.contains("• coffee - 450"));

        let rows = store.all_rows().await.unwrap();
        assert_eq!(
            rows,
            vec![LedgerRow::new("2025-09-01", "coffee", "450", "with colleague")]
        );
    }

    #[tokio::test]
    async fn test_parse_error_reply() {
        let store = MemoryLedger::new();
        let c = ctx(&store, None);

        let reply = handle_message(&c, 7, "abc coffee").await.unwrap();
        assert!(reply.contains("Invalid amount: abc"));
        assert!(reply.contains("/example"));
        assert!(store.all_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_and_stats_commands() {
        let store = MemoryLedger::new();
        let c = ctx(&store, None);

        assert_eq!(handle_message(&c, 7, "/recent").await.as_deref(), Some("No expenses yet"));
        assert_eq!(
            handle_message(&c, 7, "/stats").await.as_deref(),
            Some("📊 No data for the current month")
        );

        handle_message(&c, 7, "10 A").await;
        handle_message(&c, 7, "5 B").await;

        let recent = handle_message(&c, 7, "/recent").await.unwrap();
        assert!(recent.contains("1. 💰      5\t 📂 B"));
        assert!(recent.contains("2. 💰     10\t 📂 A"));

        let stats = handle_message(&c, 7, "/stats").await.unwrap();
        assert!(stats.contains("Total: 15"));
    }

    #[tokio::test]
    async fn test_example_and_unknown_commands() {
        let store = MemoryLedger::new();
        let c = ctx(&store, None);

        let examples = handle_message(&c, 7, "/example").await.unwrap();
        assert!(examples.contains("• 450 coffee 01.09"));

        let unknown = handle_message(&c, 7, "/delete").await.unwrap();
        assert!(unknown.starts_with("Unknown command: /delete"));
    }

    #[tokio::test]
    async fn test_store_failure_reply() {
        let store = BrokenLedger;
        let c = ctx(&store, None);

        let reply = handle_message(&c, 7, "450 coffee").await.unwrap();
        assert!(reply.contains("Could not save"));
        let reply = handle_message(&c, 7, "/stats").await.unwrap();
        assert!(reply.contains("Could not compute"));
    }
}
