//! Minimal Telegram Bot API client: long-poll `getUpdates`, reply with `sendMessage`.

use anyhow::{Context, Result, bail};
use financier_sheets::LedgerStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{Config, today_in};
use crate::handler::{ChatContext, handle_message};

const API_BASE: &str = "https://api.telegram.org";
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

pub struct TelegramClient {
    client: reqwest::Client,
    base: String,
    poll_timeout: u64,
}

impl TelegramClient {
    pub fn new(token: &str, poll_timeout: u64) -> Result<Self> {
        // leave room for the server-side long-poll wait
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout + 10))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base: format!("{API_BASE}/bot{token}"),
            poll_timeout,
        })
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let resp = self
            .client
            .get(format!("{}/getUpdates", self.base))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout.to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            .send()
            .await
            .context("telegram getUpdates")?;
        read_result(resp).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/sendMessage", self.base))
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            .context("telegram sendMessage")?;
        let _: serde_json::Value = read_result(resp).await?;
        Ok(())
    }
}

async fn read_result<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body: ApiResponse<T> = resp
        .json()
        .await
        .with_context(|| format!("parse telegram response ({status})"))?;
    unwrap_api(body)
}

fn unwrap_api<T>(body: ApiResponse<T>) -> Result<T> {
    if !body.ok {
        bail!(
            "telegram error: {}",
            body.description.unwrap_or_else(|| "unknown".to_string())
        );
    }
    body.result.context("telegram response without result")
}

/// Poll until Ctrl-C, answering each text message through the handler.
pub async fn run_bot(cfg: &Config, store: &dyn LedgerStore) -> Result<()> {
    let tz = cfg.timezone()?;
    let tg = TelegramClient::new(cfg.bot_token()?, cfg.telegram.poll_timeout_secs)?;
    let mut offset = 0i64;

    tracing::info!("starting telegram bot polling");
    loop {
        let updates = tokio::select! {
            res = tg.get_updates(offset) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                return Ok(());
            }
        };

        let updates = match updates {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(error = %e, "polling failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(msg) = update.message else { continue };
            let Some(text) = msg.text else { continue };

            let ctx = ChatContext {
                store,
                allowed_chat_id: cfg.telegram.allowed_chat_id,
                today: today_in(tz),
            };
            if let Some(reply) = handle_message(&ctx, msg.chat.id, &text).await {
                if let Err(e) = tg.send_message(msg.chat.id, &reply).await {
                    tracing::error!(chat_id = msg.chat.id, error = %e, "failed to send reply");
                }
            }
        }
    }
}
