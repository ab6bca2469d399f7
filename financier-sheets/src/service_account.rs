//! Google service-account auth: sign a JWT assertion, trade it for an access token.

use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Result, StoreError};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this long before Google's stated expiry
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

/// The fields we need from a service-account JSON key file
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse an inline JSON key (the whole file contents as one string)
    pub fn from_json(json: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(json)?;
        if key.client_email.is_empty() || key.private_key.is_empty() {
            return Err(StoreError::InvalidKey(
                "client_email and private_key are required".to_string(),
            ));
        }
        Ok(key)
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Caches one bearer token per key and refreshes it near expiry
pub struct TokenProvider {
    key: ServiceAccountKey,
    client: reqwest::Client,
    cached: Mutex<Option<(String, Instant)>>,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Self {
        Self {
            key,
            client,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some((token, valid_until)) = cached.as_ref() {
            if Instant::now() < *valid_until {
                return Ok(token.clone());
            }
        }

        let resp = self.request_token().await?;
        let lifetime = Duration::from_secs(resp.expires_in).saturating_sub(EXPIRY_SLACK);
        tracing::debug!(account = %self.key.client_email, "fetched google access token");
        *cached = Some((resp.access_token.clone(), Instant::now() + lifetime));
        Ok(resp.access_token)
    }

    fn assertion(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: self.key.token_uri(),
            iat: now,
            exp: now + 3600,
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?)
    }

    async fn request_token(&self) -> Result<TokenResponse> {
        let assertion = self.assertion()?;
        let resp = self
            .client
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}
