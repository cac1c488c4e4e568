//! Gmail REST collaborator: implements the mailbox seam over the v1
//! HTTP API, minting access tokens from a stored OAuth2 refresh token.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rollcall_core::{Error, MailHeader, MailMessage, Mailbox, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Refresh this many seconds before the provider-reported expiry.
const TOKEN_EXPIRY_SLACK_SECS: i64 = 60;

pub struct GmailClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_uri: String,
    refresh_token: String,
    access: tokio::sync::Mutex<Option<AccessToken>>,
}

struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

// OAuth client secret file, as issued by the provider console.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<AppCredentials>,
    web: Option<AppCredentials>,
}

#[derive(Debug, Deserialize)]
struct AppCredentials {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Deserialize)]
struct StoredToken {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(default)]
    payload: MessagePayload,
}

#[derive(Debug, Default, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<PayloadHeader>,
    body: Option<PayloadBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct PayloadHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct MessagePart {
    body: Option<PayloadBody>,
}

#[derive(Debug, Deserialize)]
struct PayloadBody {
    data: Option<String>,
}

impl GmailMessage {
    fn into_mail(self) -> MailMessage {
        let body = self.payload.body_text();
        MailMessage {
            id: self.id,
            headers: self
                .payload
                .headers
                .into_iter()
                .map(|h| MailHeader {
                    name: h.name,
                    value: h.value,
                })
                .collect(),
            body,
        }
    }
}

impl MessagePayload {
    /// Plain text of the first MIME part, falling back to the
    /// top-level body. Transport decoding is best effort; undecodable
    /// content reads as empty.
    fn body_text(&self) -> String {
        self.parts
            .first()
            .and_then(|part| part.body.as_ref())
            .or(self.body.as_ref())
            .and_then(|body| body.data.as_deref())
            .map(decode_body_data)
            .unwrap_or_default()
    }
}

/// Gmail body payloads are web-safe base64, padded or not.
fn decode_body_data(data: &str) -> String {
    URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

impl GmailClient {
    /// Build a client from the OAuth client secret file and the
    /// stored refresh token. Missing or unparseable credential files
    /// are a startup-fatal configuration error.
    pub fn from_files(credentials: &Path, token: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(credentials).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", credentials.display()))
        })?;
        let secret: ClientSecretFile = serde_json::from_str(&raw).map_err(|e| {
            Error::Configuration(format!("cannot parse {}: {e}", credentials.display()))
        })?;
        let creds = secret.installed.or(secret.web).ok_or_else(|| {
            Error::Configuration(format!(
                "{} has neither installed nor web credentials",
                credentials.display()
            ))
        })?;

        let raw = std::fs::read_to_string(token)
            .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", token.display())))?;
        let stored: StoredToken = serde_json::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("cannot parse {}: {e}", token.display())))?;

        Ok(Self {
            http: reqwest::Client::new(),
            client_id: creds.client_id,
            client_secret: creds.client_secret,
            token_uri: creds.token_uri,
            refresh_token: stored.refresh_token,
            access: tokio::sync::Mutex::new(None),
        })
    }

    /// Current access token, minting a fresh one when absent or near
    /// expiry.
    async fn bearer(&self) -> Result<String> {
        let mut slot = self.access.lock().await;
        if let Some(token) = slot.as_ref() {
            if Utc::now() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        debug!("refreshing mail provider access token");
        let response: TokenResponse = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| Error::MailProvider(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::MailProvider(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::MailProvider(e.to_string()))?;

        let expires_at = Utc::now()
            + chrono::Duration::seconds((response.expires_in - TOKEN_EXPIRY_SLACK_SECS).max(0));
        *slot = Some(AccessToken {
            token: response.access_token.clone(),
            expires_at,
        });
        Ok(response.access_token)
    }
}

#[async_trait]
impl Mailbox for GmailClient {
    async fn list_message_ids(&self) -> Result<Vec<String>> {
        let bearer = self.bearer().await?;
        let list: MessageList = self
            .http
            .get(format!("{API_BASE}/users/me/messages"))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| Error::MailProvider(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::MailProvider(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::MailProvider(e.to_string()))?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch_message(&self, id: &str) -> Result<MailMessage> {
        let bearer = self.bearer().await?;
        let message: GmailMessage = self
            .http
            .get(format!("{API_BASE}/users/me/messages/{id}?format=full"))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| Error::MailProvider(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::MailProvider(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::MailProvider(e.to_string()))?;
        Ok(message.into_mail())
    }

    async fn trash_message(&self, id: &str) -> Result<()> {
        let bearer = self.bearer().await?;
        self.http
            .post(format!("{API_BASE}/users/me/messages/{id}/trash"))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| Error::MailProvider(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::MailProvider(e.to_string()))?;
        Ok(())
    }
}
