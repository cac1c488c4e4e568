//! Service configuration

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-platform bot credential.
    pub bot_token: String,

    /// Community (guild) identifier to reconcile.
    pub guild_id: String,

    /// Institutional domain accepted as a verification sender.
    pub campus_domain: String,

    /// Seconds between reconciliation cycles.
    pub poll_interval: Duration,

    /// Append-only verification record file.
    pub audit_path: PathBuf,

    /// Mail-provider OAuth client secret file.
    pub gmail_credentials_path: PathBuf,

    /// Mail-provider stored refresh token file.
    pub gmail_token_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bot_token =
            std::env::var("ROLLCALL_BOT_TOKEN").context("ROLLCALL_BOT_TOKEN not set")?;
        let guild_id =
            std::env::var("ROLLCALL_GUILD_ID").context("ROLLCALL_GUILD_ID not set")?;

        let poll_interval = std::env::var("ROLLCALL_POLL_INTERVAL")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("Invalid ROLLCALL_POLL_INTERVAL")?;

        Ok(Config {
            bot_token,
            guild_id,

            campus_domain: std::env::var("ROLLCALL_CAMPUS_DOMAIN")
                .unwrap_or_else(|_| "umich.edu".to_string()),

            poll_interval: Duration::from_secs(poll_interval),

            audit_path: std::env::var("ROLLCALL_AUDIT_PATH")
                .unwrap_or_else(|_| "users.csv".to_string())
                .into(),

            gmail_credentials_path: std::env::var("ROLLCALL_GMAIL_CREDENTIALS")
                .unwrap_or_else(|_| "client_secret.json".to_string())
                .into(),

            gmail_token_path: std::env::var("ROLLCALL_GMAIL_TOKEN")
                .unwrap_or_else(|_| "token.json".to_string())
                .into(),
        })
    }
}
