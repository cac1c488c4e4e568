//! Rollcall Verifier Service
//!
//! Reconciles a chat-community roster against an institutional email
//! inbox: members who mail the service inbox with their chat handle
//! get the verified role, an announcement, and a durable audit row.

mod config;
mod discord;
mod gmail;

use anyhow::{Context, Result};
use rollcall_core::{CsvAuditStore, Reconciler, ReconcilerSettings};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; missing credentials are fatal here.
    let config = config::Config::from_env()?;

    let chat = Arc::new(discord::DiscordClient::new(
        &config.bot_token,
        &config.guild_id,
    ));
    let mailbox = Arc::new(
        gmail::GmailClient::from_files(&config.gmail_credentials_path, &config.gmail_token_path)
            .context("Failed to load mail provider credentials")?,
    );
    let audit = Arc::new(CsvAuditStore::new(&config.audit_path));

    let settings = ReconcilerSettings {
        campus_domain: config.campus_domain.clone(),
        poll_interval: config.poll_interval,
        ..ReconcilerSettings::default()
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let reconciler = Reconciler::new(settings, chat, mailbox, audit);
    let handle = tokio::spawn(reconciler.run(shutdown_rx));

    info!(
        guild = %config.guild_id,
        domain = %config.campus_domain,
        "rollcall is running; press CTRL-C to exit"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for shutdown signal")?;
    info!("received shutdown signal");

    // Stop issuing cycles; the in-flight cycle finishes before the
    // clients are dropped.
    let _ = shutdown_tx.send(());
    if let Err(e) = handle.await {
        error!("reconciler task aborted: {e}");
    }

    info!("rollcall stopped");
    Ok(())
}
