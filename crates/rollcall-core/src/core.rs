//! Core types: error taxonomy for the reconciliation loop

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("directory refresh failed: {0}")]
    DirectoryUnavailable(String),

    #[error("inbox listing failed: {0}")]
    InboxUnavailable(String),

    #[error("malformed message {id}: {reason}")]
    MalformedMessage { id: String, reason: String },

    #[error("no member found for handle {0}")]
    UnknownHandle(String),

    #[error("role grant failed for {handle}: {reason}")]
    RoleGrant { handle: String, reason: String },

    #[error("audit store error: {0}")]
    Audit(#[from] std::io::Error),

    #[error("chat platform error: {0}")]
    ChatPlatform(String),

    #[error("mail provider error: {0}")]
    MailProvider(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
