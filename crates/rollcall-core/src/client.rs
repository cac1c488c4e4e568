//! Collaborator seams for the reconciliation loop.
//!
//! The core never talks to a vendor SDK directly; the chat platform,
//! the mail provider, and the durable audit store are trait objects
//! supplied by the service binary (or by test fakes).

use crate::types::{Channel, MailMessage, Member, Role, VerificationRecord};
use crate::Result;
use async_trait::async_trait;

/// Chat-platform surface: roster, role set, channels, grants, messages.
#[async_trait]
pub trait ChatHost: Send + Sync {
    /// Current community membership.
    async fn list_members(&self) -> Result<Vec<Member>>;

    /// Current community role set.
    async fn list_roles(&self) -> Result<Vec<Role>>;

    /// Current community channels.
    async fn list_channels(&self) -> Result<Vec<Channel>>;

    /// Grant a role to a member's account.
    async fn grant_role(&self, member_id: &str, role_id: &str) -> Result<()>;

    /// Post a message to a channel.
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<()>;
}

/// Mail-provider surface: enumerate, fetch, and trash inbox messages.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Identifiers of messages currently in the inbox.
    async fn list_message_ids(&self) -> Result<Vec<String>>;

    /// Full content of one message.
    async fn fetch_message(&self, id: &str) -> Result<MailMessage>;

    /// Move a message to the (reversible) trash state.
    async fn trash_message(&self, id: &str) -> Result<()>;
}

/// Append-only durable record of drained verifications.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append every record in the batch. Duplicate rows across cycles
    /// are accepted; the store is an audit log, not a uniqueness table.
    async fn append(&self, records: &[VerificationRecord]) -> Result<()>;
}
