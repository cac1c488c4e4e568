//! Common types used across the reconciliation core

use serde::{Deserialize, Serialize};

/// One chat-community account as seen in the current roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Stable platform account identifier (snowflake).
    pub id: String,
    /// Display handle in `name#NNNN` form; unique within a snapshot.
    pub handle: String,
}

impl Member {
    /// Platform mention string for announcement messages.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A community role, resolved by name fresh each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
}

/// A community channel, resolved by name fresh each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// One header of a fetched inbox message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailHeader {
    pub name: String,
    pub value: String,
}

/// Provider-neutral full message shape handed to the scanner.
///
/// The body is already transport-decoded plain text; header lookup is
/// by case-insensitive name rather than positional offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub id: String,
    pub headers: Vec<MailHeader>,
    pub body: String,
}

impl MailMessage {
    /// First header value with the given name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// One extracted verification claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Claimed chat handle pulled from the message text.
    pub handle: String,
    /// Local-part of the institutional sender address.
    pub campus_id: String,
    /// Source message, for removal after processing.
    pub message_id: String,
}

/// One durable audit row: a verification that was drained from the
/// ledger, written whether or not the handle resolved to a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub handle: String,
    pub campus_id: String,
}

impl VerificationRecord {
    pub fn new(handle: impl Into<String>, campus_id: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            campus_id: campus_id.into(),
        }
    }
}

/// Terminal state of one ledger entry after a reconciliation pass.
///
/// Entries never revisit pending: an unmatched handle or failed grant
/// is dropped, with the audit row already durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantOutcome {
    /// Role applied and announcements sent.
    Granted,
    /// Handle had no match in the current roster snapshot.
    UnknownHandle,
    /// Role missing or the grant call failed.
    GrantFailed,
}
