//! In-memory roster snapshot, refreshed once per cycle

use crate::client::ChatHost;
use crate::types::Member;
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

/// Identity directory cache: handle -> member for the current cycle.
///
/// A successful refresh replaces the snapshot wholesale; a failed
/// refresh leaves the previous snapshot untouched, so a transient
/// roster outage does not erase known members mid-cycle.
#[derive(Debug, Default)]
pub struct DirectoryCache {
    members: HashMap<String, Member>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot from a fresh roster fetch.
    pub async fn refresh(&mut self, chat: &dyn ChatHost) -> Result<()> {
        let roster = chat
            .list_members()
            .await
            .map_err(|e| Error::DirectoryUnavailable(e.to_string()))?;

        let mut next = HashMap::with_capacity(roster.len());
        for member in roster {
            next.insert(member.handle.clone(), member);
        }
        debug!(members = next.len(), "directory snapshot refreshed");
        self.members = next;
        Ok(())
    }

    /// Resolve a chat handle against the current snapshot.
    pub fn resolve(&self, handle: &str) -> Option<&Member> {
        self.members.get(handle)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
