//! Pending verification state: proofs accepted but not yet applied

use std::collections::HashMap;

/// Transient mapping of chat handle -> institutional identifier.
///
/// At most one pending identifier per handle: a later proof for the
/// same handle within a cycle overwrites the earlier one. Entries
/// leave the ledger through `drain_all` and come back only through
/// `restore` when the durable append for the batch failed.
#[derive(Debug, Default)]
pub struct VerificationLedger {
    pending: HashMap<String, String>,
}

impl VerificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a proof, overwriting any pending entry for the handle.
    pub fn record(&mut self, handle: impl Into<String>, campus_id: impl Into<String>) {
        self.pending.insert(handle.into(), campus_id.into());
    }

    /// Atomically empty the ledger and return its prior contents.
    pub fn drain_all(&mut self) -> Vec<(String, String)> {
        self.pending.drain().collect()
    }

    /// Reinstate a drained batch after a failed durable append.
    ///
    /// Entries recorded since the drain win over restored ones.
    pub fn restore(&mut self, entries: Vec<(String, String)>) {
        for (handle, campus_id) in entries {
            self.pending.entry(handle).or_insert(campus_id);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
