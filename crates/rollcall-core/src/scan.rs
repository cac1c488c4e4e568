//! Inbox scanning: turn institutional mail into pending verifications

use crate::client::Mailbox;
use crate::extract::HandleExtractor;
use crate::ledger::VerificationLedger;
use crate::types::Proof;
use crate::{Error, Result};
use tracing::{info, warn};

/// Scans the inbox once per cycle and feeds accepted proofs into the
/// verification ledger.
///
/// Every visited message is moved to trash whether or not it produced
/// a proof: once seen, a message is never reconsidered. A failure
/// between extraction and removal still removes the message.
pub struct InboxScanner {
    campus_domain: String,
    extractor: HandleExtractor,
}

impl InboxScanner {
    pub fn new(campus_domain: impl Into<String>) -> Self {
        Self {
            campus_domain: campus_domain.into(),
            extractor: HandleExtractor::new(),
        }
    }

    /// Process all current inbox messages; returns the number of
    /// accepted proofs. Fails only if the listing itself fails.
    pub async fn scan(
        &self,
        mailbox: &dyn Mailbox,
        ledger: &mut VerificationLedger,
    ) -> Result<usize> {
        let ids = mailbox
            .list_message_ids()
            .await
            .map_err(|e| Error::InboxUnavailable(e.to_string()))?;

        let mut accepted = 0;
        for id in ids {
            match self.inspect(mailbox, &id).await {
                Ok(Some(proof)) => {
                    info!(
                        handle = %proof.handle,
                        campus_id = %proof.campus_id,
                        "verification proof accepted"
                    );
                    ledger.record(proof.handle, proof.campus_id);
                    accepted += 1;
                }
                Ok(None) => {}
                Err(e) => warn!(message = %id, "skipping message: {e}"),
            }

            // Seen is seen: remove the message regardless of outcome.
            if let Err(e) = mailbox.trash_message(&id).await {
                warn!(message = %id, "failed to trash message: {e}");
            }
        }
        Ok(accepted)
    }

    /// Fetch and evaluate one message. `Ok(None)` means the message
    /// carried no usable proof (wrong domain or no handle).
    async fn inspect(&self, mailbox: &dyn Mailbox, id: &str) -> Result<Option<Proof>> {
        let msg = mailbox
            .fetch_message(id)
            .await
            .map_err(|e| Error::MalformedMessage {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        let Some(from) = msg.header("From") else {
            return Err(Error::MalformedMessage {
                id: id.to_string(),
                reason: "missing From header".to_string(),
            });
        };

        let address = strip_display_name(from);
        let Some((local, domain)) = address.split_once('@') else {
            return Ok(None);
        };
        if !domain.eq_ignore_ascii_case(&self.campus_domain) {
            return Ok(None);
        }

        let campus_id = local.to_string();

        let subject = msg.header("Subject").unwrap_or_default();
        let Some(handle) = self.extractor.extract(subject, &msg.body) else {
            return Ok(None);
        };

        Ok(Some(Proof {
            handle,
            campus_id,
            message_id: msg.id,
        }))
    }
}

/// Reduce a `From` header to the bare address, dropping any
/// `Display Name <...>` decoration.
fn strip_display_name(from: &str) -> &str {
    match (from.find('<'), from.rfind('>')) {
        (Some(start), Some(end)) if start < end => &from[start + 1..end],
        _ => from.trim(),
    }
}
