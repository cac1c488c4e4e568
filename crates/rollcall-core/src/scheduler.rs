//! Cycle driver: one serialized reconciliation pass per tick

use crate::client::{AuditStore, ChatHost, Mailbox};
use crate::directory::DirectoryCache;
use crate::ledger::VerificationLedger;
use crate::reconcile::RoleReconciler;
use crate::scan::InboxScanner;
use crate::types::VerificationRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Tunables for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Institutional domain accepted as a verification sender.
    pub campus_domain: String,
    /// Name of the role granted to verified members.
    pub role_name: String,
    /// Public announcement channel name.
    pub verify_channel: String,
    /// Audit-visibility announcement channel name.
    pub internal_channel: String,
    /// Wall-clock spacing between cycles.
    pub poll_interval: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            campus_domain: "umich.edu".to_string(),
            role_name: "Verified".to_string(),
            verify_channel: "verify".to_string(),
            internal_channel: "internal-verify".to_string(),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Owns the roster cache, the ledger, and the collaborator handles,
/// and sequences one full cycle at a time: directory refresh, inbox
/// scan, durable append, role reconcile.
///
/// Cycles never overlap: the driver is a single tick consumer, and a
/// tick that lands while a cycle is still executing is delayed, not
/// queued. Shutdown is observed only between cycles, so an in-flight
/// cycle always finishes.
pub struct Reconciler {
    chat: Arc<dyn ChatHost>,
    mailbox: Arc<dyn Mailbox>,
    audit: Arc<dyn AuditStore>,
    directory: DirectoryCache,
    ledger: VerificationLedger,
    scanner: InboxScanner,
    roles: RoleReconciler,
    poll_interval: Duration,
}

impl Reconciler {
    pub fn new(
        settings: ReconcilerSettings,
        chat: Arc<dyn ChatHost>,
        mailbox: Arc<dyn Mailbox>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            chat,
            mailbox,
            audit,
            directory: DirectoryCache::new(),
            ledger: VerificationLedger::new(),
            scanner: InboxScanner::new(settings.campus_domain),
            roles: RoleReconciler::new(
                settings.role_name,
                settings.verify_channel,
                settings.internal_channel,
            ),
            poll_interval: settings.poll_interval,
        }
    }

    /// Drive cycles until a shutdown signal arrives.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(interval = ?self.poll_interval, "reconciliation loop armed");

        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("shutdown requested; reconciliation loop stopping");
                    break;
                }
                _ = tick.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// One full reconciliation pass. Every step failure is logged and
    /// the pass continues to whatever can still safely run.
    pub async fn run_cycle(&mut self) {
        if let Err(e) = self.directory.refresh(self.chat.as_ref()).await {
            warn!("{e}; retaining previous roster snapshot");
        }

        match self
            .scanner
            .scan(self.mailbox.as_ref(), &mut self.ledger)
            .await
        {
            Ok(0) => {}
            Ok(accepted) => debug!(accepted, "inbox scan accepted proofs"),
            Err(e) => warn!("{e}; skipping inbox scan this cycle"),
        }

        let entries = self.ledger.drain_all();
        if entries.is_empty() {
            return;
        }

        // The audit row must be durable before any grant side effect:
        // a crash after this append loses only the in-progress grants.
        let records: Vec<VerificationRecord> = entries
            .iter()
            .map(|(handle, campus_id)| VerificationRecord::new(handle.clone(), campus_id.clone()))
            .collect();
        if let Err(e) = self.audit.append(&records).await {
            error!(
                deferred = entries.len(),
                "audit append failed: {e}; holding entries for next cycle"
            );
            self.ledger.restore(entries);
            return;
        }

        let summary = self
            .roles
            .reconcile(self.chat.as_ref(), &self.directory, &entries)
            .await;
        info!(
            granted = summary.granted(),
            unknown = summary.unknown(),
            failed = summary.failed(),
            "reconciliation cycle applied"
        );
    }
}
