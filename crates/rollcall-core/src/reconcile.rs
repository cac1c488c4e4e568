//! Role reconciliation: apply drained verifications to the community

use crate::client::ChatHost;
use crate::directory::DirectoryCache;
use crate::types::{Channel, GrantOutcome, Role};
use tracing::{error, warn};

/// Joins drained ledger entries against the roster snapshot, grants
/// the verified role, and posts the announcement pair.
///
/// Every entry reaches a terminal outcome in this pass; nothing is
/// retried in a later cycle. The audit row for each entry is already
/// durable before this runs, so dropping an entry loses no data.
pub struct RoleReconciler {
    role_name: String,
    verify_channel: String,
    internal_channel: String,
}

/// Role and channels resolved from fresh listings for one pass.
struct CycleTargets {
    role: Option<Role>,
    verify: Option<Channel>,
    internal: Option<Channel>,
}

/// Terminal outcomes of one reconciliation pass, in entry order.
#[derive(Debug, Default)]
pub struct ReconcileSummary {
    pub outcomes: Vec<(String, GrantOutcome)>,
}

impl ReconcileSummary {
    pub fn granted(&self) -> usize {
        self.count(&GrantOutcome::Granted)
    }

    pub fn unknown(&self) -> usize {
        self.count(&GrantOutcome::UnknownHandle)
    }

    pub fn failed(&self) -> usize {
        self.count(&GrantOutcome::GrantFailed)
    }

    fn count(&self, outcome: &GrantOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| o == outcome).count()
    }
}

impl RoleReconciler {
    pub fn new(
        role_name: impl Into<String>,
        verify_channel: impl Into<String>,
        internal_channel: impl Into<String>,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            verify_channel: verify_channel.into(),
            internal_channel: internal_channel.into(),
        }
    }

    /// Process one drained batch. Role and channels are resolved by
    /// name from fresh listings; identifiers are never reused from a
    /// previous cycle.
    pub async fn reconcile(
        &self,
        chat: &dyn ChatHost,
        directory: &DirectoryCache,
        entries: &[(String, String)],
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        if entries.is_empty() {
            return summary;
        }

        let (verify, internal) = self.resolve_channels(chat).await;
        let targets = CycleTargets {
            role: self.resolve_role(chat).await,
            verify,
            internal,
        };

        for (handle, campus_id) in entries {
            let outcome = self.apply(chat, directory, &targets, handle, campus_id).await;
            summary.outcomes.push((handle.clone(), outcome));
        }
        summary
    }

    async fn apply(
        &self,
        chat: &dyn ChatHost,
        directory: &DirectoryCache,
        targets: &CycleTargets,
        handle: &str,
        campus_id: &str,
    ) -> GrantOutcome {
        let Some(member) = directory.resolve(handle) else {
            warn!(%handle, %campus_id, "handle not present in roster; dropping entry");
            return GrantOutcome::UnknownHandle;
        };

        let Some(role) = targets.role.as_ref() else {
            error!(%handle, role = %self.role_name, "verified role not found; skipping grant");
            return GrantOutcome::GrantFailed;
        };

        if let Err(e) = chat.grant_role(&member.id, &role.id).await {
            warn!(%handle, "role grant failed: {e}");
            return GrantOutcome::GrantFailed;
        }

        // Announcements are best effort; the privilege is already on.
        match targets.verify.as_ref() {
            Some(channel) => {
                let content = format!("{} was verified!", member.mention());
                if let Err(e) = chat.send_message(&channel.id, &content).await {
                    warn!(%handle, "failed to post verification notice: {e}");
                }
            }
            None => warn!(channel = %self.verify_channel, "verify channel not found"),
        }
        match targets.internal.as_ref() {
            Some(channel) => {
                let content = format!("Verified {handle}. ({campus_id})");
                if let Err(e) = chat.send_message(&channel.id, &content).await {
                    warn!(%handle, "failed to post internal notice: {e}");
                }
            }
            None => warn!(channel = %self.internal_channel, "internal verify channel not found"),
        }

        GrantOutcome::Granted
    }

    async fn resolve_role(&self, chat: &dyn ChatHost) -> Option<Role> {
        match chat.list_roles().await {
            Ok(roles) => roles.into_iter().find(|r| r.name == self.role_name),
            Err(e) => {
                error!("failed to list roles: {e}");
                None
            }
        }
    }

    async fn resolve_channels(&self, chat: &dyn ChatHost) -> (Option<Channel>, Option<Channel>) {
        match chat.list_channels().await {
            Ok(channels) => {
                let verify = channels.iter().find(|c| c.name == self.verify_channel).cloned();
                let internal = channels
                    .iter()
                    .find(|c| c.name == self.internal_channel)
                    .cloned();
                (verify, internal)
            }
            Err(e) => {
                error!("failed to list channels: {e}");
                (None, None)
            }
        }
    }
}
