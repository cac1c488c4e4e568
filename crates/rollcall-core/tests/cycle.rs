//! Full-cycle behavior of the reconciliation loop against fake
//! collaborators: durability ordering, at-most-once consumption, and
//! the end-to-end verification path.

use async_trait::async_trait;
use rollcall_core::{
    AuditStore, Channel, ChatHost, Error, MailHeader, MailMessage, Mailbox, Member, Reconciler,
    ReconcilerSettings, Result, Role, VerificationRecord,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared effect log so tests can assert cross-collaborator ordering.
type EventLog = Arc<Mutex<Vec<String>>>;

struct FakeGuild {
    members: Vec<Member>,
    roles: Vec<Role>,
    channels: Vec<Channel>,
    grants: Mutex<Vec<(String, String)>>,
    messages: Mutex<Vec<(String, String)>>,
    events: EventLog,
}

impl FakeGuild {
    fn new(members: Vec<Member>, events: EventLog) -> Self {
        Self {
            members,
            roles: vec![Role {
                id: "role-verified".to_string(),
                name: "Verified".to_string(),
            }],
            channels: vec![
                Channel {
                    id: "chan-verify".to_string(),
                    name: "verify".to_string(),
                },
                Channel {
                    id: "chan-internal".to_string(),
                    name: "internal-verify".to_string(),
                },
            ],
            grants: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            events,
        }
    }
}

#[async_trait]
impl ChatHost for FakeGuild {
    async fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.members.clone())
    }
    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.roles.clone())
    }
    async fn list_channels(&self) -> Result<Vec<Channel>> {
        Ok(self.channels.clone())
    }
    async fn grant_role(&self, member_id: &str, role_id: &str) -> Result<()> {
        self.events.lock().unwrap().push(format!("grant:{member_id}"));
        self.grants
            .lock()
            .unwrap()
            .push((member_id.to_string(), role_id.to_string()));
        Ok(())
    }
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((channel_id.to_string(), content.to_string()));
        Ok(())
    }
}

/// Inbox that panics if the same message is ever fetched twice, to
/// prove trashed messages are never reconsidered across cycles.
struct FakeInbox {
    messages: Mutex<BTreeMap<String, MailMessage>>,
    fetched: Mutex<HashSet<String>>,
}

impl FakeInbox {
    fn new(messages: Vec<MailMessage>) -> Self {
        Self {
            messages: Mutex::new(messages.into_iter().map(|m| (m.id.clone(), m)).collect()),
            fetched: Mutex::new(HashSet::new()),
        }
    }

    fn remaining(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailbox for FakeInbox {
    async fn list_message_ids(&self) -> Result<Vec<String>> {
        Ok(self.messages.lock().unwrap().keys().cloned().collect())
    }
    async fn fetch_message(&self, id: &str) -> Result<MailMessage> {
        assert!(
            self.fetched.lock().unwrap().insert(id.to_string()),
            "message {id} fetched twice"
        );
        self.messages
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::MailProvider(format!("no such message {id}")))
    }
    async fn trash_message(&self, id: &str) -> Result<()> {
        self.messages.lock().unwrap().remove(id);
        Ok(())
    }
}

struct FakeAudit {
    rows: Mutex<Vec<VerificationRecord>>,
    fail_next: Mutex<bool>,
    events: EventLog,
}

impl FakeAudit {
    fn new(events: EventLog) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_next: Mutex::new(false),
            events,
        }
    }
}

#[async_trait]
impl AuditStore for FakeAudit {
    async fn append(&self, records: &[VerificationRecord]) -> Result<()> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(Error::Audit(std::io::Error::other("disk full")));
        }
        self.events.lock().unwrap().push("append".to_string());
        self.rows.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}

fn mail(id: &str, from: &str, subject: &str, body: &str) -> MailMessage {
    MailMessage {
        id: id.to_string(),
        headers: vec![
            MailHeader {
                name: "From".to_string(),
                value: from.to_string(),
            },
            MailHeader {
                name: "Subject".to_string(),
                value: subject.to_string(),
            },
        ],
        body: body.to_string(),
    }
}

fn settings() -> ReconcilerSettings {
    ReconcilerSettings {
        campus_domain: "inst.edu".to_string(),
        poll_interval: Duration::from_secs(5),
        ..ReconcilerSettings::default()
    }
}

struct Harness {
    guild: Arc<FakeGuild>,
    inbox: Arc<FakeInbox>,
    audit: Arc<FakeAudit>,
    reconciler: Reconciler,
    events: EventLog,
}

fn harness(members: Vec<Member>, messages: Vec<MailMessage>) -> Harness {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let guild = Arc::new(FakeGuild::new(members, events.clone()));
    let inbox = Arc::new(FakeInbox::new(messages));
    let audit = Arc::new(FakeAudit::new(events.clone()));
    let reconciler = Reconciler::new(
        settings(),
        guild.clone(),
        inbox.clone(),
        audit.clone(),
    );
    Harness {
        guild,
        inbox,
        audit,
        reconciler,
        events,
    }
}

fn member(id: &str, handle: &str) -> Member {
    Member {
        id: id.to_string(),
        handle: handle.to_string(),
    }
}

#[tokio::test]
async fn full_verification_path_grants_announces_and_persists() {
    let mut h = harness(
        vec![member("u1", "Verify#0042")],
        vec![mail("m1", "alice123@inst.edu", "Verify#0042", "")],
    );

    h.reconciler.run_cycle().await;

    assert_eq!(
        h.guild.grants.lock().unwrap().clone(),
        vec![("u1".to_string(), "role-verified".to_string())]
    );
    assert_eq!(
        h.guild.messages.lock().unwrap().clone(),
        vec![
            ("chan-verify".to_string(), "<@u1> was verified!".to_string()),
            (
                "chan-internal".to_string(),
                "Verified Verify#0042. (alice123)".to_string()
            ),
        ]
    );
    assert_eq!(
        h.audit.rows.lock().unwrap().clone(),
        vec![VerificationRecord::new("Verify#0042", "alice123")]
    );
    assert_eq!(h.inbox.remaining(), 0);
}

#[tokio::test]
async fn audit_append_precedes_any_grant_side_effect() {
    let mut h = harness(
        vec![member("u1", "a#0001"), member("u2", "b#0002")],
        vec![
            mail("m1", "a1@inst.edu", "a#0001", ""),
            mail("m2", "b2@inst.edu", "b#0002", ""),
        ],
    );

    h.reconciler.run_cycle().await;

    let events = h.events.lock().unwrap().clone();
    let append_at = events.iter().position(|e| e == "append").unwrap();
    let first_grant = events.iter().position(|e| e.starts_with("grant:")).unwrap();
    assert!(
        append_at < first_grant,
        "grant observed before durable append: {events:?}"
    );
}

#[tokio::test]
async fn processed_messages_are_never_fetched_again() {
    let mut h = harness(
        vec![member("u1", "a#0001")],
        vec![
            mail("m1", "a1@inst.edu", "a#0001", ""),
            mail("m2", "noise@inst.edu", "no token here", ""),
            mail("m3", "other@elsewhere.edu", "b#0002", ""),
        ],
    );

    // FakeInbox panics on a duplicate fetch, so a second cycle over
    // already-trashed messages would fail loudly.
    h.reconciler.run_cycle().await;
    h.reconciler.run_cycle().await;

    assert_eq!(h.inbox.remaining(), 0);
}

#[tokio::test]
async fn failed_append_defers_entries_and_blocks_grants() {
    let mut h = harness(
        vec![member("u1", "a#0001")],
        vec![mail("m1", "a1@inst.edu", "a#0001", "")],
    );
    *h.audit.fail_next.lock().unwrap() = true;

    h.reconciler.run_cycle().await;

    // No durable row, so no grant either; the entry is held back.
    assert!(h.audit.rows.lock().unwrap().is_empty());
    assert!(h.guild.grants.lock().unwrap().is_empty());

    // Next cycle re-drains the held entry and completes the grant.
    h.reconciler.run_cycle().await;
    assert_eq!(
        h.audit.rows.lock().unwrap().clone(),
        vec![VerificationRecord::new("a#0001", "a1")]
    );
    assert_eq!(
        h.guild.grants.lock().unwrap().clone(),
        vec![("u1".to_string(), "role-verified".to_string())]
    );
}

#[tokio::test]
async fn unknown_handle_is_audited_but_never_granted() {
    let mut h = harness(
        vec![member("u2", "present#0002")],
        vec![
            mail("m1", "gone@inst.edu", "absent#0001", ""),
            mail("m2", "here@inst.edu", "present#0002", ""),
        ],
    );

    h.reconciler.run_cycle().await;

    // Both identifiers are durably recorded; only the resolvable
    // handle receives the role.
    let mut rows = h.audit.rows.lock().unwrap().clone();
    rows.sort_by(|a, b| a.handle.cmp(&b.handle));
    assert_eq!(
        rows,
        vec![
            VerificationRecord::new("absent#0001", "gone"),
            VerificationRecord::new("present#0002", "here"),
        ]
    );
    assert_eq!(
        h.guild.grants.lock().unwrap().clone(),
        vec![("u2".to_string(), "role-verified".to_string())]
    );
}

#[tokio::test]
async fn message_without_proof_is_consumed_without_side_effects() {
    let mut h = harness(
        vec![member("u1", "a#0001")],
        vec![mail("m1", "a1@inst.edu", "just saying hi", "")],
    );

    h.reconciler.run_cycle().await;

    assert_eq!(h.inbox.remaining(), 0);
    assert!(h.audit.rows.lock().unwrap().is_empty());
    assert!(h.guild.grants.lock().unwrap().is_empty());
    assert!(h.guild.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn conflicting_proofs_resolve_to_the_last_processed() {
    let mut h = harness(
        vec![member("u1", "same#0001")],
        vec![
            mail("m1", "first@inst.edu", "same#0001", ""),
            mail("m2", "second@inst.edu", "same#0001", ""),
        ],
    );

    h.reconciler.run_cycle().await;

    // One pending entry survived the cycle: the later-processed proof
    // (the fake inbox enumerates ids in lexicographic order).
    assert_eq!(
        h.audit.rows.lock().unwrap().clone(),
        vec![VerificationRecord::new("same#0001", "second")]
    );
    assert_eq!(h.guild.grants.lock().unwrap().len(), 1);
}
