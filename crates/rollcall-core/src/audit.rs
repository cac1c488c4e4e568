//! Durable audit trail: append-only CSV of applied verifications

use crate::client::AuditStore;
use crate::types::VerificationRecord;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// File-backed audit store writing one `handle,campus_id` row per
/// drained ledger entry.
///
/// Rows are appended whether or not the handle later resolves to a
/// member, so institutional identifiers are never silently lost.
/// Repeat verifications across cycles each produce a new row.
pub struct CsvAuditStore {
    path: PathBuf,
}

impl CsvAuditStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

/// Quote a field only when it carries a separator, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[async_trait]
impl AuditStore for CsvAuditStore {
    async fn append(&self, records: &[VerificationRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut buf = String::new();
        for record in records {
            buf.push_str(&csv_field(&record.handle));
            buf.push(',');
            buf.push_str(&csv_field(&record.campus_id));
            buf.push('\n');
        }
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
