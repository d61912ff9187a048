//! Append-only audit trail of every engine decision, persisted as CSV at the end of
//! a run.

use crate::env;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    BidUpdate,
    DaypartingAdjustment,
    CampaignActivate,
    CampaignPause,
    KeywordDiscovery,
    NegativeKeywordAdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Keyword,
    Campaign,
    NegativeKeyword,
}

/// One decision. Values are rendered strings (`$1.00`, `enabled`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action_type: ActionType,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub old_value: String,
    pub new_value: String,
    pub reason: String,
    pub dry_run: bool,
}

impl AuditEntry {
    pub fn new(action_type: ActionType, entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action_type,
            entity_type,
            entity_id: entity_id.into(),
            old_value: String::new(),
            new_value: String::new(),
            reason: String::new(),
            dry_run: false,
        }
    }

    pub fn values(mut self, old_value: impl Into<String>, new_value: impl Into<String>) -> Self {
        self.old_value = old_value.into();
        self.new_value = new_value.into();
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to write audit file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode audit entries: {0}")]
    Encode(String),
}

/// Decisions recorded during one run.
///
/// Entries are only ever appended. [`AuditLog::flush`] writes all of them to
/// `<dir>/ppc_audit_<run start>.csv`; flushing again rewrites the same file.
#[derive(Debug)]
pub struct AuditLog {
    dir: PathBuf,
    started_at: DateTime<Utc>,
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::started_at(dir, Utc::now())
    }

    pub fn started_at(dir: impl Into<PathBuf>, started_at: DateTime<Utc>) -> Self {
        Self {
            dir: dir.into(),
            started_at,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        env::audit_file_path(&self.dir, self.started_at)
    }

    pub async fn record(&self, entry: AuditEntry) {
        debug!(
            "Audit {:?} {} {}: {} -> {} ({})",
            entry.action_type,
            entry.entity_id,
            if entry.dry_run { "[dry run]" } else { "" },
            entry.old_value,
            entry.new_value,
            entry.reason
        );
        self.entries.lock().await.push(entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }

    /// Persist all entries. Returns `None` when there was nothing to write.
    pub async fn flush(&self) -> Result<Option<PathBuf>, AuditError> {
        let entries = self.entries.lock().await.clone();
        if entries.is_empty() {
            info!("No audit entries to save");
            return Ok(None);
        }

        let path = self.file_path();
        let encoded = encode_csv(&entries)?;
        write_atomically(&path, &encoded).await?;

        info!("Saved {} audit entries to {}", entries.len(), path.display());
        Ok(Some(path))
    }
}

fn encode_csv(entries: &[AuditEntry]) -> Result<Vec<u8>, AuditError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in entries {
        writer
            .serialize(entry)
            .map_err(|e| AuditError::Encode(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| AuditError::Encode(e.to_string()))
}

async fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), AuditError> {
    let io_error = |source| AuditError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        async_fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let temp_path = path.with_extension("csv.tmp");
    async_fs::write(&temp_path, contents).await.map_err(io_error)?;
    async_fs::rename(&temp_path, path).await.map_err(io_error)?;
    Ok(())
}
