use crate::filename_utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether a backup is stored as a plain folder or as a `.zip` archive.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Directory,
    Archive,
}

/// A backup discovered on disk, recovered from its folder or archive name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// The path the record was parsed from, unchanged.
    pub path: PathBuf,
    /// The console account name embedded in the backup name.
    pub username: String,
    /// The creation time embedded in the backup name, in UTC.
    pub timestamp: DateTime<Utc>,
    /// Folder or archive.
    pub kind: BackupKind,
}

impl BackupRecord {
    /// Returns the canonical `"<username> - <timestamp>"` name of this backup.
    pub fn name(&self) -> String {
        filename_utils::format_backup_name(&self.username, self.timestamp)
    }
}

/// Sorts records newest first, breaking timestamp ties by path.
pub fn sort_newest_first(records: &mut [BackupRecord]) {
    records.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.path.cmp(&b.path))
    });
}
