use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Stable content hash used to decide whether a source file has changed
/// since it was last absorbed.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Descriptor written after a file is successfully processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: String,
    pub processed_at: DateTime<Utc>,
    pub rows: usize,
    pub source: String,
}

/// Persisted log of absorbed source files. An explicit store object handed
/// to the pipeline; loaded once per run and saved after the master snapshot
/// write succeeds so a failed run stays fully retryable.
#[derive(Debug)]
pub struct FingerprintLog {
    path: PathBuf,
    entries: HashMap<String, FileRecord>,
}

impl FingerprintLog {
    /// Load the log, starting empty when no log exists yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        Ok(FingerprintLog { path, entries })
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.path, content.as_bytes())
    }

    /// True when the file was already absorbed with identical content.
    pub fn is_processed(&self, id: &str, hash: &str) -> bool {
        self.entries
            .get(id)
            .map(|record| record.hash == hash)
            .unwrap_or(false)
    }

    pub fn record(&mut self, id: impl Into<String>, record: FileRecord) {
        self.entries.insert(id.into(), record);
    }

    /// Full rebuild: discard every descriptor so all files reprocess.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Write-then-rename so a crash mid-write never clobbers the previous file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        assert_eq!(content_hash(b"abc"), content_hash(b"abc"));
        assert_ne!(content_hash(b"abc"), content_hash(b"abd"));
    }

    #[test]
    fn round_trip_preserves_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.json");

        let mut log = FingerprintLog::load(&path).unwrap();
        assert!(log.is_empty());
        log.record(
            "horizon/sept.xlsx",
            FileRecord {
                hash: content_hash(b"data"),
                processed_at: Utc::now(),
                rows: 12,
                source: "horizon".to_string(),
            },
        );
        log.save().unwrap();

        let reloaded = FingerprintLog::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.is_processed("horizon/sept.xlsx", &content_hash(b"data")));
    }

    #[test]
    fn changed_content_reports_unprocessed() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = FingerprintLog::load(dir.path().join("log.json")).unwrap();
        log.record(
            "file.csv",
            FileRecord {
                hash: content_hash(b"v1"),
                processed_at: Utc::now(),
                rows: 3,
                source: "ollie".to_string(),
            },
        );
        assert!(log.is_processed("file.csv", &content_hash(b"v1")));
        assert!(!log.is_processed("file.csv", &content_hash(b"v2")));
        assert!(!log.is_processed("other.csv", &content_hash(b"v1")));
    }

    #[test]
    fn clear_discards_all_descriptors() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = FingerprintLog::load(dir.path().join("log.json")).unwrap();
        log.record(
            "file.csv",
            FileRecord {
                hash: "h".to_string(),
                processed_at: Utc::now(),
                rows: 1,
                source: "psc".to_string(),
            },
        );
        log.clear();
        assert!(log.is_empty());
    }
}
