use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::storage::fingerprint::write_atomic;

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkFile {
    last_sync: DateTime<Utc>,
}

/// Persisted "last successful order sync" timestamp. Advanced only after a
/// non-empty order batch is merged, so a run that fetched nothing (or
/// failed to persist) retries the same window.
#[derive(Debug, Clone)]
pub struct SyncWatermark {
    path: PathBuf,
}

impl SyncWatermark {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SyncWatermark { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<DateTime<Utc>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let file: WatermarkFile = serde_json::from_str(&content)?;
        Ok(Some(file.last_sync))
    }

    pub fn save(&self, last_sync: DateTime<Utc>) -> Result<()> {
        let content = serde_json::to_string_pretty(&WatermarkFile { last_sync })?;
        write_atomic(&self.path, content.as_bytes())
    }

    /// Full rebuild: forget the sync point entirely.
    pub fn reset(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn absent_watermark_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let watermark = SyncWatermark::new(dir.path().join("last_sync.json"));
        assert_eq!(watermark.load().unwrap(), None);
    }

    #[test]
    fn save_load_reset_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let watermark = SyncWatermark::new(dir.path().join("last_sync.json"));

        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        watermark.save(ts).unwrap();
        assert_eq!(watermark.load().unwrap(), Some(ts));

        watermark.reset().unwrap();
        assert_eq!(watermark.load().unwrap(), None);
    }
}
