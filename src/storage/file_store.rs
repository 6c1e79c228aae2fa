use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

use crate::error::{PipelineError, Result};

/// A candidate source file as reported by a file store.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Extension and exclusion rules applied while enumerating a source
/// location (e.g. Horizon folders carry "account list" workbooks that are
/// not sales reports).
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub extensions: Vec<&'static str>,
    pub exclude_name_containing: Vec<&'static str>,
}

impl FileFilter {
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        let extension_ok = self
            .extensions
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")));
        let excluded = self
            .exclude_name_containing
            .iter()
            .any(|fragment| lower.contains(fragment));
        extension_ok && !excluded
    }
}

/// Report retrieval seam. Distributor files may live on local disk or in a
/// remote store; the pipeline only ever sees this interface.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn list_files(&self, location: &str, filter: &FileFilter) -> Result<Vec<FileEntry>>;
    async fn read_file(&self, entry: &FileEntry) -> Result<Vec<u8>>;
}

/// Local-directory implementation used by the batch binary.
pub struct LocalFileStore;

#[async_trait]
impl FileStore for LocalFileStore {
    async fn list_files(&self, location: &str, filter: &FileFilter) -> Result<Vec<FileEntry>> {
        let mut dir = fs::read_dir(location).await.map_err(|e| {
            PipelineError::source_unavailable(location, format!("cannot list directory: {e}"))
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| {
            PipelineError::source_unavailable(location, format!("cannot read directory: {e}"))
        })? {
            let file_type = entry.file_type().await.map_err(|e| {
                PipelineError::source_unavailable(location, format!("cannot stat entry: {e}"))
            })?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if filter.matches(&name) {
                entries.push(FileEntry {
                    name,
                    path: entry.path(),
                });
            }
        }

        // Deterministic processing order across runs.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read_file(&self, entry: &FileEntry) -> Result<Vec<u8>> {
        fs::read(&entry.path)
            .await
            .map_err(|e| PipelineError::file_parse(&entry.name, format!("cannot read file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_checks_extension_and_exclusions() {
        let filter = FileFilter {
            extensions: vec!["xls", "xlsx"],
            exclude_name_containing: vec!["account list"],
        };
        assert!(filter.matches("Horizon_Sept_2024.xlsx"));
        assert!(filter.matches("HORIZON_OCT_2024.XLS"));
        assert!(!filter.matches("Horizon Account List 2024.xlsx"));
        assert!(!filter.matches("notes.txt"));
    }

    #[tokio::test]
    async fn local_store_lists_matching_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_report.csv"), b"x").unwrap();
        std::fs::write(dir.path().join("a_report.csv"), b"y").unwrap();
        std::fs::write(dir.path().join("skip.xlsx"), b"z").unwrap();

        let filter = FileFilter {
            extensions: vec!["csv"],
            exclude_name_containing: vec![],
        };
        let store = LocalFileStore;
        let entries = store
            .list_files(dir.path().to_str().unwrap(), &filter)
            .await
            .unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a_report.csv", "b_report.csv"]);

        let bytes = store.read_file(&entries[0]).await.unwrap();
        assert_eq!(bytes, b"y");
    }

    #[tokio::test]
    async fn missing_location_is_source_unavailable() {
        let store = LocalFileStore;
        let err = store
            .list_files("/nonexistent/sales-data", &FileFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }
}
