use thiserror::Error;

/// Failure taxonomy for a pipeline run.
///
/// `SourceUnavailable`, `FileParse` and `MetadataExtraction` are recoverable:
/// the orchestrator logs them and moves on to the next file or source. Only
/// `Persistence` failures at the final snapshot write abort a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("source '{source}' unavailable: {reason}")]
    SourceUnavailable { source: String, reason: String },

    #[error("failed to parse '{file}': {reason}")]
    FileParse { file: String, reason: String },

    #[error("could not extract a reporting period from '{name}'")]
    MetadataExtraction { name: String },

    #[error("persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn file_parse(file: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::FileParse {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    pub fn source_unavailable(source: impl Into<String>, reason: impl ToString) -> Self {
        PipelineError::SourceUnavailable {
            source: source.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that skip a single file or sheet rather than the run.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PipelineError::Persistence(_) | PipelineError::Serialization(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
