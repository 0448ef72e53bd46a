use thiserror::Error;

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid application: {0}")]
    Validation(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an import file was refused. The collection is never touched when one
/// of these is returned.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of applications, found {0}")]
    NotArray(&'static str),

    #[error("record {index} is not a valid application: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record {index} reuses id {id}")]
    DuplicateId { index: usize, id: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("source label cannot be blank")]
    Blank,

    #[error("source '{0}' already exists")]
    Duplicate(String),
}
