use depot_store::StoreError;
use thiserror::Error;

/// Errors raised while saving or loading object records.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no creator registered for class '{0}'")]
    UnknownClass(String),

    #[error("object list is empty")]
    EmptyObjectList,

    #[error("no objects loaded")]
    NoObjectsLoaded,

    #[error("target already exists: '{0}' (pass force_overwrite to replace it)")]
    TargetExists(String),

    #[error("not a usable directory: '{0}'")]
    InvalidDirectory(String),

    #[error("no files under '{dir}' match '{pattern}'")]
    NoFilesMatched { dir: String, pattern: String },

    #[error("invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("could not encode object records: {0}")]
    Encode(String),

    #[error("could not decode object records: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
