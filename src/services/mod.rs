//! Storage services: the object storage engine and the components it
//! composes — key validation, the checksum engine, the filesystem content
//! store, the SQLite metadata index, and the per-key lock map.

use std::io;

use thiserror::Error;

pub mod checksum;
pub mod content_store;
pub mod key_locks;
pub mod keys;
pub mod metadata_index;
pub mod storage_service;

/// Error taxonomy for the storage layer.
///
/// Validation errors are raised before any mutation is attempted, absence is
/// not an anomaly, and I/O or database failures surface to the caller who
/// owns retry policy.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("configuration error: {0}")]
    ConfigurationError(String),
    #[error("metadata exists for `{bucket}/{key}` but its content file is missing")]
    ConsistencyViolation { bucket: String, key: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;
