//! Error types for storage and domain store operations

use thiserror::Error;

use crate::persistence::Namespace;

/// Storage layer errors.
///
/// These never escape the public `StorageManager` API: every variant is
/// logged and turned into a `false` return or the caller's default.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage medium unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage quota exceeded writing {key} ({needed} bytes, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("Storage medium error on {key}: {reason}")]
    Medium { key: String, reason: String },

    #[error("Failed to parse stored value: {reason}")]
    Parse { reason: String },

    #[error("Stored value is not a well-formed envelope")]
    MalformedEnvelope,

    #[error("Unknown storage namespace: {key}")]
    UnknownNamespace { key: String },

    #[error("Value does not match schema for {namespace}")]
    SchemaMismatch { namespace: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Parse {
            reason: err.to_string(),
        }
    }
}

/// Domain store errors surfaced to callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Invalid login ID or password")]
    InvalidCredentials,

    #[error("User not found: {id}")]
    UnknownUser { id: String },

    #[error("User already exists: {id}")]
    UserExists { id: String },

    #[error("No user is signed in")]
    NotAuthenticated,

    #[error("Change to {namespace} was kept in memory but not persisted")]
    NotPersisted { namespace: Namespace },
}
