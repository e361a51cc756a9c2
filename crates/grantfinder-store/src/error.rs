use std::path::PathBuf;

use thiserror::Error;

/// Failure of the remote grant table.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Network, DNS, TLS or authentication failure: the store could not be reached.
    #[error("remote store unreachable: {0}")]
    Unreachable(String),

    #[error("remote store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("remote store returned malformed rows: {0}")]
    Malformed(String),
}

/// Failure reading or writing a catalog file.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("catalog file not found: {0}")]
    NotFound(PathBuf),

    #[error("catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Neither the remote store nor the fallback file produced a grant list.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no grant source available (remote: {remote}; fallback: {fallback})")]
    Unavailable {
        remote: RemoteError,
        fallback: FallbackError,
    },

    /// The remote store is empty and the file needed to seed it is unreadable.
    #[error("remote store is empty and cannot be seeded: {0}")]
    SeedSource(#[source] FallbackError),

    #[error("fallback catalog unavailable: {0}")]
    Fallback(#[from] FallbackError),
}

/// A non-fatal problem encountered while loading.
#[derive(Debug, Clone, Error)]
pub enum SyncWarning {
    #[error("remote store unavailable, serving fallback catalog: {0}")]
    RemoteUnavailable(RemoteError),

    #[error("could not seed empty remote store: {0}")]
    SeedFailed(RemoteError),
}

/// A mutation was applied locally but its full-list write did not persist.
#[derive(Debug, Error)]
#[error("change applied locally but not saved to the remote store ({count} grants pending): {source}")]
pub struct SyncError {
    /// Size of the local list that failed to persist.
    pub count: usize,
    #[source]
    pub source: RemoteError,
}

/// Rejected or partially applied admin mutation.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("grant {0} already exists")]
    DuplicateId(String),

    #[error("grant {0} not found")]
    UnknownGrant(String),

    #[error("record id {record} does not match target {target}")]
    IdMismatch { target: String, record: String },

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("export failed: {0}")]
    Export(#[from] FallbackError),
}
