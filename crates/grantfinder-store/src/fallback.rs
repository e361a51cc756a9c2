//! The static catalog file (`grants-database.json`).
//!
//! The file is the seed for an empty remote table and the source of last
//! resort when the remote table is unreachable. It holds a `grants` array and,
//! optionally, precomputed `categories` / `filters` blocks; those blocks are
//! ignored on read because the aggregates are recomputed from the grants.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use grantfinder_core::{GrantList, GrantRecord};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::FallbackError;

/// Catalog file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantsDocument {
    pub grants: Vec<GrantRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Value>,
}

impl GrantsDocument {
    /// A document carrying `list` and its freshly computed aggregate blocks.
    pub fn from_list(list: &GrantList) -> Result<Self, serde_json::Error> {
        Ok(Self {
            grants: list.grants().to_vec(),
            categories: Some(serde_json::to_value(list.category_block())?),
            filters: Some(serde_json::to_value(list.facets())?),
        })
    }
}

/// Handle on a catalog file path.
#[derive(Debug, Clone)]
pub struct FallbackFile {
    path: PathBuf,
}

impl FallbackFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> Result<GrantsDocument, FallbackError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FallbackError::NotFound(self.path.clone())
            } else {
                FallbackError::Io {
                    path: self.path.clone(),
                    source: e,
                }
            }
        })?;
        let doc: GrantsDocument =
            serde_json::from_slice(&bytes).map_err(|source| FallbackError::Json {
                path: self.path.clone(),
                source,
            })?;
        info!(path = %self.path.display(), count = doc.grants.len(), "read catalog file");
        Ok(doc)
    }
}

/// `grants-database-YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("grants-database-{}.json", date.format("%Y-%m-%d"))
}

/// Write `doc` as pretty-printed JSON to `path`, replacing any existing file.
pub async fn write_document(path: &Path, doc: &GrantsDocument) -> Result<(), FallbackError> {
    let json = serde_json::to_vec_pretty(doc).map_err(|source| FallbackError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| FallbackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), count = doc.grants.len(), "wrote catalog file");
    Ok(())
}

/// Write `list` and its aggregates to the dated export file under `dir`.
pub async fn export_list(
    list: &GrantList,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, FallbackError> {
    let path = dir.join(export_file_name(date));
    let doc = GrantsDocument::from_list(list).map_err(|source| FallbackError::Json {
        path: path.clone(),
        source,
    })?;
    write_document(&path, &doc).await?;
    Ok(path)
}
