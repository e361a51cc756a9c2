//! Contract for the hosted grant table.
//!
//! The table holds rows of `{ id, data: GrantRecord[], created_at, updated_at }`.
//! By convention a single row keyed [`DOCUMENT_ROW_ID`] carries the whole
//! catalog; readers flatten every row's `data` in creation order so that
//! stray extra rows are tolerated.

use async_trait::async_trait;
use grantfinder_core::GrantRecord;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::RemoteError;

/// Key of the row that holds the full catalog.
pub const DOCUMENT_ROW_ID: &str = "grants-data";

/// One row of the remote grant table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub id: String,
    #[serde(default)]
    pub data: Vec<GrantRecord>,
    /// ISO 8601 timestamp string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// ISO 8601 timestamp string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Notification that a row of the grant table changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub row_id: String,
}

/// The hosted table the catalog is persisted in.
///
/// Implementations are shared behind `Arc<dyn RemoteStore>` by the data source
/// and the admin gateway.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every row, oldest `created_at` first.
    async fn fetch_rows(&self) -> Result<Vec<StoredRow>, RemoteError>;

    /// Overwrite the table with a single document row holding `grants`.
    async fn replace_all(&self, grants: &[GrantRecord]) -> Result<(), RemoteError>;

    /// Push channel for row changes, if the store has one. Stores without one
    /// are only picked up by polling.
    fn subscribe(&self) -> Option<broadcast::Receiver<ChangeEvent>> {
        None
    }
}

/// Concatenate the `data` arrays of `rows` in order.
pub fn flatten_rows(rows: Vec<StoredRow>) -> Vec<GrantRecord> {
    rows.into_iter().flat_map(|row| row.data).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_parses_table_json() {
        let json = r#"[{
            "id": "grants-data",
            "data": [{
                "id": "g1",
                "計畫名稱": "測試計畫",
                "補助類別": "人才培訓",
                "金額分類": "小額補助",
                "主辦機關分類": "勞動部"
            }],
            "created_at": "2025-09-22T10:00:00+00:00",
            "updated_at": "2025-09-23T08:30:00+00:00"
        }]"#;
        let rows: Vec<StoredRow> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, DOCUMENT_ROW_ID);
        assert_eq!(rows[0].data[0].name, "測試計畫");
        assert_eq!(rows[0].created_at.as_deref(), Some("2025-09-22T10:00:00+00:00"));
    }

    #[test]
    fn row_without_data_is_empty() {
        let row: StoredRow = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(row.data.is_empty());
        assert!(row.updated_at.is_none());
    }

    #[test]
    fn flatten_keeps_row_order() {
        let rows = vec![
            StoredRow {
                id: "first".into(),
                data: vec![GrantRecord::draft("a"), GrantRecord::draft("b")],
                created_at: None,
                updated_at: None,
            },
            StoredRow {
                id: "second".into(),
                data: vec![GrantRecord::draft("c")],
                created_at: None,
                updated_at: None,
            },
        ];
        let ids: Vec<String> = flatten_rows(rows).into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
