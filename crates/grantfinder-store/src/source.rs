//! The data source adapter: decides which source is authoritative and produces
//! a fresh [`GrantList`] on every call.
//!
//! With [`Precedence::RemoteFirst`] the remote table wins as soon as it holds
//! any row. An empty table is seeded once from the catalog file, and an
//! unreachable table degrades to the catalog file with a [`SyncWarning`].

use std::sync::Arc;

use grantfinder_core::GrantList;
use tracing::{info, warn};

use crate::fallback::FallbackFile;
use crate::remote::{RemoteStore, flatten_rows};
use crate::{LoadError, SyncWarning};

/// Which source answers a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Precedence {
    /// Remote table is authoritative once non-empty; the file only seeds an
    /// empty table or stands in while the table is unreachable.
    #[default]
    RemoteFirst,
    /// Read the catalog file only. Used when no remote table is configured.
    FallbackOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePolicy {
    pub precedence: Precedence,
    /// Write the catalog file into an empty remote table.
    pub seed_on_empty: bool,
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self {
            precedence: Precedence::RemoteFirst,
            seed_on_empty: true,
        }
    }
}

/// Where a loaded list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Remote { rows: usize },
    /// The table was empty and has just been written from the catalog file.
    Seeded,
    Fallback,
}

/// Result of one load.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub list: GrantList,
    pub origin: Origin,
    pub warnings: Vec<SyncWarning>,
}

/// Loads the authoritative grant list.
pub struct DataSource {
    remote: Option<Arc<dyn RemoteStore>>,
    fallback: FallbackFile,
    policy: SourcePolicy,
}

impl DataSource {
    /// Remote table backed by a catalog file, with the default policy.
    pub fn new(remote: Arc<dyn RemoteStore>, fallback: FallbackFile) -> Self {
        Self {
            remote: Some(remote),
            fallback,
            policy: SourcePolicy::default(),
        }
    }

    /// Catalog file only.
    pub fn fallback_only(fallback: FallbackFile) -> Self {
        Self {
            remote: None,
            fallback,
            policy: SourcePolicy {
                precedence: Precedence::FallbackOnly,
                seed_on_empty: false,
            },
        }
    }

    pub fn with_policy(mut self, policy: SourcePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SourcePolicy {
        self.policy
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteStore>> {
        self.remote.as_ref()
    }

    pub fn fallback(&self) -> &FallbackFile {
        &self.fallback
    }

    /// Full reload. Never patches a previous result.
    pub async fn load(&self) -> Result<LoadOutcome, LoadError> {
        let remote = match (&self.remote, self.policy.precedence) {
            (Some(remote), Precedence::RemoteFirst) => remote,
            _ => return self.load_fallback(Vec::new()).await,
        };

        match remote.fetch_rows().await {
            Ok(rows) if !rows.is_empty() => {
                let row_count = rows.len();
                let grants = flatten_rows(rows);
                info!(rows = row_count, count = grants.len(), "loaded grants from remote store");
                Ok(LoadOutcome {
                    list: GrantList::new(grants),
                    origin: Origin::Remote { rows: row_count },
                    warnings: Vec::new(),
                })
            }
            Ok(_) => self.seed_empty(&**remote).await,
            Err(remote_err) => {
                warn!(error = %remote_err, "remote store unavailable, using catalog file");
                match self.fallback.read().await {
                    Ok(doc) => Ok(LoadOutcome {
                        list: GrantList::new(doc.grants),
                        origin: Origin::Fallback,
                        warnings: vec![SyncWarning::RemoteUnavailable(remote_err)],
                    }),
                    Err(fallback) => Err(LoadError::Unavailable {
                        remote: remote_err,
                        fallback,
                    }),
                }
            }
        }
    }

    async fn load_fallback(&self, warnings: Vec<SyncWarning>) -> Result<LoadOutcome, LoadError> {
        let doc = self.fallback.read().await?;
        Ok(LoadOutcome {
            list: GrantList::new(doc.grants),
            origin: Origin::Fallback,
            warnings,
        })
    }

    /// Empty table: serve the catalog file and write it back exactly once.
    async fn seed_empty(&self, remote: &dyn RemoteStore) -> Result<LoadOutcome, LoadError> {
        let doc = self.fallback.read().await.map_err(LoadError::SeedSource)?;
        if !self.policy.seed_on_empty {
            info!("remote store empty, seeding disabled; serving catalog file");
            return Ok(LoadOutcome {
                list: GrantList::new(doc.grants),
                origin: Origin::Fallback,
                warnings: Vec::new(),
            });
        }

        match remote.replace_all(&doc.grants).await {
            Ok(()) => {
                info!(count = doc.grants.len(), "seeded empty remote store from catalog file");
                Ok(LoadOutcome {
                    list: GrantList::new(doc.grants),
                    origin: Origin::Seeded,
                    warnings: Vec::new(),
                })
            }
            Err(err) => {
                warn!(error = %err, "seeding empty remote store failed");
                Ok(LoadOutcome {
                    list: GrantList::new(doc.grants),
                    origin: Origin::Fallback,
                    warnings: vec![SyncWarning::SeedFailed(err)],
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::remote::StoredRow;
    use grantfinder_core::GrantRecord;
    use std::path::PathBuf;

    fn fixture() -> FallbackFile {
        FallbackFile::new(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("..")
                .join("data")
                .join("grants-database.json"),
        )
    }

    fn missing() -> FallbackFile {
        FallbackFile::new("/nonexistent/grants-database.json")
    }

    async fn fixture_len() -> usize {
        fixture().read().await.unwrap().grants.len()
    }

    #[tokio::test]
    async fn non_empty_remote_is_authoritative() {
        let store = Arc::new(MemoryStore::with_grants(vec![GrantRecord::draft("remote-1")]));
        let source = DataSource::new(store.clone(), fixture());
        let outcome = source.load().await.unwrap();
        assert_eq!(outcome.origin, Origin::Remote { rows: 1 });
        assert_eq!(outcome.list.len(), 1);
        assert!(outcome.list.find("remote-1").is_some());
        assert!(outcome.warnings.is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn rows_flattened_in_order() {
        let store = Arc::new(MemoryStore::with_rows(vec![
            StoredRow {
                id: "a".into(),
                data: vec![GrantRecord::draft("1"), GrantRecord::draft("2")],
                created_at: Some("2025-01-01T00:00:00Z".into()),
                updated_at: None,
            },
            StoredRow {
                id: "b".into(),
                data: vec![GrantRecord::draft("3")],
                created_at: Some("2025-02-01T00:00:00Z".into()),
                updated_at: None,
            },
        ]));
        let outcome = DataSource::new(store, fixture()).load().await.unwrap();
        let ids: Vec<&str> = outcome.list.grants().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(outcome.origin, Origin::Remote { rows: 2 });
    }

    #[tokio::test]
    async fn empty_remote_seeded_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let source = DataSource::new(store.clone(), fixture());
        let outcome = source.load().await.unwrap();

        assert_eq!(outcome.origin, Origin::Seeded);
        assert_eq!(outcome.list.len(), fixture_len().await);
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.writes()[0], outcome.list.grants());
        // The fallback content is returned without re-reading the table.
        assert_eq!(store.fetch_count(), 1);

        // Second load sees the seeded table and does not write again.
        let again = source.load().await.unwrap();
        assert_eq!(again.origin, Origin::Remote { rows: 1 });
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn seeding_can_be_disabled() {
        let store = Arc::new(MemoryStore::new());
        let source = DataSource::new(store.clone(), fixture()).with_policy(SourcePolicy {
            precedence: Precedence::RemoteFirst,
            seed_on_empty: false,
        });
        let outcome = source.load().await.unwrap();
        assert_eq!(outcome.origin, Origin::Fallback);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn failed_seed_is_a_warning() {
        let store = Arc::new(MemoryStore::new());
        store.set_reject_writes(true);
        let outcome = DataSource::new(store.clone(), fixture()).load().await.unwrap();
        assert_eq!(outcome.origin, Origin::Fallback);
        assert!(matches!(outcome.warnings[..], [SyncWarning::SeedFailed(_)]));
        assert_eq!(outcome.list.len(), fixture_len().await);
    }

    #[tokio::test]
    async fn unreachable_remote_falls_back_with_warning() {
        let store = Arc::new(MemoryStore::with_grants(vec![GrantRecord::draft("remote-1")]));
        store.set_offline(true);
        let outcome = DataSource::new(store.clone(), fixture()).load().await.unwrap();
        assert_eq!(outcome.origin, Origin::Fallback);
        assert_eq!(outcome.list.len(), fixture_len().await);
        assert!(matches!(
            outcome.warnings[..],
            [SyncWarning::RemoteUnavailable(_)]
        ));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn both_unavailable_is_load_error() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let result = DataSource::new(store, missing()).load().await;
        assert!(matches!(result, Err(LoadError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn empty_remote_without_catalog_file() {
        let store = Arc::new(MemoryStore::new());
        let result = DataSource::new(store.clone(), missing()).load().await;
        assert!(matches!(result, Err(LoadError::SeedSource(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn fallback_only_never_touches_remote() {
        let store = Arc::new(MemoryStore::with_grants(vec![GrantRecord::draft("remote-1")]));
        let source = DataSource::new(store.clone(), fixture()).with_policy(SourcePolicy {
            precedence: Precedence::FallbackOnly,
            seed_on_empty: true,
        });
        let outcome = source.load().await.unwrap();
        assert_eq!(outcome.origin, Origin::Fallback);
        assert!(outcome.list.find("remote-1").is_none());
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn fallback_only_constructor() {
        let outcome = DataSource::fallback_only(fixture()).load().await.unwrap();
        assert_eq!(outcome.origin, Origin::Fallback);
        assert!(!outcome.list.is_empty());

        let result = DataSource::fallback_only(missing()).load().await;
        assert!(matches!(result, Err(LoadError::Fallback(_))));
    }
}
