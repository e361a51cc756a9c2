//! Admin mutations over the working grant list.
//!
//! Every mutation is applied to the in-memory list first and then the whole
//! resulting list is written to the remote store in one replacement. When
//! that write fails the local change is kept and [`AdminError::Sync`] is
//! returned, so the caller can report that the change is not durable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use grantfinder_core::{GrantList, GrantRecord};
use tracing::{info, warn};

use crate::fallback::export_list;
use crate::remote::RemoteStore;
use crate::{AdminError, SyncError};

pub struct AdminGateway {
    remote: Arc<dyn RemoteStore>,
    list: GrantList,
}

impl AdminGateway {
    pub fn new(remote: Arc<dyn RemoteStore>, list: GrantList) -> Self {
        Self { remote, list }
    }

    pub fn grants(&self) -> &[GrantRecord] {
        self.list.grants()
    }

    pub fn list(&self) -> &GrantList {
        &self.list
    }

    /// Replace the working copy after a refresh. Nothing is written.
    pub fn reload(&mut self, list: GrantList) {
        self.list = list;
    }

    pub async fn add(&mut self, record: GrantRecord) -> Result<(), AdminError> {
        if self.list.find(&record.id).is_some() {
            return Err(AdminError::DuplicateId(record.id));
        }
        info!(id = %record.id, "adding grant");
        let mut grants = self.take_grants();
        grants.push(record);
        self.commit(grants).await
    }

    pub async fn update(&mut self, id: &str, record: GrantRecord) -> Result<(), AdminError> {
        if record.id != id {
            return Err(AdminError::IdMismatch {
                target: id.to_string(),
                record: record.id,
            });
        }
        let index = self.position(id)?;
        info!(id, "updating grant");
        let mut grants = self.take_grants();
        grants[index] = record;
        self.commit(grants).await
    }

    /// Remove `id` and return the removed record. On [`AdminError::Sync`] the
    /// record is already gone from the working copy.
    pub async fn delete(&mut self, id: &str) -> Result<GrantRecord, AdminError> {
        let index = self.position(id)?;
        info!(id, "deleting grant");
        let mut grants = self.take_grants();
        let removed = grants.remove(index);
        self.commit(grants).await?;
        Ok(removed)
    }

    /// Overwrite the remote store with `grants` regardless of what it holds.
    pub async fn seed(&mut self, grants: Vec<GrantRecord>) -> Result<(), AdminError> {
        info!(count = grants.len(), "overwriting remote store");
        self.commit(grants).await
    }

    /// Write the working copy and its aggregates to a dated file under `dir`.
    pub async fn export(&self, dir: &Path, date: NaiveDate) -> Result<PathBuf, AdminError> {
        Ok(export_list(&self.list, dir, date).await?)
    }

    fn position(&self, id: &str) -> Result<usize, AdminError> {
        self.list
            .grants()
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| AdminError::UnknownGrant(id.to_string()))
    }

    fn take_grants(&mut self) -> Vec<GrantRecord> {
        std::mem::take(&mut self.list).into_grants()
    }

    /// Install `grants` locally, then persist the full list.
    async fn commit(&mut self, grants: Vec<GrantRecord>) -> Result<(), AdminError> {
        self.list = GrantList::new(grants);
        match self.remote.replace_all(self.list.grants()).await {
            Ok(()) => {
                info!(count = self.list.len(), "saved grant list");
                Ok(())
            }
            Err(source) => {
                warn!(error = %source, "grant list not saved");
                Err(SyncError {
                    count: self.list.len(),
                    source,
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FallbackError;
    use crate::memory::MemoryStore;

    fn grant(id: &str, name: &str) -> GrantRecord {
        let mut g = GrantRecord::draft(id);
        g.name = name.into();
        g
    }

    fn gateway() -> (Arc<MemoryStore>, AdminGateway) {
        let grants = vec![grant("g1", "甲"), grant("g2", "乙")];
        let store = Arc::new(MemoryStore::with_grants(grants.clone()));
        let gw = AdminGateway::new(store.clone(), GrantList::new(grants));
        (store, gw)
    }

    fn ids(grants: &[GrantRecord]) -> Vec<&str> {
        grants.iter().map(|g| g.id.as_str()).collect()
    }

    #[tokio::test]
    async fn add_writes_full_list() {
        let (store, mut gw) = gateway();
        gw.add(grant("g3", "丙")).await.unwrap();

        assert_eq!(store.write_count(), 1);
        assert_eq!(ids(&store.writes()[0]), vec!["g1", "g2", "g3"]);
        assert_eq!(ids(gw.grants()), vec!["g1", "g2", "g3"]);
    }

    #[tokio::test]
    async fn update_replaces_in_place() {
        let (store, mut gw) = gateway();
        gw.update("g1", grant("g1", "甲改")).await.unwrap();

        let written = &store.writes()[0];
        assert_eq!(ids(written), vec!["g1", "g2"]);
        assert_eq!(written[0].name, "甲改");
        assert_eq!(gw.list().find("g1").unwrap().name, "甲改");
    }

    #[tokio::test]
    async fn delete_writes_remaining_list() {
        let (store, mut gw) = gateway();
        let removed = gw.delete("g1").await.unwrap();

        assert_eq!(removed.id, "g1");
        assert_eq!(store.write_count(), 1);
        assert_eq!(ids(&store.writes()[0]), vec!["g2"]);
    }

    #[tokio::test]
    async fn aggregates_follow_mutations() {
        let (_store, mut gw) = gateway();
        let before = gw.list().facets().organizer_categories.len();
        let mut g = grant("g3", "丙");
        g.organizer_category = grantfinder_core::OrganizerCategory::Labor;
        gw.add(g).await.unwrap();
        assert_eq!(gw.list().facets().organizer_categories.len(), before + 1);
    }

    #[tokio::test]
    async fn duplicate_add_rejected_without_write() {
        let (store, mut gw) = gateway();
        let err = gw.add(grant("g1", "重複")).await.unwrap_err();
        assert!(matches!(err, AdminError::DuplicateId(id) if id == "g1"));
        assert_eq!(store.write_count(), 0);
        assert_eq!(gw.grants().len(), 2);
    }

    #[tokio::test]
    async fn unknown_ids_rejected_without_write() {
        let (store, mut gw) = gateway();
        assert!(matches!(
            gw.update("nope", grant("nope", "x")).await,
            Err(AdminError::UnknownGrant(_))
        ));
        assert!(matches!(
            gw.delete("nope").await,
            Err(AdminError::UnknownGrant(_))
        ));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn update_id_mismatch_rejected() {
        let (store, mut gw) = gateway();
        let err = gw.update("g1", grant("g2", "x")).await.unwrap_err();
        assert!(matches!(err, AdminError::IdMismatch { .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn failed_write_keeps_local_change() {
        let (store, mut gw) = gateway();
        store.set_reject_writes(true);

        let err = gw.add(grant("g3", "丙")).await.unwrap_err();
        match err {
            AdminError::Sync(sync) => assert_eq!(sync.count, 3),
            other => panic!("expected sync error, got {other:?}"),
        }
        // Local and remote have diverged.
        assert_eq!(gw.grants().len(), 3);
        assert_eq!(store.rows()[0].data.len(), 2);
    }

    #[tokio::test]
    async fn seed_overwrites_remote() {
        let (store, mut gw) = gateway();
        gw.seed(vec![grant("s1", "種子")]).await.unwrap();
        assert_eq!(ids(&store.rows()[0].data), vec!["s1"]);
        assert_eq!(ids(gw.grants()), vec!["s1"]);
    }

    #[tokio::test]
    async fn reload_does_not_write() {
        let (store, mut gw) = gateway();
        gw.reload(GrantList::new(vec![grant("r1", "重載")]));
        assert_eq!(ids(gw.grants()), vec!["r1"]);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn export_writes_dated_file() {
        let (_store, gw) = gateway();
        let tmp = tempfile::TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 9, 23).unwrap();

        let path = gw.export(tmp.path(), date).await.unwrap();
        assert!(path.ends_with("grants-database-2025-09-23.json"));

        let doc = crate::FallbackFile::new(&path).read().await.unwrap();
        assert_eq!(ids(&doc.grants), vec!["g1", "g2"]);
        let categories = doc.categories.unwrap();
        assert_eq!(categories["main"][0]["name"], "數位轉型");
        assert_eq!(categories["main"][0]["count"], 2);
    }

    #[tokio::test]
    async fn export_into_missing_dir_fails() {
        let (_store, gw) = gateway();
        let date = NaiveDate::from_ymd_opt(2025, 9, 23).unwrap();
        let err = gw
            .export(Path::new("/nonexistent/dir"), date)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Export(FallbackError::Io { .. })));
    }
}
