//! In-process [`RemoteStore`] with a change channel and fault injection.
//!
//! Test double for the data source, the admin gateway and the reload
//! coordinator.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use grantfinder_core::GrantRecord;
use tokio::sync::broadcast;
use tracing::debug;

use crate::RemoteError;
use crate::remote::{ChangeEvent, ChangeKind, DOCUMENT_ROW_ID, RemoteStore, StoredRow};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct MemoryState {
    rows: Vec<StoredRow>,
    /// Every successful `replace_all` payload, oldest first.
    writes: Vec<Vec<GrantRecord>>,
    fetches: usize,
    offline: bool,
    reject_writes: bool,
    fetch_delays: VecDeque<Duration>,
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty (uninitialized) table.
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<StoredRow>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(MemoryState {
                rows,
                ..MemoryState::default()
            }),
            changes,
        }
    }

    /// A table holding one document row with `grants`.
    pub fn with_grants(grants: Vec<GrantRecord>) -> Self {
        Self::with_rows(vec![StoredRow {
            id: DOCUMENT_ROW_ID.to_string(),
            data: grants,
            created_at: Some(now()),
            updated_at: None,
        }])
    }

    /// Make every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Make `replace_all` fail with a server rejection while reads keep working.
    pub fn set_reject_writes(&self, reject: bool) {
        self.lock().reject_writes = reject;
    }

    /// Delay the next fetch by `delay`. Queued delays apply one per fetch.
    pub fn delay_next_fetch(&self, delay: Duration) {
        self.lock().fetch_delays.push_back(delay);
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.lock().rows.clone()
    }

    /// Payloads of every successful full-list write.
    pub fn writes(&self) -> Vec<Vec<GrantRecord>> {
        self.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch_rows(&self) -> Result<Vec<StoredRow>, RemoteError> {
        let (rows, delay) = {
            let mut state = self.lock();
            if state.offline {
                return Err(RemoteError::Unreachable("memory store offline".into()));
            }
            state.fetches += 1;
            (state.rows.clone(), state.fetch_delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(rows)
    }

    async fn replace_all(&self, grants: &[GrantRecord]) -> Result<(), RemoteError> {
        let events = {
            let mut state = self.lock();
            if state.offline {
                return Err(RemoteError::Unreachable("memory store offline".into()));
            }
            if state.reject_writes {
                return Err(RemoteError::Rejected {
                    status: 503,
                    body: "writes disabled".into(),
                });
            }

            let previous = std::mem::take(&mut state.rows);
            let existing = previous.iter().find(|r| r.id == DOCUMENT_ROW_ID);
            let mut events: Vec<ChangeEvent> = previous
                .iter()
                .filter(|r| r.id != DOCUMENT_ROW_ID)
                .map(|r| ChangeEvent {
                    kind: ChangeKind::Delete,
                    row_id: r.id.clone(),
                })
                .collect();
            events.push(ChangeEvent {
                kind: if existing.is_some() {
                    ChangeKind::Update
                } else {
                    ChangeKind::Insert
                },
                row_id: DOCUMENT_ROW_ID.to_string(),
            });

            let stamp = now();
            state.rows = vec![StoredRow {
                id: DOCUMENT_ROW_ID.to_string(),
                data: grants.to_vec(),
                created_at: existing
                    .and_then(|r| r.created_at.clone())
                    .or_else(|| Some(stamp.clone())),
                updated_at: Some(stamp),
            }];
            state.writes.push(grants.to_vec());
            events
        };

        for event in events {
            // No subscribers is fine.
            let _ = self.changes.send(event);
        }
        debug!(count = grants.len(), "memory store replaced");
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<ChangeEvent>> {
        Some(self.changes.subscribe())
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
