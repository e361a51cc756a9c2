//! Single task that owns every reload of the grant list.
//!
//! Interval ticks, change notifications from the remote store and manual
//! refresh requests all funnel into one loop. A change or manual trigger bumps
//! the generation, aborts the load in flight and starts a new one. An interval
//! tick only starts a load when none is running, so a load slower than the
//! interval still completes. A finished load is published only while its
//! generation is still the latest.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::remote::ChangeEvent;
use crate::source::{DataSource, LoadOutcome};
use crate::LoadError;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// What started a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Interval,
    Change,
    Manual,
}

/// A published reload result.
#[derive(Debug, Clone)]
pub enum ReloadEvent {
    Loaded {
        generation: u64,
        outcome: Arc<LoadOutcome>,
    },
    Failed {
        generation: u64,
        error: Arc<LoadError>,
    },
}

impl ReloadEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Loaded { generation, .. } | Self::Failed { generation, .. } => *generation,
        }
    }
}

pub struct ReloadCoordinator {
    source: Arc<DataSource>,
    interval: Duration,
}

impl ReloadCoordinator {
    /// `interval` is raised to one second if shorter.
    pub fn new(source: Arc<DataSource>, interval: Duration) -> Self {
        Self {
            source,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Start the coordinator. The first load begins immediately.
    ///
    /// Change notifications are taken from the data source's remote store when
    /// it offers a push channel.
    pub fn spawn(self) -> ReloadHandle {
        let changes = self.source.remote().and_then(|remote| remote.subscribe());
        let (manual_tx, manual_rx) = mpsc::channel(1);
        let (events_tx, events_rx) = watch::channel(None);
        let task = tokio::spawn(self.run(changes, manual_rx, events_tx));
        ReloadHandle {
            manual: manual_tx,
            events: events_rx,
            task,
        }
    }

    async fn run(
        self,
        mut changes: Option<broadcast::Receiver<ChangeEvent>>,
        mut manual: mpsc::Receiver<()>,
        events: watch::Sender<Option<ReloadEvent>>,
    ) {
        // The startup load below stands in for the first tick.
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut generation: u64 = 1;
        let mut in_flight = Some(start_load(&self.source, &done_tx, generation));

        info!(
            interval_secs = self.interval.as_secs(),
            push = changes.is_some(),
            "reload coordinator started"
        );

        loop {
            let trigger = tokio::select! {
                _ = ticker.tick() => Trigger::Interval,
                change = next_change(&mut changes) => match change {
                    Ok(event) => {
                        debug!(kind = ?event.kind, row = %event.row_id, "remote change");
                        Trigger::Change
                    }
                    Err(RecvError::Lagged(missed)) => {
                        debug!(missed, "change notifications lagged");
                        Trigger::Change
                    }
                    Err(RecvError::Closed) => {
                        debug!("change channel closed");
                        changes = None;
                        continue;
                    }
                },
                request = manual.recv() => match request {
                    Some(()) => Trigger::Manual,
                    None => break,
                },
                Some((finished, result)) = done_rx.recv() => {
                    if finished == generation {
                        in_flight = None;
                        events.send_replace(Some(publish(finished, result)));
                    } else {
                        debug!(finished, latest = generation, "discarding superseded load");
                    }
                    continue;
                }
            };

            if trigger == Trigger::Interval && in_flight.is_some() {
                debug!(generation, "load still running, skipping tick");
                continue;
            }

            generation += 1;
            if let Some(task) = in_flight.take() {
                task.abort();
            }
            debug!(generation, ?trigger, "reloading");
            in_flight = Some(start_load(&self.source, &done_tx, generation));
        }

        if let Some(task) = in_flight {
            task.abort();
        }
        info!("reload coordinator stopped");
    }
}

type LoadResult = (u64, Result<LoadOutcome, LoadError>);

fn start_load(
    source: &Arc<DataSource>,
    done: &mpsc::UnboundedSender<LoadResult>,
    generation: u64,
) -> JoinHandle<()> {
    let source = Arc::clone(source);
    let done = done.clone();
    tokio::spawn(async move {
        let result = source.load().await;
        // The coordinator may already be gone.
        let _ = done.send((generation, result));
    })
}

async fn next_change(
    changes: &mut Option<broadcast::Receiver<ChangeEvent>>,
) -> Result<ChangeEvent, RecvError> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn publish(generation: u64, result: Result<LoadOutcome, LoadError>) -> ReloadEvent {
    match result {
        Ok(outcome) => {
            for warning in &outcome.warnings {
                warn!(generation, %warning, "reload degraded");
            }
            info!(generation, count = outcome.list.len(), origin = ?outcome.origin, "reload published");
            ReloadEvent::Loaded {
                generation,
                outcome: Arc::new(outcome),
            }
        }
        Err(error) => {
            warn!(generation, %error, "reload failed");
            ReloadEvent::Failed {
                generation,
                error: Arc::new(error),
            }
        }
    }
}

/// Control side of a running [`ReloadCoordinator`]. Dropping it stops the
/// coordinator and releases the change subscription.
pub struct ReloadHandle {
    manual: mpsc::Sender<()>,
    events: watch::Receiver<Option<ReloadEvent>>,
    task: JoinHandle<()>,
}

impl ReloadHandle {
    /// Request a reload. Requests made while one is already queued coalesce.
    pub fn refresh(&self) {
        let _ = self.manual.try_send(());
    }

    /// Most recently published event, if any.
    pub fn latest(&self) -> Option<ReloadEvent> {
        self.events.borrow().clone()
    }

    /// Wait for the next published event. `None` once the coordinator stopped.
    pub async fn next(&mut self) -> Option<ReloadEvent> {
        self.events.changed().await.ok()?;
        self.events.borrow_and_update().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ReloadEvent>> {
        self.events.clone()
    }

    /// Stop the coordinator and wait for it to exit.
    pub async fn shutdown(self) {
        drop(self.manual);
        if let Err(err) = self.task.await {
            warn!(error = %err, "reload coordinator ended abnormally");
        }
    }
}
