//! Background status checker
//!
//! One long-lived task that reloads the players file, probes every player and
//! publishes the results as a single snapshot, then sleeps for the interval.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::StoreError;
use crate::models::{ProbeResult, Snapshot};
use crate::monitor::{ConfigStore, Prober, SnapshotStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerSettings {
    /// Sleep between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Deadline for each individual probe
    pub timeout: Duration,
    /// Probes allowed in flight at once
    pub concurrency: usize,
}

impl CheckerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.check_interval(),
            timeout: config.connect_timeout(),
            concurrency: config.probe_concurrency(),
        }
    }
}

pub struct Checker {
    store: ConfigStore,
    prober: Arc<dyn Prober>,
    snapshots: Arc<SnapshotStore>,
    settings: CheckerSettings,
    started: AtomicBool,
}

impl Checker {
    pub fn new(
        store: ConfigStore,
        prober: Arc<dyn Prober>,
        snapshots: Arc<SnapshotStore>,
        settings: CheckerSettings,
    ) -> Self {
        Self {
            store,
            prober,
            snapshots,
            settings: CheckerSettings {
                concurrency: settings.concurrency.max(1),
                ..settings
            },
            started: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> CheckerSettings {
        self.settings
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Spawn the check loop; only the first call per checker does anything
    ///
    /// Returns `true` when this call started the loop.
    pub fn start(self: &Arc<Self>) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Player checker already started");
            return false;
        }

        let checker = Arc::clone(self);
        tokio::spawn(async move {
            checker.run().await;
        });
        true
    }

    async fn run(&self) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            timeout_ms = self.settings.timeout.as_millis() as u64,
            concurrency = self.settings.concurrency,
            path = %self.store.path().display(),
            "Player checker started"
        );

        loop {
            if let Err(e) = self.run_cycle().await {
                error!("Checker loop error: {}", e);
            }
            tokio::time::sleep(self.settings.interval).await;
        }
    }

    /// Reload, probe every player and publish one snapshot
    ///
    /// All results of the cycle share one `last_checked` timestamp, which is
    /// also the snapshot's `updated_at`. Nothing is published on error.
    pub async fn run_cycle(&self) -> Result<Arc<Snapshot>, StoreError> {
        let started = Instant::now();

        let store = self.store.clone();
        let reload = tokio::task::spawn_blocking(move || store.load_if_changed()).await??;
        let players = Arc::clone(reload.players());

        let checked_at = Utc::now();
        let timeout = self.settings.timeout;
        let prober = &self.prober;

        let results: Vec<ProbeResult> = stream::iter(players.iter().cloned())
            .map(|endpoint| async move {
                let outcome = prober.probe(&endpoint.ip_port, timeout).await;
                ProbeResult::new(&endpoint, outcome, checked_at)
            })
            .buffered(self.settings.concurrency)
            .collect()
            .await;

        let snapshot = self.snapshots.publish(Snapshot::new(results, checked_at)).await;

        debug!(
            players = snapshot.results.len(),
            online = snapshot.online_count(),
            reloaded = reload.is_changed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Check cycle published"
        );
        Ok(snapshot)
    }
}
