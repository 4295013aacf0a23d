//! Latest published check results

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::{Snapshot, StatusReport};

/// Holds the most recent [`Snapshot`] behind a pointer swap
///
/// The lock only guards replacing or cloning the `Arc`, so readers never wait
/// on a probe cycle and never observe results from two cycles at once.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
    interval: Duration,
    timeout: Duration,
}

impl SnapshotStore {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::default())),
            interval,
            timeout,
        }
    }

    pub async fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write().await = snapshot.clone();
        snapshot
    }

    pub async fn read(&self) -> Arc<Snapshot> {
        self.current.read().await.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn report(&self) -> StatusReport {
        let snapshot = self.read().await;
        StatusReport {
            players: snapshot.results.clone(),
            updated_at: snapshot.updated_at,
            interval_sec: self.interval.as_secs(),
            timeout_sec: self.timeout.as_secs_f64(),
        }
    }
}
