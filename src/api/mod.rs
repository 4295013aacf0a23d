pub mod health;
pub mod openapi;
pub mod players;
pub mod response;

use std::sync::Arc;

use crate::config::Config;
use crate::monitor::{Checker, CheckerSettings, ConfigStore, Prober, SnapshotStore, TcpProber};

/// Shared application state
///
/// Handlers read the snapshot and mutate the players file; they never touch
/// the checker loop beyond asking whether it runs.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: ConfigStore,
    pub snapshots: Arc<SnapshotStore>,
    pub checker: Arc<Checker>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_prober(config, Arc::new(TcpProber))
    }

    pub fn with_prober(config: Config, prober: Arc<dyn Prober>) -> Self {
        let settings = CheckerSettings::from_config(&config);
        let store = ConfigStore::new(config.player_config_path.clone());
        let snapshots = Arc::new(SnapshotStore::new(settings.interval, settings.timeout));
        let checker = Arc::new(Checker::new(
            store.clone(),
            prober,
            snapshots.clone(),
            settings,
        ));

        Self {
            config,
            store,
            snapshots,
            checker,
        }
    }

    /// Start the background checker; repeated calls are no-ops
    pub fn start_checker(&self) -> bool {
        self.checker.start()
    }
}
