//! Player status monitoring
//!
//! - [`ConfigStore`]: persisted player list with change detection
//! - [`Prober`]: one bounded TCP connect per player
//! - [`Checker`]: the background reload/probe/publish loop
//! - [`SnapshotStore`]: latest results shared with request handlers

pub mod checker;
pub mod prober;
pub mod snapshot;
pub mod store;

pub use checker::{Checker, CheckerSettings};
pub use prober::{Prober, TcpProber};
pub use snapshot::SnapshotStore;
pub use store::{ConfigStore, PlayersDocument, Reload};
