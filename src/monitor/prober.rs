//! TCP reachability probe

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

use crate::models::{IpPort, ProbeOutcome};

/// Single bounded connectivity check against one player
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Prober: Send + Sync {
    /// Never fails: every error collapses to an offline outcome
    async fn probe(&self, ip_port: &IpPort, timeout: Duration) -> ProbeOutcome;
}

/// Opens a TCP connection and drops it as soon as it is established
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, ip_port: &IpPort, timeout: Duration) -> ProbeOutcome {
        let started = Instant::now();
        let target = (ip_port.host(), ip_port.port());

        // Name resolution happens inside connect and shares the same deadline
        match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
            Ok(Ok(stream)) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                drop(stream);
                ProbeOutcome::online(latency_ms)
            }
            Ok(Err(e)) => {
                debug!(ip_port = %ip_port, error = %e, "Probe failed");
                ProbeOutcome::offline()
            }
            Err(_) => {
                debug!(ip_port = %ip_port, timeout_ms = timeout.as_millis() as u64, "Probe timed out");
                ProbeOutcome::offline()
            }
        }
    }
}
