use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Endpoint;

/// Reachability of a player as seen by the last probe
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProbeStatus {
    Online,
    Offline,
}

/// Outcome of a single connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    pub latency_ms: Option<u64>,
}

impl ProbeOutcome {
    pub fn online(latency_ms: u64) -> Self {
        Self {
            status: ProbeStatus::Online,
            latency_ms: Some(latency_ms),
        }
    }

    pub fn offline() -> Self {
        Self {
            status: ProbeStatus::Offline,
            latency_ms: None,
        }
    }
}

/// Status of one player within a check cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProbeResult {
    pub name: String,
    #[schema(value_type = String)]
    pub ip_port: super::IpPort,
    pub status: ProbeStatus,
    pub latency_ms: Option<u64>,
    /// Unix seconds, shared by every result of the same cycle
    #[serde(with = "chrono::serde::ts_seconds")]
    #[schema(value_type = i64)]
    pub last_checked: DateTime<Utc>,
}

impl ProbeResult {
    pub fn new(endpoint: &Endpoint, outcome: ProbeOutcome, checked_at: DateTime<Utc>) -> Self {
        Self {
            name: endpoint.name.clone(),
            ip_port: endpoint.ip_port.clone(),
            status: outcome.status,
            latency_ms: outcome.latency_ms,
            last_checked: checked_at,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == ProbeStatus::Online
    }
}

/// Complete result set of one check cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub results: Vec<ProbeResult>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(results: Vec<ProbeResult>, updated_at: DateTime<Utc>) -> Self {
        Self {
            results,
            updated_at: Some(updated_at),
        }
    }

    pub fn online_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_online()).count()
    }
}

/// JSON view of the latest snapshot served to the UI
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusReport {
    pub players: Vec<ProbeResult>,
    /// Unix seconds of the last published cycle, null before the first one
    #[serde(with = "chrono::serde::ts_seconds_option")]
    #[schema(value_type = Option<i64>)]
    pub updated_at: Option<DateTime<Utc>>,
    pub interval_sec: u64,
    pub timeout_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_probe_status_strings() {
        assert_eq!(ProbeStatus::Online.to_string(), "online");
        assert_eq!(
            "offline".parse::<ProbeStatus>().unwrap(),
            ProbeStatus::Offline
        );
        assert!("unknown".parse::<ProbeStatus>().is_err());
    }

    #[test]
    fn test_probe_result_json_shape() {
        let ep = Endpoint::new(Some("A"), "127.0.0.1:9").unwrap();
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let result = ProbeResult::new(&ep, ProbeOutcome::offline(), ts);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "A",
                "ip_port": "127.0.0.1:9",
                "status": "offline",
                "latency_ms": null,
                "last_checked": 1_700_000_000
            })
        );
    }

    #[test]
    fn test_report_before_first_cycle() {
        let report = StatusReport {
            players: vec![],
            updated_at: None,
            interval_sec: 5,
            timeout_sec: 1.0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["updated_at"].is_null());
        assert_eq!(json["players"].as_array().unwrap().len(), 0);
    }
}
