use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::EndpointError;

/// A validated `host:port` pair, the identity key of a player
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpPort {
    raw: String,
    split: usize,
    port: u16,
}

impl IpPort {
    pub fn host(&self) -> &str {
        &self.raw[..self.split]
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for IpPort {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(EndpointError::Empty);
        }
        if raw.matches(':').count() != 1 {
            return Err(EndpointError::MissingSeparator(raw.to_string()));
        }
        let split = raw
            .find(':')
            .ok_or_else(|| EndpointError::MissingSeparator(raw.to_string()))?;
        if raw[..split].trim().is_empty() {
            return Err(EndpointError::EmptyHost(raw.to_string()));
        }
        let port = raw[split + 1..]
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| EndpointError::InvalidPort(raw.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            split,
            port,
        })
    }
}

impl TryFrom<String> for IpPort {
    type Error = EndpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IpPort> for String {
    fn from(value: IpPort) -> Self {
        value.raw
    }
}

impl fmt::Display for IpPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A monitored player: display name plus the address it is probed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Endpoint {
    pub name: String,
    #[schema(value_type = String, example = "10.0.0.5:7777")]
    pub ip_port: IpPort,
}

impl Endpoint {
    /// Build an endpoint, defaulting an absent or blank name to the host part
    pub fn new(name: Option<&str>, ip_port: &str) -> Result<Self, EndpointError> {
        let ip_port: IpPort = ip_port.parse()?;
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ip_port.host())
            .to_string();
        Ok(Self { name, ip_port })
    }
}

/// Request to add a player
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePlayerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip_port: String,
}

/// Request to edit a player; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePlayerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip_port: Option<String>,
}
