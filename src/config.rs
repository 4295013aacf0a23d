use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// YAML file holding the `players:` list
    #[serde(default = "default_player_config_path")]
    pub player_config_path: PathBuf,

    /// Seconds between two check cycles
    #[serde(default = "default_player_check_interval")]
    pub player_check_interval: u64,

    /// Seconds allowed for one TCP connect, fractions allowed
    #[serde(default = "default_player_connect_timeout")]
    pub player_connect_timeout: f64,

    /// Upper bound on probes in flight during one cycle
    #[serde(default = "default_player_probe_concurrency")]
    pub player_probe_concurrency: usize,

    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,
}

fn default_port() -> u16 {
    8080
}

fn default_player_config_path() -> PathBuf {
    PathBuf::from("/opt/status-monitor/config/players.yml")
}

fn default_player_check_interval() -> u64 {
    5
}

fn default_player_connect_timeout() -> f64 {
    1.0
}

fn default_player_probe_concurrency() -> usize {
    8
}

fn default_cors_allowed_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000".to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Ok(Self::from_source(config))
    }

    /// Deserialize all keys at once, or key by key when one of them is bad
    ///
    /// A malformed value only resets its own key to the default.
    pub fn from_source(source: config::Config) -> Self {
        match source.clone().try_deserialize::<Config>() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid environment configuration, keeping valid keys");
                let defaults = Config::default();
                Self {
                    port: setting(&source, "port", defaults.port),
                    player_config_path: setting(
                        &source,
                        "player_config_path",
                        defaults.player_config_path,
                    ),
                    player_check_interval: setting(
                        &source,
                        "player_check_interval",
                        defaults.player_check_interval,
                    ),
                    player_connect_timeout: setting(
                        &source,
                        "player_connect_timeout",
                        defaults.player_connect_timeout,
                    ),
                    player_probe_concurrency: setting(
                        &source,
                        "player_probe_concurrency",
                        defaults.player_probe_concurrency,
                    ),
                    cors_allowed_origins: setting(
                        &source,
                        "cors_allowed_origins",
                        defaults.cors_allowed_origins,
                    ),
                }
            }
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.player_check_interval.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        if self.player_connect_timeout.is_finite() && self.player_connect_timeout > 0.0 {
            Duration::from_secs_f64(self.player_connect_timeout)
        } else {
            Duration::from_secs_f64(default_player_connect_timeout())
        }
    }

    pub fn probe_concurrency(&self) -> usize {
        self.player_probe_concurrency.max(1)
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn setting<T: DeserializeOwned>(source: &config::Config, key: &str, default: T) -> T {
    match source.get::<T>(key) {
        Ok(value) => value,
        Err(config::ConfigError::NotFound(_)) => default,
        Err(e) => {
            tracing::warn!(key, error = %e, "Invalid configuration value, using default");
            default
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            player_config_path: default_player_config_path(),
            player_check_interval: default_player_check_interval(),
            player_connect_timeout: default_player_connect_timeout(),
            player_probe_concurrency: default_player_probe_concurrency(),
            cors_allowed_origins: default_cors_allowed_origins(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.player_config_path,
            PathBuf::from("/opt/status-monitor/config/players.yml")
        );
        assert_eq!(config.check_interval(), Duration::from_secs(5));
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
        assert_eq!(config.probe_concurrency(), 8);
    }

    #[test]
    fn test_degenerate_values_are_clamped() {
        let config = Config {
            player_check_interval: 0,
            player_connect_timeout: -3.0,
            player_probe_concurrency: 0,
            ..Config::default()
        };
        assert_eq!(config.check_interval(), Duration::from_secs(1));
        assert_eq!(config.connect_timeout(), Duration::from_secs(1));
        assert_eq!(config.probe_concurrency(), 1);
    }

    fn source(pairs: &[(&str, &str)]) -> config::Config {
        let mut builder = config::Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_from_source_reads_overrides() {
        let config = Config::from_source(source(&[
            ("player_config_path", "/srv/players.yml"),
            ("player_check_interval", "7"),
        ]));
        assert_eq!(config.player_config_path, PathBuf::from("/srv/players.yml"));
        assert_eq!(config.check_interval(), Duration::from_secs(7));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_bad_value_keeps_other_keys() {
        let config = Config::from_source(source(&[
            ("player_config_path", "/srv/players.yml"),
            ("player_check_interval", "five"),
            ("port", "9090"),
        ]));
        assert_eq!(config.player_config_path, PathBuf::from("/srv/players.yml"));
        assert_eq!(config.port, 9090);
        assert_eq!(config.check_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_allowed_origins_split() {
        let config = Config {
            cors_allowed_origins: "http://a.test, ,http://b.test".to_string(),
            ..Config::default()
        };
        assert_eq!(config.allowed_origins(), vec!["http://a.test", "http://b.test"]);
    }
}
