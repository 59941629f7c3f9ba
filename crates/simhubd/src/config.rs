//! simhubd.toml configuration.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use simhub_health::parse_duration;
use simhub_registry::RegistryConfig;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8700";

/// Config file as written on disk. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub listen: Option<String>,
    pub advertise_url: Option<String>,
    pub health: Option<HealthConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthConfig {
    pub interval: Option<String>,
    pub probe_timeout: Option<String>,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub advertise_url: Option<String>,
    pub health_interval: Option<String>,
    pub probe_timeout: Option<String>,
}

/// Fully resolved daemon settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub listen: SocketAddr,
    pub advertise_url: String,
    pub health_interval: Duration,
    pub probe_timeout: Duration,
}

impl BrokerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: BrokerConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Layer `overrides` on top of the file values and fill in defaults.
    pub fn resolve(&self, overrides: Overrides) -> anyhow::Result<Settings> {
        let health = self.health.clone().unwrap_or_default();
        let defaults = RegistryConfig::default().monitor;

        let listen = overrides
            .listen
            .or_else(|| self.listen.clone())
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen
            .parse()
            .with_context(|| format!("invalid listen address `{listen}`"))?;

        let advertise_url = overrides
            .advertise_url
            .or_else(|| self.advertise_url.clone())
            .unwrap_or_else(|| format!("http://{listen}"));

        let health_interval = duration_field(
            "health.interval",
            overrides.health_interval.or(health.interval),
            defaults.interval,
        )?;
        let probe_timeout = duration_field(
            "health.probe_timeout",
            overrides.probe_timeout.or(health.probe_timeout),
            defaults.probe_timeout,
        )?;

        Ok(Settings {
            listen,
            advertise_url,
            health_interval,
            probe_timeout,
        })
    }
}

fn duration_field(name: &str, value: Option<String>, default: Duration) -> anyhow::Result<Duration> {
    match value {
        None => Ok(default),
        Some(raw) => match parse_duration(&raw) {
            Some(d) if !d.is_zero() => Ok(d),
            _ => anyhow::bail!("invalid duration `{raw}` for {name}"),
        },
    }
}

impl Settings {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new()
            .with_health_interval(self.health_interval)
            .with_probe_timeout(self.probe_timeout)
            .with_self_address(self.advertise_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let settings = BrokerConfig::default().resolve(Overrides::default()).unwrap();
        assert_eq!(settings.listen, DEFAULT_LISTEN.parse::<SocketAddr>().unwrap());
        assert_eq!(settings.advertise_url, "http://0.0.0.0:8700");
        assert_eq!(settings.health_interval, Duration::from_secs(60));
        assert_eq!(settings.probe_timeout, Duration::from_secs(5));
    }

    #[test]
    fn parse_full_file() {
        let toml_str = r#"
listen = "127.0.0.1:9000"
advertise_url = "http://10.0.0.5:9000"

[health]
interval = "30s"
probe_timeout = "750ms"
"#;
        let config: BrokerConfig = toml::from_str(toml_str).unwrap();
        let settings = config.resolve(Overrides::default()).unwrap();
        assert_eq!(settings.listen.port(), 9000);
        assert_eq!(settings.advertise_url, "http://10.0.0.5:9000");
        assert_eq!(settings.health_interval, Duration::from_secs(30));
        assert_eq!(settings.probe_timeout, Duration::from_millis(750));
    }

    #[test]
    fn overrides_win_over_file() {
        let config: BrokerConfig = toml::from_str(
            r#"
listen = "127.0.0.1:9000"
[health]
interval = "30s"
"#,
        )
        .unwrap();
        let settings = config
            .resolve(Overrides {
                listen: Some("127.0.0.1:9100".to_string()),
                health_interval: Some("2m".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.listen.port(), 9100);
        assert_eq!(settings.advertise_url, "http://127.0.0.1:9100");
        assert_eq!(settings.health_interval, Duration::from_secs(120));
    }

    #[test]
    fn bad_values_are_rejected() {
        let config = BrokerConfig {
            listen: Some("not-an-addr".to_string()),
            ..Default::default()
        };
        assert!(config.resolve(Overrides::default()).is_err());

        let config = BrokerConfig {
            health: Some(HealthConfig {
                interval: Some("0s".to_string()),
                probe_timeout: None,
            }),
            ..Default::default()
        };
        let err = config.resolve(Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("health.interval"));
    }

    #[test]
    fn oversized_minutes_are_rejected() {
        let err = BrokerConfig::default()
            .resolve(Overrides {
                health_interval: Some("307445734561825861m".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("health.interval"));
    }

    #[test]
    fn registry_config_carries_settings() {
        let settings = BrokerConfig::default()
            .resolve(Overrides {
                advertise_url: Some("http://broker:8700".to_string()),
                probe_timeout: Some("2s".to_string()),
                ..Default::default()
            })
            .unwrap();
        let monitor = settings.registry_config().monitor;
        assert_eq!(monitor.self_address, "http://broker:8700");
        assert_eq!(monitor.probe_timeout, Duration::from_secs(2));
    }
}
