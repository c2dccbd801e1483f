//! Service configuration for the fleet-conf binary.

use std::{path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::conf::ServerPub;

/// Top-level configuration, loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Registry address, `proto://addr`
    #[serde(default = "default_registry")]
    pub registry: String,
    pub platform: String,
    pub system: String,
    pub server_type: String,
    pub cluster: String,
    #[serde(default = "default_host")]
    pub host: String,
    pub server_id: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Names the comparer reports on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WatchConfig {
    /// Root scalar fields
    #[serde(default)]
    pub values: Vec<String>,
    /// Sub-configuration names
    #[serde(default)]
    pub sub_confs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rolling log files; stdout only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
    #[serde(default = "default_log_file_prefix")]
    pub log_file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            log_dir: None,
            log_file_prefix: default_log_file_prefix(),
        }
    }
}

fn default_registry() -> String {
    "lm://.".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file_prefix() -> String {
    "fleet-conf".to_string()
}

impl AppConfig {
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(text).context("invalid configuration YAML")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn server_pub(&self) -> ServerPub {
        ServerPub::new(
            self.platform.clone(),
            self.system.clone(),
            self.server_type.clone(),
            self.cluster.clone(),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        conf_registry::RegistryAddress::parse(&self.registry).map_err(|e| e.to_string())?;

        for (field, value) in [
            ("platform", &self.platform),
            ("system", &self.system),
            ("server_type", &self.server_type),
            ("cluster", &self.cluster),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} should not be empty", field));
            }
            if value.contains('/') {
                return Err(format!("{} must not contain '/': {}", field, value));
            }
        }

        if self.server_id.trim().is_empty() {
            return Err("server_id should not be empty".to_string());
        }
        if self.host.contains(crate::cluster::NODE_NAME_SEPARATOR) {
            return Err(format!("host must not contain '_': {}", self.host));
        }

        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = r#"
platform: hydra
system: apiserver
server_type: api
cluster: t
server_id: s1
"#;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.registry, "lm://.");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.logging, LoggingConfig::default());
        assert!(config.watch.values.is_empty());
        assert_eq!(config.server_pub().main_path(), "/hydra/apiserver/api/t/conf");
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_yaml(
            r#"
registry: zk://192.168.0.101:2181
platform: hydra
system: apiserver
server_type: api
cluster: prod
host: 10.0.0.7
server_id: a1b2
poll_interval_secs: 3
watch:
  values: [status, trace]
  sub_confs: [mqc]
logging:
  level: debug
  json: true
  log_dir: /var/log/fleet-conf
"#,
        )
        .unwrap();
        assert_eq!(config.watch.values, vec!["status", "trace"]);
        assert_eq!(config.watch.sub_confs, vec!["mqc"]);
        assert!(config.logging.json);
        assert_eq!(config.logging.log_dir.as_deref(), Some("/var/log/fleet-conf"));
        assert_eq!(config.logging.log_file_prefix, "fleet-conf");
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AppConfig::from_yaml(MINIMAL).unwrap();

        config.registry = "no-proto".to_string();
        assert!(config.validate().is_err());
        config.registry = default_registry();

        config.cluster = "a/b".to_string();
        assert!(config.validate().unwrap_err().contains("cluster"));
        config.cluster = "t".to_string();

        config.host = "my_host".to_string();
        assert!(config.validate().is_err());
        config.host = default_host();

        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());
        config.poll_interval_secs = 1;

        config.server_id = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_required_field() {
        assert!(AppConfig::from_yaml("platform: hydra\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server_id, "s1");

        assert!(AppConfig::from_file(Path::new("/nonexistent/fleet-conf.yaml")).is_err());
    }
}
