//! Configuration loading for the tfos CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tfos_client::SecureString;
use tfos_observability::LoggingConfig as SubscriberConfig;
use tfos_provider::ProviderSettings;

const REDACTED: &str = "***REDACTED***";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cloud credentials and endpoints.
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads `path` if it exists, otherwise starts from defaults. The `OS_*`
    /// environment fills whatever the file leaves unset.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.provider.apply_env();
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if !config.provider.password.is_empty() {
            config.provider.password = SecureString::from(REDACTED);
        }
        if !config.provider.token.is_empty() {
            config.provider.token = SecureString::from(REDACTED);
        }
        config
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to use JSON format.
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Subscriber settings; `verbose` forces the development preset.
    pub fn subscriber_config(&self, verbose: bool) -> SubscriberConfig {
        if verbose {
            return SubscriberConfig::development();
        }
        let mut config = if self.json_format {
            SubscriberConfig::production()
        } else {
            SubscriberConfig::default()
        };
        if let Ok(level) = self.level.parse() {
            config.level = level;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::Level;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.provider.endpoint_type, "public");
        assert_eq!(config.provider.timeout_secs, 30);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
provider:
  auth_url: https://keystone.example.com:5000/v3
  region: RegionOne
  username: admin
  password: hunter2
  project_name: admin
  endpoint_type: internal
  endpoint_overrides:
    key-manager: https://barbican.example.com:9311

logging:
  level: debug
  json_format: true
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.region, "RegionOne");
        assert_eq!(config.provider.endpoint_type, "internal");
        assert!(config.provider.endpoint_overrides.contains_key("key-manager"));
        assert!(config.logging.json_format);
        assert!(config.provider.validate().is_ok());
    }

    #[test]
    fn test_redact_secrets() {
        let mut config = AppConfig::default();
        config.provider.password = SecureString::from("hunter2");

        let redacted = config.redact_secrets();
        assert_eq!(redacted.provider.password.expose_secret(), REDACTED);
        assert!(redacted.provider.token.is_empty());
        assert_eq!(config.provider.password.expose_secret(), "hunter2");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = AppConfig::default();
        config.provider.auth_url = "https://keystone.example.com/v3".into();
        config.provider.token = SecureString::from("gAAAAAB");
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.provider.auth_url, "https://keystone.example.com/v3");
        assert_eq!(loaded.provider.token.expose_secret(), "gAAAAAB");
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "provider: [not, a, map]").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config file"));
    }

    #[test]
    #[serial]
    fn test_missing_file_falls_back_to_environment() {
        std::env::set_var("OS_AUTH_URL", "https://env.example.com/v3");
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.yaml")).unwrap();
        std::env::remove_var("OS_AUTH_URL");

        assert_eq!(config.provider.auth_url, "https://env.example.com/v3");
    }

    #[test]
    fn test_subscriber_config() {
        let logging = LoggingConfig {
            level: "info".into(),
            json_format: true,
        };
        let config = logging.subscriber_config(false);
        assert_eq!(config.level, Level::INFO);
        assert!(config.json_format);

        assert_eq!(logging.subscriber_config(true).level, Level::DEBUG);

        let bogus = LoggingConfig {
            level: "loud".into(),
            json_format: false,
        };
        assert_eq!(bogus.subscriber_config(false).level, Level::WARN);
    }
}
