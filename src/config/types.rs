use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::storage::StorageConfig;

/// Prefix for environment overrides, e.g. `AUTHSHELL_API__BASE_URL`.
pub const ENV_PREFIX: &str = "AUTHSHELL_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: remote API, session storage and logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the remote API lives and how the client treats it.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ApiConfig {
    /// Base URL every request path is appended to, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    /// Upper bound for a single refresh call.
    #[serde(default = "default_refresh_timeout_in_ms")]
    pub refresh_timeout_in_ms: u64,
    /// Location of the login entry point used for hard redirects.
    #[serde(default = "default_login_entry")]
    pub login_entry: String,
    /// Where the OAuth sign-in starts. A path is resolved against the origin of
    /// `base_url`; an absolute URL is used as-is.
    #[serde(default = "default_oauth_entry")]
    pub oauth_entry: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_timeout_in_ms: default_refresh_timeout_in_ms(),
            login_entry: default_login_entry(),
            oauth_entry: default_oauth_entry(),
        }
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_in_ms)
    }
}

fn default_refresh_timeout_in_ms() -> u64 {
    5000
}

fn default_login_entry() -> String {
    "/login".to_string()
}

fn default_oauth_entry() -> String {
    "/oauth2/authorization/google".to_string()
}

/// Load config from a YAML file, letting `AUTHSHELL_*` environment variables override it.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigV1, figment::Error> {
    let figment = Figment::new()
        .merge(Yaml::file(path.as_ref()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    extract(figment)
}

/// Parse a config from an in-memory YAML document (no environment overrides).
pub fn parse_config(yaml: &str) -> Result<ConfigV1, figment::Error> {
    extract(Figment::new().merge(Yaml::string(yaml)))
}

fn extract(figment: Figment) -> Result<ConfigV1, figment::Error> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
    // handle configuration migration between versions here when necessary
}

/// Render the JSON schema for the configuration.
pub fn schema_json() -> Result<String, serde_json::Error> {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
version: "1.0.0"
api:
  base_url: "http://localhost:8080/api"
  refresh_timeout_in_ms: 1500
  login_entry: "/signin"
storage:
  type: file
  path: "/tmp/session.json"
logging:
  level: "debug"
  format: "json"
"#;
        let config = parse_config(yaml).expect("config should parse");
        assert_eq!(config.api.base_url, "http://localhost:8080/api");
        assert_eq!(config.api.refresh_timeout(), Duration::from_millis(1500));
        assert_eq!(config.api.login_entry, "/signin");
        match config.storage {
            StorageConfig::File(file) => assert_eq!(file.path, "/tmp/session.json"),
            other => panic!("unexpected storage config: {:?}", other),
        }
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_defaults_apply() {
        let yaml = r#"
version: "1.0.0"
api:
  base_url: "http://api.local"
"#;
        let config = parse_config(yaml).expect("config should parse");
        assert_eq!(config.api.refresh_timeout_in_ms, 5000);
        assert_eq!(config.api.login_entry, "/login");
        assert_eq!(config.api.oauth_entry, "/oauth2/authorization/google");
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "console");
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let yaml = r#"
version: "0.9.0"
api:
  base_url: "http://api.local"
"#;
        assert!(parse_config(yaml).is_err());
    }

    #[test]
    fn test_schema_mentions_sections() {
        let schema = schema_json().expect("schema should serialize");
        assert!(schema.contains("base_url"));
        assert!(schema.contains("refresh_timeout_in_ms"));
    }
}
