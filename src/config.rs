use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DatadogMcpError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    Stdio,
    Http,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub mode: ServerMode,
    pub http_addr: Option<String>,
    pub http_port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::Stdio,
            http_addr: None,
            http_port: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatadogConfig {
    /// Datadog site the keys belong to, e.g. `datadoghq.com`, `datadoghq.eu`.
    pub site: String,
    /// Full base URL override; takes precedence over `site` when set.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub app_key: Option<String>,
    /// Deadline for the upstream call in milliseconds; `0` disables it.
    pub request_timeout_ms: u64,
}

impl Default for DatadogConfig {
    fn default() -> Self {
        Self {
            site: "datadoghq.com".to_string(),
            endpoint: None,
            api_key: None,
            app_key: None,
            request_timeout_ms: 30_000,
        }
    }
}

impl DatadogConfig {
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://api.{}", self.site),
        }
    }
}

/// What the tool serializes into its text payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadMode {
    /// The entire upstream response, pagination metadata included. Kept as
    /// the default so hosts that ignore `nextCursor` can still page.
    Full,
    /// Only the `data` array of log events.
    Entries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    pub payload: PayloadMode,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            payload: PayloadMode::Full,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub datadog: DatadogConfig,
    pub response: ResponseConfig,
}

impl Config {
    /// Load a YAML or JSON config file, picked by extension.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DatadogMcpError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        match ext {
            "yaml" | "yml" => serde_yaml::from_str(&raw)
                .map_err(|e| DatadogMcpError::Config(format!("invalid yaml config: {e}"))),
            "json" => serde_json::from_str(&raw)
                .map_err(|e| DatadogMcpError::Config(format!("invalid json config: {e}"))),
            other => Err(DatadogMcpError::Config(format!(
                "unsupported config format: {other:?} (expected .yaml, .yml or .json)"
            ))),
        }
    }

    /// Overlay the environment variables the hosted client reads. Set
    /// variables win over file values so deployments can keep credentials
    /// out of the config file.
    pub fn apply_env(&mut self) {
        if let Ok(key) = env::var("DD_API_KEY") {
            if !key.is_empty() {
                self.datadog.api_key = Some(key);
            }
        }
        if let Ok(key) = env::var("DD_APP_KEY") {
            if !key.is_empty() {
                self.datadog.app_key = Some(key);
            }
        }
        if let Ok(site) = env::var("DD_SITE") {
            if !site.is_empty() {
                self.datadog.site = site;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_stdio_and_primary_site() {
        let cfg = Config::default();
        assert_eq!(cfg.server.mode, ServerMode::Stdio);
        assert_eq!(cfg.datadog.site, "datadoghq.com");
        assert_eq!(cfg.datadog.request_timeout_ms, 30_000);
        assert_eq!(cfg.response.payload, PayloadMode::Full);
        assert_eq!(cfg.datadog.base_url(), "https://api.datadoghq.com");
    }

    #[test]
    fn load_yaml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "server:\n  mode: http\n  http_port: 8081\ndatadog:\n  site: datadoghq.eu\n  api_key: file-key\nresponse:\n  payload: entries\n",
        )
        .unwrap();

        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.server.mode, ServerMode::Http);
        assert_eq!(cfg.server.http_port, Some(8081));
        assert_eq!(cfg.datadog.site, "datadoghq.eu");
        assert_eq!(cfg.datadog.api_key.as_deref(), Some("file-key"));
        assert_eq!(cfg.datadog.base_url(), "https://api.datadoghq.eu");
        assert_eq!(cfg.response.payload, PayloadMode::Entries);
        // unset sections keep their defaults
        assert_eq!(cfg.datadog.request_timeout_ms, 30_000);
        assert!(cfg.server.http_addr.is_none());
    }

    #[test]
    fn load_json_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"server": {"mode": "both"}, "datadog": {"endpoint": "http://localhost:9999/"}}"#,
        )
        .unwrap();

        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.server.mode, ServerMode::Both);
        // trailing slash is stripped so URL joins stay predictable
        assert_eq!(cfg.datadog.base_url(), "http://localhost:9999");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mode = 'stdio'").unwrap();

        let err = Config::load_from_path(&path).unwrap_err().to_string();
        assert!(err.contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::load_from_path(Path::new("/does/not/exist.yaml"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("cannot read"));
    }
}
