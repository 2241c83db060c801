use anyhow::{bail, Context as _, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_PORT: u16 = 8000;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// Optional TOML config file — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP server port (default: 8000).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// SQLite connection string, e.g. "sqlite:///var/lib/taskd/tasks.db".
    database_url: Option<String>,
    /// Shared secret expected in the X-API-Key header on every task route.
    api_key: Option<String>,
    /// Log level filter string, e.g. "debug", "info,taskd=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured).
    log_format: Option<String>,
}

fn load_toml(path: &Path) -> Result<TomlConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Resolved server configuration, built once at startup and shared read-only
/// through `AppContext`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_address: String,
    /// SQLite connection string the storage pool opens at startup.
    pub database_url: String,
    /// Shared secret compared against the X-API-Key header by exact equality.
    pub api_key: String,
    pub log: String,
    /// "pretty" (default) | "json".
    pub log_format: String,
}

impl ServerConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file passed via `--config`
    ///   3. Built-in defaults
    ///
    /// Fails when `database_url` or `api_key` is unresolved after all layers,
    /// or when the config file cannot be read or parsed.
    pub fn new(
        port: Option<u16>,
        bind_address: Option<String>,
        database_url: Option<String>,
        api_key: Option<String>,
        log: Option<String>,
        config_file: Option<&Path>,
    ) -> Result<Self> {
        let toml = match config_file {
            Some(path) => load_toml(path)?,
            None => TomlConfig::default(),
        };

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let bind_address = bind_address
            .filter(|s| !s.is_empty())
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let log_format = std::env::var("TASKD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let Some(database_url) = database_url.filter(|s| !s.is_empty()).or(toml.database_url)
        else {
            bail!(
                "database URL not configured — set --database-url, TASKD_DATABASE_URL, \
                 or database_url in the config file"
            );
        };

        let Some(api_key) = api_key.filter(|s| !s.is_empty()).or(toml.api_key) else {
            bail!(
                "API key not configured — set --api-key, TASKD_API_KEY, \
                 or api_key in the config file"
            );
        };

        Ok(Self {
            port,
            bind_address,
            database_url,
            api_key,
            log,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn minimal(database_url: Option<&str>, api_key: Option<&str>) -> Result<ServerConfig> {
        ServerConfig::new(
            None,
            None,
            database_url.map(String::from),
            api_key.map(String::from),
            None,
            None,
        )
    }

    #[test]
    fn defaults_apply() {
        let config = minimal(Some("sqlite://tasks.db"), Some("secret")).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.log, "info");
    }

    #[test]
    fn missing_database_url_fails() {
        let err = minimal(None, Some("secret")).unwrap_err();
        assert!(err.to_string().contains("database URL"));
    }

    #[test]
    fn missing_api_key_fails() {
        let err = minimal(Some("sqlite://tasks.db"), None).unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn empty_api_key_fails() {
        let err = minimal(Some("sqlite://tasks.db"), Some("")).unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn toml_fills_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 9100\ndatabase_url = \"sqlite://from-toml.db\"\napi_key = \"toml-key\""
        )
        .unwrap();

        let config =
            ServerConfig::new(None, None, None, None, None, Some(file.path())).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.database_url, "sqlite://from-toml.db");
        assert_eq!(config.api_key, "toml-key");
    }

    #[test]
    fn cli_overrides_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 9100\ndatabase_url = \"sqlite://from-toml.db\"\napi_key = \"toml-key\""
        )
        .unwrap();

        let config = ServerConfig::new(
            Some(9200),
            None,
            Some("sqlite://from-cli.db".to_string()),
            Some("cli-key".to_string()),
            None,
            Some(file.path()),
        )
        .unwrap();
        assert_eq!(config.port, 9200);
        assert_eq!(config.database_url, "sqlite://from-cli.db");
        assert_eq!(config.api_key, "cli-key");
    }

    #[test]
    fn unparsable_config_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = ServerConfig::new(None, None, None, None, None, Some(file.path()))
            .unwrap_err();
        assert!(err.to_string().contains("parse"));
    }
}
