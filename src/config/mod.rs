//! Application configuration.
//!
//! A single Config struct that can be loaded from YAML files or environment
//! variables.

#[cfg(feature = "aws")]
pub mod aws;

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "dynatables.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "DYNATABLES_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "DYNATABLES";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "DYNATABLES_LOG";

/// Default region when none is configured.
pub const DEFAULT_REGION: &str = "us-west-2";
/// Default port of the local store in testing mode.
pub const DEFAULT_LOCAL_PORT: u16 = 5000;
/// Reserved session table, never treated as an application table.
pub const DEFAULT_SESSION_TABLE: &str = "arc-sessions";
/// Token separating application scope from logical name in local table names.
pub const DEFAULT_STAGE_DELIMITER: &str = "-staging-";
/// Substring marking a table as belonging to a production stage.
pub const DEFAULT_PRODUCTION_MARKER: &str = "production";

/// Execution mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Running against a deployed stack; tables come from parameter lookup.
    #[default]
    Deployed,
    /// Running locally or under test; tables come from listing the store.
    Testing,
}

impl Mode {
    /// Whether this is the local mode that bypasses the client cache.
    pub fn is_local(&self) -> bool {
        matches!(self, Mode::Testing)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution mode signal.
    pub mode: Mode,
    /// Deployment identifier scoping remote discovery.
    pub deployment: Option<String>,
    /// AWS region.
    pub region: String,
    /// Port of the local store in testing mode.
    pub local_port: u16,
    /// Explicit store endpoint, overriding the mode default.
    pub endpoint_url: Option<String>,
    /// Table excluded from local discovery.
    pub session_table: String,
    /// Local naming convention delimiter.
    pub stage_delimiter: String,
    /// Local tables containing this marker are excluded.
    pub production_marker: String,
    /// Logical tables the application declares; each must be discovered.
    pub declared_tables: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            deployment: None,
            region: DEFAULT_REGION.to_string(),
            local_port: DEFAULT_LOCAL_PORT,
            endpoint_url: None,
            session_table: DEFAULT_SESSION_TABLE.to_string(),
            stage_delimiter: DEFAULT_STAGE_DELIMITER.to_string(),
            production_marker: DEFAULT_PRODUCTION_MARKER.to_string(),
            declared_tables: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `dynatables.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("declared_tables")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        Ok(config)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self {
            mode: Mode::Testing,
            ..Self::default()
        }
    }

    /// Store endpoint implied by this config, if not the provider default.
    pub fn store_endpoint(&self) -> Option<String> {
        match (&self.endpoint_url, self.mode) {
            (Some(url), _) => Some(url.clone()),
            (None, Mode::Testing) => Some(format!("http://localhost:{}", self.local_port)),
            (None, Mode::Deployed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.mode, Mode::Deployed);
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.local_port, 5000);
        assert_eq!(config.session_table, "arc-sessions");
        assert!(config.declared_tables.is_empty());
    }

    #[test]
    fn test_store_endpoint_by_mode() {
        assert_eq!(Config::default().store_endpoint(), None);
        assert_eq!(
            Config::for_test().store_endpoint().as_deref(),
            Some("http://localhost:5000")
        );

        let config = Config {
            endpoint_url: Some("http://dynamo:8000".to_string()),
            ..Config::default()
        };
        assert_eq!(config.store_endpoint().as_deref(), Some("http://dynamo:8000"));
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let yaml = "mode: testing\n\
                    deployment: shop-stack\n\
                    local_port: 6000\n\
                    declared_tables:\n  - orders\n  - carts";
        writeln!(file, "{}", yaml).unwrap();

        let config = Config::load(file.path().to_str()).unwrap();
        assert_eq!(config.mode, Mode::Testing);
        assert_eq!(config.deployment.as_deref(), Some("shop-stack"));
        assert_eq!(config.local_port, 6000);
        assert_eq!(config.declared_tables, vec!["orders", "carts"]);
        assert_eq!(config.region, "us-west-2");
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        std::env::set_var("DYNATABLES_DEPLOYMENT", "env-stack");
        std::env::set_var("DYNATABLES_DECLARED_TABLES", "orders,carts");

        let config = Config::load(None);

        std::env::remove_var("DYNATABLES_DEPLOYMENT");
        std::env::remove_var("DYNATABLES_DECLARED_TABLES");

        let config = config.unwrap();
        assert_eq!(config.deployment.as_deref(), Some("env-stack"));
        assert_eq!(config.declared_tables, vec!["orders", "carts"]);
    }
}
