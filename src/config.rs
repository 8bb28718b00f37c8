use crate::connection::ConnectionParams;
use crate::pool::config::DEFAULT_MAX_CONNECTIONS;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "DOCGUARD";

/// Database section of the configuration
///
/// ```toml
/// [database]
/// host = "localhost"
/// port = 28015
/// database = "app"
/// auth_key = ""
/// max_connections = 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub auth_key: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_host() -> String {
    ConnectionParams::default().host
}

fn default_port() -> u16 {
    ConnectionParams::default().port
}

fn default_database() -> String {
    ConnectionParams::default().database
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            auth_key: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// Load the database configuration from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // The file existed but could not be read or parsed
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    log::warn!(
                        "failed to load {}, falling back to env: {}",
                        DEFAULT_CONFIG_FILE,
                        err
                    );
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        Self::from_settings(&settings)
    }

    /// Load the database configuration from an explicit file (format taken from its extension)
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?;
        Self::from_settings(&settings)
    }

    fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<DatabaseConfig>("database") {
            Ok(config) => Ok(config),
            // No section at all: run on defaults
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Database configuration could not be loaded from file or environment: {}",
                e
            ))),
        }
    }

    /// Parameters for opening connections
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            auth_key: self.auth_key.clone(),
        }
    }
}
