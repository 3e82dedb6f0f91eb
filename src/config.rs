//! Configuration for AtlasID
//!
//! Centralized configuration with sensible defaults. A config can be built
//! in code with [`Config::builder`] or loaded from a TOML file with
//! [`Config::from_file`]; keys missing from the file keep their defaults.
//!
//! ```toml
//! listen_addr = "0.0.0.0:6389"
//! database_path = "/var/lib/atlasid/atlasid.db"
//! batch_size = 2000
//! log_level = "info"
//! log_path = "/var/log/atlasid"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AtlasError, Result};
use crate::sequence::DEFAULT_BATCH_SIZE;

/// Database path that selects a private in-memory SQLite database
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// File name of the server log inside `log_path`
pub const LOG_FILE_NAME: &str = "atlasid.log";

/// Main configuration for an AtlasID instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// SQLite database file holding the catalog and counter tables
    pub database_path: PathBuf,

    // -------------------------------------------------------------------------
    // Sequence Configuration
    // -------------------------------------------------------------------------
    /// Number of ids reserved from the store per refill
    pub batch_size: i64,

    // -------------------------------------------------------------------------
    // Logging Configuration
    // -------------------------------------------------------------------------
    /// Default `tracing` filter directive when `RUST_LOG` is unset
    pub log_level: String,

    /// Directory for the server log file; unset logs to stdout
    pub log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6389".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            database_path: PathBuf::from("./atlasid.db"),
            batch_size: DEFAULT_BATCH_SIZE,
            log_level: "info,atlasid=debug".to_string(),
            log_path: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a config from a TOML file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            AtlasError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(raw).map_err(|e| AtlasError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the server relies on
    pub fn validate(&self) -> Result<()> {
        if self.batch_size <= 0 {
            return Err(AtlasError::Config(format!(
                "batch_size must be positive, got {}",
                self.batch_size
            )));
        }
        if self.max_connections == 0 {
            return Err(AtlasError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.listen_addr.is_empty() {
            return Err(AtlasError::Config("listen_addr is empty".to_string()));
        }
        Ok(())
    }

    /// Log file the server appends to, if file logging is enabled
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_path.as_ref().map(|dir| dir.join(LOG_FILE_NAME))
    }

    /// Whether the database lives only in memory
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_DATABASE
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing config (e.g. one loaded from a file)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the SQLite database path (`:memory:` for an in-memory database)
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Set the per-refill reservation size
    pub fn batch_size(mut self, batch: i64) -> Self {
        self.config.batch_size = batch;
        self
    }

    /// Set the default log filter
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Log to a file in this directory instead of stdout
    pub fn log_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_path = Some(dir.into());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
