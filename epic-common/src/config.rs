//! Configuration loading and root folder resolution
//!
//! Bootstrap settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file (`epic.toml`)
//! 4. OS-dependent compiled default (fallback)
//!
//! Runtime settings (report title etc.) live in the database `settings` table.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "EPIC_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "EPIC_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "epic.db";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5800;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl ServerConfig {
    /// Resolve configuration from CLI, environment, TOML file and defaults
    ///
    /// A missing config file is not an error; an unreadable or malformed one
    /// logs a warning and falls back to defaults.
    pub fn resolve(cli: CliOverrides) -> Self {
        let toml_config = match config_file_path() {
            Some(path) if path.exists() => match TomlConfig::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Ignoring config file: {}", e);
                    TomlConfig::default()
                }
            },
            _ => TomlConfig::default(),
        };

        Self::resolve_with(cli, &toml_config)
    }

    /// Resolve configuration against an already loaded TOML config
    pub fn resolve_with(cli: CliOverrides, toml_config: &TomlConfig) -> Self {
        let root_folder = cli
            .root_folder
            .or_else(|| std::env::var(ROOT_FOLDER_ENV).ok().map(PathBuf::from))
            .or_else(|| toml_config.root_folder.clone())
            .unwrap_or_else(default_root_folder);

        let host = cli
            .host
            .or_else(|| toml_config.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

        Self {
            root_folder,
            host,
            port,
            log_level: toml_config.logging.level.clone(),
        }
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Create the root folder if needed
    pub fn ensure_root_folder(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }
}

/// Location of the TOML config file
///
/// `EPIC_CONFIG` wins; otherwise `<config dir>/epic/epic.toml`, and on Linux
/// `/etc/epic/epic.toml` as a system-wide fallback.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("epic").join("epic.toml"));
    if let Some(path) = &user_config {
        if path.exists() {
            return user_config;
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/epic/epic.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    user_config
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/epic (or /var/lib/epic for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("epic"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/epic"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("epic"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/epic"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("epic"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\epic"))
    } else {
        PathBuf::from("./epic_data")
    }
}
