//! Configuration management for the session registry
//!
//! Loads settings from TOML file at ~/.session-registry/config.toml

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend: "db" (SQLite) or "ephemeral" (in-memory)
    #[serde(default)]
    pub storage: Storage,

    /// Session lifecycle behaviour
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Data directory (defaults to ~/.session-registry)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".session-registry"))
        .unwrap_or_else(|| PathBuf::from(".session-registry"))
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// SQLite file under the data directory
    #[default]
    Db,
    /// Volatile in-memory map, lost on restart
    Ephemeral,
}

impl Storage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Storage::Db => "db",
            Storage::Ephemeral => "ephemeral",
        }
    }
}

impl std::str::FromStr for Storage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "db" | "sqlite" => Ok(Storage::Db),
            "ephemeral" | "memory" => Ok(Storage::Ephemeral),
            other => Err(CoreError::Config(format!(
                "Unknown storage backend: {} (expected \"db\" or \"ephemeral\")",
                other
            ))),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 0.0.0.0, clients register from other machines)
    #[serde(default = "default_host")]
    pub host: String,

    /// Take the caller address from the last X-Forwarded-For entry, the one
    /// appended by the proxy in front of us. Earlier entries come from the
    /// client and are ignored. Only enable behind exactly one reverse proxy.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            trust_forwarded_for: false,
        }
    }
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// IANA timezone used to stamp createdAt/updatedAt
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Reject refresh/logout for unknown session ids instead of acknowledging them
    #[serde(default)]
    pub strict_updates: bool,
}

fn default_timezone() -> String {
    "America/Mexico_City".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            timezone: default_timezone(),
            strict_updates: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            storage: Storage::default(),
            registry: RegistryConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(CoreError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        default_data_dir().join("config.toml")
    }

    /// Get the data directory, expanding ~ if present
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    /// Resolve the server socket address. A host that doesn't resolve is a
    /// configuration error rather than a silent bind to every interface.
    pub fn server_addr(&self) -> Result<SocketAddr> {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| {
                CoreError::Config(format!(
                    "Server host does not resolve: {}",
                    self.server.host
                ))
            })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SESSION_REGISTRY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SESSION_REGISTRY_PORT") {
            self.server.port = port.parse().map_err(|_| {
                CoreError::Config(format!("SESSION_REGISTRY_PORT is not a port: {}", port))
            })?;
        }
        if let Ok(storage) = std::env::var("SESSION_REGISTRY_STORAGE") {
            self.storage = storage.parse()?;
        }
        if let Ok(data_dir) = std::env::var("SESSION_REGISTRY_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        Ok(())
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# Session Registry Configuration

# Storage backend
# "db"        = SQLite file in data_dir (persistent)
# "ephemeral" = in-memory only, lost on restart
storage = "db"

# data_dir = "~/.session-registry"

[server]
# Port to listen on (default: 3000)
port = 3000

# Host to bind to
host = "0.0.0.0"

# Use the last X-Forwarded-For entry (appended by the proxy) as the client
# address. Entries before it are client-supplied and ignored.
# Only enable behind a single trusted reverse proxy.
trust_forwarded_for = false

[registry]
# Timezone used for createdAt / updatedAt
timezone = "America/Mexico_City"

# false: /update and /logout acknowledge unknown session ids
# true:  they answer 404 instead
strict_updates = false
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
