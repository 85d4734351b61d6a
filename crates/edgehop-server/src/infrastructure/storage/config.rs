//! TOML-based configuration for the Edgehop server.
//!
//! Example:
//!
//! ```toml
//! [server]
//! name = "server"
//! bind_address = "0.0.0.0"
//! port = 50001
//! motion_deadband = 32
//!
//! [[screens]]
//! name = "server"
//!
//! [[screens]]
//! name = "ingrid"
//!
//! [[links]]
//! from = "server"
//! direction = "right"
//! to = "ingrid"
//!
//! [[links]]
//! from = "ingrid"
//! direction = "left"
//! to = "server"
//! ```
//!
//! Links are one-way on purpose: each `[[links]]` entry declares exactly
//! one edge, so asymmetric layouts are expressible.  Fields absent from
//! the file take the defaults below, which lets a bare `[server]` section
//! run a single-screen server.

use edgehop_core::domain::topology::{Direction, ScreenMap, TopologyError};
use edgehop_core::protocol::messages::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, IpAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not a valid IP address.
    #[error("invalid bind address \"{addr}\": {source}")]
    BadBindAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    /// A link names a side other than left/right/top/bottom.
    #[error("unknown link direction \"{0}\"")]
    BadDirection(String),

    /// A link violates the topology rules (self-loop, undeclared screen).
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub screens: Vec<ScreenEntry>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

/// The `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// The primary screen's name in the topology.
    #[serde(default = "default_name")]
    pub name: String,
    /// IP address to bind the listening socket to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP contact port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long to keep retrying when the port is already in use.
    #[serde(default = "default_bind_retry_timeout_secs")]
    pub bind_retry_timeout_secs: u64,
    /// Deadline for a client to complete the greeting exchange.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Pixel window for discarding warp-back motion artifacts right after
    /// a switch; 0 disables the heuristic.
    #[serde(default = "default_motion_deadband")]
    pub motion_deadband: i32,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One `[[screens]]` declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreenEntry {
    pub name: String,
}

/// One `[[links]]` declaration: a single directed edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkEntry {
    pub from: String,
    pub direction: String,
    pub to: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_name() -> String {
    "server".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind_retry_timeout_secs() -> u64 {
    300
}
fn default_handshake_timeout_secs() -> u64 {
    30
}
fn default_motion_deadband() -> i32 {
    32
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            bind_address: default_bind_address(),
            port: default_port(),
            bind_retry_timeout_secs: default_bind_retry_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            motion_deadband: default_motion_deadband(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BadBindAddress`] when the string is not an
    /// IP address.
    pub fn bind_address(&self) -> Result<IpAddr, ConfigError> {
        self.server.bind_address.parse().map_err(|source| ConfigError::BadBindAddress {
            addr: self.server.bind_address.clone(),
            source,
        })
    }

    /// Builds the validated topology map from the declared screens and
    /// links.  The primary screen is declared implicitly when the file
    /// omits it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BadDirection`] or [`ConfigError::Topology`]
    /// for invalid links.
    pub fn build_map(&self) -> Result<ScreenMap, ConfigError> {
        let mut map = ScreenMap::new();
        for screen in &self.screens {
            map.add_screen(&screen.name);
        }
        if !map.contains(&self.server.name) {
            debug!("declaring primary screen \"{}\" implicitly", self.server.name);
            map.add_screen(&self.server.name);
        }
        for link in &self.links {
            let dir = parse_direction(&link.direction)?;
            map.connect(&link.from, dir, &link.to)?;
        }
        Ok(map)
    }
}

fn parse_direction(s: &str) -> Result<Direction, ConfigError> {
    match s {
        "left" => Ok(Direction::Left),
        "right" => Ok(Direction::Right),
        "top" => Ok(Direction::Top),
        "bottom" => Ok(Direction::Bottom),
        other => Err(ConfigError::BadDirection(other.to_string())),
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory
/// cannot be determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("edgehop.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the configuration from `path`, or from the platform default
/// location when `path` is `None`.  A missing file yields the defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no config at {}; using defaults", path.display());
            Ok(AppConfig::default())
        }
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Resolves the platform config base directory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Edgehop"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h).join("Library").join("Application Support").join("Edgehop")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("edgehop"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
