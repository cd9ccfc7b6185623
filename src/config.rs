//! Configuration loading and constants.
//!
//! Both servers run with built-in defaults when no config file is given.
//! A TOML file may override any field; timeouts left unset are filled from
//! the server's [`Profile`]. `AppConfig` is the root configuration struct.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

// =============================================================================
// Listener Defaults
// =============================================================================

/// Default bind address (all interfaces, as inside a container)
pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";

/// Default listener port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Production listener: max time to receive request headers
pub const PRODUCTION_READ_TIMEOUT_SECS: u64 = 10;

/// Production listener: max time for a handler to produce its response
pub const PRODUCTION_WRITE_TIMEOUT_SECS: u64 = 10;

/// Production listener: max time a keep-alive connection waits for its next request
pub const PRODUCTION_IDLE_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Response Bodies
// =============================================================================

/// Body returned by every route of the SQLite server
pub const SQLITE_BANNER: &str = "✅ CGO-enabled Go app with SQLite running in Docker!\n";

/// First line of the production server's root response
pub const PRODUCTION_BANNER: &str = "✅ Hello from a production-optimized Go container!\n";

/// Second line of the production server's root response
pub const PRODUCTION_TAGLINE: &str = "📦 This image is minimal, secure, and fast.\n";

/// Body returned by the liveness probe
pub const HEALTH_BODY: &str = "OK";

// =============================================================================
// Profiling
// =============================================================================

/// CPU profile duration when `seconds` is missing or invalid
pub const DEFAULT_CPU_PROFILE_SECS: u64 = 30;

/// Trace capture duration when `seconds` is missing or invalid
pub const DEFAULT_TRACE_SECS: f64 = 1.0;

/// CPU sampling frequency in Hz
pub const CPU_PROFILE_FREQUENCY: i32 = 100;

/// Upper bound on events kept by a single trace capture
pub const MAX_TRACE_EVENTS: usize = 100_000;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default SQLite location (in-memory database)
pub const DEFAULT_DATABASE_LOCATION: &str = ":memory:";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "shipshape=info,sqlite_server=info,prod_server=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Which server the configuration is for. Decides the timeout defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Plain listener, no timeouts
    Sqlite,
    /// Hardened listener with read/write/idle timeouts
    Production,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub http: HttpServerConfig,
    /// SQLite settings (only read by the SQLite server)
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Seconds to wait for request headers. `0` disables.
    pub read_timeout_seconds: Option<u64>,
    /// Seconds a handler may take to respond. `0` disables.
    pub write_timeout_seconds: Option<u64>,
    /// Seconds a keep-alive connection may sit idle. Falls back to the read timeout.
    pub idle_timeout_seconds: Option<u64>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            read_timeout_seconds: None,
            write_timeout_seconds: None,
            idle_timeout_seconds: None,
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    /// Parse host and port into a bindable address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                ConfigError::Validation(format!(
                    "Invalid http.host or http.port '{}:{}': {}",
                    self.host, self.port, e
                ))
            })
    }

    /// Resolve configured seconds into listener timeouts
    pub fn timeouts(&self) -> Timeouts {
        let read = seconds(self.read_timeout_seconds);
        Timeouts {
            read,
            write: seconds(self.write_timeout_seconds),
            idle: seconds(self.idle_timeout_seconds).or(read),
        }
    }

    fn apply_profile(&mut self, profile: Profile) {
        if profile == Profile::Production {
            self.read_timeout_seconds
                .get_or_insert(PRODUCTION_READ_TIMEOUT_SECS);
            self.write_timeout_seconds
                .get_or_insert(PRODUCTION_WRITE_TIMEOUT_SECS);
            self.idle_timeout_seconds
                .get_or_insert(PRODUCTION_IDLE_TIMEOUT_SECS);
        }
    }
}

/// Zero and unset both mean "no timeout"
fn seconds(value: Option<u64>) -> Option<Duration> {
    value.filter(|s| *s > 0).map(Duration::from_secs)
}

/// Listener timeouts. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub read: Option<Duration>,
    pub write: Option<Duration>,
    pub idle: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// `:memory:` or a filesystem path
    #[serde(default = "DatabaseConfig::default_location")]
    pub location: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            location: Self::default_location(),
        }
    }
}

impl DatabaseConfig {
    fn default_location() -> String {
        DEFAULT_DATABASE_LOCATION.to_string()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }
}

impl AppConfig {
    /// Built-in configuration for a server profile
    pub fn for_profile(profile: Profile) -> Self {
        let mut config = Self::default();
        config.http.apply_profile(profile);
        config
    }

    /// Load configuration from an optional TOML file.
    ///
    /// Without a path the built-in defaults for `profile` are returned.
    pub fn load(path: Option<&Path>, profile: Profile) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::for_profile(profile));
        };

        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents, profile)
    }

    /// Parse configuration from TOML text and fill profile defaults
    pub fn from_toml(contents: &str, profile: Profile) -> Result<Self, ConfigError> {
        let mut config: AppConfig = toml::from_str(contents)?;
        config.http.apply_profile(profile);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.http.socket_addr()?;

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Unknown logging.format '{}', expected \"text\" or \"json\"",
                    other
                )))
            }
        }

        if self.database.location.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database.location must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
