//! Configuration Module - TOML-based Service Configuration
//!
//! Loads configuration from an optional `config.toml` and applies
//! environment overrides (`CONNECTION_STRING`, `PORT`, `APP_ENV`, ...).
//! Every field carries a default so the service boots with no file.
//! Connection strings and origins are externalized here, never
//! hardcoded in the domain layer.

pub mod loader;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// HTTP listener and runtime environment.
  pub server: ServerConfig,
  /// Report store backend and connection pool.
  pub database: DatabaseConfig,
  /// Per-IP request budgets.
  pub rate_limits: RateLimitConfig,
  /// Log level and format.
  pub logging: LoggingConfig,
}

/// Runtime environment. Controls whether error details reach clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Development,
  Production,
  Test,
}

impl Environment {
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Development => "development",
      Self::Production => "production",
      Self::Test => "test",
    }
  }

  /// Whether underlying error text is attached to error responses.
  pub const fn exposes_error_detail(self) -> bool {
    matches!(self, Self::Development)
  }
}

impl fmt::Display for Environment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Environment {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "development" | "dev" => Ok(Self::Development),
      "production" | "prod" => Ok(Self::Production),
      "test" => Ok(Self::Test),
      other => anyhow::bail!("Unknown environment '{other}' (expected development, production or test)"),
    }
  }
}

/// Which `ReportStore` implementation backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
  #[default]
  Mongodb,
  Memory,
}

impl FromStr for StoreBackend {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "mongodb" | "mongo" => Ok(Self::Mongodb),
      "memory" => Ok(Self::Memory),
      other => anyhow::bail!("Unknown store backend '{other}' (expected mongodb or memory)"),
    }
  }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  /// Bind host.
  pub host: String,
  /// Bind port.
  pub port: u16,
  /// Origins allowed by CORS.
  pub allowed_origins: Vec<String>,
  /// Runtime environment.
  pub environment: Environment,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: "0.0.0.0".to_string(),
      port: 3000,
      allowed_origins: vec!["http://localhost:3000".to_string()],
      environment: Environment::Development,
    }
  }
}

/// Report store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  /// Store backend.
  pub backend: StoreBackend,
  /// MongoDB connection string.
  pub connection_string: String,
  /// Database name.
  pub name: String,
  /// Collection holding reports.
  pub collection: String,
  /// Connections kept open while idle.
  pub min_pool_size: u32,
  /// Upper bound on pooled connections.
  pub max_pool_size: u32,
  /// Idle connection reclaim (seconds).
  pub max_idle_seconds: u64,
  /// Server selection timeout (milliseconds).
  pub server_selection_timeout_ms: u64,
  /// Startup connection retry budget.
  pub connect_retry: RetryConfig,
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      backend: StoreBackend::Mongodb,
      connection_string: "mongodb://localhost:27017".to_string(),
      name: "intelligence_unit".to_string(),
      collection: "intel_reports".to_string(),
      min_pool_size: 1,
      max_pool_size: 10,
      max_idle_seconds: 30,
      server_selection_timeout_ms: 5_000,
      connect_retry: RetryConfig::default(),
    }
  }
}

/// Exponential backoff parameters for the startup connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  /// Total attempts including the first.
  pub max_attempts: u32,
  /// Delay before the second attempt (milliseconds).
  pub initial_delay_ms: u64,
  /// Growth factor applied after each failed attempt.
  pub multiplier: f64,
  /// Ceiling on a single delay (milliseconds).
  pub max_delay_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: 5,
      initial_delay_ms: 500,
      multiplier: 2.0,
      max_delay_ms: 10_000,
    }
  }
}

/// Per-IP rate limits. Each tier allows `*_max` requests per window.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
  /// Window length (seconds).
  pub window_seconds: u64,
  /// GET requests.
  pub read_max: u32,
  /// POST, PUT, PATCH and DELETE requests.
  pub write_max: u32,
  /// Everything else.
  pub general_max: u32,
}

impl Default for RateLimitConfig {
  fn default() -> Self {
    Self {
      window_seconds: 15 * 60,
      read_max: 200,
      write_max: 25,
      general_max: 100,
    }
  }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Fallback filter when `RUST_LOG` is unset.
  pub level: String,
  /// JSON output (false = human-readable text).
  pub json: bool,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      json: true,
    }
  }
}
