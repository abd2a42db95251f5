//! Configuration Loader - File Loading, Env Overrides and Validation
//!
//! Handles loading `config.toml`, layering environment overrides on top,
//! validating all parameters, and providing clear error messages for
//! misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "INTEL_CONFIG";

/// Load configuration from the file named by `INTEL_CONFIG`
/// (default `config.toml`) plus the process environment.
///
/// # Errors
/// See [`load_config`].
pub fn load_from_env() -> Result<AppConfig> {
  let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".to_string());
  load_config(&path, |key| std::env::var(key).ok())
}

/// Load, override and validate configuration.
///
/// A missing file falls back to defaults; `env` is consulted for each
/// override variable.
///
/// # Errors
/// Returns detailed error if:
/// - The file exists but can't be read or parsed
/// - An override variable holds an unparseable value
/// - Validation rules are violated
pub fn load_config<F>(path: &str, env: F) -> Result<AppConfig>
where
  F: Fn(&str) -> Option<String>,
{
  let path = Path::new(path);

  let mut config = if path.exists() {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
      .with_context(|| format!("Failed to parse {}", path.display()))?
  } else {
    AppConfig::default()
  };

  apply_env(&mut config, env)?;
  validate_config(&config)?;

  info!(
    file = %path.display(),
    environment = %config.server.environment,
    backend = ?config.database.backend,
    port = config.server.port,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Layer environment overrides on top of file values.
fn apply_env<F>(config: &mut AppConfig, env: F) -> Result<()>
where
  F: Fn(&str) -> Option<String>,
{
  let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

  if let Some(uri) = var("CONNECTION_STRING") {
    config.database.connection_string = uri;
  }
  if let Some(name) = var("DATABASE_NAME") {
    config.database.name = name;
  }
  if let Some(backend) = var("STORE_BACKEND") {
    config.database.backend = backend.parse()?;
  }
  if let Some(port) = var("PORT") {
    config.server.port = port
      .trim()
      .parse()
      .with_context(|| format!("PORT must be a valid port number, got '{port}'"))?;
  }
  if let Some(host) = var("HOST") {
    config.server.host = host;
  }
  if let Some(origins) = var("ALLOWED_ORIGINS") {
    config.server.allowed_origins = origins
      .split(',')
      .map(str::trim)
      .filter(|o| !o.is_empty())
      .map(str::to_string)
      .collect();
  }
  if let Some(environment) = var("APP_ENV") {
    config.server.environment = environment.parse()?;
  }
  if let Some(level) = var("LOG_LEVEL") {
    config.logging.level = level;
  }

  Ok(())
}

/// Validate all configuration parameters.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Server
  anyhow::ensure!(config.server.port > 0, "Server port must be non-zero");
  anyhow::ensure!(!config.server.host.is_empty(), "Server host must not be empty");

  // Database
  let db = &config.database;
  if db.backend == super::StoreBackend::Mongodb {
    anyhow::ensure!(
      !db.connection_string.trim().is_empty(),
      "CONNECTION_STRING must be set for the mongodb backend"
    );
  }
  anyhow::ensure!(!db.name.is_empty(), "Database name must not be empty");
  anyhow::ensure!(!db.collection.is_empty(), "Collection name must not be empty");
  anyhow::ensure!(db.max_pool_size > 0, "max_pool_size must be positive");
  anyhow::ensure!(
    db.min_pool_size <= db.max_pool_size,
    "min_pool_size ({}) must not exceed max_pool_size ({})",
    db.min_pool_size,
    db.max_pool_size
  );

  // Retry
  let retry = &db.connect_retry;
  anyhow::ensure!(retry.max_attempts >= 1, "connect_retry.max_attempts must be at least 1");
  anyhow::ensure!(
    retry.multiplier.is_finite() && retry.multiplier >= 1.0,
    "connect_retry.multiplier must be >= 1.0, got {}",
    retry.multiplier
  );
  anyhow::ensure!(
    retry.initial_delay_ms <= retry.max_delay_ms,
    "connect_retry.initial_delay_ms must not exceed max_delay_ms"
  );

  // Rate limits
  let limits = &config.rate_limits;
  anyhow::ensure!(limits.window_seconds > 0, "rate_limits.window_seconds must be positive");
  anyhow::ensure!(
    limits.read_max > 0 && limits.write_max > 0 && limits.general_max > 0,
    "Rate limit maxima must be positive"
  );

  Ok(())
}
