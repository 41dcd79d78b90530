//! Configuration loading
//!
//! Handles loading configuration from embedded defaults, files, and environment.

use super::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../config/default.toml");

/// Load configuration from files and environment
pub fn load_config() -> Result<AppConfig> {
    let env_name = std::env::var("CRONMESH_ENV").unwrap_or_else(|_| "development".to_string());

    let config = Config::builder()
        // 1. Embedded defaults (always available)
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        // 2. External overrides (optional)
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
        .add_source(File::with_name("config/local").required(false))
        // 3. Environment variables (highest priority)
        // prefix_separator("_") makes CRONMESH_SCHEDULER__X work; config 0.14
        // otherwise expects CRONMESH__SCHEDULER__X.
        .add_source(
            Environment::with_prefix("CRONMESH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    config
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

/// Parse a single TOML document on top of the embedded defaults
#[cfg(test)]
pub fn parse_config(overrides: &str) -> Result<AppConfig> {
    Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::from_str(overrides, FileFormat::Toml))
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::LockBackend;

    #[test]
    fn test_embedded_defaults() {
        let config = parse_config("").unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.tick_interval_secs, 10);
        assert_eq!(config.scheduler.lock_ttl_secs, 10);
        assert_eq!(config.scheduler.lock_backend, LockBackend::Redis);
        assert_eq!(config.scheduler.max_concurrent, 1);
        assert_eq!(config.scheduler.job_timeout_secs, 0);

        let names: Vec<&str> = config.seed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Send Email", "Database Backup"]);
    }

    #[test]
    fn test_overrides_apply() {
        let config = parse_config(
            r#"
            [scheduler]
            tick_interval_secs = 5
            lock_backend = "memory"
            max_concurrent = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.tick_interval_secs, 5);
        assert_eq!(config.scheduler.lock_backend, LockBackend::Memory);
        assert_eq!(config.scheduler.max_concurrent, 4);
        // Untouched keys keep their defaults
        assert_eq!(config.scheduler.lock_ttl_secs, 10);
    }

    #[test]
    fn test_unknown_lock_backend_rejected() {
        let result = parse_config(
            r#"
            [scheduler]
            lock_backend = "zookeeper"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_engine_config_mapping() {
        let config = parse_config("[scheduler]\njob_timeout_secs = 30").unwrap();
        let engine = config.scheduler.engine_config();
        assert_eq!(engine.tick_interval_secs, 10);
        assert_eq!(engine.job_timeout_secs, 30);
    }
}
