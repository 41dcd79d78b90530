//! Configuration validation
//!
//! Hard errors for values the scheduler cannot run with, warnings for
//! deployments that will run but lose guarantees.

use super::config::{AppConfig, LockBackend};
use anyhow::{bail, Result};
use tracing::warn;

/// Validate configuration before wiring any backend
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let scheduler = &config.scheduler;

    if scheduler.tick_interval_secs == 0 {
        bail!("scheduler.tick_interval_secs must be at least 1");
    }
    if scheduler.lock_ttl_secs == 0 {
        bail!("scheduler.lock_ttl_secs must be at least 1");
    }
    if scheduler.max_concurrent == 0 {
        bail!("scheduler.max_concurrent must be at least 1");
    }

    if scheduler.lock_ttl_secs < scheduler.tick_interval_secs {
        warn!(
            lock_ttl_secs = scheduler.lock_ttl_secs,
            tick_interval_secs = scheduler.tick_interval_secs,
            "Lock TTL is shorter than the tick interval; a slow job may run on two instances"
        );
    }

    if scheduler.job_timeout_secs > scheduler.lock_ttl_secs {
        warn!(
            job_timeout_secs = scheduler.job_timeout_secs,
            lock_ttl_secs = scheduler.lock_ttl_secs,
            "Job timeout exceeds the lock TTL"
        );
    }

    for seed in &config.seed {
        if seed.name.trim().is_empty() {
            bail!("seed job names must not be empty");
        }
    }

    validate_production_config(config);
    Ok(())
}

/// Warn about settings that are unsafe for production deployments
fn validate_production_config(config: &AppConfig) {
    let is_production = std::env::var("CRONMESH_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false);

    if !is_production {
        return;
    }

    if config.scheduler.lock_backend == LockBackend::Memory {
        warn!(
            "WARNING: In-memory locks only exclude jobs within this process. \
             Running more than one instance will execute jobs more than once."
        );
    }

    if config.redis.url.starts_with("redis://") && !config.redis.url.contains('@') {
        warn!(
            "SECURITY WARNING: Redis connection appears to have no authentication in production. \
             Consider enabling Redis AUTH."
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::loader::parse_config;

    #[test]
    fn test_defaults_are_valid() {
        let config = parse_config("").unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_tick_rejected() {
        let config = parse_config("[scheduler]\ntick_interval_secs = 0").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = parse_config("[scheduler]\nlock_ttl_secs = 0").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = parse_config("[scheduler]\nmax_concurrent = 0").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_short_ttl_is_only_a_warning() {
        let config =
            parse_config("[scheduler]\ntick_interval_secs = 30\nlock_ttl_secs = 5").unwrap();
        assert!(validate_config(&config).is_ok());
    }
}
