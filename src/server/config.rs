//! Server configuration types
//!
//! Mirrors the sections of `config/default.toml`.

use cronmesh_core::SchedulerConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub scheduler: SchedulerAppConfig,
    #[serde(default)]
    pub seed: Vec<SeedJob>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Job store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Where job locks live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockBackend {
    /// Shared Redis keyspace (multi-instance)
    #[default]
    Redis,
    /// In-process map (single instance only)
    Memory,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerAppConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,
    #[serde(default)]
    pub lock_backend: LockBackend,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default)]
    pub job_timeout_secs: u64,
}

impl Default for SchedulerAppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_secs: default_tick_interval(),
            lock_ttl_secs: default_lock_ttl(),
            lock_backend: LockBackend::default(),
            max_concurrent: default_max_concurrent(),
            job_timeout_secs: 0,
        }
    }
}

impl SchedulerAppConfig {
    /// Engine configuration for these settings
    pub fn engine_config(&self) -> SchedulerConfig {
        SchedulerConfig::new()
            .with_tick_interval(self.tick_interval_secs)
            .with_lock_ttl(self.lock_ttl_secs)
            .with_max_concurrent(self.max_concurrent)
            .with_job_timeout(self.job_timeout_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    10
}

fn default_lock_ttl() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    1
}

/// Job inserted at start-up unless one with the same name exists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedJob {
    pub name: String,
    pub cron_schedule: String,
}
