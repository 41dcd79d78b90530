//! Server module for Cronmesh
//!
//! Contains process wiring and the runtime loop.
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `validation`: Configuration validation
//! - `init_stores`: Job store and lock service construction
//! - `background_tasks`: Seeding and the scheduler loop
//! - `init`: Main initialization and run loop

mod background_tasks;
pub mod config;
mod init;
mod init_stores;
mod loader;
mod validation;

// Re-export public API
pub use init::{run, RunMode};
