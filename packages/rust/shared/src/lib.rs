//! Shared types, error model, and configuration for Batchline.
//!
//! This crate is the foundation depended on by all other Batchline crates.
//! It provides:
//! - [`BatchlineError`] — the unified error type
//! - Domain types ([`Employee`], [`NewEmployee`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, JobConfig, StorageConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{BatchlineError, Result};
pub use types::{Employee, NewEmployee, demo_employees};
