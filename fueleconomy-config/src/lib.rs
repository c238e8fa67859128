//! Configuration system for the fueleconomy dataset cache.
//!
//! This crate provides configuration loading, saving, and default values
//! for the dataset synchronizer. It includes:
//!
//! - The [`Config`] struct (dataset URL, target directory, HTTP limits)
//! - YAML persistence with atomic writes
//! - Typed [`ConfigError`] values for callers that want to match on failures

pub mod config;
pub mod defaults;
pub mod error;
mod persistence;

// Re-export main types for convenience
pub use config::Config;
pub use error::ConfigError;
