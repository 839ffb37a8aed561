//! Shared library for the anime batch factory.
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration management
//! - Database access and the durable post queue
//! - In-flight task registry (single-flight per requester)
//! - Data models
//! - File path utilities
//! - Logging infrastructure

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod paths;
pub mod queue;
pub mod registry;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use logging::LogConfig;
pub use models::*;
pub use paths::WorkPaths;
pub use queue::PostQueue;
pub use registry::TaskRegistry;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
