//! Common types, errors, and configuration for the workbench.
//!
//! This crate provides shared functionality used across the workspace:
//! - Error types using `thiserror` for type-safe error handling
//! - Configuration structures for the engine, runtime and remote service
//! - TOML configuration file loading

pub mod config;
pub mod config_file;
pub mod error;

pub use config::{
    EmbeddedRuntimeConfig, EngineConfig, ExecutionConfig, RemoteConfig, RemoteTarget,
    WorkbenchConfig,
};
pub use config_file::{ConfigFile, ConfigFileError, ServerConfigFile};
pub use error::{EngineError, RemoteError, RuntimeLoadError};
