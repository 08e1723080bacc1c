//! Configuration management for the toolbox.
//!
//! [`ToolboxConfig`] is read from an optional TOML file and then adjusted by
//! `TOOLBOX_*` environment variables. Every section has defaults, so an empty
//! file (or no file at all) yields a working configuration.

#![warn(missing_docs, clippy::pedantic)]

use std::path::PathBuf;

use thiserror::Error;

pub mod loader;
pub mod schema;

pub use loader::{BIND_ENV, DELAY_MAX_ENV, LOG_ENV, OVERRIDE_ENVS, PLACEHOLDERS_ENV};
pub use schema::{
    AwsSettings, GcpSettings, LoggingConfig, ServerConfig, ToolboxConfig, ToolsConfig,
};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The TOML document did not match the schema.
    #[error("failed to parse config{}: {source}", origin_suffix(.path.as_ref()))]
    Parse {
        /// File the document came from, if any.
        path: Option<PathBuf>,
        /// Underlying parser failure.
        #[source]
        source: toml::de::Error,
    },
    /// An environment override carried an unusable value.
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidOverride {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Why it was refused.
        reason: String,
    },
    /// The merged configuration violates a constraint.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Violated constraint.
        reason: String,
    },
}

fn origin_suffix(path: Option<&PathBuf>) -> String {
    path.map(|path| format!(" {}", path.display()))
        .unwrap_or_default()
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
