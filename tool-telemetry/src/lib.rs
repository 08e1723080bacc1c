//! Observability utilities for the toolbox.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;

pub mod tracing_support {
    //! Structured tracing helpers.

    use tool_config::LoggingConfig;
    use tool_primitives::Environment;
    use tracing_subscriber::EnvFilter;

    use crate::{TelemetryError, TelemetryResult};

    /// Variable that overrides the configured filter.
    pub const RUST_LOG_ENV: &str = "RUST_LOG";

    /// Builds the event filter: `RUST_LOG` when set, otherwise `config.filter`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFilter`] for an unparseable directive.
    pub fn build_filter(config: &LoggingConfig, env: &dyn Environment) -> TelemetryResult<EnvFilter> {
        let directives = env
            .first_of(&[RUST_LOG_ENV])
            .unwrap_or_else(|| config.filter.clone());
        EnvFilter::try_new(&directives).map_err(|err| TelemetryError::InvalidFilter {
            directives,
            reason: err.to_string(),
        })
    }

    /// Installs the global `fmt` subscriber.
    ///
    /// # Errors
    ///
    /// Fails on a bad filter or when a global subscriber is already set.
    pub fn init(config: &LoggingConfig, env: &dyn Environment) -> TelemetryResult<()> {
        let filter = build_filter(config, env)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.with_target)
            .with_level(true)
            .try_init()
            .map_err(|err| TelemetryError::AlreadyInitialised(err.to_string()))
    }
}

pub mod health {
    //! Health reporting utilities.

    use std::time::Instant;

    use serde::Serialize;

    /// Body of `GET /health`.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct HealthReport {
        /// Always `"ok"` while the process serves requests.
        pub status: &'static str,
        /// Server version.
        pub version: &'static str,
        /// Number of registered tools.
        pub tools: usize,
        /// Seconds since the monitor was created.
        pub uptime_secs: u64,
    }

    /// Tracks process start for health reports.
    #[derive(Clone, Copy, Debug)]
    pub struct HealthMonitor {
        started: Instant,
        version: &'static str,
    }

    impl HealthMonitor {
        /// Starts the uptime clock now.
        #[must_use]
        pub fn new(version: &'static str) -> Self {
            Self {
                started: Instant::now(),
                version,
            }
        }

        /// Snapshot for a registry holding `tools` entries.
        #[must_use]
        pub fn report(&self, tools: usize) -> HealthReport {
            HealthReport {
                status: "ok",
                version: self.version,
                tools,
                uptime_secs: self.started.elapsed().as_secs(),
            }
        }
    }
}

/// Errors raised while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive did not parse.
    #[error("invalid log filter `{directives}`: {reason}")]
    InvalidFilter {
        /// Offending directive string.
        directives: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber was already installed.
    #[error("tracing subscriber already initialised: {0}")]
    AlreadyInitialised(String),
}

/// Convenience alias for telemetry results.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use tool_config::LoggingConfig;
    use tool_primitives::MapEnvironment;

    use super::health::HealthMonitor;
    use super::tracing_support::{RUST_LOG_ENV, build_filter};

    #[test]
    fn configured_filter_is_used_without_rust_log() {
        let config = LoggingConfig {
            filter: "warn,tool_dispatch=debug".into(),
            with_target: false,
        };
        let filter = build_filter(&config, &MapEnvironment::new()).unwrap();
        assert!(filter.to_string().contains("tool_dispatch=debug"));
    }

    #[test]
    fn rust_log_overrides_configuration() {
        let env = MapEnvironment::new().with(RUST_LOG_ENV, "trace");
        let filter = build_filter(&LoggingConfig::default(), &env).unwrap();
        assert_eq!(filter.to_string(), "trace");
    }

    #[test]
    fn health_report_serialises() {
        let report = HealthMonitor::new("1.2.3").report(4);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["version"], "1.2.3");
        assert_eq!(value["tools"], 4);
        assert!(value["uptime_secs"].is_u64());
    }
}
