//! Built-in tools served by the toolbox.
//!
//! [`register_builtins`] fills a [`ToolRegistry`] with every tool enabled by
//! the supplied [`ToolboxConfig`].

#![warn(missing_docs, clippy::pedantic)]

use std::sync::Arc;

use thiserror::Error;
use tool_config::ToolboxConfig;
use tool_credentials::CredentialError;
use tool_primitives::Environment;
use tool_registry::{RegistryError, ToolRegistry};
use tracing::info;

pub mod credentials;
pub mod delay;
pub mod env;
pub mod placeholder;

pub use credentials::{VerifyAnyCredentials, VerifyCredentials, aws_provider, gcp_provider};
pub use delay::Sleep;
pub use env::PrintEnv;

/// Tool names registered by [`register_builtins`].
pub mod names {
    /// Environment dump.
    pub const PRINT_ENV: &str = "print_env";
    /// AWS credential check.
    pub const VERIFY_AWS: &str = "verify_aws_credentials";
    /// GCP credential check.
    pub const VERIFY_GCP: &str = "verify_gcp_credentials";
    /// Credential check selected by a `provider` argument.
    pub const VERIFY_ANY: &str = "verify_credentials";
    /// Delay.
    pub const SLEEP: &str = "sleep";
    /// Search placeholder.
    pub const SEARCH: &str = "search";
    /// Fetch placeholder.
    pub const FETCH: &str = "fetch";
}

/// Errors raised while registering built-in tools.
#[derive(Debug, Error)]
pub enum BuiltinsError {
    /// A tool could not be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A credential provider rejected its configuration.
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Registers every built-in tool enabled by `config`.
///
/// Credential tools and `print_env` read from `env`.
///
/// # Errors
///
/// Fails on a duplicate tool name or an invalid provider endpoint.
pub fn register_builtins(
    registry: &mut ToolRegistry,
    config: &ToolboxConfig,
    env: Arc<dyn Environment>,
) -> Result<(), BuiltinsError> {
    env::register(registry, Arc::clone(&env))?;
    credentials::register(registry, config, env)?;
    delay::register(registry, &config.tools)?;
    if config.tools.placeholders {
        placeholder::register(registry)?;
    }

    info!(tools = registry.len(), "built-in tools registered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tool_primitives::MapEnvironment;

    use super::*;

    #[test]
    fn default_config_registers_core_tools() {
        let mut registry = ToolRegistry::new();
        register_builtins(
            &mut registry,
            &ToolboxConfig::default(),
            Arc::new(MapEnvironment::new()),
        )
        .unwrap();

        let listed: Vec<String> = registry
            .list()
            .iter()
            .map(|descriptor| descriptor.name().to_string())
            .collect();
        assert_eq!(
            listed,
            [
                "print_env",
                "sleep",
                "verify_aws_credentials",
                "verify_credentials",
                "verify_gcp_credentials",
            ]
        );
    }

    #[test]
    fn placeholders_are_opt_in() {
        let mut config = ToolboxConfig::default();
        config.tools.placeholders = true;
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, &config, Arc::new(MapEnvironment::new())).unwrap();

        assert!(registry.contains(names::SEARCH));
        assert!(registry.contains(names::FETCH));
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn registering_twice_is_a_duplicate() {
        let mut registry = ToolRegistry::new();
        let env: Arc<dyn Environment> = Arc::new(MapEnvironment::new());
        let config = ToolboxConfig::default();
        register_builtins(&mut registry, &config, Arc::clone(&env)).unwrap();

        let err = register_builtins(&mut registry, &config, env).unwrap_err();
        assert!(matches!(
            err,
            BuiltinsError::Registry(RegistryError::DuplicateName { .. })
        ));
    }

    #[test]
    fn bad_endpoint_fails_registration() {
        let mut config = ToolboxConfig::default();
        config.aws.endpoint = Some("not a uri".into());
        let mut registry = ToolRegistry::new();
        let err = register_builtins(&mut registry, &config, Arc::new(MapEnvironment::new()))
            .unwrap_err();
        assert!(matches!(err, BuiltinsError::Credentials(_)));
    }
}
