//! Configuration loader: TOML file first, environment overrides second.

use std::fs;
use std::path::Path;

use tool_primitives::Environment;
use tracing::debug;

use crate::schema::ToolboxConfig;
use crate::{ConfigError, ConfigResult};

/// Overrides `server.bind`.
pub const BIND_ENV: &str = "TOOLBOX_BIND";
/// Overrides `logging.filter`.
pub const LOG_ENV: &str = "TOOLBOX_LOG";
/// Overrides `tools.delay_max_secs`.
pub const DELAY_MAX_ENV: &str = "TOOLBOX_DELAY_MAX_SECS";
/// Overrides `tools.placeholders`.
pub const PLACEHOLDERS_ENV: &str = "TOOLBOX_PLACEHOLDERS";

/// Every variable [`ToolboxConfig::apply_env`] reads.
pub const OVERRIDE_ENVS: [&str; 4] = [BIND_ENV, LOG_ENV, DELAY_MAX_ENV, PLACEHOLDERS_ENV];

impl ToolboxConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document does not match the schema.
    pub fn from_toml_str(document: &str) -> ConfigResult<Self> {
        toml::from_str(document).map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let document = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&document).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    /// Loads the file at `path` (defaults when `None`), applies overrides from
    /// `env`, and validates the result.
    ///
    /// # Errors
    ///
    /// Propagates read, parse, override and validation failures.
    pub fn load(path: Option<&Path>, env: &dyn Environment) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Names of the override variables `env` sets to a non-blank value.
    ///
    /// Loading usually runs before a subscriber is installed, so callers log
    /// this list once tracing is up.
    #[must_use]
    pub fn env_overrides(env: &dyn Environment) -> Vec<&'static str> {
        OVERRIDE_ENVS
            .into_iter()
            .filter(|key| env.first_of(&[*key]).is_some())
            .collect()
    }

    /// Applies `TOOLBOX_*` overrides. Blank values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for values that do not parse.
    pub fn apply_env(&mut self, env: &dyn Environment) -> ConfigResult<()> {
        if let Some(value) = override_value(env, BIND_ENV) {
            self.server.bind = value.parse().map_err(|err: std::net::AddrParseError| {
                ConfigError::InvalidOverride {
                    key: BIND_ENV,
                    value: value.clone(),
                    reason: err.to_string(),
                }
            })?;
        }

        if let Some(value) = override_value(env, LOG_ENV) {
            self.logging.filter = value;
        }

        if let Some(value) = override_value(env, DELAY_MAX_ENV) {
            self.tools.delay_max_secs =
                value.parse().map_err(|err: std::num::ParseFloatError| {
                    ConfigError::InvalidOverride {
                        key: DELAY_MAX_ENV,
                        value: value.clone(),
                        reason: err.to_string(),
                    }
                })?;
        }

        if let Some(value) = override_value(env, PLACEHOLDERS_ENV) {
            self.tools.placeholders =
                parse_flag(&value).ok_or_else(|| ConfigError::InvalidOverride {
                    key: PLACEHOLDERS_ENV,
                    value: value.clone(),
                    reason: "expected true/false, yes/no, on/off or 1/0".into(),
                })?;
        }

        Ok(())
    }
}

fn override_value(env: &dyn Environment, key: &'static str) -> Option<String> {
    let value = env.first_of(&[key])?;
    debug!(key, "applying environment override");
    Some(value.trim().to_owned())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tool_primitives::MapEnvironment;

    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = ToolboxConfig::load(None, &MapEnvironment::new()).unwrap();
        assert_eq!(config, ToolboxConfig::default());
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config = ToolboxConfig::from_toml_str(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [tools]
            delay_max_secs = 5.5
            placeholders = true

            [gcp]
            credentials_env = "GCP_KEY_FILE"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.server.request_timeout_secs, 120);
        assert!((config.tools.delay_max_secs - 5.5).abs() < f64::EPSILON);
        assert!(config.tools.placeholders);
        assert_eq!(config.gcp.credentials_env, "GCP_KEY_FILE");
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ToolboxConfig::from_toml_str("[tools]\nmax_delay = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: None, .. }));
    }

    #[test]
    fn file_is_read_and_env_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nfilter = \"warn\"\n[tools]\ndelay_max_secs = 10").unwrap();

        let env = MapEnvironment::new()
            .with(LOG_ENV, "debug")
            .with(DELAY_MAX_ENV, " 2.5 ")
            .with(PLACEHOLDERS_ENV, "yes")
            .with(BIND_ENV, "127.0.0.1:18001");
        let config = ToolboxConfig::load(Some(file.path()), &env).unwrap();

        assert_eq!(config.logging.filter, "debug");
        assert!((config.tools.delay_max_secs - 2.5).abs() < f64::EPSILON);
        assert!(config.tools.placeholders);
        assert_eq!(config.server.bind.port(), 18001);
    }

    #[test]
    fn blank_override_is_ignored() {
        let env = MapEnvironment::new().with(LOG_ENV, "   ");
        let config = ToolboxConfig::load(None, &env).unwrap();
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn unreadable_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = ToolboxConfig::load(Some(&path), &MapEnvironment::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { path: ref reported, .. } if *reported == path));
    }

    #[test]
    fn malformed_override_is_an_error() {
        let env = MapEnvironment::new().with(PLACEHOLDERS_ENV, "maybe");
        let err = ToolboxConfig::load(None, &env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride { key: PLACEHOLDERS_ENV, .. }
        ));

        let env = MapEnvironment::new().with(BIND_ENV, "not-an-address");
        assert!(ToolboxConfig::load(None, &env).is_err());
    }

    #[test]
    fn override_is_validated() {
        let env = MapEnvironment::new().with(DELAY_MAX_ENV, "-3");
        let err = ToolboxConfig::load(None, &env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn env_overrides_lists_non_blank_keys() {
        let env = MapEnvironment::new()
            .with(BIND_ENV, "127.0.0.1:9100")
            .with(LOG_ENV, " ")
            .with(PLACEHOLDERS_ENV, "on");
        assert_eq!(
            ToolboxConfig::env_overrides(&env),
            vec![BIND_ENV, PLACEHOLDERS_ENV]
        );
        assert!(ToolboxConfig::env_overrides(&MapEnvironment::new()).is_empty());
    }
}
