//! JSON mapping configuration.
//!
//! Loaded from `AMBER_JSON_*` environment variables via the `config` crate,
//! for example `AMBER_JSON_PRETTY=true`.

use serde::Deserialize;

/// Options for the JSON facades.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JsonConfig {
    /// Indent streaming output by two spaces per level.
    #[serde(default = "default_pretty")]
    pub pretty: bool,

    /// Discriminator field for unions registered without one.
    #[serde(default = "default_discriminator_field")]
    pub default_discriminator_field: String,
}

fn default_pretty() -> bool {
    false
}

fn default_discriminator_field() -> String {
    crate::registry::DEFAULT_DISCRIMINATOR_FIELD.to_string()
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
            default_discriminator_field: default_discriminator_field(),
        }
    }
}

impl JsonConfig {
    /// Loads configuration from `AMBER_JSON_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("AMBER_JSON")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}
