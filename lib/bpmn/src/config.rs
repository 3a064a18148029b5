//! BPMN mapping configuration.
//!
//! Loaded from `AMBER_BPMN_*` environment variables via the `config` crate,
//! for example `AMBER_BPMN_UNMATCHED_ELEMENTS=leave_unparsed`.

use serde::Deserialize;

/// What the reader does with an element several types claim when no guard
/// picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedElementPolicy {
    /// Fail with an ambiguous-element error.
    #[default]
    Reject,
    /// Keep the element as unparsed BPMN content.
    LeaveUnparsed,
}

/// Options for reading and writing BPMN documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BpmnConfig {
    /// Spaces per indentation level; 0 writes everything on one line.
    #[serde(default = "default_indent")]
    pub indent: usize,

    #[serde(default)]
    pub unmatched_elements: UnmatchedElementPolicy,

    /// Write the workflow diagram as BPMN-DI.
    #[serde(default = "default_write_diagram")]
    pub write_diagram: bool,
}

fn default_indent() -> usize {
    2
}

fn default_write_diagram() -> bool {
    true
}

impl Default for BpmnConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            unmatched_elements: UnmatchedElementPolicy::default(),
            write_diagram: default_write_diagram(),
        }
    }
}

impl BpmnConfig {
    /// Loads configuration from `AMBER_BPMN_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(Self::environment())
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("AMBER_BPMN")
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

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<BpmnConfig, config::ConfigError> {
        let source = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<config::Map<String, String>>();
        BpmnConfig::from_environment(BpmnConfig::environment().source(Some(source)))
    }

    #[test]
    fn bpmn_config_has_correct_defaults() {
        let config = BpmnConfig::default();
        assert_eq!(config.indent, 2);
        assert_eq!(config.unmatched_elements, UnmatchedElementPolicy::Reject);
        assert!(config.write_diagram);
        assert_eq!(load(&[]).expect("config"), config);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = load(&[
            ("AMBER_BPMN_INDENT", "0"),
            ("AMBER_BPMN_UNMATCHED_ELEMENTS", "leave_unparsed"),
            ("AMBER_BPMN_WRITE_DIAGRAM", "false"),
        ])
        .expect("config");
        assert_eq!(config.indent, 0);
        assert_eq!(config.unmatched_elements, UnmatchedElementPolicy::LeaveUnparsed);
        assert!(!config.write_diagram);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(load(&[("AMBER_BPMN_UNMATCHED_ELEMENTS", "guess")]).is_err());
    }
}
