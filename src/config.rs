//! Engine limits, loadable from a config file and `RULEKIT_*` environment variables.

use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combine::MIN_COMBINE_RULES;
use crate::parse::DEFAULT_MAX_DEPTH;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Limits applied by [`RuleEngine`](crate::RuleEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fewest rules a combination accepts. Never below 2.
    pub min_combine_rules: usize,
    /// Deepest parenthesis nesting accepted in rule text.
    pub max_nesting_depth: usize,
    /// Longest rule text accepted, in bytes.
    pub max_rule_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_combine_rules: MIN_COMBINE_RULES,
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            max_rule_length: 4096,
        }
    }
}

impl EngineConfig {
    /// Prefix of environment variables that override file settings,
    /// e.g. `RULEKIT_MAX_RULE_LENGTH=8192`.
    pub const ENV_PREFIX: &'static str = "RULEKIT";

    /// Load configuration.
    ///
    /// Sources, later ones overriding earlier:
    /// 1. built-in defaults
    /// 2. `path`, if given (format chosen by extension, e.g. `.toml`)
    /// 3. `RULEKIT_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a source cannot be read or the result
    /// fails [`validate`](Self::validate).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(Environment::with_prefix(Self::ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_combine_rules < MIN_COMBINE_RULES {
            return Err(ConfigError::Invalid(format!(
                "min_combine_rules must be at least {MIN_COMBINE_RULES}, got {}",
                self.min_combine_rules
            )));
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_nesting_depth must be positive".to_owned(),
            ));
        }
        if self.max_rule_length == 0 {
            return Err(ConfigError::Invalid(
                "max_rule_length must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}
