//! Load the rule table from `tagcheck.toml` and `TAGCHECK_*` environment variables.
use std::path::{Path, PathBuf};

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::rules::{RuleTable, SerializationRule};

/// The file tagcheck looks for, in the current directory, when no configuration
/// file is specified explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "tagcheck.toml";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagcheckConfig {
    /// Whether to start from the built-in rules for well-known serializers.
    #[serde(default = "default_builtin_rules")]
    pub builtin_rules: bool,
    /// Additional serialization functions.
    ///
    /// They take precedence over built-in rules for the same function.
    #[serde(default)]
    pub functions: Vec<FunctionConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionConfig {
    /// The fully qualified name of the function, e.g. `example.com/db.Insert`
    /// or `(*example.com/db.Conn).Insert`.
    pub name: String,
    pub tag: String,
    pub arg_pos: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opt_out_methods: Vec<String>,
}

fn default_builtin_rules() -> bool {
    true
}

impl Default for TagcheckConfig {
    fn default() -> Self {
        Self {
            builtin_rules: default_builtin_rules(),
            functions: Vec::new(),
        }
    }
}

impl TagcheckConfig {
    /// Load the configuration.
    ///
    /// Sources, ordered by precedence:
    ///
    /// 1. Environment variables (`TAGCHECK_BUILTIN_RULES`)
    /// 2. The configuration file at `path` or, if `path` is `None`, [`DEFAULT_CONFIG_FILE`]
    ///    in the current directory, if it exists
    /// 3. Defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::MissingFile(path.to_owned()));
                }
                Some(path.to_owned())
            }
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };
        let span = tracing::info_span!(
            "Loading configuration",
            configuration.file = ?path,
        );
        let _guard = span.enter();

        let mut figment = Figment::from(Serialized::defaults(TagcheckConfig::default()));
        if let Some(path) = &path {
            figment = figment.merge(Toml::file(path));
        }
        // Other `TAGCHECK_*` variables configure the CLI, not the analysis.
        figment = figment.merge(Env::prefixed("TAGCHECK_").only(&["builtin_rules"]));
        figment
            .extract()
            .context("Failed to load hierarchical configuration")
            .map_err(ConfigError::Load)
    }

    /// Assemble the rule table described by this configuration.
    pub fn rule_table(&self) -> Result<RuleTable, ConfigError> {
        let mut table = if self.builtin_rules {
            RuleTable::builtin()
        } else {
            RuleTable::empty()
        };
        for (index, function) in self.functions.iter().enumerate() {
            if function.name.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    index,
                    field: "name",
                });
            }
            if function.tag.trim().is_empty() {
                return Err(ConfigError::EmptyField { index, field: "tag" });
            }
            let rule = SerializationRule {
                tag: function.tag.clone(),
                arg_pos: function.arg_pos,
                opt_out_methods: function.opt_out_methods.clone(),
            };
            if let Some(previous) = table.insert(function.name.clone(), rule) {
                tracing::debug!(
                    function = %function.name,
                    previous.tag = %previous.tag,
                    "A configured function overrides an existing rule"
                );
            }
        }
        Ok(table)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The configuration file `{}` doesn't exist", .0.display())]
    MissingFile(PathBuf),
    #[error("Failed to load tagcheck's configuration")]
    Load(#[source] anyhow::Error),
    #[error("The function #{index} in the configuration has an empty `{field}`")]
    EmptyField { index: usize, field: &'static str },
}
