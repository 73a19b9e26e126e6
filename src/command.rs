//! Command definitions for property configurations.
//!
//! A property configuration is an ordered list of single-key mappings:
//!
//! ```yaml
//! - column: "$.name"
//! - regex_split: "\\s+"
//! - regex: "^(\\w+)"
//! - transformer:
//!     name: contrib.transformers.convert_case
//!     params:
//!       case: upper
//! ```
//!
//! Each mapping is parsed into a typed [`Command`]. Regex patterns and path
//! queries are compiled here, so a broken pattern is reported when the
//! configuration is loaded rather than on the first record.

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::extraction::{value_to_string, FieldPath};
use crate::transform_registry::TransformParams;

/// A single resolution command with its typed configuration
#[derive(Debug, Clone)]
pub enum Command {
    /// Append a constant
    Literal(String),
    /// Append a pseudo-reference to the entity defined under this key
    Entity(String),
    /// Append every value the path query selects from the record
    Column(FieldPath),
    /// Split every value by a pattern
    RegexSplit(Regex),
    /// Keep the first capture group (or the whole match) of matching values
    Regex(Regex),
    /// Replace the values with the output of a registered transform
    Transformer(TransformSpec),
    /// Append the output of a registered transform
    Augmentor(TransformSpec),
    /// Append a rendered template
    Template(String),
    /// A command name this version does not know; skipped by the resolver
    Unknown { name: String, config: Value },
}

/// Reference to a registered transform plus its keyword parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformSpec {
    /// Dotted name the transform is registered under
    pub name: String,
    pub params: TransformParams,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TransformSpecRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        params: TransformParams,
    },
}

impl From<TransformSpecRepr> for TransformSpec {
    fn from(repr: TransformSpecRepr) -> Self {
        match repr {
            TransformSpecRepr::Name(name) => Self {
                name,
                params: TransformParams::new(),
            },
            TransformSpecRepr::Full { name, params } => Self { name, params },
        }
    }
}

impl TransformSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: TransformParams::new(),
        }
    }
}

impl Command {
    /// Parse one `{name: config}` entry
    pub fn parse(name: &str, config: &Value) -> Result<Self, ConfigError> {
        let command = match name {
            "literal" => match config {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    Command::Literal(value_to_string(config).unwrap_or_default())
                }
                _ => return Err(invalid(name, "expected a string, number or boolean")),
            },
            "entity" => Command::Entity(expect_str(name, config)?.to_string()),
            "column" => Command::Column(FieldPath::parse(expect_str(name, config)?)?),
            "regex_split" => Command::RegexSplit(compile("regex_split", expect_str(name, config)?)?),
            "regex" => Command::Regex(compile("regex", expect_str(name, config)?)?),
            "transformer" => Command::Transformer(parse_transform(name, config)?),
            "augmentor" => Command::Augmentor(parse_transform(name, config)?),
            "template" => Command::Template(expect_str(name, config)?.to_string()),
            _ => Command::Unknown {
                name: name.to_string(),
                config: config.clone(),
            },
        };
        Ok(command)
    }

    /// The configuration key of this command
    pub fn name(&self) -> &str {
        match self {
            Command::Literal(_) => "literal",
            Command::Entity(_) => "entity",
            Command::Column(_) => "column",
            Command::RegexSplit(_) => "regex_split",
            Command::Regex(_) => "regex",
            Command::Transformer(_) => "transformer",
            Command::Augmentor(_) => "augmentor",
            Command::Template(_) => "template",
            Command::Unknown { name, .. } => name,
        }
    }
}

fn invalid(command: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidCommand {
        command: command.to_string(),
        reason: reason.into(),
    }
}

fn expect_str<'a>(command: &str, config: &'a Value) -> Result<&'a str, ConfigError> {
    config
        .as_str()
        .ok_or_else(|| invalid(command, "expected a string"))
}

fn compile(command: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex { command, source })
}

fn parse_transform(command: &str, config: &Value) -> Result<TransformSpec, ConfigError> {
    let repr: TransformSpecRepr = serde_json::from_value(config.clone()).map_err(|_| {
        invalid(
            command,
            "expected a dotted name or a mapping with 'name' and optional 'params'",
        )
    })?;
    let spec = TransformSpec::from(repr);
    if spec.name.trim().is_empty() {
        return Err(invalid(command, "transform name is empty"));
    }
    Ok(spec)
}

/// Ordered commands resolving one entity field
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Vec<IndexMap<String, Value>>")]
pub struct PropertyConfig {
    commands: Vec<Command>,
}

impl PropertyConfig {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Parse a property configuration from a JSON array of command mappings
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        let entries: Vec<IndexMap<String, Value>> = serde_json::from_value(value.clone())?;
        Self::try_from(entries)
    }

    /// Parse a property configuration from a YAML sequence of command mappings
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let entries: Vec<IndexMap<String, Value>> = serde_yaml::from_str(yaml)?;
        Self::try_from(entries)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl TryFrom<Vec<IndexMap<String, Value>>> for PropertyConfig {
    type Error = ConfigError;

    /// Mappings with several keys contribute one command per key, in key order.
    fn try_from(entries: Vec<IndexMap<String, Value>>) -> Result<Self, Self::Error> {
        let mut commands = Vec::with_capacity(entries.len());
        for entry in &entries {
            for (name, config) in entry {
                commands.push(Command::parse(name, config)?);
            }
        }
        Ok(Self { commands })
    }
}

impl From<Vec<Command>> for PropertyConfig {
    fn from(commands: Vec<Command>) -> Self {
        Self::new(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_all_commands() {
        let config = PropertyConfig::from_json(&json!([
            {"literal": "x"},
            {"literal": 42},
            {"entity": "company"},
            {"column": "$.name"},
            {"regex_split": "\\s+"},
            {"regex": "(\\d)"},
            {"transformer": "contrib.transformers.trim_string"},
            {"augmentor": {"name": "app.aliases", "params": {"limit": 2}}},
            {"template": "{{record.title}}"},
        ]))
        .unwrap();

        let names: Vec<&str> = config.commands().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "literal",
                "literal",
                "entity",
                "column",
                "regex_split",
                "regex",
                "transformer",
                "augmentor",
                "template"
            ]
        );
        assert!(matches!(&config.commands()[1], Command::Literal(v) if v == "42"));
        match &config.commands()[7] {
            Command::Augmentor(spec) => {
                assert_eq!(spec.name, "app.aliases");
                assert_eq!(spec.params.get("limit"), Some(&json!(2)));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_is_kept() {
        let config = PropertyConfig::from_json(&json!([{"bogus": "z"}])).unwrap();

        assert!(matches!(
            &config.commands()[0],
            Command::Unknown { name, config } if name == "bogus" && config == &json!("z")
        ));
    }

    #[test]
    fn test_multi_key_mapping_keeps_key_order() {
        let config = PropertyConfig::from_yaml_str("- literal: a\n  entity: b\n- literal: c\n").unwrap();

        let names: Vec<&str> = config.commands().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["literal", "entity", "literal"]);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        assert!(matches!(
            PropertyConfig::from_json(&json!([{"regex": "(unclosed"}])),
            Err(ConfigError::InvalidRegex { command: "regex", .. })
        ));
        assert!(matches!(
            PropertyConfig::from_json(&json!([{"column": "$..["}])),
            Err(ConfigError::InvalidQuery { .. })
        ));
        assert!(matches!(
            PropertyConfig::from_json(&json!([{"literal": ["a"]}])),
            Err(ConfigError::InvalidCommand { .. })
        ));
        assert!(matches!(
            PropertyConfig::from_json(&json!([{"transformer": {"params": {}}}])),
            Err(ConfigError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_unicode_classes_compile() {
        let config = PropertyConfig::from_json(&json!([
            {"regex": "[\\p{Cyrillic}&&\\p{Lu}]+"},
            {"regex_split": "[\\p{P}--[.]]"}
        ]));

        assert!(config.is_ok());
    }
}
