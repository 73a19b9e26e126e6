//! Error types for command resolution and mapping configuration.

use thiserror::Error;

use crate::transform_registry::TransformError;

/// Failure raised while resolving a property configuration.
///
/// This is the pipeline's only failure channel: transform lookups, transform
/// execution and template rendering are never caught locally.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("transformer '{name}' failed: {source}")]
    Transform {
        name: String,
        #[source]
        source: TransformError,
    },

    #[error("template rendering failed: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("failed to resolve '{entity}.{field}': {source}")]
    Field {
        entity: String,
        field: String,
        #[source]
        source: Box<ResolveError>,
    },

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("command '{command}' requires {missing}, which is not available here")]
    MissingContext {
        command: String,
        missing: &'static str,
    },
}

/// Failure raised while loading commands or a mapping configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid '{command}' command: {reason}")]
    InvalidCommand { command: String, reason: String },

    #[error("invalid regex for '{command}': {source}")]
    InvalidRegex {
        command: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },
}
