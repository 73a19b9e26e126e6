//! Mapping configuration loader and record mapper.
//!
//! A mapping describes which entities to build from each record and how every
//! field is resolved:
//!
//! ```yaml
//! options:
//!   strict_commands: false
//!
//! meta:
//!   source:
//!     - literal: "company registry"
//!
//! entities:
//!   company:
//!     schema: Company
//!     properties:
//!       name:
//!         - column: "$.company_name"
//!   director:
//!     schema: Person
//!     properties:
//!       name:
//!         - column: "$.director"
//!         - transformer: contrib.transformers.trim_string
//!       employer:
//!         - entity: company
//! ```
//!
//! Entities are built in declaration order and their fields are resolved in
//! declaration order, so a `template` command sees the fields above it.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::command::PropertyConfig;
use crate::entity::{Entity, Properties};
use crate::error::{ConfigError, ResolveError};
use crate::resolver::{resolve_constant_meta, Resolver, ResolverOptions};
use crate::template::TemplateRenderer;
use crate::transform_registry::TransformRegistry;

/// A complete mapping configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub options: ResolverOptions,

    /// Constant metadata attached to every entity (literal commands only)
    #[serde(default)]
    pub meta: IndexMap<String, PropertyConfig>,

    /// Entity key -> entity mapping, in declaration order
    pub entities: IndexMap<String, EntityMapping>,
}

/// How one entity is built from a record
#[derive(Debug, Clone, Deserialize)]
pub struct EntityMapping {
    /// Target schema name
    pub schema: String,

    /// Field name -> commands, in declaration order
    #[serde(default)]
    pub properties: IndexMap<String, PropertyConfig>,
}

impl MappingConfig {
    /// Load a mapping from a YAML file.
    ///
    /// # Errors
    /// Returns error if the file can't be read, is not valid YAML, or contains
    /// an invalid command (bad regex, bad query, malformed payload)
    ///
    /// # Example
    /// ```ignore
    /// use fieldchain::MappingConfig;
    ///
    /// let mapping = MappingConfig::load_from_file("mappings/registry.yaml")?;
    /// println!("Entities: {:?}", mapping.entity_names());
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml_str(&contents)
    }

    /// Parse a mapping from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: MappingConfig = serde_yaml::from_str(yaml)?;
        debug!(
            entities = config.entities.len(),
            fields = config.field_count(),
            "MappingConfig: loaded"
        );
        Ok(config)
    }

    /// Get entity mapping by key.
    pub fn get_entity(&self, key: &str) -> Option<&EntityMapping> {
        self.entities.get(key)
    }

    /// Get all entity keys, in declaration order.
    pub fn entity_names(&self) -> Vec<&String> {
        self.entities.keys().collect()
    }

    /// Total number of mapped fields across all entities
    pub fn field_count(&self) -> usize {
        self.entities.values().map(|e| e.properties.len()).sum()
    }
}

/// Applies a [`MappingConfig`] to records
pub struct Mapper<'a> {
    config: &'a MappingConfig,
    resolver: Resolver<'a>,
    meta: Properties,
}

impl<'a> Mapper<'a> {
    /// Create a mapper and resolve the constant metadata once
    pub fn new(
        config: &'a MappingConfig,
        transforms: &'a TransformRegistry,
        templates: &'a TemplateRenderer,
    ) -> Result<Self, ResolveError> {
        let mut meta = Properties::new();
        for (name, commands) in &config.meta {
            let values = resolve_constant_meta(commands)?;
            if !values.is_empty() {
                meta.insert(name.clone(), values);
            }
        }

        Ok(Self {
            config,
            resolver: Resolver::new(transforms, templates).with_options(config.options),
            meta,
        })
    }

    /// Constant metadata attached to every entity
    pub fn meta(&self) -> &Properties {
        &self.meta
    }

    /// Build every entity of the mapping from one record
    ///
    /// Fields that resolve to no values are left out of the entity.
    pub fn map_record(&self, record: &Value) -> Result<Vec<Entity>, ResolveError> {
        let mut entities = Vec::with_capacity(self.config.entities.len());

        for (key, mapping) in &self.config.entities {
            let mut entity = Entity::new(key.clone(), mapping.schema.clone());
            entity.meta = self.meta.clone();

            for (field, commands) in &mapping.properties {
                let values = self
                    .resolver
                    .resolve_entity(commands, record, &entity)
                    .map_err(|source| ResolveError::Field {
                        entity: key.clone(),
                        field: field.clone(),
                        source: Box::new(source),
                    })?;
                entity.add(field.clone(), values);
            }

            debug!(
                entity = %key,
                properties = entity.properties.len(),
                "Mapper::map_record: built entity"
            );
            entities.push(entity);
        }

        Ok(entities)
    }
}
