//! Entities assembled from resolved property values.
//!
//! The resolver only needs read access to the properties resolved so far, which
//! is what [`EntityContext`] exposes. [`Entity`] is the concrete type the
//! mapping layer builds.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Property name -> ordered values
pub type Properties = IndexMap<String, Vec<String>>;

/// Read-only view of an in-progress entity
///
/// # Example
///
/// ```ignore
/// use fieldchain::{EntityContext, Properties};
///
/// struct Row {
///     props: Properties,
/// }
///
/// impl EntityContext for Row {
///     fn properties(&self) -> &Properties {
///         &self.props
///     }
/// }
/// ```
pub trait EntityContext {
    /// Properties resolved so far
    fn properties(&self) -> &Properties;
}

impl EntityContext for Properties {
    fn properties(&self) -> &Properties {
        self
    }
}

/// An entity produced by a mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Key the entity is defined under in the mapping
    pub key: String,
    /// Target schema name (e.g. `Person`, `Company`)
    pub schema: String,
    #[serde(default)]
    pub properties: Properties,
    /// Constant metadata attached by the mapping
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub meta: Properties,
}

impl Entity {
    pub fn new(key: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            schema: schema.into(),
            ..Self::default()
        }
    }

    /// Append values to a property, creating it if needed
    ///
    /// Empty value lists leave the entity untouched.
    pub fn add(&mut self, property: impl Into<String>, values: Vec<String>) {
        if values.is_empty() {
            return;
        }
        self.properties
            .entry(property.into())
            .or_default()
            .extend(values);
    }

    /// Values of a property, empty when it is not set
    pub fn get(&self, property: &str) -> &[String] {
        self.properties
            .get(property)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// First value of a property
    pub fn first(&self, property: &str) -> Option<&str> {
        self.get(property).first().map(|s| s.as_str())
    }

    /// Convert entity to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl EntityContext for Entity {
    fn properties(&self) -> &Properties {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut entity = Entity::new("person", "Person");
        entity.add("name", vec!["Alice".to_string()]);
        entity.add("name", vec!["Alicia".to_string()]);
        entity.add("email", vec![]);

        assert_eq!(entity.get("name"), ["Alice", "Alicia"]);
        assert_eq!(entity.first("name"), Some("Alice"));
        assert!(entity.get("email").is_empty());
        assert!(!entity.properties.contains_key("email"));
    }

    #[test]
    fn test_entity_to_json() {
        let mut entity = Entity::new("person", "Person");
        entity.add("name", vec!["Bob".to_string()]);

        let json = entity.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"key":"person","schema":"Person","properties":{"name":["Bob"]}}"#
        );
    }

    #[test]
    fn test_properties_map_is_a_context() {
        let mut props = Properties::new();
        props.insert("title".to_string(), vec!["hello".to_string()]);

        let ctx: &dyn EntityContext = &props;
        assert_eq!(ctx.properties().len(), 1);
    }
}
