//! Transform registry system for registering and calling value-list transformers.
//!
//! `transformer` and `augmentor` commands name their callable with a dotted path
//! such as `contrib.transformers.trim_string`. The embedding application
//! registers callables under those names at startup; the resolver looks them up
//! at call time.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// Keyword parameters passed to a transform
pub type TransformParams = HashMap<String, Value>;

/// Error type for transform operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransformError {
    #[error("Transform not found: {0}")]
    NotFound(String),
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

/// Trait for transformation functions
///
/// A transform receives the whole value list accumulated so far and returns a
/// new list. It may shrink, grow or rewrite the list.
pub trait TransformFn: Send + Sync {
    /// Execute the transformation over `values` with keyword `params`
    fn execute(
        &self,
        values: &[String],
        params: &TransformParams,
    ) -> Result<Vec<String>, TransformError>;
}

/// Simple function-based implementation of TransformFn
impl<F> TransformFn for F
where
    F: Fn(&[String], &TransformParams) -> Result<Vec<String>, TransformError> + Send + Sync,
{
    fn execute(
        &self,
        values: &[String],
        params: &TransformParams,
    ) -> Result<Vec<String>, TransformError> {
        self(values, params)
    }
}

/// Registry for storing and calling transformation functions
pub struct TransformRegistry {
    transforms: HashMap<String, Box<dyn TransformFn>>,
}

impl TransformRegistry {
    /// Create a new empty transform registry
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Create a registry pre-populated with the built-in transformers
    ///
    /// See [`crate::contrib`] for the list of registered names.
    pub fn with_contrib() -> Self {
        let mut registry = Self::new();
        crate::contrib::register_all(&mut registry);
        registry
    }

    /// Register a transformation function
    ///
    /// # Example
    ///
    /// ```ignore
    /// use fieldchain::{TransformRegistry, TransformParams, TransformError};
    ///
    /// let mut registry = TransformRegistry::new();
    /// registry.register(
    ///     "app.upper",
    ///     Box::new(|values: &[String], _: &TransformParams| -> Result<Vec<String>, TransformError> {
    ///         Ok(values.iter().map(|v| v.to_uppercase()).collect())
    ///     }),
    /// );
    /// ```
    pub fn register(&mut self, name: impl Into<String>, func: Box<dyn TransformFn>) {
        self.transforms.insert(name.into(), func);
    }

    /// Call a registered transformation function
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)` - Transform succeeded
    /// * `Err(TransformError::NotFound)` - No transform under `name`
    /// * `Err(TransformError)` - Transform failed
    pub fn call(
        &self,
        name: &str,
        values: &[String],
        params: &TransformParams,
    ) -> Result<Vec<String>, TransformError> {
        let transform = self
            .transforms
            .get(name)
            .ok_or_else(|| TransformError::NotFound(name.to_string()))?;

        transform.execute(values, params)
    }

    /// Check if a transform is registered
    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Get list of all registered transform names, sorted
    pub fn list_transforms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.transforms.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered transforms
    pub fn count(&self) -> usize {
        self.transforms.len()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uppercase() -> Box<dyn TransformFn> {
        Box::new(
            |values: &[String], _params: &TransformParams| -> Result<Vec<String>, TransformError> {
                Ok(values.iter().map(|v| v.to_uppercase()).collect())
            },
        )
    }

    #[test]
    fn test_register_and_call_transform() {
        let mut registry = TransformRegistry::new();
        registry.register("app.uppercase", uppercase());

        let values = vec!["hello".to_string(), "world".to_string()];
        let result = registry
            .call("app.uppercase", &values, &TransformParams::new())
            .unwrap();

        assert_eq!(result, vec!["HELLO", "WORLD"]);
    }

    #[test]
    fn test_transform_not_found() {
        let registry = TransformRegistry::new();

        let result = registry.call("app.nonexistent", &[], &TransformParams::new());

        assert_eq!(
            result,
            Err(TransformError::NotFound("app.nonexistent".to_string()))
        );
    }

    #[test]
    fn test_has_transform() {
        let mut registry = TransformRegistry::new();
        registry.register("app.uppercase", uppercase());

        assert!(registry.has_transform("app.uppercase"));
        assert!(!registry.has_transform("app.other"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_with_contrib_lists_builtins() {
        let registry = TransformRegistry::with_contrib();
        let names = registry.list_transforms();

        assert!(names.contains(&"contrib.transformers.trim_string".to_string()));
        assert!(names.contains(&"contrib.transformers.pad_string".to_string()));
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }
}
