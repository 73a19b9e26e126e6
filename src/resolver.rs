//! Command dispatch and the two public resolution entry points.
//!
//! [`apply_commands`] folds a value list through a property configuration,
//! left to right, starting from the empty list. Which commands take part is
//! decided by an [`OperatorSet`]:
//!
//! - [`Resolver::resolve_entity`] enables every operator and supplies the
//!   record, the in-progress entity, the transform registry and the renderer.
//! - [`resolve_constant_meta`] enables only `literal`, for mapping-level
//!   metadata that has no record behind it.
//!
//! Commands outside the enabled set are skipped without error or log. Unknown
//! command names are skipped too, unless `strict_commands` is set.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::command::{Command, PropertyConfig};
use crate::entity::EntityContext;
use crate::error::ResolveError;
use crate::operators;
use crate::template::TemplateRenderer;
use crate::transform_registry::TransformRegistry;

/// The operators a dispatch is allowed to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSet {
    /// All eight operators
    Full,
    /// Only `literal`
    LiteralOnly,
}

impl OperatorSet {
    pub fn enables(&self, command: &Command) -> bool {
        match self {
            OperatorSet::Full => !matches!(command, Command::Unknown { .. }),
            OperatorSet::LiteralOnly => matches!(command, Command::Literal(_)),
        }
    }
}

/// Resolution options, usually read from the `options` section of a mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ResolverOptions {
    /// Reject unknown command names instead of skipping them
    #[serde(default)]
    pub strict_commands: bool,

    /// Fail templates that reference missing variables
    #[serde(default)]
    pub strict_templates: bool,
}

/// Everything operators may read while a property configuration is applied
#[derive(Default, Clone, Copy)]
pub struct ResolveScope<'a> {
    pub record: Option<&'a Value>,
    pub entity: Option<&'a dyn EntityContext>,
    pub transforms: Option<&'a TransformRegistry>,
    pub templates: Option<&'a TemplateRenderer>,
    /// Render templates in strict mode even if the renderer is lenient
    pub strict_templates: bool,
}

/// Apply `commands` in order and return the final value list
pub fn apply_commands(
    commands: &[Command],
    operators: OperatorSet,
    scope: &ResolveScope<'_>,
    strict_commands: bool,
) -> Result<Vec<String>, ResolveError> {
    let mut values: Vec<String> = Vec::new();

    for command in commands {
        if !operators.enables(command) {
            if strict_commands {
                if let Command::Unknown { name, .. } = command {
                    return Err(ResolveError::UnknownCommand(name.clone()));
                }
            }
            continue;
        }

        values = apply_one(command, values, scope)?;
        debug!(command = command.name(), values = values.len(), "apply_commands: applied");
    }

    Ok(values)
}

fn apply_one(
    command: &Command,
    values: Vec<String>,
    scope: &ResolveScope<'_>,
) -> Result<Vec<String>, ResolveError> {
    let missing = |what: &'static str| ResolveError::MissingContext {
        command: command.name().to_string(),
        missing: what,
    };

    match command {
        Command::Literal(value) => Ok(operators::literal(values, value)),
        Command::Entity(key) => Ok(operators::entity_reference(values, key)),
        Command::Column(path) => {
            let record = scope.record.ok_or_else(|| missing("a record"))?;
            Ok(operators::column(values, path, record))
        }
        Command::RegexSplit(pattern) => Ok(operators::regex_split(values, pattern)),
        Command::Regex(pattern) => Ok(operators::regex_match(values, pattern)),
        Command::Transformer(spec) => {
            let registry = scope.transforms.ok_or_else(|| missing("a transform registry"))?;
            operators::transformer(values, spec, registry)
        }
        Command::Augmentor(spec) => {
            let registry = scope.transforms.ok_or_else(|| missing("a transform registry"))?;
            operators::augmentor(values, spec, registry)
        }
        Command::Template(template) => {
            let renderer = scope.templates.ok_or_else(|| missing("a template renderer"))?;
            operators::template(
                values,
                template,
                renderer,
                scope.strict_templates,
                scope.entity,
                scope.record,
            )
        }
        Command::Unknown { .. } => Ok(values),
    }
}

/// Resolves entity fields against records
///
/// Borrows the transform registry and template renderer, which the caller
/// builds once and shares across records.
///
/// # Example
///
/// ```ignore
/// use fieldchain::{PropertyConfig, Resolver, TemplateRenderer, TransformRegistry, Entity};
///
/// let transforms = TransformRegistry::with_contrib();
/// let templates = TemplateRenderer::new();
/// let resolver = Resolver::new(&transforms, &templates);
///
/// let config = PropertyConfig::from_yaml_str("- column: $.name\n- regex_split: \"\\\\s+\"")?;
/// let entity = Entity::new("person", "Person");
/// let values = resolver.resolve_entity(&config, &record, &entity)?;
/// ```
pub struct Resolver<'a> {
    transforms: &'a TransformRegistry,
    templates: &'a TemplateRenderer,
    options: ResolverOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(transforms: &'a TransformRegistry, templates: &'a TemplateRenderer) -> Self {
        Self {
            transforms,
            templates,
            options: ResolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve one field of a real entity
    pub fn resolve_entity(
        &self,
        config: &PropertyConfig,
        record: &Value,
        entity: &dyn EntityContext,
    ) -> Result<Vec<String>, ResolveError> {
        let scope = ResolveScope {
            record: Some(record),
            entity: Some(entity),
            transforms: Some(self.transforms),
            templates: Some(self.templates),
            strict_templates: self.options.strict_templates,
        };
        apply_commands(
            config.commands(),
            OperatorSet::Full,
            &scope,
            self.options.strict_commands,
        )
    }
}

/// Resolve mapping-level constant metadata
///
/// Only `literal` commands contribute; every other command is ignored, with
/// no record or entity in scope.
pub fn resolve_constant_meta(config: &PropertyConfig) -> Result<Vec<String>, ResolveError> {
    apply_commands(
        config.commands(),
        OperatorSet::LiteralOnly,
        &ResolveScope::default(),
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::TransformSpec;
    use crate::entity::Entity;
    use crate::reference::pseudo_reference;
    use crate::transform_registry::{TransformError, TransformParams};
    use serde_json::json;

    fn config(value: Value) -> PropertyConfig {
        PropertyConfig::from_json(&value).unwrap()
    }

    fn resolve(cfg: Value, record: Value) -> Result<Vec<String>, ResolveError> {
        let transforms = TransformRegistry::with_contrib();
        let templates = TemplateRenderer::new();
        let resolver = Resolver::new(&transforms, &templates);
        resolver.resolve_entity(&config(cfg), &record, &Entity::new("e", "Thing"))
    }

    #[test]
    fn test_literals_append_in_order() {
        assert_eq!(resolve(json!([{"literal": "x"}]), json!({})).unwrap(), vec!["x"]);
        assert_eq!(
            resolve(json!([{"literal": "a"}, {"literal": "b"}]), json!({})).unwrap(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_empty_config_gives_empty_list() {
        assert!(resolve(json!([]), json!({"a": 1})).unwrap().is_empty());
    }

    #[test]
    fn test_split_then_match() {
        let values = resolve(
            json!([{"literal": "a1,b2"}, {"regex_split": ","}, {"regex": "(\\d)"}]),
            json!({}),
        )
        .unwrap();

        assert_eq!(values, vec!["1", "2"]);
    }

    #[test]
    fn test_unknown_command_is_noop() {
        let cfg = config(json!([{"bogus": "z"}]));
        let scope = ResolveScope::default();

        let values = apply_commands(cfg.commands(), OperatorSet::Full, &scope, false).unwrap();
        assert!(values.is_empty());

        let values = resolve(json!([{"literal": "keep"}, {"bogus": "z"}]), json!({})).unwrap();
        assert_eq!(values, vec!["keep"]);
    }

    #[test]
    fn test_strict_commands_rejects_unknown() {
        let transforms = TransformRegistry::new();
        let templates = TemplateRenderer::new();
        let resolver = Resolver::new(&transforms, &templates).with_options(ResolverOptions {
            strict_commands: true,
            ..ResolverOptions::default()
        });

        let result = resolver.resolve_entity(
            &config(json!([{"literal": "keep"}, {"bogus": "z"}])),
            &json!({}),
            &Entity::default(),
        );

        assert!(matches!(result, Err(ResolveError::UnknownCommand(name)) if name == "bogus"));
    }

    #[test]
    fn test_entity_reference() {
        let values = resolve(json!([{"entity": "company"}]), json!({})).unwrap();
        assert_eq!(values, vec![pseudo_reference("company")]);
    }

    #[test]
    fn test_column_split_match_scenario() {
        let values = resolve(
            json!([{"column": "$.name"}, {"regex_split": "\\s+"}, {"regex": "^(\\w+)"}]),
            json!({"name": "Jane Q Public"}),
        )
        .unwrap();

        assert_eq!(values, vec!["Jane", "Q", "Public"]);
    }

    #[test]
    fn test_transformer_with_params() {
        let values = resolve(
            json!([
                {"column": "$.names"},
                {"transformer": {
                    "name": "contrib.transformers.convert_case",
                    "params": {"case": "lower"}
                }},
                {"augmentor": {
                    "name": "contrib.transformers.pad_string",
                    "params": {"length": 4, "pad_char": "_"}
                }}
            ]),
            json!({"names": ["ANN", "BO"]}),
        )
        .unwrap();

        assert_eq!(values, vec!["ann", "bo", "ann_", "bo__"]);
    }

    #[test]
    fn test_unknown_transformer_propagates() {
        let result = resolve(json!([{"literal": "x"}, {"transformer": "no.such.fn"}]), json!({}));

        assert!(matches!(
            result,
            Err(ResolveError::Transform { ref name, source: TransformError::NotFound(_) })
                if name == "no.such.fn"
        ));
    }

    #[test]
    fn test_template_sees_entity_and_record() {
        let transforms = TransformRegistry::new();
        let templates = TemplateRenderer::new();
        let resolver = Resolver::new(&transforms, &templates);
        let mut entity = Entity::new("person", "Person");
        entity.add("name", vec!["Jane".to_string()]);

        let values = resolver
            .resolve_entity(
                &config(json!([
                    {"template": "{{upper record.title}}"},
                    {"template": "{{entity.name.[0]}}/{{ record.title }}"}
                ])),
                &json!({"title": "hello"}),
                &entity,
            )
            .unwrap();

        assert_eq!(values, vec!["HELLO", "Jane/hello"]);
    }

    #[test]
    fn test_malformed_template_propagates() {
        let result = resolve(json!([{"template": "{{#each record}}"}]), json!({}));

        assert!(matches!(result, Err(ResolveError::Template(_))));
    }

    #[test]
    fn test_constant_meta_keeps_literals_only() {
        let cfg = config(json!([
            {"literal": "registry"},
            {"column": "$.name"},
            {"entity": "company"},
            {"bogus": 1},
            {"literal": 2024}
        ]));

        assert_eq!(resolve_constant_meta(&cfg).unwrap(), vec!["registry", "2024"]);
    }

    #[test]
    fn test_missing_context_is_reported() {
        let cfg = PropertyConfig::new(vec![Command::Transformer(TransformSpec::new("x.y"))]);

        let result = apply_commands(cfg.commands(), OperatorSet::Full, &ResolveScope::default(), false);

        assert!(matches!(
            result,
            Err(ResolveError::MissingContext { ref command, .. }) if command == "transformer"
        ));
    }

    #[test]
    fn test_registered_callable_receives_accumulated_values() {
        let mut transforms = TransformRegistry::new();
        transforms.register(
            "app.count",
            Box::new(|values: &[String], _: &TransformParams| -> Result<Vec<String>, TransformError> {
                Ok(vec![values.len().to_string()])
            }),
        );
        let templates = TemplateRenderer::new();
        let resolver = Resolver::new(&transforms, &templates);

        let values = resolver
            .resolve_entity(
                &config(json!([{"literal": "a"}, {"literal": "b"}, {"augmentor": "app.count"}])),
                &json!({}),
                &Entity::default(),
            )
            .unwrap();

        assert_eq!(values, vec!["a", "b", "2"]);
    }
}
