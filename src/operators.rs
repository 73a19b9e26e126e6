//! The value-list operators behind each command.
//!
//! Every operator takes the list accumulated so far by value and returns the
//! next list. Only `regex_split`, `regex` and `transformer` can drop or rewrite
//! values; the others append.

use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::command::TransformSpec;
use crate::entity::EntityContext;
use crate::error::ResolveError;
use crate::extraction::{Extractor, FieldPath};
use crate::reference::pseudo_reference;
use crate::template::TemplateRenderer;
use crate::transform_registry::TransformRegistry;

pub fn literal(mut values: Vec<String>, value: &str) -> Vec<String> {
    values.push(value.to_string());
    values
}

/// Append the pseudo-reference token for `key`
pub fn entity_reference(mut values: Vec<String>, key: &str) -> Vec<String> {
    values.push(pseudo_reference(key));
    values
}

/// Append everything `path` selects from `record`
pub fn column(mut values: Vec<String>, path: &FieldPath, record: &Value) -> Vec<String> {
    let extracted = record.extract(path);
    trace!(query = %path, found = extracted.len(), "column: extracted");
    values.extend(extracted);
    values
}

/// Split every value by `pattern`, keeping the text of any capture groups
/// between the pieces
pub fn regex_split(values: Vec<String>, pattern: &Regex) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| split_keeping_groups(pattern, value))
        .collect()
}

fn split_keeping_groups(pattern: &Regex, text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut last = 0;

    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        pieces.push(text[last..whole.start()].to_string());
        pieces.extend(caps.iter().skip(1).flatten().map(|g| g.as_str().to_string()));
        last = whole.end();
    }
    pieces.push(text[last..].to_string());

    pieces
}

/// Keep the first capture group of each matching value, or the whole match
/// when the pattern has no groups
///
/// Empty and non-matching values are dropped, as are matches where the first
/// group did not take part.
pub fn regex_match(values: Vec<String>, pattern: &Regex) -> Vec<String> {
    let has_groups = pattern.captures_len() > 1;

    values
        .iter()
        .filter(|value| !value.is_empty())
        .filter_map(|value| {
            let caps = pattern.captures(value)?;
            let group = if has_groups { caps.get(1) } else { caps.get(0) };
            group.map(|m| m.as_str().to_string())
        })
        .collect()
}

/// Replace the values with the transform's output
pub fn transformer(
    values: Vec<String>,
    spec: &TransformSpec,
    registry: &TransformRegistry,
) -> Result<Vec<String>, ResolveError> {
    call_transform(&values, spec, registry)
}

/// Append the transform's output to the values
pub fn augmentor(
    mut values: Vec<String>,
    spec: &TransformSpec,
    registry: &TransformRegistry,
) -> Result<Vec<String>, ResolveError> {
    let extra = call_transform(&values, spec, registry)?;
    values.extend(extra);
    Ok(values)
}

fn call_transform(
    values: &[String],
    spec: &TransformSpec,
    registry: &TransformRegistry,
) -> Result<Vec<String>, ResolveError> {
    registry
        .call(&spec.name, values, &spec.params)
        .map_err(|source| ResolveError::Transform {
            name: spec.name.clone(),
            source,
        })
}

/// Append the rendered template
///
/// `strict` only tightens the renderer: a renderer built in strict mode stays
/// strict.
pub fn template(
    mut values: Vec<String>,
    template: &str,
    renderer: &TemplateRenderer,
    strict: bool,
    entity: Option<&dyn EntityContext>,
    record: Option<&Value>,
) -> Result<Vec<String>, ResolveError> {
    let strict = strict || renderer.is_strict();
    values.push(renderer.render_with(template, strict, entity, record)?);
    Ok(values)
}
