//! Template rendering for the `template` command.
//!
//! Templates use Handlebars syntax and see two variables: `entity`, the
//! properties resolved so far (property name -> list of values), and `record`,
//! the raw input record.
//!
//! ```text
//! {{record.title}}
//! {{upper record.title}}
//! {{entity.name.[0]}} ({{record.country}})
//! ```
//!
//! HTML escaping of substituted values stays enabled.

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError};
use serde_json::{json, Value};
use tracing::trace;

use crate::entity::EntityContext;

/// Owned template engine, built once and passed to the resolver by reference
///
/// Keeps a lenient and a strict engine so strictness can be chosen per render.
pub struct TemplateRenderer {
    lenient: Handlebars<'static>,
    strict: Handlebars<'static>,
    strict_default: bool,
}

impl TemplateRenderer {
    /// Create a renderer with the `upper`, `lower` and `trim` helpers
    pub fn new() -> Self {
        Self {
            lenient: engine(false),
            strict: engine(true),
            strict_default: false,
        }
    }

    /// Make references to missing variables an error instead of rendering empty
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_default = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict_default
    }

    /// Compile and render `template` against the entity and record
    pub fn render(
        &self,
        template: &str,
        entity: Option<&dyn EntityContext>,
        record: Option<&Value>,
    ) -> Result<String, RenderError> {
        self.render_with(template, self.strict_default, entity, record)
    }

    /// Like [`render`](Self::render), with strictness chosen by the caller
    pub fn render_with(
        &self,
        template: &str,
        strict: bool,
        entity: Option<&dyn EntityContext>,
        record: Option<&Value>,
    ) -> Result<String, RenderError> {
        let hbs = if strict { &self.strict } else { &self.lenient };
        let data = json!({
            "entity": entity.map(|e| e.properties()),
            "record": record,
        });
        trace!(template, strict, "TemplateRenderer::render: rendering");
        hbs.render_template(template, &data)
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn engine(strict: bool) -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.set_strict_mode(strict);
    hbs.register_helper("upper", Box::new(upper_helper));
    hbs.register_helper("lower", Box::new(lower_helper));
    hbs.register_helper("trim", Box::new(trim_helper));
    hbs
}

fn param_text(h: &Helper) -> String {
    match h.param(0).map(|p| p.value()) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn upper_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(&param_text(h).to_uppercase())?;
    Ok(())
}

fn lower_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(&param_text(h).to_lowercase())?;
    Ok(())
}

fn trim_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(param_text(h).trim())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Properties;

    #[test]
    fn test_render_record_passthrough() {
        let renderer = TemplateRenderer::new();
        let record = json!({"title": "hello"});

        let out = renderer.render("{{ record.title }}", None, Some(&record)).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn test_upper_helper() {
        let renderer = TemplateRenderer::new();
        let record = json!({"title": "hello"});

        let out = renderer.render("{{upper record.title}}", None, Some(&record)).unwrap();
        assert_eq!(out, "HELLO");
    }

    #[test]
    fn test_entity_properties_in_context() {
        let renderer = TemplateRenderer::new();
        let mut props = Properties::new();
        props.insert("name".to_string(), vec!["Jane".to_string(), "J.".to_string()]);
        let record = json!({"country": "ua"});

        let out = renderer
            .render(
                "{{entity.name.[0]}} ({{upper record.country}})",
                Some(&props),
                Some(&record),
            )
            .unwrap();
        assert_eq!(out, "Jane (UA)");
    }

    #[test]
    fn test_values_are_escaped() {
        let renderer = TemplateRenderer::new();
        let record = json!({"title": "a & <b>"});

        let out = renderer.render("{{record.title}}", None, Some(&record)).unwrap();
        assert_eq!(out, "a &amp; &lt;b&gt;");
    }

    #[test]
    fn test_missing_variable() {
        let record = json!({});

        let lenient = TemplateRenderer::new();
        assert_eq!(lenient.render("[{{record.nope}}]", None, Some(&record)).unwrap(), "[]");

        let strict = TemplateRenderer::new().with_strict_mode(true);
        assert!(strict.is_strict());
        assert!(strict.render("[{{record.nope}}]", None, Some(&record)).is_err());

        assert!(lenient.render_with("[{{record.nope}}]", true, None, Some(&record)).is_err());
        assert_eq!(
            strict.render_with("[{{record.nope}}]", false, None, Some(&record)).unwrap(),
            "[]"
        );
    }

    #[test]
    fn test_malformed_template_fails() {
        let renderer = TemplateRenderer::new();

        assert!(renderer.render("{{#if record}}", None, None).is_err());
    }
}
