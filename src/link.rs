//! Link rendering - the mini-DSL shared by resources, relationships, and
//! error objects.
//!
//! A link computation either returns a finished link value (a string, an
//! object, or null) or calls the [`LinkBuilder`] setters it receives, in
//! which case the link renders as `{href, meta?}`.

use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::types::{json_type_name, BoxError, Context};

/// A link computation evaluated against a binding context.
///
/// The builder argument is the structured alternative to returning a raw
/// value: setting `href` and/or `meta` on it takes precedence over the
/// computation's return value.
pub type LinkFn = std::rc::Rc<dyn Fn(&Context, &mut LinkBuilder) -> Result<Value, BoxError>>;

/// Builder handed to link computations for the `{href, meta}` link form.
#[derive(Debug, Default)]
pub struct LinkBuilder {
    href: Option<String>,
    meta: Option<Map<String, Value>>,
}

impl LinkBuilder {
    /// Set the link's `href`.
    pub fn href(&mut self, href: impl Into<String>) -> &mut Self {
        self.href = Some(href.into());
        self
    }

    /// Set the link's `meta` object.
    pub fn meta(&mut self, meta: Map<String, Value>) -> &mut Self {
        self.meta = Some(meta);
        self
    }

    /// The built link object, or `None` if no setter was invoked.
    fn into_value(self) -> Option<Value> {
        if self.href.is_none() && self.meta.is_none() {
            return None;
        }

        let mut map = Map::new();
        if let Some(href) = self.href {
            map.insert("href".to_string(), Value::String(href));
        }
        if let Some(meta) = self.meta {
            map.insert("meta".to_string(), Value::Object(meta));
        }
        Some(Value::Object(map))
    }
}

/// Evaluate a link computation and produce its link value.
///
/// # Errors
///
/// Returns `RenderError::Computation` if the computation fails, or
/// `RenderError::InvalidLink` if its direct return value is neither a
/// string, an object, nor null.
pub(crate) fn render_link(
    context: &Context,
    compute: &LinkFn,
    path: &str,
) -> Result<Value, RenderError> {
    let mut builder = LinkBuilder::default();
    let returned =
        compute(context, &mut builder).map_err(|source| RenderError::computation(path, source))?;

    if let Some(built) = builder.into_value() {
        return Ok(built);
    }

    match returned {
        Value::Null | Value::String(_) | Value::Object(_) => Ok(returned),
        other => Err(RenderError::InvalidLink {
            path: path.to_string(),
            actual: json_type_name(&other).to_string(),
        }),
    }
}
