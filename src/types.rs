//! Core types shared across the rendering engine.

use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Boxed error returned by caller-supplied computations.
///
/// Domain failures inside a computation propagate through the engine
/// unchanged; the engine wraps them once with the field path and never
/// retries them.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A deferred field computation evaluated against a binding context.
///
/// Computations are captured at declaration time and run at most once per
/// instance, on first access of the field they back.
pub type ComputeFn = Rc<dyn Fn(&Context) -> Result<Value, BoxError>>;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Named values available to computations during resolution.
///
/// A context is bound at instance construction time and shared by a
/// resource and all of its relationships. Values are plain JSON; domain
/// objects enter the context pre-serialized (e.g. via `serde_json::json!`
/// or `serde_json::to_value`).
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: Map<String, Value>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a named value, consuming and returning the context.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Bind a named value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a bound value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Look up a bound value, erroring if the name is unbound.
    ///
    /// The error converts into [`BoxError`], so computations can use `?`
    /// directly:
    ///
    /// ```
    /// use jsonapi_render::Context;
    /// use serde_json::json;
    ///
    /// let ctx = Context::new().with("user", json!({ "name": "Lucas" }));
    /// let name = ctx.require("user").map(|u| u["name"].clone());
    /// assert_eq!(name.unwrap(), json!("Lucas"));
    /// assert!(ctx.require("post").is_err());
    /// ```
    pub fn require(&self, name: &str) -> Result<&Value, MissingContextValue> {
        self.values.get(name).ok_or_else(|| MissingContextValue {
            name: name.to_string(),
        })
    }

    /// Returns true if the name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Error for a context lookup of an unbound name.
#[derive(Debug, Clone, Error)]
#[error("missing context value `{name}`")]
pub struct MissingContextValue {
    /// The name that was looked up.
    pub name: String,
}

/// Options for a single render call.
///
/// `fields` is the sparse fieldset: the attribute and relationship names
/// to emit. When unset, every declared field is emitted. `include` names
/// the relationships whose linkage `data` should be expanded.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    fields: Option<HashSet<String>>,
    include: HashSet<String>,
}

impl RenderOptions {
    /// Create default options: all declared fields, no inclusions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict output to the given attribute/relationship names.
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Expand linkage data for the given relationship names.
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = names.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the fieldset admits the given field name.
    pub fn field_visible(&self, name: &str) -> bool {
        match &self.fields {
            Some(fields) => fields.contains(name),
            None => true,
        }
    }

    /// Whether the given relationship name is included.
    pub fn includes(&self, name: &str) -> bool {
        self.include.contains(name)
    }

    /// The set of included relationship names.
    pub fn include_set(&self) -> &HashSet<String> {
        &self.include
    }
}

/// Minimal `{type, id}` identification of a resource.
///
/// This is the unit of JSON:API linkage: enough to point at a resource
/// without materializing its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceIdentifier {
    /// The resource type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// The resource id.
    pub id: String,
}

impl ResourceIdentifier {
    /// Create an identifier from a type name and id.
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Render as a `{"type": ..., "id": ...}` JSON object.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(self.type_name.clone()));
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

/// Insert into an ordered entry list, replacing in place on name collision.
///
/// Declaration order is preserved; overriding a name keeps its original
/// position. This is the merge rule descriptor inheritance relies on.
pub(crate) fn insert_entry<T>(entries: &mut Vec<(String, T)>, name: String, value: T) {
    if let Some(slot) = entries.iter_mut().find(|(existing, _)| *existing == name) {
        slot.1 = value;
    } else {
        entries.push((name, value));
    }
}

/// Resolve a meta declaration: a fixed object wins over a computation.
///
/// A computation's result must be an object (kept) or null (treated as
/// absent).
pub(crate) fn resolve_meta(
    fixed: Option<&Map<String, Value>>,
    compute: Option<&ComputeFn>,
    context: &Context,
    path: &str,
) -> Result<Option<Value>, crate::error::RenderError> {
    if let Some(meta) = fixed {
        return Ok(Some(Value::Object(meta.clone())));
    }

    let Some(compute) = compute else {
        return Ok(None);
    };

    let value =
        compute(context).map_err(|source| crate::error::RenderError::computation(path, source))?;
    match value {
        Value::Object(_) => Ok(Some(value)),
        Value::Null => Ok(None),
        other => Err(crate::error::RenderError::InvalidMeta {
            path: path.to_string(),
            actual: json_type_name(&other).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_get_and_require() {
        let mut ctx = Context::new().with("user", json!({ "id": 1 }));
        ctx.insert("helper", json!("h"));
        assert_eq!(ctx.get("user"), Some(&json!({ "id": 1 })));
        assert!(ctx.contains("helper"));
        assert!(ctx.get("post").is_none());
        assert!(ctx.require("user").is_ok());

        let err = ctx.require("post").unwrap_err();
        assert_eq!(err.to_string(), "missing context value `post`");
    }

    #[test]
    fn default_options_admit_every_field() {
        let options = RenderOptions::new();
        assert!(options.field_visible("name"));
        assert!(options.field_visible("anything"));
        assert!(!options.includes("author"));
    }

    #[test]
    fn fieldset_restricts_fields() {
        let options = RenderOptions::new().fields(["name", "author"]);
        assert!(options.field_visible("name"));
        assert!(options.field_visible("author"));
        assert!(!options.field_visible("body"));
    }

    #[test]
    fn empty_fieldset_admits_nothing() {
        let options = RenderOptions::new().fields(Vec::<String>::new());
        assert!(!options.field_visible("name"));
    }

    #[test]
    fn identifier_renders_type_then_id() {
        let identifier = ResourceIdentifier::new("users", "7");
        assert_eq!(identifier.to_value(), json!({ "type": "users", "id": "7" }));
    }

    #[test]
    fn insert_entry_replaces_in_place() {
        let mut entries = vec![("a".to_string(), 1), ("b".to_string(), 2)];
        insert_entry(&mut entries, "a".to_string(), 10);
        insert_entry(&mut entries, "c".to_string(), 3);

        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(entries[0].1, 10);
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(true)), "boolean");
        assert_eq!(json_type_name(&json!(1)), "number");
        assert_eq!(json_type_name(&json!("a")), "string");
        assert_eq!(json_type_name(&json!([])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
