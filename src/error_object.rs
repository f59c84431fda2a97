//! Error object resolution - JSON:API error objects.
//!
//! Scalar fields (`id`, `status`, `code`, `title`, `detail`, `meta`) are
//! declared at the type level with a fixed value, a computation, or both,
//! and may be overridden per instance through the binding context.
//! Precedence: instance-supplied value, then fixed value, then
//! computation. `source` is an open-ended key/value accumulation.

use std::cell::OnceCell;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::link::{render_link, LinkBuilder, LinkFn};
use crate::types::{insert_entry, json_type_name, BoxError, ComputeFn, Context};

/// Scalar fields of a JSON:API error object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorField {
    Id,
    Status,
    Code,
    Title,
    Detail,
    Meta,
}

impl ErrorField {
    /// All scalar fields, in JSON:API output order.
    pub const ALL: [ErrorField; 6] = [
        ErrorField::Id,
        ErrorField::Status,
        ErrorField::Code,
        ErrorField::Title,
        ErrorField::Detail,
        ErrorField::Meta,
    ];

    /// The output key for this field.
    pub fn key(self) -> &'static str {
        match self {
            ErrorField::Id => "id",
            ErrorField::Status => "status",
            ErrorField::Code => "code",
            ErrorField::Title => "title",
            ErrorField::Detail => "detail",
            ErrorField::Meta => "meta",
        }
    }

    fn index(self) -> usize {
        match self {
            ErrorField::Id => 0,
            ErrorField::Status => 1,
            ErrorField::Code => 2,
            ErrorField::Title => 3,
            ErrorField::Detail => 4,
            ErrorField::Meta => 5,
        }
    }
}

/// A source computation accumulating origin key/value pairs.
pub type SourceFn = Rc<dyn Fn(&Context, &mut SourceBuilder) -> Result<(), BoxError>>;

/// Builder handed to source computations.
///
/// Each setter inserts one key/value pair; the shape is open-ended, with
/// conveniences for the pairs JSON:API names.
#[derive(Debug, Default)]
pub struct SourceBuilder {
    entries: Map<String, Value>,
}

impl SourceBuilder {
    /// Insert an arbitrary source entry.
    pub fn field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// Insert a `pointer` entry (a JSON Pointer into the request document).
    pub fn pointer(&mut self, pointer: impl Into<String>) -> &mut Self {
        self.field("pointer", pointer.into())
    }

    /// Insert a `parameter` entry (the offending query parameter).
    pub fn parameter(&mut self, parameter: impl Into<String>) -> &mut Self {
        self.field("parameter", parameter.into())
    }

    /// Insert a `header` entry (the offending request header).
    pub fn header(&mut self, header: impl Into<String>) -> &mut Self {
        self.field("header", header.into())
    }
}

#[derive(Clone, Default)]
struct FieldSpec {
    value: Option<Value>,
    compute: Option<ComputeFn>,
}

/// Declaration of an error type: per-field fixed values and/or
/// computations, a source computation, and named links.
#[derive(Clone, Default)]
pub struct ErrorDescriptor {
    fields: [FieldSpec; 6],
    source: Option<SourceFn>,
    links: Vec<(String, LinkFn)>,
}

impl ErrorDescriptor {
    /// Start building an error type declaration.
    pub fn builder() -> ErrorDescriptorBuilder {
        ErrorDescriptorBuilder::default()
    }

    /// Start building a subtype declaration seeded with this descriptor's
    /// entries.
    ///
    /// Overlays are per slot: a child fixed value coexists with an
    /// inherited computation (the precedence rule resolves them), and
    /// link declarations merge by name like resource fields.
    pub fn extend(&self) -> ErrorDescriptorBuilder {
        ErrorDescriptorBuilder {
            descriptor: self.clone(),
        }
    }
}

/// Builder for [`ErrorDescriptor`].
#[derive(Default)]
pub struct ErrorDescriptorBuilder {
    descriptor: ErrorDescriptor,
}

impl ErrorDescriptorBuilder {
    /// Declare a fixed value for a scalar field. Wins over the field's
    /// computation.
    pub fn value(mut self, field: ErrorField, value: impl Into<Value>) -> Self {
        self.descriptor.fields[field.index()].value = Some(value.into());
        self
    }

    /// Declare a computation for a scalar field.
    pub fn compute<F>(mut self, field: ErrorField, compute: F) -> Self
    where
        F: Fn(&Context) -> Result<Value, BoxError> + 'static,
    {
        self.descriptor.fields[field.index()].compute = Some(Rc::new(compute));
        self
    }

    /// Declare the source computation.
    pub fn source<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Context, &mut SourceBuilder) -> Result<(), BoxError> + 'static,
    {
        self.descriptor.source = Some(Rc::new(compute));
        self
    }

    /// Declare a named link.
    pub fn link<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Context, &mut LinkBuilder) -> Result<Value, BoxError> + 'static,
    {
        insert_entry(&mut self.descriptor.links, name.into(), Rc::new(compute));
        self
    }

    /// Finish the declaration. Every entry is optional.
    pub fn build(self) -> ErrorDescriptor {
        self.descriptor
    }
}

/// One error object instance: a descriptor bound to a binding context.
///
/// Links render eagerly at construction; scalar fields and `source`
/// resolve lazily, at most once each.
pub struct ErrorObject {
    descriptor: ErrorDescriptor,
    context: Context,
    links: Map<String, Value>,
    fields: [OnceCell<Result<Option<Value>, RenderError>>; 6],
    source: OnceCell<Result<Option<Value>, RenderError>>,
}

impl ErrorObject {
    /// Bind a descriptor to a context.
    ///
    /// Context entries named after a scalar field (`"status"`, `"title"`,
    /// ...) override that field for this instance.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if a link computation fails or produces a
    /// non-link value.
    pub fn new(descriptor: &ErrorDescriptor, context: Context) -> Result<Self, RenderError> {
        let mut links = Map::new();
        for (name, compute) in &descriptor.links {
            let path = format!("links/{}", name);
            links.insert(name.clone(), render_link(&context, compute, &path)?);
        }

        Ok(Self {
            descriptor: descriptor.clone(),
            context,
            links,
            fields: Default::default(),
            source: OnceCell::new(),
        })
    }

    /// Resolve one scalar field, memoized.
    ///
    /// Returns `None` when the field is undeclared or resolves to null
    /// (either way the key is omitted from output). A resolved `meta`
    /// must be an object.
    pub fn field(&self, field: ErrorField) -> Result<Option<Value>, RenderError> {
        self.fields[field.index()]
            .get_or_init(|| {
                let resolved = self.resolve_field(field)?;
                let resolved = resolved.filter(|value| !value.is_null());

                if field == ErrorField::Meta {
                    if let Some(value) = &resolved {
                        if !value.is_object() {
                            return Err(RenderError::InvalidMeta {
                                path: "meta".to_string(),
                                actual: json_type_name(value).to_string(),
                            });
                        }
                    }
                }

                Ok(resolved)
            })
            .clone()
    }

    /// Pick the field's value by precedence: instance context entry, then
    /// fixed value, then computation.
    fn resolve_field(&self, field: ErrorField) -> Result<Option<Value>, RenderError> {
        if let Some(value) = self.context.get(field.key()) {
            return Ok(Some(value.clone()));
        }

        let spec = &self.descriptor.fields[field.index()];
        if let Some(value) = &spec.value {
            return Ok(Some(value.clone()));
        }
        if let Some(compute) = &spec.compute {
            let value = compute(&self.context)
                .map_err(|source| RenderError::computation(field.key(), source))?;
            return Ok(Some(value));
        }

        Ok(None)
    }

    /// The accumulated source mapping, resolved once and cached. `None`
    /// when no source computation is declared or it set no entry.
    pub fn source(&self) -> Result<Option<Value>, RenderError> {
        self.source
            .get_or_init(|| {
                let Some(compute) = &self.descriptor.source else {
                    return Ok(None);
                };

                let mut builder = SourceBuilder::default();
                compute(&self.context, &mut builder)
                    .map_err(|source| RenderError::computation("source", source))?;

                if builder.entries.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Value::Object(builder.entries)))
                }
            })
            .clone()
    }

    /// Render as a JSON:API error object, omitting absent fields.
    pub fn render(&self) -> Result<Value, RenderError> {
        let mut out = Map::new();

        if !self.links.is_empty() {
            out.insert("links".to_string(), Value::Object(self.links.clone()));
        }
        for field in ErrorField::ALL {
            if let Some(value) = self.field(field)? {
                out.insert(field.key().to_string(), value);
            }
        }
        if let Some(source) = self.source()? {
            out.insert("source".to_string(), source);
        }

        Ok(Value::Object(out))
    }
}
