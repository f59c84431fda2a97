//! Resource resolution - the central entity turning a declared type
//! descriptor plus a binding context into a JSON:API resource object.
//!
//! Identity (`id`, `type`), `meta`, and `links` resolve eagerly at
//! construction: every representation needs identity for linkage even
//! when all fields are filtered out. Attributes resolve lazily, at most
//! once each, and only when a render's fieldset asks for them.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{DeclarationError, RenderError};
use crate::link::{render_link, LinkBuilder, LinkFn};
use crate::relationship::{Relationship, RelationshipDescriptor};
use crate::types::{
    insert_entry, json_type_name, resolve_meta, BoxError, ComputeFn, Context, RenderOptions,
    ResourceIdentifier,
};

/// Declaration of a resource type: how to derive identity, attributes,
/// relationships, links, and meta from a binding context.
///
/// Descriptors are declared once per resource type and shared across
/// every instance of it. Subtypes compose with [`ResourceDescriptor::extend`].
#[derive(Clone)]
pub struct ResourceDescriptor {
    pub(crate) type_value: Option<String>,
    pub(crate) type_compute: Option<ComputeFn>,
    pub(crate) id: ComputeFn,
    pub(crate) attributes: Vec<(String, ComputeFn)>,
    pub(crate) relationships: Vec<(String, RelationshipDescriptor)>,
    pub(crate) links: Vec<(String, LinkFn)>,
    pub(crate) meta_value: Option<Map<String, Value>>,
    pub(crate) meta: Option<ComputeFn>,
}

impl ResourceDescriptor {
    /// Start building a resource type declaration.
    pub fn builder() -> ResourceDescriptorBuilder {
        ResourceDescriptorBuilder::default()
    }

    /// Start building a subtype declaration seeded with this descriptor's
    /// entries.
    ///
    /// The child's declarations overlay the parent's: redeclaring a name
    /// replaces its computation in place, new names append. The parent is
    /// never mutated.
    pub fn extend(&self) -> ResourceDescriptorBuilder {
        ResourceDescriptorBuilder {
            type_value: self.type_value.clone(),
            type_compute: self.type_compute.clone(),
            id: Some(self.id.clone()),
            attributes: self.attributes.clone(),
            relationships: self.relationships.clone(),
            links: self.links.clone(),
            meta_value: self.meta_value.clone(),
            meta: self.meta.clone(),
        }
    }

    /// Declared attribute and relationship names, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.relationships.iter().map(|(name, _)| name.as_str()))
    }
}

/// Builder for [`ResourceDescriptor`].
#[derive(Default)]
pub struct ResourceDescriptorBuilder {
    type_value: Option<String>,
    type_compute: Option<ComputeFn>,
    id: Option<ComputeFn>,
    attributes: Vec<(String, ComputeFn)>,
    relationships: Vec<(String, RelationshipDescriptor)>,
    links: Vec<(String, LinkFn)>,
    meta_value: Option<Map<String, Value>>,
    meta: Option<ComputeFn>,
}

impl ResourceDescriptorBuilder {
    /// Declare a fixed type name. Wins over a type computation.
    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_value = Some(type_name.into());
        self
    }

    /// Declare a type computation. Must resolve to a string.
    pub fn type_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Context) -> Result<Value, BoxError> + 'static,
    {
        self.type_compute = Some(Rc::new(compute));
        self
    }

    /// Declare the id computation. Must resolve to a string or integer.
    pub fn id<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Context) -> Result<Value, BoxError> + 'static,
    {
        self.id = Some(Rc::new(compute));
        self
    }

    /// Declare a named attribute computation.
    pub fn attribute<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Context) -> Result<Value, BoxError> + 'static,
    {
        insert_entry(&mut self.attributes, name.into(), Rc::new(compute));
        self
    }

    /// Declare a named relationship.
    pub fn relationship(
        mut self,
        name: impl Into<String>,
        descriptor: RelationshipDescriptor,
    ) -> Self {
        insert_entry(&mut self.relationships, name.into(), descriptor);
        self
    }

    /// Declare a named link.
    pub fn link<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Context, &mut LinkBuilder) -> Result<Value, BoxError> + 'static,
    {
        insert_entry(&mut self.links, name.into(), Rc::new(compute));
        self
    }

    /// Declare a fixed meta object. Wins over a meta computation.
    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta_value = Some(meta);
        self
    }

    /// Declare a meta computation. Must resolve to an object or null.
    pub fn meta_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Context) -> Result<Value, BoxError> + 'static,
    {
        self.meta = Some(Rc::new(compute));
        self
    }

    /// Finish the declaration.
    ///
    /// # Errors
    ///
    /// Returns `DeclarationError` if no id computation was declared, or
    /// if neither a type value nor a type computation was declared.
    pub fn build(self) -> Result<ResourceDescriptor, DeclarationError> {
        let id = self.id.ok_or(DeclarationError::MissingId)?;
        if self.type_value.is_none() && self.type_compute.is_none() {
            return Err(DeclarationError::MissingType);
        }

        Ok(ResourceDescriptor {
            type_value: self.type_value,
            type_compute: self.type_compute,
            id,
            attributes: self.attributes,
            relationships: self.relationships,
            links: self.links,
            meta_value: self.meta_value,
            meta: self.meta,
        })
    }
}

struct AttributeSlot {
    compute: ComputeFn,
    cell: OnceCell<Result<Value, RenderError>>,
}

/// One resource instance: a descriptor bound to a binding context.
///
/// Instances are constructed fresh per render request and discarded
/// afterwards; all lazily resolved fields are memoized for the instance's
/// lifetime.
pub struct Resource {
    type_name: String,
    id: String,
    meta: Option<Value>,
    links: Map<String, Value>,
    relationships: Vec<(String, Relationship)>,
    attributes: Vec<(String, AttributeSlot)>,
    context: Rc<Context>,
}

impl Resource {
    /// Bind a descriptor to a context.
    ///
    /// Resolves `id`, `type`, `meta`, and `links` eagerly, and constructs
    /// one [`Relationship`] per declared relationship name (each
    /// internally lazy).
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Computation` if an eager computation fails,
    /// or a shape error if `id`/`type`/`meta`/link values resolve to the
    /// wrong JSON type.
    pub fn new(descriptor: &ResourceDescriptor, context: Context) -> Result<Self, RenderError> {
        let context = Rc::new(context);

        let id = match (descriptor.id)(&context)
            .map_err(|source| RenderError::computation("id", source))?
        {
            Value::String(id) => id,
            Value::Number(id) if id.is_i64() || id.is_u64() => id.to_string(),
            other => {
                return Err(RenderError::InvalidId {
                    path: "id".to_string(),
                    actual: json_type_name(&other).to_string(),
                })
            }
        };

        let type_name = match (&descriptor.type_value, &descriptor.type_compute) {
            (Some(type_name), _) => type_name.clone(),
            (None, Some(compute)) => {
                match compute(&context).map_err(|source| RenderError::computation("type", source))?
                {
                    Value::String(type_name) => type_name,
                    other => {
                        return Err(RenderError::InvalidType {
                            path: "type".to_string(),
                            actual: json_type_name(&other).to_string(),
                        })
                    }
                }
            }
            // Builders reject this declaration, so instances never see it.
            (None, None) => return Err(DeclarationError::MissingType.into()),
        };

        let meta = resolve_meta(
            descriptor.meta_value.as_ref(),
            descriptor.meta.as_ref(),
            &context,
            "meta",
        )?;

        let mut links = Map::new();
        for (name, compute) in &descriptor.links {
            let path = format!("links/{}", name);
            links.insert(name.clone(), render_link(&context, compute, &path)?);
        }

        let mut relationships = Vec::with_capacity(descriptor.relationships.len());
        for (name, rel_descriptor) in &descriptor.relationships {
            let relationship =
                Relationship::new(name.clone(), rel_descriptor.clone(), context.clone())?;
            relationships.push((name.clone(), relationship));
        }

        let attributes = descriptor
            .attributes
            .iter()
            .map(|(name, compute)| {
                (
                    name.clone(),
                    AttributeSlot {
                        compute: compute.clone(),
                        cell: OnceCell::new(),
                    },
                )
            })
            .collect();

        debug!(type_name = %type_name, id = %id, "constructed resource");

        Ok(Self {
            type_name,
            id,
            meta,
            links,
            relationships,
            attributes,
            context,
        })
    }

    /// The resolved type name. Never triggers field resolution.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The resolved id. Never triggers field resolution.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The `{type, id}` identifier for linkage.
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(&self.type_name, &self.id)
    }

    /// Resolve one declared attribute, memoized. `None` for an undeclared
    /// name.
    pub fn attribute(&self, name: &str) -> Option<Result<Value, RenderError>> {
        let (_, slot) = self.attributes.iter().find(|(n, _)| n == name)?;
        Some(self.resolve_attribute(name, slot))
    }

    /// The declared relationship with the given name, if any.
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, relationship)| relationship)
    }

    fn resolve_attribute(&self, name: &str, slot: &AttributeSlot) -> Result<Value, RenderError> {
        slot.cell
            .get_or_init(|| {
                trace!(attribute = %name, "resolving attribute");
                (slot.compute)(&self.context).map_err(|source| {
                    RenderError::computation(format!("attributes/{}", name), source)
                })
            })
            .clone()
    }

    /// Render as a JSON:API resource object.
    ///
    /// `attributes` and `relationships` contain only declared names
    /// admitted by the fieldset (all declared names by default); a
    /// filtered field's computation is never invoked. The
    /// `attributes`/`relationships`/`links`/`meta` keys are omitted
    /// entirely when empty.
    ///
    /// # Errors
    ///
    /// Propagates the first failing field computation; nothing is
    /// silently omitted.
    pub fn render(&self, options: &RenderOptions) -> Result<Value, RenderError> {
        let mut out = Map::new();
        out.insert("id".to_string(), Value::String(self.id.clone()));
        out.insert("type".to_string(), Value::String(self.type_name.clone()));

        let mut attributes = Map::new();
        for (name, slot) in &self.attributes {
            if options.field_visible(name) {
                attributes.insert(name.clone(), self.resolve_attribute(name, slot)?);
            }
        }
        if !attributes.is_empty() {
            out.insert("attributes".to_string(), Value::Object(attributes));
        }

        let mut relationships = Map::new();
        for (name, relationship) in &self.relationships {
            if options.field_visible(name) {
                relationships.insert(name.clone(), relationship.render(options.includes(name))?);
            }
        }
        if !relationships.is_empty() {
            out.insert("relationships".to_string(), Value::Object(relationships));
        }

        if !self.links.is_empty() {
            out.insert("links".to_string(), Value::Object(self.links.clone()));
        }
        if let Some(meta) = &self.meta {
            out.insert("meta".to_string(), meta.clone());
        }

        Ok(Value::Object(out))
    }

    /// Resolved related resources for the given include set, normalized
    /// to a flat sequence.
    ///
    /// This is the hook a document assembler uses to discover resources
    /// for the `included` array. Relationship names not declared on this
    /// resource are ignored.
    pub fn related(&self, include: &HashSet<String>) -> Result<Vec<&Resource>, RenderError> {
        let mut related = Vec::new();
        for (name, relationship) in &self.relationships {
            if include.contains(name) {
                related.extend(relationship.data()?.as_slice().iter());
            }
        }
        Ok(related)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("type", &self.type_name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
