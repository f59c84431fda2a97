//! Relationship resolution - a named edge from a resource to zero, one,
//! or many related resources.
//!
//! A relationship's links render eagerly when the owning resource is
//! constructed; its `data`, `meta`, and linkage resolve lazily and are
//! memoized. Compact `{type, id}` linkage comes from an explicit linkage
//! computation when one is declared, so emitting linkage never has to
//! materialize the full related resources.

use std::cell::OnceCell;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::RenderError;
use crate::link::{render_link, LinkBuilder, LinkFn};
use crate::resource::Resource;
use crate::types::{insert_entry, json_type_name, resolve_meta, BoxError, ComputeFn, Context};

/// A relationship data computation: resolves the related resource(s).
pub type DataFn = Rc<dyn Fn(&Context) -> Result<Related, BoxError>>;

/// Resolved related-resource value of a relationship.
pub enum Related {
    /// An empty to-one relationship.
    Null,
    /// A to-one relationship.
    One(Resource),
    /// A to-many relationship (possibly empty).
    Many(Vec<Resource>),
}

impl Related {
    /// Normalize to a sequence: empty for null, singleton for one.
    pub fn as_slice(&self) -> &[Resource] {
        match self {
            Related::Null => &[],
            Related::One(resource) => std::slice::from_ref(resource),
            Related::Many(resources) => resources,
        }
    }

    /// Returns true for an empty to-one relationship.
    pub fn is_null(&self) -> bool {
        matches!(self, Related::Null)
    }
}

impl From<Resource> for Related {
    fn from(resource: Resource) -> Self {
        Related::One(resource)
    }
}

impl From<Option<Resource>> for Related {
    fn from(resource: Option<Resource>) -> Self {
        match resource {
            Some(resource) => Related::One(resource),
            None => Related::Null,
        }
    }
}

impl From<Vec<Resource>> for Related {
    fn from(resources: Vec<Resource>) -> Self {
        Related::Many(resources)
    }
}

impl std::fmt::Debug for Related {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Related::Null => f.write_str("Related::Null"),
            Related::One(resource) => write!(f, "Related::One({:?})", resource),
            Related::Many(resources) => write!(f, "Related::Many({:?})", resources),
        }
    }
}

/// Declaration of one relationship: data, linkage, links, and meta
/// computations. All entries are optional.
#[derive(Clone, Default)]
pub struct RelationshipDescriptor {
    pub(crate) data: Option<DataFn>,
    pub(crate) linkage: Option<ComputeFn>,
    pub(crate) meta_value: Option<Map<String, Value>>,
    pub(crate) meta: Option<ComputeFn>,
    pub(crate) links: Vec<(String, LinkFn)>,
}

impl RelationshipDescriptor {
    /// Start building a relationship declaration.
    pub fn builder() -> RelationshipDescriptorBuilder {
        RelationshipDescriptorBuilder::default()
    }
}

/// Builder for [`RelationshipDescriptor`].
#[derive(Default)]
pub struct RelationshipDescriptorBuilder {
    descriptor: RelationshipDescriptor,
}

impl RelationshipDescriptorBuilder {
    /// Declare the data computation resolving the related resource(s).
    pub fn data<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Context) -> Result<Related, BoxError> + 'static,
    {
        self.descriptor.data = Some(Rc::new(compute));
        self
    }

    /// Declare an explicit linkage computation.
    ///
    /// Its result (null, a `{type, id}` object, or an array of them) is
    /// used as the relationship's `data` key instead of deriving linkage
    /// from the resolved data, so related resources are never
    /// materialized just to emit linkage.
    pub fn linkage<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Context) -> Result<Value, BoxError> + 'static,
    {
        self.descriptor.linkage = Some(Rc::new(compute));
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

    /// Declare a fixed meta object. Wins over a meta computation.
    pub fn meta(mut self, meta: Map<String, Value>) -> Self {
        self.descriptor.meta_value = Some(meta);
        self
    }

    /// Declare a meta computation.
    pub fn meta_with<F>(mut self, compute: F) -> Self
    where
        F: Fn(&Context) -> Result<Value, BoxError> + 'static,
    {
        self.descriptor.meta = Some(Rc::new(compute));
        self
    }

    /// Finish the declaration.
    pub fn build(self) -> RelationshipDescriptor {
        self.descriptor
    }
}

/// One relationship bound to its owning resource's context.
///
/// Constructed eagerly by [`Resource::new`](crate::Resource::new) (links
/// render at construction); everything else resolves lazily, at most
/// once.
pub struct Relationship {
    name: String,
    descriptor: RelationshipDescriptor,
    context: Rc<Context>,
    links: Map<String, Value>,
    data: OnceCell<Result<Related, RenderError>>,
    linkage: OnceCell<Result<Value, RenderError>>,
    meta: OnceCell<Result<Option<Value>, RenderError>>,
}

impl Relationship {
    pub(crate) fn new(
        name: String,
        descriptor: RelationshipDescriptor,
        context: Rc<Context>,
    ) -> Result<Self, RenderError> {
        let mut links = Map::new();
        for (link_name, compute) in &descriptor.links {
            let path = format!("relationships/{}/links/{}", name, link_name);
            links.insert(link_name.clone(), render_link(&context, compute, &path)?);
        }

        Ok(Self {
            name,
            descriptor,
            context,
            links,
            data: OnceCell::new(),
            linkage: OnceCell::new(),
            meta: OnceCell::new(),
        })
    }

    /// The related-resource value, resolved once and cached.
    ///
    /// A relationship declared without a data computation resolves to
    /// [`Related::Null`].
    ///
    /// # Errors
    ///
    /// Replays `RenderError::Computation` if the data computation failed.
    pub fn data(&self) -> Result<&Related, RenderError> {
        self.data
            .get_or_init(|| match &self.descriptor.data {
                Some(compute) => {
                    trace!(relationship = %self.name, "resolving relationship data");
                    compute(&self.context).map_err(|source| {
                        RenderError::computation(
                            format!("relationships/{}/data", self.name),
                            source,
                        )
                    })
                }
                None => Ok(Related::Null),
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// The relationship's meta, resolved once and cached. A fixed meta
    /// object wins over a meta computation.
    pub fn meta(&self) -> Result<Option<Value>, RenderError> {
        self.meta
            .get_or_init(|| {
                resolve_meta(
                    self.descriptor.meta_value.as_ref(),
                    self.descriptor.meta.as_ref(),
                    &self.context,
                    &format!("relationships/{}/meta", self.name),
                )
            })
            .clone()
    }

    /// Render as a JSON:API relationship object: `{links?, meta?, data?}`.
    ///
    /// The `data` key appears only when `included` is true and the
    /// relationship declares a linkage or data computation. Its value is
    /// the explicit linkage computation's result when one is declared,
    /// otherwise `{type, id}` linkage derived from the resolved data.
    pub fn render(&self, included: bool) -> Result<Value, RenderError> {
        let mut out = Map::new();

        if !self.links.is_empty() {
            out.insert("links".to_string(), Value::Object(self.links.clone()));
        }
        if let Some(meta) = self.meta()? {
            out.insert("meta".to_string(), meta);
        }
        if included && (self.descriptor.linkage.is_some() || self.descriptor.data.is_some()) {
            out.insert("data".to_string(), self.resolved_linkage()?);
        }

        Ok(Value::Object(out))
    }

    /// Linkage data for the `data` key, resolved once and cached.
    fn resolved_linkage(&self) -> Result<Value, RenderError> {
        self.linkage
            .get_or_init(|| {
                let Some(compute) = &self.descriptor.linkage else {
                    return self.derive_linkage();
                };

                let path = format!("relationships/{}/linkage", self.name);
                let value = compute(&self.context)
                    .map_err(|source| RenderError::computation(&path, source))?;
                match value {
                    Value::Null | Value::Object(_) | Value::Array(_) => Ok(value),
                    other => Err(RenderError::InvalidLinkage {
                        path,
                        actual: json_type_name(&other).to_string(),
                    }),
                }
            })
            .clone()
    }

    /// Derive `{type, id}` linkage by reflecting on the resolved data.
    fn derive_linkage(&self) -> Result<Value, RenderError> {
        let related = self.data()?;
        Ok(match related {
            Related::Null => Value::Null,
            Related::One(resource) => resource.identifier().to_value(),
            Related::Many(resources) => Value::Array(
                resources
                    .iter()
                    .map(|resource| resource.identifier().to_value())
                    .collect(),
            ),
        })
    }
}
