//! Declarative rendering of JSON:API documents.
//!
//! Callers declare, per resource type, how to derive an identifier, type
//! name, attributes, relationships, links, and meta from a binding
//! context; the engine resolves those declarations into JSON:API
//! resource, relationship, and error objects, honoring sparse fieldsets,
//! relationship inclusion, and linkage rules.
//!
//! # Example
//!
//! ```
//! use jsonapi_render::{Context, RenderOptions, Resource, ResourceDescriptor};
//! use serde_json::json;
//!
//! let users = ResourceDescriptor::builder()
//!     .type_name("users")
//!     .id(|ctx| Ok(ctx.require("user")?["id"].clone()))
//!     .attribute("name", |ctx| Ok(ctx.require("user")?["name"].clone()))
//!     .attribute("email", |ctx| Ok(ctx.require("user")?["email"].clone()))
//!     .build()
//!     .unwrap();
//!
//! let context = Context::new().with(
//!     "user",
//!     json!({ "id": "7", "name": "Lucas", "email": "lucas@example.com" }),
//! );
//! let resource = Resource::new(&users, context).unwrap();
//!
//! // Sparse fieldset: only `name` is resolved; `email` never runs.
//! let rendered = resource
//!     .render(&RenderOptions::new().fields(["name"]))
//!     .unwrap();
//! assert_eq!(
//!     rendered,
//!     json!({ "id": "7", "type": "users", "attributes": { "name": "Lucas" } })
//! );
//! ```
//!
//! # Resolution model
//!
//! | Field | Evaluated |
//! |-------|-----------|
//! | `id`, `type` | eagerly at construction |
//! | resource `links`, `meta` | eagerly at construction |
//! | attributes | lazily, when a render's fieldset asks |
//! | relationship `data` / `meta` / linkage | lazily |
//! | error scalar fields, `source` | lazily |
//!
//! Every computation runs at most once per instance regardless of how
//! many times its field is requested; failures propagate to the render
//! caller and are replayed on later access, never retried.
//!
//! The engine is single-threaded: descriptors hold `Rc` closures,
//! instances memoize through `OnceCell`, and one instance is expected to
//! be constructed fresh per render request.

mod document;
mod error;
mod error_object;
mod link;
mod relationship;
mod resource;
mod types;

pub use document::{render_collection, render_errors, render_one};
pub use error::{DeclarationError, RenderError};
pub use error_object::{
    ErrorDescriptor, ErrorDescriptorBuilder, ErrorField, ErrorObject, SourceBuilder, SourceFn,
};
pub use link::{LinkBuilder, LinkFn};
pub use relationship::{
    DataFn, Related, Relationship, RelationshipDescriptor, RelationshipDescriptorBuilder,
};
pub use resource::{Resource, ResourceDescriptor, ResourceDescriptorBuilder};
pub use types::{
    BoxError, ComputeFn, Context, MissingContextValue, RenderOptions, ResourceIdentifier,
};
