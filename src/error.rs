//! Error types for descriptor declaration and document rendering.

use std::sync::Arc;

use thiserror::Error;

/// Errors raised while building a descriptor.
///
/// These are configuration errors: the declaration is incomplete and no
/// instance can be constructed from it. They surface from the builder's
/// `build()` so a half-declared type is rejected before any render.
#[derive(Debug, Clone, Error)]
pub enum DeclarationError {
    #[error("resource descriptor declares no `id` computation")]
    MissingId,

    #[error("resource descriptor declares neither a `type` value nor a `type` computation")]
    MissingType,
}

/// Errors raised while resolving or rendering an entity.
///
/// The `path` fields are slash-separated field paths within the entity,
/// e.g. `attributes/name` or `relationships/author/data`.
///
/// `RenderError` is `Clone`: resolved fields memoize their `Result`, so a
/// failed computation is replayed on later access instead of re-invoked.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    /// A caller-supplied computation failed. The source error is the
    /// domain error, untouched.
    #[error("computation at {path} failed: {source}")]
    Computation {
        path: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("id computation at {path} returned {actual}: expected string or integer")]
    InvalidId { path: String, actual: String },

    #[error("type computation at {path} returned {actual}: expected string")]
    InvalidType { path: String, actual: String },

    #[error("link computation at {path} returned {actual}: expected string, object, or null")]
    InvalidLink { path: String, actual: String },

    #[error("linkage computation at {path} returned {actual}: expected null, object, or array")]
    InvalidLinkage { path: String, actual: String },

    #[error("meta computation at {path} returned {actual}: expected object or null")]
    InvalidMeta { path: String, actual: String },
}

impl RenderError {
    /// Wrap a caller computation failure with its field path.
    pub(crate) fn computation(path: impl Into<String>, source: crate::types::BoxError) -> Self {
        RenderError::Computation {
            path: path.into(),
            source: Arc::from(source),
        }
    }
}
