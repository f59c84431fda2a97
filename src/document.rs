//! Top-level document assembly.
//!
//! Thin layer over the per-entity render contract: renders primary data,
//! discovers `included` resources through
//! [`Resource::related`](crate::Resource::related), and deduplicates them
//! by `(type, id)`.

use std::collections::{HashSet, VecDeque};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::RenderError;
use crate::error_object::ErrorObject;
use crate::resource::Resource;
use crate::types::{RenderOptions, ResourceIdentifier};

/// Render a single-resource document: `{data: object|null, included?}`.
///
/// # Errors
///
/// Propagates the first failing field computation.
pub fn render_one(
    resource: Option<&Resource>,
    options: &RenderOptions,
) -> Result<Value, RenderError> {
    let mut out = Map::new();
    match resource {
        Some(resource) => {
            out.insert("data".to_string(), resource.render(options)?);
            let included = collect_included(&[resource], options)?;
            if !included.is_empty() {
                out.insert("included".to_string(), Value::Array(included));
            }
        }
        None => {
            out.insert("data".to_string(), Value::Null);
        }
    }
    Ok(Value::Object(out))
}

/// Render a resource-collection document: `{data: [...], included?}`.
///
/// # Errors
///
/// Propagates the first failing field computation.
pub fn render_collection(
    resources: &[Resource],
    options: &RenderOptions,
) -> Result<Value, RenderError> {
    let mut data = Vec::with_capacity(resources.len());
    for resource in resources {
        data.push(resource.render(options)?);
    }

    let mut out = Map::new();
    out.insert("data".to_string(), Value::Array(data));

    let roots: Vec<&Resource> = resources.iter().collect();
    let included = collect_included(&roots, options)?;
    if !included.is_empty() {
        out.insert("included".to_string(), Value::Array(included));
    }

    Ok(Value::Object(out))
}

/// Render an errors document: `{errors: [...]}`.
///
/// # Errors
///
/// Propagates the first failing field computation.
pub fn render_errors(errors: &[ErrorObject]) -> Result<Value, RenderError> {
    let mut rendered = Vec::with_capacity(errors.len());
    for error in errors {
        rendered.push(error.render()?);
    }

    let mut out = Map::new();
    out.insert("errors".to_string(), Value::Array(rendered));
    Ok(Value::Object(out))
}

/// Discover and render resources for the `included` array.
///
/// Breadth-first walk through `related(include)`, deduplicated by
/// `(type, id)`. Primary-data resources are seeded into the seen-set so
/// they never reappear under `included`; the seen-set also terminates
/// cyclic graphs.
fn collect_included(
    roots: &[&Resource],
    options: &RenderOptions,
) -> Result<Vec<Value>, RenderError> {
    let include = options.include_set();
    if include.is_empty() {
        return Ok(Vec::new());
    }

    let mut seen: HashSet<ResourceIdentifier> =
        roots.iter().map(|resource| resource.identifier()).collect();
    let mut queue: VecDeque<&Resource> = roots.iter().copied().collect();
    let mut included = Vec::new();

    while let Some(resource) = queue.pop_front() {
        for related in resource.related(include)? {
            if seen.insert(related.identifier()) {
                included.push(related.render(options)?);
                queue.push_back(related);
            }
        }
    }

    debug!(count = included.len(), "collected included resources");
    Ok(included)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::relationship::{Related, RelationshipDescriptor};
    use crate::resource::ResourceDescriptor;
    use crate::types::Context;

    fn authors() -> ResourceDescriptor {
        ResourceDescriptor::builder()
            .type_name("authors")
            .id(|ctx| Ok(ctx.require("author")?["id"].clone()))
            .attribute("name", |ctx| Ok(ctx.require("author")?["name"].clone()))
            .build()
            .unwrap()
    }

    fn articles() -> ResourceDescriptor {
        ResourceDescriptor::builder()
            .type_name("articles")
            .id(|ctx| Ok(ctx.require("article")?["id"].clone()))
            .relationship(
                "author",
                RelationshipDescriptor::builder()
                    .data(|ctx| {
                        let author = ctx.require("article")?["author"].clone();
                        let context = Context::new().with("author", author);
                        Ok(Related::One(Resource::new(&authors(), context)?))
                    })
                    .build(),
            )
            .build()
            .unwrap()
    }

    fn article(id: &str, author_id: &str) -> Resource {
        let context = Context::new().with(
            "article",
            json!({ "id": id, "author": { "id": author_id, "name": "Lucas" } }),
        );
        Resource::new(&articles(), context).unwrap()
    }

    #[test]
    fn null_data_document() {
        let doc = render_one(None, &RenderOptions::new()).unwrap();
        assert_eq!(doc, json!({ "data": null }));
    }

    #[test]
    fn no_include_no_included_key() {
        let doc = render_one(Some(&article("1", "9")), &RenderOptions::new()).unwrap();
        assert!(doc.get("included").is_none());
    }

    #[test]
    fn included_resources_are_discovered() {
        let options = RenderOptions::new().include(["author"]);
        let doc = render_one(Some(&article("1", "9")), &options).unwrap();

        assert_eq!(
            doc["data"]["relationships"]["author"]["data"],
            json!({ "type": "authors", "id": "9" })
        );
        assert_eq!(
            doc["included"],
            json!([{ "id": "9", "type": "authors", "attributes": { "name": "Lucas" } }])
        );
    }

    #[test]
    fn included_resources_dedup_by_identifier() {
        let resources = vec![article("1", "9"), article("2", "9")];
        let options = RenderOptions::new().include(["author"]);
        let doc = render_collection(&resources, &options).unwrap();

        assert_eq!(doc["data"].as_array().unwrap().len(), 2);
        assert_eq!(doc["included"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn errors_document() {
        use crate::error_object::{ErrorDescriptor, ErrorField, ErrorObject};

        let descriptor = ErrorDescriptor::builder()
            .value(ErrorField::Status, "404")
            .build();
        let errors = vec![
            ErrorObject::new(&descriptor, Context::new()).unwrap(),
            ErrorObject::new(&descriptor, Context::new().with("status", "500")).unwrap(),
        ];

        let doc = render_errors(&errors).unwrap();
        assert_eq!(
            doc,
            json!({ "errors": [{ "status": "404" }, { "status": "500" }] })
        );
    }
}
