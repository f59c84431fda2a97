//! Integration tests for error object rendering.

use std::cell::Cell;
use std::rc::Rc;

use jsonapi_render::{render_errors, Context, ErrorDescriptor, ErrorField, ErrorObject};
use serde_json::{json, Value};

fn server_error() -> ErrorDescriptor {
    ErrorDescriptor::builder()
        .value(ErrorField::Status, "500")
        .value(ErrorField::Title, "Internal Server Error")
        .compute(ErrorField::Detail, |ctx| {
            Ok(ctx.get("reason").cloned().unwrap_or(Value::Null))
        })
        .build()
}

// === Precedence Tests ===

mod precedence {
    use super::*;

    #[test]
    fn class_fixed_value_by_default() {
        let error = ErrorObject::new(&server_error(), Context::new()).unwrap();
        assert_eq!(error.field(ErrorField::Status).unwrap(), Some(json!("500")));
    }

    #[test]
    fn instance_value_wins_over_class_declarations() {
        let context = Context::new().with("status", "404");
        let error = ErrorObject::new(&server_error(), context).unwrap();
        assert_eq!(error.field(ErrorField::Status).unwrap(), Some(json!("404")));
    }

    #[test]
    fn fixed_value_wins_over_computation() {
        let descriptor = ErrorDescriptor::builder()
            .value(ErrorField::Code, "fixed")
            .compute(ErrorField::Code, |_| Ok(json!("computed")))
            .build();
        let error = ErrorObject::new(&descriptor, Context::new()).unwrap();
        assert_eq!(error.field(ErrorField::Code).unwrap(), Some(json!("fixed")));
    }

    #[test]
    fn instance_value_beats_computation_too() {
        let descriptor = ErrorDescriptor::builder()
            .compute(ErrorField::Title, |_| Ok(json!("computed")))
            .build();
        let context = Context::new().with("title", "supplied");
        let error = ErrorObject::new(&descriptor, context).unwrap();
        assert_eq!(
            error.field(ErrorField::Title).unwrap(),
            Some(json!("supplied"))
        );
    }

    #[test]
    fn overridden_computation_never_runs() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let descriptor = ErrorDescriptor::builder()
            .compute(ErrorField::Status, move |_| {
                counter.set(counter.get() + 1);
                Ok(json!("500"))
            })
            .build();

        let context = Context::new().with("status", "404");
        let error = ErrorObject::new(&descriptor, context).unwrap();
        error.render().unwrap();
        assert_eq!(calls.get(), 0);
    }
}

// === Rendering Tests ===

mod rendering {
    use super::*;

    #[test]
    fn renders_declared_fields_in_order() {
        let context = Context::new().with("reason", "the database went away");
        let error = ErrorObject::new(&server_error(), context).unwrap();

        assert_eq!(
            error.render().unwrap(),
            json!({
                "status": "500",
                "title": "Internal Server Error",
                "detail": "the database went away"
            })
        );
    }

    #[test]
    fn null_resolutions_are_omitted() {
        // No `reason` bound: the detail computation resolves to null.
        let error = ErrorObject::new(&server_error(), Context::new()).unwrap();
        assert_eq!(
            error.render().unwrap(),
            json!({ "status": "500", "title": "Internal Server Error" })
        );
    }

    #[test]
    fn empty_descriptor_renders_empty_object() {
        let descriptor = ErrorDescriptor::builder().build();
        let error = ErrorObject::new(&descriptor, Context::new()).unwrap();
        assert_eq!(error.render().unwrap(), json!({}));
    }

    #[test]
    fn source_and_links_render() {
        let descriptor = ErrorDescriptor::builder()
            .value(ErrorField::Status, "422")
            .source(|ctx, source| {
                let pointer = ctx.require("pointer")?;
                source
                    .pointer(pointer.as_str().unwrap_or_default())
                    .header("Content-Type");
                Ok(())
            })
            .link("about", |_, link| {
                link.href("https://example.com/errors/validation");
                Ok(Value::Null)
            })
            .build();

        let context = Context::new().with("pointer", "/data/attributes/title");
        let error = ErrorObject::new(&descriptor, context).unwrap();

        assert_eq!(
            error.render().unwrap(),
            json!({
                "links": { "about": { "href": "https://example.com/errors/validation" } },
                "status": "422",
                "source": {
                    "pointer": "/data/attributes/title",
                    "header": "Content-Type"
                }
            })
        );
    }

    #[test]
    fn computation_failure_propagates() {
        let descriptor = ErrorDescriptor::builder()
            .compute(ErrorField::Detail, |ctx| Ok(ctx.require("missing")?.clone()))
            .build();
        let error = ErrorObject::new(&descriptor, Context::new()).unwrap();

        let err = error.render().unwrap_err();
        assert_eq!(
            err.to_string(),
            "computation at detail failed: missing context value `missing`"
        );
    }
}

// === Inheritance Tests ===

mod inheritance {
    use super::*;

    #[test]
    fn subtype_inherits_and_overrides() {
        let child = server_error()
            .extend()
            .value(ErrorField::Status, "503")
            .value(ErrorField::Title, "Service Unavailable")
            .build();

        let error = ErrorObject::new(&child, Context::new()).unwrap();
        assert_eq!(
            error.render().unwrap(),
            json!({ "status": "503", "title": "Service Unavailable" })
        );
    }

    #[test]
    fn link_declarations_merge_by_name() {
        let parent = ErrorDescriptor::builder()
            .link("about", |_, _| Ok(json!("https://example.com/parent")))
            .build();
        let child = parent
            .extend()
            .link("about", |_, _| Ok(json!("https://example.com/child")))
            .link("docs", |_, _| Ok(json!("https://example.com/docs")))
            .build();

        let error = ErrorObject::new(&child, Context::new()).unwrap();
        assert_eq!(
            error.render().unwrap(),
            json!({ "links": {
                "about": "https://example.com/child",
                "docs": "https://example.com/docs"
            } })
        );
    }
}

// === Document Tests ===

mod errors_document {
    use super::*;

    #[test]
    fn collects_rendered_errors() {
        let errors = vec![
            ErrorObject::new(&server_error(), Context::new()).unwrap(),
            ErrorObject::new(&server_error(), Context::new().with("status", "502")).unwrap(),
        ];

        let doc = render_errors(&errors).unwrap();
        let rendered = doc["errors"].as_array().unwrap();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0]["status"], json!("500"));
        assert_eq!(rendered[1]["status"], json!("502"));
    }
}
