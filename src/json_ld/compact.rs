use serde_json::{Map, Value};
use tracing::debug;

use super::context::Context;
use super::vocab::{CONTEXT, ID, TYPE, Term};

/// Rewrite a node object from `active` terms to `target` terms and attach
/// `context_ref` as its `@context`.
pub(super) fn compact_document(
    document: Map<String, Value>,
    active: &Context,
    target: &Context,
    context_ref: Value,
) -> Value {
    let mut result = compact_node(document, active, target);
    result.insert(CONTEXT.as_str().to_owned(), context_ref);
    Value::Object(result)
}

fn compact_node(node: Map<String, Value>, active: &Context, target: &Context) -> Map<String, Value> {
    let mut result = Map::new();
    for (key, value) in node {
        if key == CONTEXT.as_str() {
            continue;
        }
        let Some(term) = active.expand_property(&key) else {
            debug!(target: "json_ld", key, "dropping property without a term definition");
            continue;
        };
        let value = if term == TYPE {
            compact_types(value, active, target)
        } else if term == ID {
            value
        } else {
            compact_value(value, active, target)
        };
        result.insert(target.compact_iri(&term), value);
    }
    result
}

fn compact_value(value: Value, active: &Context, target: &Context) -> Value {
    match value {
        Value::Object(node) => Value::Object(compact_node(node, active, target)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| compact_value(item, active, target))
                .collect(),
        ),
        other => other,
    }
}

fn compact_types(value: Value, active: &Context, target: &Context) -> Value {
    let compact_type = |ty: &str| -> Value {
        let expanded: Term = active.expand_type(ty);
        Value::String(target.compact_iri(&expanded))
    };
    match value {
        Value::String(ty) => compact_type(&ty),
        Value::Array(types) => Value::Array(
            types
                .into_iter()
                .map(|ty| match ty {
                    Value::String(ty) => compact_type(&ty),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::{Value, json};

    use crate::json_ld::context::{Context, normalize};

    use super::compact_document;

    fn context(definition: Value) -> Result<Context> {
        let definitions = normalize(&definition)?;
        Context::try_from(definitions.as_slice())
    }

    fn as_object(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn rename_properties_between_contexts() -> Result<()> {
        let active = context(json!({
            "@vocab": "https://schema.org/",
            "id": "@id",
            "type": "@type"
        }))?;
        let target = context(json!({
            "s": "https://schema.org/",
            "kind": "@type",
            "label": "https://schema.org/name"
        }))?;
        let document = as_object(json!({
            "@context": "http://local/context/default",
            "id": "http://local/widgets/1",
            "type": "Widget",
            "name": "Sprocket",
            "color": "red"
        }));
        let result = compact_document(document, &active, &target, json!("http://other/ctx"));
        assert_eq!(
            result,
            json!({
                "@context": "http://other/ctx",
                "@id": "http://local/widgets/1",
                "kind": "s:Widget",
                "label": "Sprocket",
                "s:color": "red"
            })
        );
        Ok(())
    }

    #[test]
    fn nested_nodes_and_arrays() -> Result<()> {
        let active = context(json!({"@vocab": "https://schema.org/", "type": "@type"}))?;
        let target = active.clone();
        let document = as_object(json!({
            "type": ["Widget", "https://schema.org/Product"],
            "parts": [{"type": "Part", "name": "bolt"}, "https://example.com/nut"],
            "maker": {"name": "ACME"}
        }));
        let result = compact_document(document, &active, &target, json!("ctx"));
        assert_eq!(
            result,
            json!({
                "@context": "ctx",
                "type": ["Widget", "Product"],
                "parts": [{"type": "Part", "name": "bolt"}, "https://example.com/nut"],
                "maker": {"name": "ACME"}
            })
        );
        Ok(())
    }

    #[test]
    fn unmapped_properties_are_dropped() -> Result<()> {
        let active = context(json!({"name": "http://xmlns.com/foaf/0.1/name"}))?;
        let target = active.clone();
        let document = as_object(json!({"name": "Alice", "nickname": "Al"}));
        let result = compact_document(document, &active, &target, json!("ctx"));
        assert_eq!(result, json!({"@context": "ctx", "name": "Alice"}));
        Ok(())
    }
}
