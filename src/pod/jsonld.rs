//! Minimal JSON-LD reading
//!
//! Pods answer `application/ld+json` in either expanded or compacted form.
//! These helpers accept full IRIs, `prefix:local` keys and bare local names.

use reqwest::Url;
use serde_json::{Map, Value};

pub(crate) const LDP: &str = "http://www.w3.org/ns/ldp#";
pub(crate) const ACL: &str = "http://www.w3.org/ns/auth/acl#";

/// All node objects in a document (top-level array, `@graph`, or single node)
pub(crate) fn nodes(doc: &Value) -> Vec<&Map<String, Value>> {
    match doc {
        Value::Array(items) => items.iter().flat_map(nodes).collect(),
        Value::Object(obj) => match obj.get("@graph") {
            Some(graph) => nodes(graph),
            None => vec![obj],
        },
        _ => Vec::new(),
    }
}

fn prefix_of(namespace: &str) -> &'static str {
    match namespace {
        LDP => "ldp",
        ACL => "acl",
        _ => "",
    }
}

/// Values of a property, looked up by full IRI, prefixed name or local name
pub(crate) fn property<'a>(
    node: &'a Map<String, Value>,
    namespace: &str,
    local: &str,
) -> Option<&'a Value> {
    let full = format!("{}{}", namespace, local);
    let prefixed = format!("{}:{}", prefix_of(namespace), local);
    node.get(&full)
        .or_else(|| node.get(&prefixed))
        .or_else(|| node.get(local))
}

/// IRIs referenced by a value: strings, `{"@id": ..}` objects, or arrays of either
pub(crate) fn iris(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Object(obj) => obj
            .get("@id")
            .and_then(Value::as_str)
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        Value::Array(items) => items.iter().flat_map(iris).collect(),
        _ => Vec::new(),
    }
}

/// `@type` values of a node
pub(crate) fn types(node: &Map<String, Value>) -> Vec<String> {
    node.get("@type").map(iris).unwrap_or_default()
}

/// Resolve a possibly relative IRI against a base URL
pub(crate) fn resolve(base: &str, iri: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(iri)) {
        Ok(url) => url.to_string(),
        Err(_) => iri.to_string(),
    }
}

/// Strip a namespace or prefix from an IRI, leaving the local name
pub(crate) fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', ':', '/']).next().unwrap_or(iri)
}
