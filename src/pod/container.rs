//! Container listings

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::jsonld::{iris, nodes, property, resolve, LDP};

fn same_container(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Whether `node` describes the container itself
///
/// A document made of one node without `@id` is taken to describe the
/// container it was fetched from.
fn is_container_node(container_url: &str, node: &Map<String, Value>, lone: bool) -> bool {
    match node.get("@id").and_then(Value::as_str) {
        Some(id) => same_container(&resolve(container_url, id), container_url),
        None => lone,
    }
}

/// Resources the container itself lists under `ldp:contains`, as absolute URLs
///
/// Members of other containers described in the same document are ignored.
/// Duplicates are collapsed. Order is unspecified; callers sort.
pub fn contained_resources(container_url: &str, doc: &Value) -> Vec<String> {
    let all = nodes(doc);
    let lone = all.len() == 1;
    let mut found = BTreeSet::new();
    for node in all {
        if !is_container_node(container_url, node, lone) {
            continue;
        }
        if let Some(contains) = property(node, LDP, "contains") {
            for iri in iris(contains) {
                found.insert(resolve(container_url, &iri));
            }
        }
    }
    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expanded_listing() {
        let doc = json!([
            {
                "@id": "https://client.example/inbox/",
                "@type": ["http://www.w3.org/ns/ldp#Container"],
                "http://www.w3.org/ns/ldp#contains": [
                    {"@id": "https://client.example/inbox/b.jsonld"},
                    {"@id": "https://client.example/inbox/a.jsonld"}
                ]
            },
            {"@id": "https://client.example/inbox/a.jsonld"}
        ]);
        let listing = contained_resources("https://client.example/inbox/", &doc);
        assert_eq!(
            listing,
            vec![
                "https://client.example/inbox/a.jsonld",
                "https://client.example/inbox/b.jsonld"
            ]
        );
    }

    #[test]
    fn test_compacted_relative_listing() {
        let doc = json!({
            "@context": {"ldp": "http://www.w3.org/ns/ldp#"},
            "@id": "",
            "ldp:contains": [{"@id": "n1"}, {"@id": "n1"}]
        });
        let listing = contained_resources("https://client.example/inbox/", &doc);
        assert_eq!(listing, vec!["https://client.example/inbox/n1"]);
    }

    #[test]
    fn test_empty_container() {
        let doc = json!({"@id": "https://client.example/inbox/"});
        assert!(contained_resources("https://client.example/inbox/", &doc).is_empty());
    }

    #[test]
    fn test_child_container_members_are_ignored() {
        let doc = json!([
            {
                "@id": "https://client.example/inbox/",
                "http://www.w3.org/ns/ldp#contains": [
                    {"@id": "https://client.example/inbox/n1"},
                    {"@id": "https://client.example/inbox/archive/"}
                ]
            },
            {
                "@id": "https://client.example/inbox/archive/",
                "http://www.w3.org/ns/ldp#contains": [
                    {"@id": "https://client.example/inbox/archive/old"}
                ]
            }
        ]);
        let listing = contained_resources("https://client.example/inbox/", &doc);
        assert_eq!(
            listing,
            vec![
                "https://client.example/inbox/archive/",
                "https://client.example/inbox/n1"
            ]
        );
    }

    #[test]
    fn test_lone_node_without_id() {
        let doc = json!({"ldp:contains": ["n2"]});
        let listing = contained_resources("https://client.example/inbox/", &doc);
        assert_eq!(listing, vec!["https://client.example/inbox/n2"]);
    }
}
