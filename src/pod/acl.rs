//! Web Access Control documents
//!
//! An [`AclDocument`] is the ACL of one resource: a list of authorizations,
//! each granting a set of [`AccessModes`] to agents over resources either
//! directly (`acl:accessTo`) or by inheritance (`acl:default`).
//!
//! Editing one agent's access keeps everything else in the document intact:
//! groups, origin restrictions, class targets and predicates this module does
//! not interpret are written back as they were read.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::jsonld::{iris, local_name, nodes, property, resolve, types, ACL};
use crate::error::{PodNotifyError, Result};
use crate::types::AccessModes;

const FOAF: &str = "http://xmlns.com/foaf/0.1/";
const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Authorization predicates with a field of their own
const KNOWN_PREDICATES: [&str; 8] = [
    "agent",
    "agentClass",
    "agentGroup",
    "origin",
    "accessTo",
    "accessToClass",
    "default",
    "mode",
];

/// How an authorization reaches a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AclRelation {
    /// `acl:accessTo`, the resource itself
    Resource,
    /// `acl:default`, children of the container
    Default,
}

/// Object of a predicate kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AclTerm {
    Iri(String),
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

/// One `acl:Authorization`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub agents: BTreeSet<String>,
    /// `acl:agentClass` values (e.g. `foaf:Agent`)
    pub agent_classes: BTreeSet<String>,
    /// `acl:agentGroup` values
    pub agent_groups: BTreeSet<String>,
    /// `acl:origin` restrictions
    pub origins: BTreeSet<String>,
    pub access_to: BTreeSet<String>,
    pub access_to_classes: BTreeSet<String>,
    pub default_for: BTreeSet<String>,
    pub modes: AccessModes,
    /// Every other predicate, keyed by full IRI
    pub extra: BTreeMap<String, Vec<AclTerm>>,
}

impl Authorization {
    fn targets(&self, relation: AclRelation) -> &BTreeSet<String> {
        match relation {
            AclRelation::Resource => &self.access_to,
            AclRelation::Default => &self.default_for,
        }
    }

    fn targets_mut(&mut self, relation: AclRelation) -> &mut BTreeSet<String> {
        match relation {
            AclRelation::Resource => &mut self.access_to,
            AclRelation::Default => &mut self.default_for,
        }
    }

    fn has_subject(&self) -> bool {
        !self.agents.is_empty() || !self.agent_classes.is_empty() || !self.agent_groups.is_empty()
    }

    fn has_target(&self) -> bool {
        !self.access_to.is_empty()
            || !self.default_for.is_empty()
            || !self.access_to_classes.is_empty()
    }
}

/// True when `iri` can sit between `<` and `>` in Turtle unescaped
pub fn is_safe_iri(iri: &str) -> bool {
    !iri.is_empty()
        && !iri.chars().any(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\')
        })
}

fn turtle_iri(iri: &str) -> Result<String> {
    if !is_safe_iri(iri) {
        return Err(PodNotifyError::Acl(format!(
            "refusing to write malformed IRI {:?}",
            iri
        )));
    }
    Ok(format!("<{}>", iri))
}

fn turtle_iri_list<'a>(iris: impl IntoIterator<Item = &'a String>) -> Result<String> {
    let terms = iris
        .into_iter()
        .map(|iri| turtle_iri(iri))
        .collect::<Result<Vec<_>>>()?;
    Ok(terms.join(", "))
}

fn turtle_term(term: &AclTerm) -> Result<String> {
    match term {
        AclTerm::Iri(iri) => turtle_iri(iri),
        AclTerm::Literal {
            value,
            datatype,
            language,
        } => {
            // JSON string escapes are valid Turtle string escapes
            let mut out = serde_json::to_string(value)?;
            if let Some(lang) = language {
                if lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                {
                    return Err(PodNotifyError::Acl(format!(
                        "refusing to write language tag {:?}",
                        lang
                    )));
                }
                let _ = write!(out, "@{}", lang);
            } else if let Some(datatype) = datatype {
                let _ = write!(out, "^^{}", turtle_iri(datatype)?);
            }
            Ok(out)
        }
    }
}

/// Local name of an authorization predicate this module handles itself
fn known_predicate(key: &str) -> Option<&str> {
    let local = key
        .strip_prefix(ACL)
        .or_else(|| key.strip_prefix("acl:"))
        .unwrap_or(key);
    KNOWN_PREDICATES.contains(&local).then_some(local)
}

/// Full IRI of a JSON-LD key, when it can be known without a context
fn expand_key(key: &str) -> Option<String> {
    if let Some(local) = key.strip_prefix("acl:") {
        Some(format!("{}{}", ACL, local))
    } else if let Some(local) = key.strip_prefix("foaf:") {
        Some(format!("{}{}", FOAF, local))
    } else if key.contains("://") {
        Some(key.to_string())
    } else {
        None
    }
}

fn literal(value: String, datatype: Option<String>) -> AclTerm {
    AclTerm::Literal {
        value,
        datatype,
        language: None,
    }
}

fn terms(base: &str, value: &Value) -> Vec<AclTerm> {
    match value {
        Value::Array(items) => items.iter().flat_map(|item| terms(base, item)).collect(),
        Value::Object(obj) => {
            if let Some(id) = obj.get("@id").and_then(Value::as_str) {
                return vec![AclTerm::Iri(resolve(base, id))];
            }
            match obj.get("@value") {
                Some(Value::String(s)) => vec![AclTerm::Literal {
                    value: s.clone(),
                    datatype: obj.get("@type").and_then(Value::as_str).map(str::to_string),
                    language: obj
                        .get("@language")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                }],
                Some(other) => terms(base, other),
                None => Vec::new(),
            }
        }
        Value::String(s) => vec![literal(s.clone(), None)],
        Value::Bool(b) => vec![literal(b.to_string(), Some(format!("{}boolean", XSD)))],
        Value::Number(n) => {
            let datatype = if n.is_f64() { "double" } else { "integer" };
            vec![literal(n.to_string(), Some(format!("{}{}", XSD, datatype)))]
        }
        Value::Null => Vec::new(),
    }
}

/// ACL of a single resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclDocument {
    /// Where the ACL lives
    pub acl_url: String,
    /// Resource the ACL protects
    pub resource_url: String,
    pub authorizations: Vec<Authorization>,
}

impl AclDocument {
    /// An ACL with no authorizations
    pub fn empty(acl_url: impl Into<String>, resource_url: impl Into<String>) -> Self {
        Self {
            acl_url: acl_url.into(),
            resource_url: resource_url.into(),
            authorizations: Vec::new(),
        }
    }

    /// A fresh ACL giving `owner` full control, directly and by default
    ///
    /// Saving an ACL replaces the inherited one, so a new document must keep
    /// the owner in control of the resource.
    pub fn for_owner(
        acl_url: impl Into<String>,
        resource_url: impl Into<String>,
        owner: &str,
    ) -> Self {
        let mut doc = Self::empty(acl_url, resource_url);
        doc.set_agent_access(owner, AccessModes::FULL, AclRelation::Resource);
        doc.set_agent_access(owner, AccessModes::FULL, AclRelation::Default);
        doc
    }

    /// Parse an ACL served as JSON-LD
    pub fn from_json_ld(acl_url: &str, resource_url: &str, doc: &Value) -> Result<Self> {
        if !(doc.is_array() || doc.is_object()) {
            return Err(PodNotifyError::Acl(format!(
                "ACL at {} is not a JSON-LD document",
                acl_url
            )));
        }

        let mut authorizations = Vec::new();
        for node in nodes(doc) {
            if !types(node)
                .iter()
                .any(|t| local_name(t) == "Authorization")
            {
                continue;
            }

            let raw = |local: &str| -> BTreeSet<String> {
                property(node, ACL, local)
                    .map(iris)
                    .unwrap_or_default()
                    .into_iter()
                    .collect()
            };
            let resolved = |local: &str| -> BTreeSet<String> {
                raw(local)
                    .into_iter()
                    .map(|iri| resolve(acl_url, &iri))
                    .collect()
            };

            let mut extra: BTreeMap<String, Vec<AclTerm>> = BTreeMap::new();
            let mut modes = AccessModes::default();
            for mode in property(node, ACL, "mode").map(iris).unwrap_or_default() {
                match local_name(&mode) {
                    "Read" => modes.read = true,
                    "Append" => modes.append = true,
                    "Write" => modes.write = true,
                    "Control" => modes.control = true,
                    _ => extra
                        .entry(format!("{}mode", ACL))
                        .or_default()
                        .push(AclTerm::Iri(resolve(acl_url, &mode))),
                }
            }

            for (key, value) in node {
                if key.starts_with('@') || known_predicate(key).is_some() {
                    continue;
                }
                match expand_key(key) {
                    Some(predicate) => extra
                        .entry(predicate)
                        .or_default()
                        .extend(terms(acl_url, value)),
                    None => tracing::debug!("Ignoring ACL key {} without a known namespace", key),
                }
            }

            authorizations.push(Authorization {
                agents: resolved("agent"),
                agent_classes: raw("agentClass"),
                agent_groups: resolved("agentGroup"),
                origins: raw("origin"),
                access_to: resolved("accessTo"),
                access_to_classes: raw("accessToClass"),
                default_for: resolved("default"),
                modes,
                extra,
            });
        }

        Ok(Self {
            acl_url: acl_url.to_string(),
            resource_url: resource_url.to_string(),
            authorizations,
        })
    }

    /// Modes an agent holds on this document's resource through `relation`
    pub fn agent_access(&self, agent: &str, relation: AclRelation) -> AccessModes {
        let mut modes = AccessModes::default();
        for auth in &self.authorizations {
            if auth.agents.contains(agent) && auth.targets(relation).contains(&self.resource_url)
            {
                modes.read |= auth.modes.read;
                modes.append |= auth.modes.append;
                modes.write |= auth.modes.write;
                modes.control |= auth.modes.control;
            }
        }
        modes
    }

    /// Replace what `agent` may do on this resource through `relation`
    ///
    /// Grants the agent holds through the other relation, or on other
    /// resources, are kept with their restrictions. Empty `modes` revokes.
    pub fn set_agent_access(&mut self, agent: &str, modes: AccessModes, relation: AclRelation) {
        let resource = self.resource_url.clone();
        let mut carried = Vec::new();

        for auth in &mut self.authorizations {
            if !auth.agents.contains(agent) || !auth.targets(relation).contains(&resource) {
                continue;
            }
            auth.agents.remove(agent);

            let mut rest = Authorization {
                agents: BTreeSet::from([agent.to_string()]),
                origins: auth.origins.clone(),
                access_to: auth.access_to.clone(),
                access_to_classes: auth.access_to_classes.clone(),
                default_for: auth.default_for.clone(),
                modes: auth.modes,
                extra: auth.extra.clone(),
                ..Default::default()
            };
            rest.targets_mut(relation).remove(&resource);
            if rest.has_target() {
                carried.push(rest);
            }
        }

        self.authorizations
            .retain(|auth| auth.has_subject() && auth.has_target());
        self.authorizations.extend(carried);

        if !modes.is_empty() {
            let mut auth = Authorization {
                agents: BTreeSet::from([agent.to_string()]),
                modes,
                ..Default::default()
            };
            auth.targets_mut(relation).insert(resource);
            self.authorizations.push(auth);
        }
    }

    /// Serialize as Turtle for writing back to the pod
    ///
    /// Fails rather than write an IRI that would break out of its `<...>`.
    pub fn to_turtle(&self) -> Result<String> {
        let mut out = String::new();
        out.push_str("@prefix acl: <http://www.w3.org/ns/auth/acl#>.\n");
        out.push_str("@prefix foaf: <http://xmlns.com/foaf/0.1/>.\n");

        for (i, auth) in self.authorizations.iter().enumerate() {
            let _ = write!(out, "\n<#grant-{}> a acl:Authorization", i);
            if !auth.agents.is_empty() {
                let _ = write!(out, ";\n    acl:agent {}", turtle_iri_list(&auth.agents)?);
            }
            if !auth.agent_classes.is_empty() {
                let classes = auth
                    .agent_classes
                    .iter()
                    .map(|class| match local_name(class) {
                        "Agent" => Ok("foaf:Agent".to_string()),
                        "AuthenticatedAgent" => Ok("acl:AuthenticatedAgent".to_string()),
                        _ => turtle_iri(class),
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                let _ = write!(out, ";\n    acl:agentClass {}", classes);
            }
            if !auth.agent_groups.is_empty() {
                let _ = write!(out, ";\n    acl:agentGroup {}", turtle_iri_list(&auth.agent_groups)?);
            }
            if !auth.origins.is_empty() {
                let _ = write!(out, ";\n    acl:origin {}", turtle_iri_list(&auth.origins)?);
            }
            if !auth.access_to.is_empty() {
                let _ = write!(out, ";\n    acl:accessTo {}", turtle_iri_list(&auth.access_to)?);
            }
            if !auth.access_to_classes.is_empty() {
                let _ = write!(
                    out,
                    ";\n    acl:accessToClass {}",
                    turtle_iri_list(&auth.access_to_classes)?
                );
            }
            if !auth.default_for.is_empty() {
                let _ = write!(out, ";\n    acl:default {}", turtle_iri_list(&auth.default_for)?);
            }

            let mut modes = Vec::new();
            if auth.modes.read {
                modes.push("acl:Read");
            }
            if auth.modes.append {
                modes.push("acl:Append");
            }
            if auth.modes.write {
                modes.push("acl:Write");
            }
            if auth.modes.control {
                modes.push("acl:Control");
            }
            if !modes.is_empty() {
                let _ = write!(out, ";\n    acl:mode {}", modes.join(", "));
            }

            for (predicate, values) in &auth.extra {
                if values.is_empty() {
                    continue;
                }
                let objects = values
                    .iter()
                    .map(turtle_term)
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                let _ = write!(out, ";\n    {} {}", turtle_iri(predicate)?, objects);
            }
            out.push_str(".\n");
        }
        Ok(out)
    }
}
