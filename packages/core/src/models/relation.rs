//! Typed relations between registry nodes

use super::node::{RegistryNode, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a directed relation `(subject, predicate, object)`
///
/// - `Registry` / `Register`: attach a register or item to its container
/// - `Parent` / `Collection`: hierarchical nesting among items
/// - `Successor` / `Predecessor`: version chain links
/// - `Reference`: "is defined by" links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    Registry,
    Register,
    Parent,
    Collection,
    Successor,
    Predecessor,
    Reference,
}

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::Registry => "registry",
            Predicate::Register => "register",
            Predicate::Parent => "parent",
            Predicate::Collection => "collection",
            Predicate::Successor => "successor",
            Predicate::Predecessor => "predecessor",
            Predicate::Reference => "reference",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Predicate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registry" => Ok(Predicate::Registry),
            "register" => Ok(Predicate::Register),
            "parent" => Ok(Predicate::Parent),
            "collection" => Ok(Predicate::Collection),
            "successor" => Ok(Predicate::Successor),
            "predecessor" => Ok(Predicate::Predecessor),
            "reference" => Ok(Predicate::Reference),
            other => Err(ValidationError::InvalidPredicate(other.to_string())),
        }
    }
}

/// A stored relation with both endpoints hydrated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub id: String,
    pub subject: RegistryNode,
    pub predicate: Predicate,
    pub object: RegistryNode,
}

/// Relation lookup; at least one endpoint must be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationQuery<'a> {
    pub subject: Option<&'a str>,
    pub object: Option<&'a str>,
    pub predicate: Predicate,
}

impl<'a> RelationQuery<'a> {
    /// Relations where `subject_id` is the subject
    pub fn by_subject(subject_id: &'a str, predicate: Predicate) -> Self {
        Self {
            subject: Some(subject_id),
            object: None,
            predicate,
        }
    }

    /// Relations where `object_id` is the object
    pub fn by_object(object_id: &'a str, predicate: Predicate) -> Self {
        Self {
            subject: None,
            object: Some(object_id),
            predicate,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.subject.is_some() || self.object.is_some()
    }

    pub fn matches(&self, subject_id: &str, predicate: Predicate, object_id: &str) -> bool {
        self.predicate == predicate
            && self.subject.map_or(true, |s| s == subject_id)
            && self.object.map_or(true, |o| o == object_id)
    }
}
