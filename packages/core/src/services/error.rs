//! Service Layer Error Types
//!
//! This module defines the error type of a resolution call. Store failures
//! travel as `anyhow::Error` and are wrapped transparently, except a stored
//! class type outside the closed set, which is surfaced as `AmbiguousType`.

use crate::db::DatabaseError;
use crate::models::ValidationError;
use thiserror::Error;

/// Resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// A relation (or base URI) needed to compute a URI is missing
    #[error("Unresolved {relation} for node {node_id}")]
    UnresolvedRelation { node_id: String, relation: String },

    /// Stored class type outside registry/register/item
    #[error("Ambiguous node type: {0}")]
    AmbiguousType(String),

    /// Nested rendering went deeper than the configured limit
    #[error("Nesting too deep at node {node_id} (depth {depth})")]
    NestingTooDeep { node_id: String, depth: usize },

    /// Resolver configuration rejected by `validate()`
    #[error("Invalid resolver configuration: {0}")]
    InvalidConfig(String),

    /// Store operation failed
    #[error(transparent)]
    Store(anyhow::Error),
}

impl ResolveError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create an unresolved relation error
    pub fn unresolved(node_id: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnresolvedRelation {
            node_id: node_id.into(),
            relation: relation.into(),
        }
    }

    /// Create a nesting too deep error
    pub fn nesting_too_deep(node_id: impl Into<String>, depth: usize) -> Self {
        Self::NestingTooDeep {
            node_id: node_id.into(),
            depth,
        }
    }

    pub fn is_unresolved_relation(&self) -> bool {
        matches!(self, Self::UnresolvedRelation { .. })
    }
}

impl From<anyhow::Error> for ResolveError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DatabaseError>() {
            Some(DatabaseError::InvalidData(ValidationError::InvalidClassType(value))) => {
                Self::AmbiguousType(value.clone())
            }
            _ => Self::Store(err),
        }
    }
}

impl From<ValidationError> for ResolveError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidClassType(value) => Self::AmbiguousType(value),
            other => Self::Store(DatabaseError::from(other).into()),
        }
    }
}
