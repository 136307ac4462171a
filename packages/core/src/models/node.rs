//! Registry Node Data Structures
//!
//! This module defines the persisted shape of registry nodes as the resolution
//! engine sees them: the node itself, its item class and its status.
//!
//! # Architecture
//!
//! - **Three-level hierarchy**: every node is a Registry, a Register or an Item,
//!   decided by the `class_type` of its item class
//! - **System items**: item classes flagged `system_item` never appear in output
//! - **Visibility**: a node whose status is not public resolves to nothing
//!
//! # Examples
//!
//! ```rust
//! use registry_core::models::{NodeType, RegistryNode};
//!
//! fn describe(node: &RegistryNode) -> &'static str {
//!     match node.node_type() {
//!         NodeType::Registry => "registry",
//!         NodeType::Register => "register",
//!         NodeType::Item => "item",
//!     }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Validation errors for registry data decoded from a store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid item class type: {0}")]
    InvalidClassType(String),

    #[error("Invalid relation predicate: {0}")]
    InvalidPredicate(String),

    #[error("Invalid field type: {0}")]
    InvalidFieldType(String),
}

/// Role of a node in the registry hierarchy
///
/// Closed set: a class type outside these three values is a data error and is
/// rejected when the item class is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Registry,
    Register,
    Item,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Registry => "registry",
            NodeType::Register => "register",
            NodeType::Item => "item",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registry" => Ok(NodeType::Registry),
            "register" => Ok(NodeType::Register),
            "item" => Ok(NodeType::Item),
            other => Err(ValidationError::InvalidClassType(other.to_string())),
        }
    }
}

/// Class definition shared by all nodes of the same kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemClass {
    pub id: String,

    pub local_id: String,

    /// Base URI for instances of this class (registries always have one,
    /// registers may inherit the registry URI instead)
    #[serde(default)]
    pub base_uri: Option<String>,

    /// Parent class in the item-class tree
    #[serde(default)]
    pub parent_class: Option<String>,

    #[serde(default)]
    pub system_item: bool,

    pub class_type: NodeType,
}

/// Group a status belongs to; provides the base of the status href
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusGroup {
    pub id: String,
    pub local_id: String,
    pub base_uri: String,
}

/// Lifecycle status of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: String,
    pub local_id: String,
    pub is_public: bool,
    pub group: StatusGroup,
}

impl Status {
    /// Href of the status concept, e.g. `http://ex/status/valid`
    pub fn href(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group.base_uri, self.group.local_id, self.local_id
        )
    }
}

/// A registry, register or item as stored
///
/// Nodes are hydrated by the store: the item class and status are embedded so
/// that classification never needs another query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryNode {
    /// Stable identifier (UUID in most registries)
    pub id: String,

    /// Local identifier; an absolute URI for externally hosted items
    pub local_id: String,

    /// True when the item is hosted elsewhere and `local_id` is its URI
    pub external: bool,

    pub item_class: ItemClass,

    pub status: Status,

    pub insert_date: DateTime<Utc>,

    pub edit_date: Option<DateTime<Utc>>,
}

impl RegistryNode {
    pub fn node_type(&self) -> NodeType {
        self.item_class.class_type
    }

    /// System items are internal bookkeeping nodes and never emitted
    pub fn is_system_item(&self) -> bool {
        self.item_class.system_item
    }

    pub fn is_public(&self) -> bool {
        self.status.is_public
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_type_parsing() {
        assert_eq!("registry".parse::<NodeType>().unwrap(), NodeType::Registry);
        assert_eq!("register".parse::<NodeType>().unwrap(), NodeType::Register);
        assert_eq!("item".parse::<NodeType>().unwrap(), NodeType::Item);

        let err = "collection".parse::<NodeType>().unwrap_err();
        assert_eq!(err, ValidationError::InvalidClassType("collection".into()));
    }

    #[test]
    fn test_item_class_rejects_unknown_type() {
        let value = json!({
            "id": "c1",
            "localId": "codelist",
            "classType": "folder"
        });
        assert!(serde_json::from_value::<ItemClass>(value).is_err());
    }

    #[test]
    fn test_item_class_defaults() {
        let value = json!({
            "id": "c1",
            "localId": "codelist",
            "classType": "register"
        });
        let class: ItemClass = serde_json::from_value(value).unwrap();
        assert!(class.base_uri.is_none());
        assert!(class.parent_class.is_none());
        assert!(!class.system_item);
        assert_eq!(class.class_type, NodeType::Register);
    }

    #[test]
    fn test_status_href() {
        let status = Status {
            id: "1".into(),
            local_id: "valid".into(),
            is_public: true,
            group: StatusGroup {
                id: "g".into(),
                local_id: "statuses".into(),
                base_uri: "http://ex/registry".into(),
            },
        };
        assert_eq!(status.href(), "http://ex/registry/statuses/valid");
    }
}
