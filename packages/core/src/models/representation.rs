//! Resolved Item Representation
//!
//! The output tree produced by the resolution engine. Everything here is plain
//! data: serialization to JSON is the caller's business (the HTTP server uses
//! serde_json directly).
//!
//! Sections that resolve to nothing are `None` and skipped during
//! serialization, so an item without narrower concepts has no `narrower` key
//! at all rather than an empty array.

use super::node::NodeType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One value of a localized property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedPropertyValue {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl LocalizedPropertyValue {
    pub fn new(value: impl Into<String>, href: Option<String>) -> Self {
        Self {
            value: value.into(),
            href,
        }
    }
}

/// A field of a node rendered in one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedProperty {
    /// Language the values were found in (may be the master language)
    pub lang: String,
    /// Field local id
    pub id: String,
    #[serde(rename = "istitle")]
    pub is_title: bool,
    /// Field display label
    pub label: String,
    pub values: Vec<LocalizedPropertyValue>,
    pub order: i32,
    #[serde(rename = "tablevisible")]
    pub table_visible: bool,
}

/// Version number and its URI (`<uri>:<number>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInformation {
    pub number: i32,
    pub uri: String,
}

impl VersionInformation {
    pub fn new(number: i32, uri: &str) -> Self {
        Self {
            number,
            uri: format!("{}:{}", uri, number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemClassRef {
    pub id: String,
}

/// Reference to a container: URI plus its title property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub uri: String,
    pub properties: Vec<LocalizedProperty>,
}

/// URI-only reference (top concepts, broader, in-scheme)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicItem {
    pub uri: String,
}

/// A resolved registry, register or item
///
/// The same structure serves every render mode; reduced modes simply leave
/// more sections empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRepresentation {
    #[serde(rename = "uuid")]
    pub id: String,

    pub uri: String,

    #[serde(rename = "localid")]
    pub local_id: String,

    pub latest: bool,

    pub version: VersionInformation,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version_history: Vec<VersionInformation>,

    pub language: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    pub insert_date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_date: Option<DateTime<Utc>>,

    #[serde(rename = "itemclass")]
    pub item_class: ItemClassRef,

    #[serde(default, skip_serializing_if = "is_false")]
    pub has_collection: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_parent: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<ItemRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<ItemRef>,

    pub properties: Vec<LocalizedProperty>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_defined_by: Option<Vec<ItemRepresentation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contained_items: Option<Vec<ItemRepresentation>>,

    /// Registry navigation listing driven by the item-class tree
    #[serde(
        default,
        rename = "containedItemsBeeingParentItemClass",
        skip_serializing_if = "Option::is_none"
    )]
    pub contained_items_by_class: Option<Vec<ItemRepresentation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_concepts: Option<Vec<BasicItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_scheme: Option<BasicItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_concept_of: Option<BasicItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrower: Option<Vec<ItemRepresentation>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broader: Option<Vec<BasicItem>>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// `None` for an empty list so the section is omitted
pub(crate) fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
