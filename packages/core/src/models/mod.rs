//! Data Models
//!
//! This module contains the data structures used throughout the registry
//! resolution engine:
//!
//! - `RegistryNode`, `ItemClass`, `Status` - persisted registry nodes
//! - `Relation`, `Predicate` - typed directed links between nodes
//! - `Field`, `FieldMapping`, `Localization` - localized field values
//! - `ItemRepresentation` - the resolved output tree

mod field;
mod node;
mod relation;
mod representation;

pub use field::{
    Field, FieldMapping, FieldType, Localization, StatusLocalization, VersionHistoryEntry,
};
pub use node::{ItemClass, NodeType, RegistryNode, Status, StatusGroup, ValidationError};
pub use relation::{Predicate, Relation, RelationQuery};
pub(crate) use representation::non_empty;
pub use representation::{
    BasicItem, ItemClassRef, ItemRef, ItemRepresentation, LocalizedProperty,
    LocalizedPropertyValue, VersionInformation,
};
