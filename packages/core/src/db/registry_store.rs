//! RegistryStore Trait - Read-only Persistence Port
//!
//! This module defines the `RegistryStore` trait through which the resolution
//! engine reads nodes, relations, field mappings, localizations and version
//! history. The engine never writes.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so that embedded (libsql) and
//!    in-memory backends share one contract with network backends
//! 2. **Absent is not an error**: lookups return `Option`/empty `Vec` when
//!    nothing matches; `Err` is reserved for backend failures
//! 3. **Hydrated nodes**: returned nodes embed their item class and status
//! 4. **Error Handling**: Uses `anyhow::Result` for flexible error context
//!
//! # Examples
//!
//! ```rust,no_run
//! use registry_core::db::{MemoryStore, RegistryStore};
//! use registry_core::models::{Predicate, RelationQuery};
//!
//! # async fn example(store: &MemoryStore) -> anyhow::Result<()> {
//! let children = store
//!     .get_relations(RelationQuery::by_object("register-1", Predicate::Register))
//!     .await?;
//! for relation in children {
//!     println!("{} is in the register", relation.subject.local_id);
//! }
//! # Ok(())
//! # }
//! ```

use crate::models::{
    Field, FieldMapping, ItemClass, Localization, RegistryNode, Relation, RelationQuery,
    StatusLocalization, VersionHistoryEntry,
};
use anyhow::Result;
use async_trait::async_trait;

/// Read-only access to a persisted registry
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by all
/// concurrent resolutions.
///
/// # Method Categories
///
/// - **Nodes**: 4 methods (by id, by local id, by local id and class, by class)
/// - **Item classes**: 2 methods (by local id, children)
/// - **Relations**: 2 methods (query, by id)
/// - **History**: 1 method
/// - **Fields**: 2 methods (by local id, mappings of a class)
/// - **Localizations**: 4 methods (field+node, node, field label, status)
#[async_trait]
pub trait RegistryStore: Send + Sync {
    //
    // NODES
    //

    /// Get node by ID
    ///
    /// - `Ok(Some(node))` if the node exists
    /// - `Ok(None)` if it doesn't (not an error)
    async fn get_node(&self, id: &str) -> Result<Option<RegistryNode>>;

    /// All nodes sharing a local id, in storage order
    async fn get_nodes_by_local_id(&self, local_id: &str) -> Result<Vec<RegistryNode>>;

    /// Node with the given local id in the given item class
    async fn get_node_by_local_id_and_class(
        &self,
        local_id: &str,
        item_class_id: &str,
    ) -> Result<Option<RegistryNode>>;

    /// All instances of an item class, in storage order
    async fn get_nodes_by_item_class(&self, item_class_id: &str) -> Result<Vec<RegistryNode>>;

    //
    // ITEM CLASSES
    //

    async fn get_item_class_by_local_id(&self, local_id: &str) -> Result<Option<ItemClass>>;

    /// Classes whose parent class is `item_class_id`
    async fn get_child_item_classes(&self, item_class_id: &str) -> Result<Vec<ItemClass>>;

    //
    // RELATIONS
    //

    /// Relations matching the query
    ///
    /// # Errors
    ///
    /// Returns an error if the query binds neither subject nor object.
    async fn get_relations(&self, query: RelationQuery<'_>) -> Result<Vec<Relation>>;

    async fn get_relation(&self, id: &str) -> Result<Option<Relation>>;

    //
    // HISTORY
    //

    /// Prior versions of a node ordered by ascending version number
    async fn get_history(&self, node_id: &str) -> Result<Vec<VersionHistoryEntry>>;

    //
    // FIELDS
    //

    async fn get_field_by_local_id(&self, local_id: &str) -> Result<Option<Field>>;

    /// Field mappings of an item class ordered by display order
    async fn get_field_mappings(&self, item_class_id: &str) -> Result<Vec<FieldMapping>>;

    //
    // LOCALIZATIONS
    //

    /// Values of one field of one node in one language
    async fn get_localizations(
        &self,
        field_id: &str,
        node_id: &str,
        language: &str,
    ) -> Result<Vec<Localization>>;

    /// Values of all fields of one node in one language
    async fn get_node_localizations(
        &self,
        node_id: &str,
        language: &str,
    ) -> Result<Vec<Localization>>;

    /// Display label of a field (localization without a node)
    async fn get_field_localization(
        &self,
        field_id: &str,
        language: &str,
    ) -> Result<Option<Localization>>;

    async fn get_status_localization(
        &self,
        status_id: &str,
        language: &str,
    ) -> Result<Option<StatusLocalization>>;
}
