//! Database Layer
//!
//! This module handles every read the resolution engine makes:
//!
//! - `RegistryStore` - the read-only persistence port
//! - `LibsqlStore` - embedded libsql database backend
//! - `MemoryStore` - in-memory backend loaded from a JSON snapshot
//!
//! # Architecture
//!
//! The engine holds an `Arc<dyn RegistryStore>` and never writes. Both
//! backends return hydrated nodes (item class and status embedded) and keep
//! storage order, so resolution output is identical whichever one is used.

mod error;
mod libsql_store;
mod memory_store;
mod registry_store;

pub use error::DatabaseError;
pub use libsql_store::LibsqlStore;
pub use memory_store::{
    FieldMappingRecord, MemoryStore, NodeRecord, RegistrySnapshot, RelationRecord, StatusRecord,
};
pub use registry_store::RegistryStore;
