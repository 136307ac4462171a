//! Registry Core - Item Resolution Engine
//!
//! This crate resolves a persisted graph of registry nodes (registries,
//! registers and items of a controlled-vocabulary registry) into the
//! localized, versioned representation of a single requested node.
//!
//! # Architecture
//!
//! - **Read-only**: the engine reads through the `RegistryStore` port and never writes
//! - **Three-level hierarchy**: Registry ⊇ Register ⊇ Item, items nested in collections
//! - **Per-request state**: caches live in a `ResolutionContext` and die with the request
//! - **libsql**: embedded SQLite-compatible backend, plus an in-memory snapshot store
//!
//! # Modules
//!
//! - [`models`] - Data structures (RegistryNode, Relation, ItemRepresentation, etc.)
//! - [`services`] - Resolution services (ItemService, URI builder, property assembler)
//! - [`db`] - Store port and its libsql / in-memory implementations

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::{LibsqlStore, MemoryStore, RegistrySnapshot, RegistryStore};
pub use models::*;
pub use services::{ItemService, ResolveError, ResolverConfig};
