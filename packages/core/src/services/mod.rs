//! Resolution Services
//!
//! This module contains the registry item resolution engine:
//!
//! - `ItemService` - entry point; resolves a node by id or by URI
//! - `hierarchy_resolver` - classifies nodes and assembles nested representations
//! - `property_assembler` - localized properties per field type
//! - `uri_builder` - canonical URIs and reverse URI lookup
//! - `version_resolver` - version number and history references
//! - `localization` - requested-then-master language fallback
//! - `ResolutionContext` / `ResolutionCache` - per-request state
//!
//! Services read through the `RegistryStore` port and never write.

pub mod config;
pub mod context;
pub mod error;
pub mod hierarchy_resolver;
pub mod item_service;
pub mod localization;
pub mod property_assembler;
pub mod resolution_cache;
pub mod uri_builder;
pub mod version_resolver;

pub use config::ResolverConfig;
pub use context::{BoxFuture, ResolutionContext};
pub use error::ResolveError;
pub use hierarchy_resolver::RenderMode;
pub use item_service::ItemService;
pub use resolution_cache::{CacheStats, ResolutionCache, StatusLabel};
