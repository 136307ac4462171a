//! Item Service - Resolution Entry Point
//!
//! `ItemService` owns the store handle and the resolver configuration. Each
//! call builds a fresh `ResolutionContext` (and with it a fresh cache), so
//! one service can be shared behind `Arc` by any number of concurrent
//! requests.
//!
//! # Examples
//!
//! ```rust,no_run
//! use registry_core::db::MemoryStore;
//! use registry_core::services::{ItemService, ResolverConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(MemoryStore::load("registry.json").await?);
//! let service = ItemService::new(store, ResolverConfig::default())?;
//!
//! if let Some(item) = service.get_item_by_uri("http://ex/r/codelist/a", Some("fr")).await? {
//!     println!("{}", serde_json::to_string_pretty(&item)?);
//! }
//! # Ok(())
//! # }
//! ```

use crate::db::RegistryStore;
use crate::models::{ItemRepresentation, RegistryNode};
use crate::services::config::ResolverConfig;
use crate::services::context::ResolutionContext;
use crate::services::error::ResolveError;
use crate::services::hierarchy_resolver::resolve;
use crate::services::uri_builder::{build_uri, find_by_uri};
use std::sync::Arc;
use tracing::instrument;

pub struct ItemService {
    store: Arc<dyn RegistryStore>,
    config: ResolverConfig,
}

impl ItemService {
    /// Create the service, rejecting an invalid configuration
    pub fn new(
        store: Arc<dyn RegistryStore>,
        config: ResolverConfig,
    ) -> Result<Self, ResolveError> {
        config.validate().map_err(ResolveError::InvalidConfig)?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn context(&self, language: Option<&str>) -> ResolutionContext<'_> {
        ResolutionContext::new(
            self.store.as_ref(),
            &self.config,
            language.unwrap_or(&self.config.master_language),
        )
    }

    /// Resolve the node with `id` in `language` (master language if `None`)
    ///
    /// Returns `Ok(None)` when the node does not exist or is not public.
    #[instrument(skip(self))]
    pub async fn get_item_by_id(
        &self,
        id: &str,
        language: Option<&str>,
    ) -> Result<Option<ItemRepresentation>, ResolveError> {
        let Some(node) = self.store.get_node(id).await? else {
            tracing::debug!("Node not found");
            return Ok(None);
        };
        self.resolve_node(&node, language).await
    }

    /// Resolve the node whose canonical URI is `uri`
    ///
    /// Returns `Ok(None)` when no node has that URI or it is not public.
    #[instrument(skip(self))]
    pub async fn get_item_by_uri(
        &self,
        uri: &str,
        language: Option<&str>,
    ) -> Result<Option<ItemRepresentation>, ResolveError> {
        let Some(node) = self.find_node_by_uri(uri).await? else {
            tracing::debug!("No node matches URI");
            return Ok(None);
        };
        self.resolve_node(&node, language).await
    }

    /// Node whose canonical URI is exactly `uri`
    pub async fn find_node_by_uri(&self, uri: &str) -> Result<Option<RegistryNode>, ResolveError> {
        let ctx = self.context(None);
        find_by_uri(&ctx, uri).await
    }

    /// Canonical URI of the node with `id`
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if there is no such node, `UnresolvedRelation` if an
    /// ancestor needed for the URI is missing.
    #[instrument(skip(self))]
    pub async fn get_uri(&self, id: &str) -> Result<String, ResolveError> {
        let node = self
            .store
            .get_node(id)
            .await?
            .ok_or_else(|| ResolveError::node_not_found(id))?;
        let ctx = self.context(None);
        build_uri(&ctx, &node).await
    }

    async fn resolve_node(
        &self,
        node: &RegistryNode,
        language: Option<&str>,
    ) -> Result<Option<ItemRepresentation>, ResolveError> {
        let mut ctx = self.context(language);
        let result = resolve(&mut ctx, node).await;

        let stats = ctx.cache().stats();
        tracing::debug!(
            node_id = %node.id,
            language = ctx.language(),
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "Resolution finished"
        );
        result
    }
}
