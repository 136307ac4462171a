//! Resolution Context
//!
//! One `ResolutionContext` is created per request. It pins the requested and
//! master languages, borrows the store and configuration, and owns the
//! per-request `ResolutionCache`.
//!
//! The relation helpers here are the only place the resolvers talk to the
//! relation port; every other module goes through them.

use crate::db::RegistryStore;
use crate::models::{Field, FieldMapping, Predicate, RegistryNode, RelationQuery};
use crate::services::config::ResolverConfig;
use crate::services::error::ResolveError;
use crate::services::resolution_cache::ResolutionCache;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future used by the recursive builders (URI, render)
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub struct ResolutionContext<'a> {
    store: &'a dyn RegistryStore,
    config: &'a ResolverConfig,
    language: String,
    cache: ResolutionCache,
}

impl<'a> ResolutionContext<'a> {
    /// An empty requested language means the master language
    pub fn new(
        store: &'a dyn RegistryStore,
        config: &'a ResolverConfig,
        language: impl Into<String>,
    ) -> Self {
        let language = language.into();
        let language = if language.trim().is_empty() {
            config.master_language.clone()
        } else {
            language
        };
        Self {
            store,
            config,
            language,
            cache: ResolutionCache::new(),
        }
    }

    pub fn store(&self) -> &'a dyn RegistryStore {
        self.store
    }

    pub fn config(&self) -> &'a ResolverConfig {
        self.config
    }

    /// Requested language
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn master_language(&self) -> &'a str {
        &self.config.master_language
    }

    /// Languages to try in order: requested, then master unless identical
    pub fn fallback_languages(&self) -> Vec<String> {
        if self.language == self.config.master_language {
            vec![self.language.clone()]
        } else {
            vec![self.language.clone(), self.config.master_language.clone()]
        }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ResolutionCache {
        &mut self.cache
    }

    //
    // RELATIONS
    //

    /// Objects of `(node predicate X)` relations
    pub async fn related_by_subject(
        &self,
        node: &RegistryNode,
        predicate: Predicate,
    ) -> Result<Vec<RegistryNode>, ResolveError> {
        let relations = self
            .store
            .get_relations(RelationQuery::by_subject(&node.id, predicate))
            .await?;
        Ok(relations.into_iter().map(|r| r.object).collect())
    }

    /// Subjects of `(X predicate node)` relations
    pub async fn related_by_object(
        &self,
        node: &RegistryNode,
        predicate: Predicate,
    ) -> Result<Vec<RegistryNode>, ResolveError> {
        let relations = self
            .store
            .get_relations(RelationQuery::by_object(&node.id, predicate))
            .await?;
        Ok(relations.into_iter().map(|r| r.subject).collect())
    }

    /// First object of `(node predicate X)`; ties go to storage order
    pub async fn first_related_by_subject(
        &self,
        node: &RegistryNode,
        predicate: Predicate,
    ) -> Result<Option<RegistryNode>, ResolveError> {
        Ok(self
            .related_by_subject(node, predicate)
            .await?
            .into_iter()
            .next())
    }

    /// Like `first_related_by_subject`, but a missing target is an error
    pub async fn require_related_by_subject(
        &self,
        node: &RegistryNode,
        predicate: Predicate,
    ) -> Result<RegistryNode, ResolveError> {
        self.first_related_by_subject(node, predicate)
            .await?
            .ok_or_else(|| ResolveError::unresolved(&node.id, predicate.as_str()))
    }

    //
    // CACHED LOOKUPS
    //

    /// The title field (`label_field_local_id`), looked up once per request
    pub async fn label_field(&mut self) -> Result<Option<Field>, ResolveError> {
        if let Some(cached) = self.cache.label_field() {
            return Ok(cached);
        }
        let field = self
            .store
            .get_field_by_local_id(&self.config.label_field_local_id)
            .await?;
        if field.is_none() {
            tracing::warn!(
                local_id = %self.config.label_field_local_id,
                "Registry has no label field"
            );
        }
        self.cache.set_label_field(field.clone());
        Ok(field)
    }

    /// Field mappings of an item class ordered by display order
    pub async fn field_mappings(
        &mut self,
        item_class_id: &str,
    ) -> Result<Arc<Vec<FieldMapping>>, ResolveError> {
        if let Some(cached) = self.cache.field_mappings(item_class_id) {
            return Ok(cached);
        }
        let mappings = self.store.get_field_mappings(item_class_id).await?;
        Ok(self.cache.set_field_mappings(item_class_id, mappings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[test]
    fn test_fallback_languages() {
        let store = MemoryStore::default();
        let config = ResolverConfig::default();

        let ctx = ResolutionContext::new(&store, &config, "fr");
        assert_eq!(ctx.fallback_languages(), vec!["fr", "en"]);

        let ctx = ResolutionContext::new(&store, &config, "en");
        assert_eq!(ctx.fallback_languages(), vec!["en"]);

        let ctx = ResolutionContext::new(&store, &config, "");
        assert_eq!(ctx.language(), "en");
    }

    #[tokio::test]
    async fn test_missing_label_field_is_cached() {
        let store = MemoryStore::default();
        let config = ResolverConfig::default();
        let mut ctx = ResolutionContext::new(&store, &config, "en");

        assert!(ctx.label_field().await.unwrap().is_none());
        assert!(ctx.label_field().await.unwrap().is_none());
        assert_eq!(ctx.cache().stats().hits, 1);
    }
}
