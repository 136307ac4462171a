//! Per-request Lookup Cache
//!
//! Memoizes the lookups a resolution repeats for every node it renders: the
//! title field, field display labels, field mappings per item class and
//! status labels.
//!
//! # Lifetime
//!
//! A cache belongs to exactly one `ResolutionContext` and is dropped with it.
//! Nothing is shared between requests, so there is no invalidation and no
//! locking.

use crate::models::{Field, FieldMapping};
use std::collections::HashMap;
use std::sync::Arc;

/// Localized status label with the language it was found in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLabel {
    pub lang: String,
    pub label: String,
    pub href: String,
}

/// Hit/miss counters, logged when a resolution finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    /// `None` until looked up; `Some(None)` when the registry has no title field
    label_field: Option<Option<Field>>,
    field_labels: HashMap<String, String>,
    field_mappings: HashMap<String, Arc<Vec<FieldMapping>>>,
    status_labels: HashMap<String, Option<StatusLabel>>,
    stats: CacheStats,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, hit: bool) {
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
    }

    pub fn label_field(&mut self) -> Option<Option<Field>> {
        let cached = self.label_field.clone();
        self.record(cached.is_some());
        cached
    }

    pub fn set_label_field(&mut self, field: Option<Field>) {
        self.label_field = Some(field);
    }

    pub fn field_label(&mut self, field_id: &str) -> Option<String> {
        let cached = self.field_labels.get(field_id).cloned();
        self.record(cached.is_some());
        cached
    }

    pub fn set_field_label(&mut self, field_id: &str, label: String) {
        self.field_labels.insert(field_id.to_string(), label);
    }

    pub fn field_mappings(&mut self, item_class_id: &str) -> Option<Arc<Vec<FieldMapping>>> {
        let cached = self.field_mappings.get(item_class_id).cloned();
        self.record(cached.is_some());
        cached
    }

    pub fn set_field_mappings(
        &mut self,
        item_class_id: &str,
        mappings: Vec<FieldMapping>,
    ) -> Arc<Vec<FieldMapping>> {
        let mappings = Arc::new(mappings);
        self.field_mappings
            .insert(item_class_id.to_string(), Arc::clone(&mappings));
        mappings
    }

    /// Outer `None` is a miss; inner `None` means the status has no label
    pub fn status_label(&mut self, status_id: &str) -> Option<Option<StatusLabel>> {
        let cached = self.status_labels.get(status_id).cloned();
        self.record(cached.is_some());
        cached
    }

    pub fn set_status_label(&mut self, status_id: &str, label: Option<StatusLabel>) {
        self.status_labels.insert(status_id.to_string(), label);
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldType;

    fn field(id: &str) -> Field {
        Field {
            id: id.to_string(),
            local_id: id.to_string(),
            is_title: false,
            field_type: FieldType::Plain,
        }
    }

    #[test]
    fn test_label_field_negative_result_is_cached() {
        let mut cache = ResolutionCache::new();
        assert_eq!(cache.label_field(), None);

        cache.set_label_field(None);
        assert_eq!(cache.label_field(), Some(None));

        cache.set_label_field(Some(field("label")));
        assert_eq!(cache.label_field(), Some(Some(field("label"))));
    }

    #[test]
    fn test_mappings_are_shared() {
        let mut cache = ResolutionCache::new();
        let stored = cache.set_field_mappings("class-1", vec![]);
        let cached = cache.field_mappings("class-1").unwrap();
        assert!(Arc::ptr_eq(&stored, &cached));
        assert!(cache.field_mappings("class-2").is_none());
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let mut cache = ResolutionCache::new();
        assert!(cache.field_label("f1").is_none());
        cache.set_field_label("f1", "Label".to_string());
        assert_eq!(cache.field_label("f1").as_deref(), Some("Label"));
        assert!(cache.status_label("s1").is_none());

        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });
    }
}
