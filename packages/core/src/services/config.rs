//! Configuration for the resolution engine

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

/// Deepest nesting a single resolution may render before giving up
const MAX_SUPPORTED_DEPTH: usize = 256;

/// Resolver settings shared by every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Fallback language for every localized lookup
    pub master_language: String,

    /// Emit properties with no values instead of dropping them
    pub allow_empty_fields: bool,

    /// chrono strftime pattern for creation/edit date properties
    pub date_format: String,

    /// Local id of the title field used for labels and item references
    pub label_field_local_id: String,

    /// Status id a collection must have to count as a top-level collection
    pub active_status_id: String,

    /// Maximum render nesting depth
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            master_language: "en".to_string(),
            allow_empty_fields: false,
            date_format: "%d/%m/%Y".to_string(),
            label_field_local_id: "label".to_string(),
            active_status_id: "1".to_string(),
            max_depth: 16,
        }
    }
}

impl ResolverConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.master_language.trim().is_empty() {
            return Err("master_language cannot be empty".to_string());
        }

        if self.date_format.is_empty() {
            return Err("date_format cannot be empty".to_string());
        }

        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(format!(
                "date_format '{}' is not a valid strftime pattern",
                self.date_format
            ));
        }

        if self.label_field_local_id.is_empty() {
            return Err("label_field_local_id cannot be empty".to_string());
        }

        if self.active_status_id.is_empty() {
            return Err("active_status_id cannot be empty".to_string());
        }

        if self.max_depth == 0 {
            return Err("max_depth must be greater than 0".to_string());
        }

        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(format!(
                "max_depth cannot exceed {}",
                MAX_SUPPORTED_DEPTH
            ));
        }

        Ok(())
    }
}
