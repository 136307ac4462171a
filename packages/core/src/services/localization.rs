//! Localization Fallback
//!
//! Every localized lookup runs the same policy: query the requested language,
//! re-query the master language when nothing came back, and treat a
//! still-empty result as absent. When the two languages are the same the
//! second query is skipped.

use crate::models::{Field, Localization, RegistryNode, Status};
use crate::services::context::ResolutionContext;
use crate::services::error::ResolveError;
use crate::services::resolution_cache::StatusLabel;
use std::collections::HashMap;

/// Localizations of one node grouped by field, requested language first
#[derive(Debug, Default)]
pub struct NodeLocalizations {
    by_language: Vec<(String, HashMap<String, Vec<Localization>>)>,
}

impl NodeLocalizations {
    /// Fetch all localizations of `node` in the fallback languages
    pub async fn load(
        ctx: &ResolutionContext<'_>,
        node: &RegistryNode,
    ) -> Result<Self, ResolveError> {
        let mut by_language = Vec::new();
        for lang in ctx.fallback_languages() {
            let localizations = ctx.store().get_node_localizations(&node.id, &lang).await?;
            let mut by_field: HashMap<String, Vec<Localization>> = HashMap::new();
            for loc in localizations {
                by_field.entry(loc.field_id.clone()).or_default().push(loc);
            }
            by_language.push((lang, by_field));
        }
        Ok(Self { by_language })
    }

    /// Values of a field in the first language that has any
    pub fn for_field(&self, field_id: &str) -> Option<(&str, &[Localization])> {
        self.by_language.iter().find_map(|(lang, by_field)| {
            by_field
                .get(field_id)
                .filter(|locs| !locs.is_empty())
                .map(|locs| (lang.as_str(), locs.as_slice()))
        })
    }
}

/// Localizations of `field` on `node`, with the language they were found in
pub async fn field_localizations(
    ctx: &ResolutionContext<'_>,
    field: &Field,
    node: &RegistryNode,
) -> Result<Option<(String, Vec<Localization>)>, ResolveError> {
    for lang in ctx.fallback_languages() {
        let localizations = ctx
            .store()
            .get_localizations(&field.id, &node.id, &lang)
            .await?;
        if !localizations.is_empty() {
            return Ok(Some((lang, localizations)));
        }
    }
    Ok(None)
}

/// Display label of a node: first value of its title field
pub async fn node_label(
    ctx: &mut ResolutionContext<'_>,
    node: &RegistryNode,
) -> Result<Option<String>, ResolveError> {
    let Some(label_field) = ctx.label_field().await? else {
        return Ok(None);
    };
    Ok(field_localizations(ctx, &label_field, node)
        .await?
        .and_then(|(_, locs)| locs.into_iter().next())
        .and_then(|loc| loc.value))
}

/// Display label of a field, falling back to its local id
pub async fn field_label(
    ctx: &mut ResolutionContext<'_>,
    field: &Field,
) -> Result<String, ResolveError> {
    if let Some(cached) = ctx.cache_mut().field_label(&field.id) {
        return Ok(cached);
    }

    let mut label = None;
    for lang in ctx.fallback_languages() {
        let found = ctx
            .store()
            .get_field_localization(&field.id, &lang)
            .await?
            .and_then(|loc| loc.value);
        if found.is_some() {
            label = found;
            break;
        }
    }

    let label = label.unwrap_or_else(|| {
        tracing::debug!(field = %field.local_id, "Field has no localized label");
        field.local_id.clone()
    });
    ctx.cache_mut().set_field_label(&field.id, label.clone());
    Ok(label)
}

/// Localized label and href of a status; `None` when neither language has one
pub async fn status_label(
    ctx: &mut ResolutionContext<'_>,
    status: &Status,
) -> Result<Option<StatusLabel>, ResolveError> {
    if let Some(cached) = ctx.cache_mut().status_label(&status.id) {
        return Ok(cached);
    }

    let mut label = None;
    for lang in ctx.fallback_languages() {
        if let Some(loc) = ctx
            .store()
            .get_status_localization(&status.id, &lang)
            .await?
        {
            label = Some(StatusLabel {
                lang,
                label: loc.label,
                href: status.href(),
            });
            break;
        }
    }

    if label.is_none() {
        tracing::debug!(status = %status.local_id, "Status has no localized label");
    }
    ctx.cache_mut().set_status_label(&status.id, label.clone());
    Ok(label)
}
