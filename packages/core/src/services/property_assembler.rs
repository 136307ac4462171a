//! Property Assembler
//!
//! Turns the field mappings of a node's item class into localized output
//! properties. Each mapping is dispatched on its field type:
//!
//! | Field type | Values |
//! |---|---|
//! | registry / register marker | never emitted |
//! | collection / parent / successor / predecessor link | label and URI of the related node |
//! | relation reference link | label and URI of each referenced relation object |
//! | status | localized status label, href into the status group |
//! | creation / edit date | node timestamp in the configured date format |
//! | plain | localized values of the field |
//!
//! A mapping that yields no values is dropped unless `allow_empty_fields` is
//! set. Status and marker fields are dropped regardless.

use crate::models::{
    FieldMapping, FieldType, ItemRef, LocalizedProperty, LocalizedPropertyValue, Predicate,
    RegistryNode,
};
use crate::services::context::ResolutionContext;
use crate::services::error::ResolveError;
use crate::services::localization::{
    field_label, field_localizations, node_label, status_label, NodeLocalizations,
};
use crate::services::uri_builder::build_uri;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Selects which mappings are assembled
pub type MappingFilter = fn(&FieldMapping) -> bool;

/// Top-level filter: everything that is not hidden
pub fn visible(mapping: &FieldMapping) -> bool {
    !mapping.hidden
}

/// Localized properties of `node` for the mappings passing `filter`, in
/// mapping order
pub async fn assemble_properties(
    ctx: &mut ResolutionContext<'_>,
    node: &RegistryNode,
    filter: MappingFilter,
) -> Result<Vec<LocalizedProperty>, ResolveError> {
    let mappings = ctx.field_mappings(&node.item_class.id).await?;
    let localizations = NodeLocalizations::load(ctx, node).await?;

    let mut properties = Vec::new();
    for mapping in mappings.iter().filter(|m| filter(m)) {
        if let Some(property) = assemble_property(ctx, node, mapping, &localizations).await? {
            properties.push(property);
        }
    }
    Ok(properties)
}

async fn assemble_property(
    ctx: &mut ResolutionContext<'_>,
    node: &RegistryNode,
    mapping: &FieldMapping,
    localizations: &NodeLocalizations,
) -> Result<Option<LocalizedProperty>, ResolveError> {
    let field = &mapping.field;
    let requested = ctx.language().to_string();

    let (lang, values) = match field.field_type {
        FieldType::RegistryMarker | FieldType::RegisterMarker => return Ok(None),
        FieldType::CollectionLink
        | FieldType::ParentLink
        | FieldType::SuccessorLink
        | FieldType::PredecessorLink => {
            let predicate = link_predicate(field.field_type);
            let values = match ctx.first_related_by_subject(node, predicate).await? {
                Some(related) => link_value(ctx, &related).await?.into_iter().collect(),
                None => Vec::new(),
            };
            (requested, values)
        }
        FieldType::RelationReferenceLink => {
            match relation_reference_values(ctx, &field.id, localizations).await? {
                Some((lang, values)) => (lang, values),
                None => (requested, Vec::new()),
            }
        }
        FieldType::Status => match status_label(ctx, &node.status).await? {
            Some(status) => (
                status.lang,
                vec![LocalizedPropertyValue::new(status.label, Some(status.href))],
            ),
            None => return Ok(None),
        },
        FieldType::CreationDate => {
            let value = format_date(&node.insert_date, &ctx.config().date_format)?;
            (requested, vec![LocalizedPropertyValue::new(value, None)])
        }
        FieldType::EditDate => {
            let values = match &node.edit_date {
                Some(edit_date) => {
                    let value = format_date(edit_date, &ctx.config().date_format)?;
                    vec![LocalizedPropertyValue::new(value, None)]
                }
                None => Vec::new(),
            };
            (requested, values)
        }
        FieldType::Plain => match localizations.for_field(&field.id) {
            Some((lang, locs)) => (
                lang.to_string(),
                locs.iter()
                    .map(|loc| {
                        LocalizedPropertyValue::new(
                            loc.value.clone().unwrap_or_default(),
                            loc.href.clone(),
                        )
                    })
                    .collect(),
            ),
            None => (requested, Vec::new()),
        },
    };

    if values.is_empty() && !ctx.config().allow_empty_fields {
        return Ok(None);
    }

    let label = field_label(ctx, field).await?;
    Ok(Some(LocalizedProperty {
        lang,
        id: field.local_id.clone(),
        is_title: field.is_title,
        label,
        values,
        order: mapping.order,
        table_visible: mapping.table_visible,
    }))
}

fn link_predicate(field_type: FieldType) -> Predicate {
    match field_type {
        FieldType::CollectionLink => Predicate::Collection,
        FieldType::ParentLink => Predicate::Parent,
        FieldType::SuccessorLink => Predicate::Successor,
        _ => Predicate::Predecessor,
    }
}

/// `(label, URI)` of a related node; `None` when it has no label
async fn link_value(
    ctx: &mut ResolutionContext<'_>,
    related: &RegistryNode,
) -> Result<Option<LocalizedPropertyValue>, ResolveError> {
    let Some(label) = node_label(ctx, related).await? else {
        return Ok(None);
    };
    let uri = build_uri(ctx, related).await?;
    Ok(Some(LocalizedPropertyValue::new(label, Some(uri))))
}

async fn relation_reference_values(
    ctx: &mut ResolutionContext<'_>,
    field_id: &str,
    localizations: &NodeLocalizations,
) -> Result<Option<(String, Vec<LocalizedPropertyValue>)>, ResolveError> {
    let Some((lang, locs)) = localizations.for_field(field_id) else {
        return Ok(None);
    };

    let mut values = Vec::new();
    for loc in locs {
        let Some(relation_id) = loc.relation_reference.as_deref() else {
            continue;
        };
        let Some(relation) = ctx.store().get_relation(relation_id).await? else {
            tracing::warn!(relation_id, "Relation reference points to a missing relation");
            continue;
        };
        if let Some(value) = link_value(ctx, &relation.object).await? {
            values.push(value);
        }
    }
    Ok(Some((lang.to_string(), values)))
}

fn format_date(date: &DateTime<Utc>, format: &str) -> Result<String, ResolveError> {
    let mut out = String::new();
    write!(out, "{}", date.format(format)).map_err(|_| {
        ResolveError::InvalidConfig(format!("date_format '{}' cannot be rendered", format))
    })?;
    Ok(out)
}

/// Reference to a container: its URI plus its title property
///
/// The property carries the title field's order and table visibility from
/// the target's item class; its label is the title field's local id.
pub async fn item_ref(
    ctx: &mut ResolutionContext<'_>,
    target: &RegistryNode,
) -> Result<ItemRef, ResolveError> {
    let uri = build_uri(ctx, target).await?;
    let Some(label_field) = ctx.label_field().await? else {
        return Ok(ItemRef {
            uri,
            properties: Vec::new(),
        });
    };

    let mappings = ctx.field_mappings(&target.item_class.id).await?;
    let mapping = mappings.iter().find(|m| m.field.id == label_field.id);

    let (lang, values) = match field_localizations(ctx, &label_field, target).await? {
        Some((lang, locs)) => (
            lang,
            locs.into_iter()
                .map(|loc| LocalizedPropertyValue::new(loc.value.unwrap_or_default(), loc.href))
                .collect(),
        ),
        None => (ctx.master_language().to_string(), Vec::new()),
    };

    Ok(ItemRef {
        uri,
        properties: vec![LocalizedProperty {
            lang,
            id: label_field.local_id.clone(),
            is_title: label_field.is_title,
            label: label_field.local_id.clone(),
            values,
            order: mapping.map_or(0, |m| m.order),
            table_visible: mapping.map_or(false, |m| m.table_visible),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2020, 5, 11, 8, 30, 0).unwrap();
        assert_eq!(format_date(&date, "%d/%m/%Y").unwrap(), "11/05/2020");
        assert_eq!(format_date(&date, "%Y-%m-%d").unwrap(), "2020-05-11");
    }

    #[test]
    fn test_link_predicates() {
        assert_eq!(link_predicate(FieldType::CollectionLink), Predicate::Collection);
        assert_eq!(link_predicate(FieldType::ParentLink), Predicate::Parent);
        assert_eq!(link_predicate(FieldType::SuccessorLink), Predicate::Successor);
        assert_eq!(link_predicate(FieldType::PredecessorLink), Predicate::Predecessor);
    }
}
