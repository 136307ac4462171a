//! URI Builder
//!
//! Computes the canonical URI of a node by composing its ancestor chain, and
//! performs the reverse lookup from a URI back to the node.
//!
//! # URI Shapes
//!
//! - Registry: `<class base URI>/<local id>`
//! - Register: `<class base URI>/<local id>` when the class declares a base
//!   URI, otherwise `<registry URI>/<local id>`
//! - External item: its local id, verbatim
//! - Item: `<register URI>/<collection chain>/<local id>`, where the chain is
//!   the local ids of enclosing collections from root to leaf

use crate::models::{NodeType, Predicate, RegistryNode};
use crate::services::context::{BoxFuture, ResolutionContext};
use crate::services::error::ResolveError;
use std::collections::HashSet;

/// Canonical URI of `node`
///
/// # Errors
///
/// `UnresolvedRelation` when an ancestor needed for the URI is missing.
pub fn build_uri<'b, 's: 'b>(
    ctx: &'b ResolutionContext<'s>,
    node: &'b RegistryNode,
) -> BoxFuture<'b, Result<String, ResolveError>> {
    Box::pin(async move {
        match node.node_type() {
            NodeType::Registry => {
                let base_uri = node
                    .item_class
                    .base_uri
                    .as_deref()
                    .ok_or_else(|| ResolveError::unresolved(&node.id, "base URI"))?;
                Ok(format!("{}/{}", base_uri, node.local_id))
            }
            NodeType::Register => {
                if let Some(base_uri) = node.item_class.base_uri.as_deref() {
                    return Ok(format!("{}/{}", base_uri, node.local_id));
                }
                let registry = ctx
                    .require_related_by_subject(node, Predicate::Registry)
                    .await?;
                let registry_uri = build_uri(ctx, &registry).await?;
                Ok(format!("{}/{}", registry_uri, node.local_id))
            }
            NodeType::Item => {
                if node.external {
                    return Ok(node.local_id.clone());
                }
                let register = ctx
                    .require_related_by_subject(node, Predicate::Register)
                    .await?;
                let register_uri = build_uri(ctx, &register).await?;
                let chain = collection_chain(ctx, node).await?;
                if chain.is_empty() {
                    Ok(format!("{}/{}", register_uri, node.local_id))
                } else {
                    Ok(format!(
                        "{}/{}/{}",
                        register_uri,
                        chain.join("/"),
                        node.local_id
                    ))
                }
            }
        }
    })
}

/// URI of `node`, or `None` when it cannot be computed
pub async fn try_build_uri(
    ctx: &ResolutionContext<'_>,
    node: &RegistryNode,
) -> Result<Option<String>, ResolveError> {
    match build_uri(ctx, node).await {
        Ok(uri) => Ok(Some(uri)),
        Err(e) if e.is_unresolved_relation() => {
            tracing::debug!(node_id = %node.id, error = %e, "URI not computable");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Local ids of the collections enclosing `node`, root first
///
/// Follows `collection` relations upwards; a revisited node ends the walk.
pub async fn collection_chain(
    ctx: &ResolutionContext<'_>,
    node: &RegistryNode,
) -> Result<Vec<String>, ResolveError> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(node.id.clone());

    let mut current = ctx
        .first_related_by_subject(node, Predicate::Collection)
        .await?;
    while let Some(collection) = current {
        if !visited.insert(collection.id.clone()) {
            tracing::warn!(
                node_id = %node.id,
                collection_id = %collection.id,
                "Collection cycle detected, truncating chain"
            );
            break;
        }
        current = ctx
            .first_related_by_subject(&collection, Predicate::Collection)
            .await?;
        chain.push(collection.local_id);
    }

    chain.reverse();
    Ok(chain)
}

/// Find the node whose URI is exactly `uri`
///
/// The segment before the last `/` names the register item class; the node
/// is looked up by local id in that class's first child class. If that fails
/// or yields a different URI, every node sharing the local id is tried.
pub async fn find_by_uri(
    ctx: &ResolutionContext<'_>,
    uri: &str,
) -> Result<Option<RegistryNode>, ResolveError> {
    let Some(split) = uri.rfind('/') else {
        return Ok(None);
    };
    let local_id = &uri[split + 1..];
    let head = &uri[..split];
    let class_local_id = head.rsplit('/').next().unwrap_or(head);

    match find_in_register_class(ctx, uri, local_id, class_local_id).await {
        Ok(Some(node)) => return Ok(Some(node)),
        Ok(None) => {}
        Err(e) => {
            tracing::debug!(uri, error = %e, "Direct URI lookup failed, scanning by local id");
        }
    }

    for candidate in ctx.store().get_nodes_by_local_id(local_id).await? {
        match build_uri(ctx, &candidate).await {
            Ok(candidate_uri) if candidate_uri == uri => return Ok(Some(candidate)),
            Ok(_) => {}
            Err(e) if e.is_unresolved_relation() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

async fn find_in_register_class(
    ctx: &ResolutionContext<'_>,
    uri: &str,
    local_id: &str,
    class_local_id: &str,
) -> Result<Option<RegistryNode>, ResolveError> {
    let Some(register_class) = ctx
        .store()
        .get_item_class_by_local_id(class_local_id)
        .await?
    else {
        return Ok(None);
    };
    let Some(item_class) = ctx
        .store()
        .get_child_item_classes(&register_class.id)
        .await?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };
    let Some(node) = ctx
        .store()
        .get_node_by_local_id_and_class(local_id, &item_class.id)
        .await?
    else {
        return Ok(None);
    };

    if build_uri(ctx, &node).await? == uri {
        Ok(Some(node))
    } else {
        Ok(None)
    }
}
