//! Hierarchy Resolver
//!
//! Assembles the representation of a node and, recursively, the reduced
//! representations of the nodes around it.
//!
//! # Render Modes
//!
//! | Mode | Sections |
//! |---|---|
//! | `Full` | everything |
//! | `Contained` | main, refs, is-defined-by, top concepts, in-scheme; items also narrower, broader, contained items |
//! | `ContainedWithoutItems` | main, refs, is-defined-by, top concepts, in-scheme |
//! | `DefinedBy` | main properties only |
//!
//! Top concepts, broader and in-scheme entries are URI-only (`BasicItem`).
//!
//! # Depth
//!
//! Every nested render runs one level deeper than its parent. Going past
//! `max_depth` fails with `NestingTooDeep`.

use crate::models::{
    non_empty, BasicItem, ItemClass, ItemClassRef, ItemRepresentation, NodeType, Predicate,
    RegistryNode,
};
use crate::services::context::{BoxFuture, ResolutionContext};
use crate::services::error::ResolveError;
use crate::services::property_assembler::{assemble_properties, item_ref, visible};
use crate::services::uri_builder::{build_uri, try_build_uri};
use crate::services::version_resolver::resolve_versions;

/// How much of a node is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Full,
    Contained,
    ContainedWithoutItems,
    DefinedBy,
}

/// Representation of `node`, or `None` when its status is not public
pub async fn resolve(
    ctx: &mut ResolutionContext<'_>,
    node: &RegistryNode,
) -> Result<Option<ItemRepresentation>, ResolveError> {
    if !node.is_public() {
        tracing::debug!(node_id = %node.id, status = %node.status.local_id, "Node is not public");
        return Ok(None);
    }
    render(ctx, node, RenderMode::Full, 0).await.map(Some)
}

/// Render `node` in `mode` at nesting `depth`
pub fn render<'b, 's: 'b>(
    ctx: &'b mut ResolutionContext<'s>,
    node: &'b RegistryNode,
    mode: RenderMode,
    depth: usize,
) -> BoxFuture<'b, Result<ItemRepresentation, ResolveError>> {
    Box::pin(async move {
        if depth > ctx.config().max_depth {
            return Err(ResolveError::nesting_too_deep(&node.id, depth));
        }

        let mut rep = main_properties(ctx, node).await?;
        if mode == RenderMode::DefinedBy {
            return Ok(rep);
        }

        set_container_refs(ctx, node, &mut rep).await?;
        rep.is_defined_by = non_empty(defined_by(ctx, node, depth).await?);

        let node_type = node.node_type();
        let with_item_sections = match mode {
            RenderMode::Full => true,
            RenderMode::Contained => node_type == NodeType::Item,
            RenderMode::ContainedWithoutItems | RenderMode::DefinedBy => false,
        };

        match node_type {
            NodeType::Registry => {
                if mode == RenderMode::Full {
                    let registers = registers_of(ctx, node).await?;
                    let registers =
                        render_all(ctx, &registers, RenderMode::ContainedWithoutItems, depth)
                            .await?;
                    rep.contained_items = non_empty(registers);
                    rep.contained_items_by_class =
                        non_empty(contained_items_by_class(ctx, node, depth).await?);
                }
            }
            NodeType::Register => {
                let items = directly_contained_items(ctx, node).await?;
                rep.top_concepts = non_empty(basic_items(ctx, &items).await?);
                if mode == RenderMode::Full {
                    let items =
                        render_all(ctx, &items, RenderMode::ContainedWithoutItems, depth).await?;
                    rep.contained_items = non_empty(items);
                }
            }
            NodeType::Item => {
                let candidates = item_candidates(ctx, node).await?;
                rep.top_concepts = non_empty(basic_items(ctx, &candidates).await?);
                if with_item_sections {
                    let contained =
                        render_all(ctx, &candidates, RenderMode::Contained, depth).await?;
                    rep.contained_items = non_empty(contained);
                }
            }
        }

        if let Some(scheme) = in_scheme(ctx, node).await? {
            rep.top_concept_of = Some(scheme.clone());
            rep.in_scheme = Some(scheme);
        }

        if with_item_sections {
            rep.narrower = non_empty(narrower(ctx, node, depth).await?);
            rep.broader = non_empty(broader(ctx, node).await?);
        }

        Ok(rep)
    })
}

/// Identity, version, properties and the item flags
async fn main_properties(
    ctx: &mut ResolutionContext<'_>,
    node: &RegistryNode,
) -> Result<ItemRepresentation, ResolveError> {
    let uri = build_uri(ctx, node).await?;
    let (version, version_history) = resolve_versions(ctx, node, &uri).await?;
    let properties = assemble_properties(ctx, node, visible).await?;

    let node_type = node.node_type();
    let (has_collection, is_parent, external) = match node_type {
        NodeType::Item => (
            !ctx.related_by_subject(node, Predicate::Collection).await?.is_empty(),
            !ctx.related_by_subject(node, Predicate::Parent).await?.is_empty(),
            node.external,
        ),
        NodeType::Registry | NodeType::Register => (false, false, false),
    };

    Ok(ItemRepresentation {
        id: node.id.clone(),
        uri,
        local_id: node.local_id.clone(),
        latest: true,
        version,
        version_history,
        language: ctx.language().to_string(),
        node_type,
        insert_date: node.insert_date,
        edit_date: node.edit_date,
        item_class: ItemClassRef {
            id: node.item_class.local_id.clone(),
        },
        has_collection,
        is_parent,
        external,
        registry: None,
        register: None,
        properties,
        is_defined_by: None,
        contained_items: None,
        contained_items_by_class: None,
        top_concepts: None,
        in_scheme: None,
        top_concept_of: None,
        narrower: None,
        broader: None,
    })
}

/// Registry reference for registers and items, register reference for items
async fn set_container_refs(
    ctx: &mut ResolutionContext<'_>,
    node: &RegistryNode,
    rep: &mut ItemRepresentation,
) -> Result<(), ResolveError> {
    let predicates: &[Predicate] = match node.node_type() {
        NodeType::Registry => &[],
        NodeType::Register => &[Predicate::Registry],
        NodeType::Item => &[Predicate::Registry, Predicate::Register],
    };

    for &predicate in predicates {
        let Some(target) = ctx.first_related_by_subject(node, predicate).await? else {
            continue;
        };
        let reference = item_ref(ctx, &target).await?;
        match predicate {
            Predicate::Registry => rep.registry = Some(reference),
            _ => rep.register = Some(reference),
        }
    }
    Ok(())
}

/// `reference` targets of an item, main properties only
async fn defined_by(
    ctx: &mut ResolutionContext<'_>,
    node: &RegistryNode,
    depth: usize,
) -> Result<Vec<ItemRepresentation>, ResolveError> {
    match node.node_type() {
        NodeType::Item => {
            let references = ctx.related_by_subject(node, Predicate::Reference).await?;
            render_all(ctx, &references, RenderMode::DefinedBy, depth).await
        }
        NodeType::Registry | NodeType::Register => Ok(Vec::new()),
    }
}

/// Render each non-system node one level deeper
///
/// Nodes with an unresolved relation are logged and skipped; any other
/// error fails the whole list.
async fn render_all(
    ctx: &mut ResolutionContext<'_>,
    nodes: &[RegistryNode],
    mode: RenderMode,
    depth: usize,
) -> Result<Vec<ItemRepresentation>, ResolveError> {
    let mut reps = Vec::new();
    for node in nodes.iter().filter(|n| !n.is_system_item()) {
        match render(ctx, node, mode, depth + 1).await {
            Ok(rep) => reps.push(rep),
            Err(e) if e.is_unresolved_relation() => {
                tracing::warn!(node_id = %node.id, error = %e, "Skipping list item");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(reps)
}

/// URI-only entries for each non-system node, skipping unresolvable ones
async fn basic_items(
    ctx: &ResolutionContext<'_>,
    nodes: &[RegistryNode],
) -> Result<Vec<BasicItem>, ResolveError> {
    let mut items = Vec::new();
    for node in nodes.iter().filter(|n| !n.is_system_item()) {
        match build_uri(ctx, node).await {
            Ok(uri) => items.push(BasicItem { uri }),
            Err(e) if e.is_unresolved_relation() => {
                tracing::warn!(node_id = %node.id, error = %e, "Skipping list entry");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(items)
}

/// Registers attached to a registry
async fn registers_of(
    ctx: &ResolutionContext<'_>,
    registry: &RegistryNode,
) -> Result<Vec<RegistryNode>, ResolveError> {
    Ok(ctx
        .related_by_object(registry, Predicate::Registry)
        .await?
        .into_iter()
        .filter(|n| n.node_type() == NodeType::Register)
        .collect())
}

/// Items of a register that are not inside a collection
async fn directly_contained_items(
    ctx: &ResolutionContext<'_>,
    register: &RegistryNode,
) -> Result<Vec<RegistryNode>, ResolveError> {
    let mut items = Vec::new();
    for item in ctx.related_by_object(register, Predicate::Register).await? {
        if ctx
            .related_by_subject(&item, Predicate::Collection)
            .await?
            .is_empty()
        {
            items.push(item);
        }
    }
    Ok(items)
}

/// Children of an item, shared by contained items and top concepts
///
/// Tried in order, each only if the previous is empty: active top-level
/// collections inside the item, `collection` members, `parent` children.
/// A failure on that path falls back to the `parent` children.
async fn item_candidates(
    ctx: &ResolutionContext<'_>,
    item: &RegistryNode,
) -> Result<Vec<RegistryNode>, ResolveError> {
    match collection_candidates(ctx, item).await {
        Ok(candidates) => Ok(candidates),
        Err(e) => {
            tracing::warn!(
                node_id = %item.id,
                error = %e,
                "Contained item lookup failed, falling back to parent relations"
            );
            ctx.related_by_object(item, Predicate::Parent).await
        }
    }
}

async fn collection_candidates(
    ctx: &ResolutionContext<'_>,
    item: &RegistryNode,
) -> Result<Vec<RegistryNode>, ResolveError> {
    let members = ctx.related_by_object(item, Predicate::Collection).await?;

    let mut top_level = Vec::new();
    for member in &members {
        if member.status.id != ctx.config().active_status_id {
            continue;
        }
        if ctx
            .related_by_subject(member, Predicate::Parent)
            .await?
            .is_empty()
        {
            top_level.push(member.clone());
        }
    }
    if !top_level.is_empty() {
        return Ok(top_level);
    }
    if !members.is_empty() {
        return Ok(members);
    }

    tracing::debug!(node_id = %item.id, "No collection members, using parent relations");
    ctx.related_by_object(item, Predicate::Parent).await
}

/// Registry navigation listing driven by the item-class tree
///
/// For each non-system child class of the registry's class: if any of its
/// child classes has children of its own, list the instances of all its
/// child classes; otherwise list its own instances.
async fn contained_items_by_class(
    ctx: &mut ResolutionContext<'_>,
    registry: &RegistryNode,
    depth: usize,
) -> Result<Vec<ItemRepresentation>, ResolveError> {
    let store = ctx.store();

    let mut classes: Vec<ItemClass> = Vec::new();
    for class in store.get_child_item_classes(&registry.item_class.id).await? {
        if class.system_item {
            continue;
        }
        let children = store.get_child_item_classes(&class.id).await?;
        let mut has_grandchildren = false;
        for child in &children {
            if !store.get_child_item_classes(&child.id).await?.is_empty() {
                has_grandchildren = true;
                break;
            }
        }
        if has_grandchildren {
            classes.extend(children);
        } else {
            classes.push(class);
        }
    }

    let mut nodes = Vec::new();
    for class in &classes {
        nodes.extend(store.get_nodes_by_item_class(&class.id).await?);
    }
    render_all(ctx, &nodes, RenderMode::ContainedWithoutItems, depth).await
}

/// Owning scheme of a node: the registry of a register; for an item its
/// collection (or that collection's parent), else its register
async fn in_scheme(
    ctx: &ResolutionContext<'_>,
    node: &RegistryNode,
) -> Result<Option<BasicItem>, ResolveError> {
    let scheme = match node.node_type() {
        NodeType::Registry => None,
        NodeType::Register => {
            ctx.first_related_by_subject(node, Predicate::Registry)
                .await?
        }
        NodeType::Item => {
            let collection = match ctx
                .first_related_by_subject(node, Predicate::Collection)
                .await?
            {
                Some(collection) => Some(
                    ctx.first_related_by_subject(&collection, Predicate::Parent)
                        .await?
                        .unwrap_or(collection),
                ),
                None => None,
            };
            match collection {
                Some(collection) => Some(collection),
                None => {
                    ctx.first_related_by_subject(node, Predicate::Register)
                        .await?
                }
            }
        }
    };

    match scheme {
        Some(scheme) => Ok(try_build_uri(ctx, &scheme)
            .await?
            .map(|uri| BasicItem { uri })),
        None => Ok(None),
    }
}

/// Children of an item rendered without their own items; failures are
/// logged and skipped
async fn narrower(
    ctx: &mut ResolutionContext<'_>,
    node: &RegistryNode,
    depth: usize,
) -> Result<Vec<ItemRepresentation>, ResolveError> {
    let children = match node.node_type() {
        NodeType::Item => {
            let children = ctx.related_by_object(node, Predicate::Parent).await?;
            if children.is_empty() {
                ctx.related_by_object(node, Predicate::Collection).await?
            } else {
                children
            }
        }
        NodeType::Registry | NodeType::Register => Vec::new(),
    };

    let mut reps = Vec::new();
    for child in children.iter().filter(|n| !n.is_system_item()) {
        match render(ctx, child, RenderMode::ContainedWithoutItems, depth + 1).await {
            Ok(rep) => reps.push(rep),
            Err(e) => {
                tracing::error!(
                    node_id = %node.id,
                    child_id = %child.id,
                    error = %e,
                    "Skipping narrower item"
                );
            }
        }
    }
    Ok(reps)
}

/// Parent of an item, else its collection, else its register
async fn broader(
    ctx: &ResolutionContext<'_>,
    node: &RegistryNode,
) -> Result<Vec<BasicItem>, ResolveError> {
    let parents = match node.node_type() {
        NodeType::Item => {
            let mut parents = ctx.related_by_subject(node, Predicate::Parent).await?;
            if parents.is_empty() {
                parents = ctx.related_by_subject(node, Predicate::Collection).await?;
            }
            if parents.is_empty() {
                parents = ctx.related_by_subject(node, Predicate::Register).await?;
            }
            parents
        }
        NodeType::Registry | NodeType::Register => Vec::new(),
    };
    basic_items(ctx, &parents).await
}

#[cfg(test)]
#[path = "hierarchy_resolver_test.rs"]
mod hierarchy_resolver_test;
