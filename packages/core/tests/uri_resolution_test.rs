//! Integration tests for URI building, reverse lookup and entry points
//!
//! Tests cover:
//! - Canonical URIs through the registry → register → item chain
//! - Register base URI precedence over the registry relation
//! - URI round trip through `get_item_by_uri`
//! - Public / non-public resolution
//! - Version numbering

mod common;

use anyhow::Result;
use common::*;
use registry_core::{Predicate, ResolveError, ResolverConfig};

// =========================================================================
// URI Building
// =========================================================================

#[tokio::test]
async fn test_item_uri_through_register_and_registry() -> Result<()> {
    let service = RegistryFixture::new().service()?;

    assert_eq!(service.get_uri(REGISTRY_ID).await?, REGISTRY_URI);
    assert_eq!(service.get_uri(REGISTER_ID).await?, REGISTER_URI);
    assert_eq!(
        service.get_uri(ITEM_ID).await?,
        "http://ex/r/G_localid/I_localid"
    );
    Ok(())
}

#[tokio::test]
async fn test_register_base_uri_wins_over_registry() -> Result<()> {
    let with_relation = RegistryFixture::new()
        .class_base_uri(REGISTER_CLASS, Some("http://codes.ex"))
        .service()?;
    let without_relation = RegistryFixture::new()
        .class_base_uri(REGISTER_CLASS, Some("http://codes.ex"))
        .unrelate(REGISTER_ID, Predicate::Registry)
        .service()?;

    for service in [&with_relation, &without_relation] {
        assert_eq!(
            service.get_uri(REGISTER_ID).await?,
            "http://codes.ex/G_localid"
        );
        assert_eq!(
            service.get_uri(ITEM_ID).await?,
            "http://codes.ex/G_localid/I_localid"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_register_without_base_uri_needs_registry() -> Result<()> {
    let service = RegistryFixture::new()
        .unrelate(REGISTER_ID, Predicate::Registry)
        .service()?;

    let err = service.get_uri(REGISTER_ID).await.unwrap_err();
    assert!(matches!(err, ResolveError::UnresolvedRelation { .. }));
    assert!(err.to_string().contains(REGISTER_ID));

    // items inherit the failure
    assert!(service.get_item_by_id(ITEM_ID, None).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_collection_chain_in_item_uri() -> Result<()> {
    let service = RegistryFixture::new()
        .item("node-m1", "m1")
        .relate("node-m1", Predicate::Collection, ITEM_ID)
        .item("node-m2", "m2")
        .relate("node-m2", Predicate::Collection, "node-m1")
        .service()?;

    assert_eq!(
        service.get_uri("node-m2").await?,
        "http://ex/r/G_localid/I_localid/m1/m2"
    );
    Ok(())
}

#[tokio::test]
async fn test_collection_cycle_truncates_chain() -> Result<()> {
    let service = RegistryFixture::new()
        .item("node-x", "x")
        .item("node-y", "y")
        .relate("node-x", Predicate::Collection, "node-y")
        .relate("node-y", Predicate::Collection, "node-x")
        .item("node-z", "z")
        .relate("node-z", Predicate::Collection, "node-z")
        .service()?;

    assert_eq!(service.get_uri("node-x").await?, "http://ex/r/G_localid/y/x");
    assert_eq!(service.get_uri("node-y").await?, "http://ex/r/G_localid/x/y");
    assert_eq!(service.get_uri("node-z").await?, "http://ex/r/G_localid/z");
    Ok(())
}

#[tokio::test]
async fn test_external_item_uri_is_its_local_id() -> Result<()> {
    let mut snapshot = RegistryFixture::new()
        .item("node-ext", "http://elsewhere.ex/concept/9")
        .snapshot();
    if let Some(node) = snapshot.nodes.iter_mut().find(|n| n.id == "node-ext") {
        node.external = true;
    }
    let store = std::sync::Arc::new(registry_core::MemoryStore::from_snapshot(snapshot)?);
    let service = registry_core::ItemService::new(store, ResolverConfig::default())?;

    assert_eq!(
        service.get_uri("node-ext").await?,
        "http://elsewhere.ex/concept/9"
    );
    let item = service.get_item_by_id("node-ext", None).await?.unwrap();
    assert!(item.external);
    Ok(())
}

#[tokio::test]
async fn test_unknown_node() -> Result<()> {
    let service = RegistryFixture::new().service()?;

    assert!(service.get_item_by_id("missing", None).await?.is_none());
    let err = service.get_uri("missing").await.unwrap_err();
    assert!(matches!(err, ResolveError::NodeNotFound { .. }));
    Ok(())
}

// =========================================================================
// Reverse Lookup
// =========================================================================

#[tokio::test]
async fn test_uri_round_trip() -> Result<()> {
    let service = RegistryFixture::new()
        .item("node-c1", "c1")
        .relate("node-c1", Predicate::Parent, ITEM_ID)
        .service()?;

    for id in [ITEM_ID, "node-c1", REGISTER_ID, REGISTRY_ID] {
        let uri = service.get_uri(id).await?;
        let node = service.find_node_by_uri(&uri).await?;
        assert_eq!(node.map(|n| n.id).as_deref(), Some(id), "round trip of {}", uri);
    }

    let item = service.get_item_by_uri(ITEM_URI, Some("fr")).await?.unwrap();
    assert_eq!(item.id, ITEM_ID);
    assert_eq!(item.language, "fr");
    Ok(())
}

#[tokio::test]
async fn test_uri_lookup_misses() -> Result<()> {
    let service = RegistryFixture::new().service()?;

    for uri in [
        "http://ex/r/G_localid/unknown",
        "http://ex/r/other/I_localid",
        "no-slashes",
    ] {
        assert!(service.get_item_by_uri(uri, None).await?.is_none(), "{}", uri);
    }
    Ok(())
}

// =========================================================================
// Public Status
// =========================================================================

#[tokio::test]
async fn test_non_public_node_toggle() -> Result<()> {
    let hidden = RegistryFixture::new().status(ITEM_ID, SUBMITTED).service()?;
    assert!(hidden.get_item_by_id(ITEM_ID, None).await?.is_none());
    assert!(hidden.get_item_by_uri(ITEM_URI, None).await?.is_none());
    // the URI itself is still computable
    assert_eq!(hidden.get_uri(ITEM_ID).await?, ITEM_URI);

    let public = RegistryFixture::new().status(ITEM_ID, VALID).service()?;
    let item = public.get_item_by_id(ITEM_ID, None).await?;
    assert_eq!(item.map(|i| i.uri).as_deref(), Some(ITEM_URI));
    Ok(())
}

// =========================================================================
// Versions
// =========================================================================

#[tokio::test]
async fn test_version_numbering() -> Result<()> {
    let service = RegistryFixture::new()
        .history(ITEM_ID, &[2, 1])
        .service()?;

    let item = service.get_item_by_id(ITEM_ID, None).await?.unwrap();
    assert_eq!(item.version.number, 3);
    assert_eq!(item.version.uri, format!("{}:3", ITEM_URI));
    let history: Vec<_> = item.version_history.iter().map(|v| v.number).collect();
    assert_eq!(history, vec![1, 2]);
    assert_eq!(item.version_history[0].uri, format!("{}:1", ITEM_URI));

    let register = service.get_item_by_id(REGISTER_ID, None).await?.unwrap();
    assert_eq!(register.version.number, 1);
    assert!(register.version_history.is_empty());
    Ok(())
}

// =========================================================================
// Configuration
// =========================================================================

#[tokio::test]
async fn test_invalid_config_is_rejected() -> Result<()> {
    let config = ResolverConfig {
        master_language: String::new(),
        ..ResolverConfig::default()
    };
    let err = RegistryFixture::new().service_with(config).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<ResolveError>(),
        Some(ResolveError::InvalidConfig(_))
    ));
    Ok(())
}
