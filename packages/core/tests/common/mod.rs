//! Shared registry fixture for integration tests
//!
//! `RegistryFixture::new()` describes a minimal registry:
//!
//! - registry `r` (class base URI `http://ex`, so its URI is `http://ex/r`)
//! - register `G_localid` attached to `r`, no base URI of its own
//! - item `I_localid` in `G_localid`
//!
//! Fields `label`, `definition`, `status`, `parent`, `register`, `insertDate`
//! and a hidden `secret` field are mapped on the item class. Builder methods
//! add nodes, relations and values on top.

#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use registry_core::db::{
    FieldMappingRecord, MemoryStore, NodeRecord, RegistrySnapshot, RelationRecord, StatusRecord,
};
use registry_core::{
    Field, FieldType, ItemClass, ItemService, Localization, NodeType, Predicate, ResolverConfig,
    StatusGroup, StatusLocalization, VersionHistoryEntry,
};
use std::sync::Arc;

pub const REGISTRY_ID: &str = "node-r";
pub const REGISTER_ID: &str = "node-g";
pub const ITEM_ID: &str = "node-i";

pub const REGISTRY_URI: &str = "http://ex/r";
pub const REGISTER_URI: &str = "http://ex/r/G_localid";
pub const ITEM_URI: &str = "http://ex/r/G_localid/I_localid";

pub const REGISTRY_CLASS: &str = "class-registry";
pub const REGISTER_CLASS: &str = "class-register";
pub const ITEM_CLASS: &str = "class-item";
pub const SYSTEM_CLASS: &str = "class-system";

/// Public, localized in `en` and `fr`
pub const VALID: &str = "1";
/// Not public
pub const SUBMITTED: &str = "2";
/// Public, no localized label
pub const RETIRED: &str = "3";

pub const LABEL_FIELD: &str = "field-label";
pub const DEFINITION_FIELD: &str = "field-definition";

pub struct RegistryFixture {
    snapshot: RegistrySnapshot,
    next_id: usize,
}

impl RegistryFixture {
    pub fn new() -> Self {
        let mut fixture = Self {
            snapshot: RegistrySnapshot::default(),
            next_id: 0,
        };

        fixture.snapshot.status_groups.push(StatusGroup {
            id: "group-status".into(),
            local_id: "status".into(),
            base_uri: REGISTRY_URI.into(),
        });
        for (id, local_id, is_public) in [
            (VALID, "valid", true),
            (SUBMITTED, "submitted", false),
            (RETIRED, "retired", true),
        ] {
            fixture.snapshot.statuses.push(StatusRecord {
                id: id.into(),
                local_id: local_id.into(),
                is_public,
                group: "group-status".into(),
            });
        }
        for (lang, label) in [("en", "Valid"), ("fr", "Valide")] {
            fixture.snapshot.status_localizations.push(StatusLocalization {
                id: format!("status-{}", lang),
                status_id: VALID.into(),
                language: lang.into(),
                label: label.into(),
            });
        }

        fixture = fixture
            .item_class(REGISTRY_CLASS, "registry", NodeType::Registry, None)
            .item_class(REGISTER_CLASS, "G_localid", NodeType::Register, Some(REGISTRY_CLASS))
            .item_class(ITEM_CLASS, "GValue", NodeType::Item, Some(REGISTER_CLASS))
            .item_class(SYSTEM_CLASS, "GSystem", NodeType::Item, Some(REGISTER_CLASS))
            .class_base_uri(REGISTRY_CLASS, Some("http://ex"));
        if let Some(class) = fixture
            .snapshot
            .item_classes
            .iter_mut()
            .find(|c| c.id == SYSTEM_CLASS)
        {
            class.system_item = true;
        }

        for (id, local_id, field_type, is_title) in [
            (LABEL_FIELD, "label", FieldType::Plain, true),
            (DEFINITION_FIELD, "definition", FieldType::Plain, false),
            ("field-status", "status", FieldType::Status, false),
            ("field-parent", "parent", FieldType::ParentLink, false),
            ("field-register", "register", FieldType::RegisterMarker, false),
            ("field-insert", "insertDate", FieldType::CreationDate, false),
            ("field-secret", "secret", FieldType::Plain, false),
        ] {
            fixture.snapshot.fields.push(Field {
                id: id.into(),
                local_id: local_id.into(),
                is_title,
                field_type,
            });
        }

        for class in [REGISTRY_CLASS, REGISTER_CLASS] {
            fixture = fixture.mapping(class, LABEL_FIELD, 0, true, false);
        }
        for class in [ITEM_CLASS, SYSTEM_CLASS] {
            fixture = fixture
                .mapping(class, LABEL_FIELD, 0, true, false)
                .mapping(class, DEFINITION_FIELD, 1, false, false)
                .mapping(class, "field-status", 2, true, false)
                .mapping(class, "field-parent", 3, false, false)
                .mapping(class, "field-register", 4, false, false)
                .mapping(class, "field-insert", 5, false, false)
                .mapping(class, "field-secret", 6, false, true);
        }

        fixture = fixture
            .field_label(LABEL_FIELD, "en", "Label")
            .field_label(DEFINITION_FIELD, "en", "Definition")
            .field_label(DEFINITION_FIELD, "fr", "Définition")
            .node(REGISTRY_ID, "r", REGISTRY_CLASS, VALID)
            .node(REGISTER_ID, "G_localid", REGISTER_CLASS, VALID)
            .relate(REGISTER_ID, Predicate::Registry, REGISTRY_ID)
            .label(REGISTRY_ID, "en", "Registry R")
            .label(REGISTER_ID, "en", "Register G")
            .item(ITEM_ID, "I_localid")
            .label(ITEM_ID, "en", "Item I")
            .label(ITEM_ID, "fr", "Élément I")
            .value(DEFINITION_FIELD, ITEM_ID, "en", "The first item");
        fixture
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    pub fn item_class(
        mut self,
        id: &str,
        local_id: &str,
        class_type: NodeType,
        parent_class: Option<&str>,
    ) -> Self {
        self.snapshot.item_classes.push(ItemClass {
            id: id.into(),
            local_id: local_id.into(),
            base_uri: None,
            parent_class: parent_class.map(String::from),
            system_item: false,
            class_type,
        });
        self
    }

    pub fn class_base_uri(mut self, class_id: &str, base_uri: Option<&str>) -> Self {
        if let Some(class) = self
            .snapshot
            .item_classes
            .iter_mut()
            .find(|c| c.id == class_id)
        {
            class.base_uri = base_uri.map(String::from);
        }
        self
    }

    pub fn mapping(
        mut self,
        class_id: &str,
        field_id: &str,
        order: i32,
        table_visible: bool,
        hidden: bool,
    ) -> Self {
        let id = self.next_id("mapping");
        self.snapshot.field_mappings.push(FieldMappingRecord {
            id,
            field: field_id.into(),
            item_class: class_id.into(),
            order,
            table_visible,
            hidden,
        });
        self
    }

    /// Add a field and map it on the item class at `order`
    pub fn item_field(
        mut self,
        id: &str,
        local_id: &str,
        field_type: FieldType,
        order: i32,
    ) -> Self {
        self.snapshot.fields.push(Field {
            id: id.into(),
            local_id: local_id.into(),
            is_title: false,
            field_type,
        });
        self.mapping(ITEM_CLASS, id, order, false, false)
    }

    pub fn node(mut self, id: &str, local_id: &str, class_id: &str, status_id: &str) -> Self {
        self.snapshot.nodes.push(NodeRecord {
            id: id.into(),
            local_id: local_id.into(),
            external: false,
            item_class: class_id.into(),
            status: status_id.into(),
            insert_date: Utc.with_ymd_and_hms(2020, 5, 11, 9, 30, 0).unwrap(),
            edit_date: None,
        });
        self
    }

    pub fn edit_date(mut self, node_id: &str, edit_date: DateTime<Utc>) -> Self {
        if let Some(node) = self.snapshot.nodes.iter_mut().find(|n| n.id == node_id) {
            node.edit_date = Some(edit_date);
        }
        self
    }

    /// Public item of the item class, attached to register `G_localid`
    pub fn item(self, id: &str, local_id: &str) -> Self {
        self.node(id, local_id, ITEM_CLASS, VALID)
            .relate(id, Predicate::Register, REGISTER_ID)
            .relate(id, Predicate::Registry, REGISTRY_ID)
    }

    /// Item of the system class, attached to register `G_localid`
    pub fn system_item(self, id: &str, local_id: &str) -> Self {
        self.node(id, local_id, SYSTEM_CLASS, VALID)
            .relate(id, Predicate::Register, REGISTER_ID)
            .relate(id, Predicate::Registry, REGISTRY_ID)
    }

    pub fn status(mut self, node_id: &str, status_id: &str) -> Self {
        if let Some(node) = self.snapshot.nodes.iter_mut().find(|n| n.id == node_id) {
            node.status = status_id.into();
        }
        self
    }

    pub fn relate(mut self, subject: &str, predicate: Predicate, object: &str) -> Self {
        let id = self.next_id("relation");
        self.relate_as(&id, subject, predicate, object)
    }

    /// Relation with a fixed id, for relation-reference localizations
    pub fn relate_as(
        mut self,
        id: &str,
        subject: &str,
        predicate: Predicate,
        object: &str,
    ) -> Self {
        self.snapshot.relations.push(RelationRecord {
            id: id.into(),
            subject: subject.into(),
            predicate,
            object: object.into(),
        });
        self
    }

    pub fn unrelate(mut self, subject: &str, predicate: Predicate) -> Self {
        self.snapshot
            .relations
            .retain(|r| !(r.subject == subject && r.predicate == predicate));
        self
    }

    pub fn value(mut self, field_id: &str, node_id: &str, lang: &str, value: &str) -> Self {
        let id = self.next_id("loc");
        self.snapshot.localizations.push(Localization {
            id,
            field_id: field_id.into(),
            node_id: Some(node_id.into()),
            language: lang.into(),
            value: Some(value.into()),
            href: None,
            relation_reference: None,
        });
        self
    }

    pub fn relation_reference(
        mut self,
        field_id: &str,
        node_id: &str,
        lang: &str,
        relation_id: &str,
    ) -> Self {
        let id = self.next_id("loc");
        self.snapshot.localizations.push(Localization {
            id,
            field_id: field_id.into(),
            node_id: Some(node_id.into()),
            language: lang.into(),
            value: None,
            href: None,
            relation_reference: Some(relation_id.into()),
        });
        self
    }

    pub fn label(self, node_id: &str, lang: &str, value: &str) -> Self {
        self.value(LABEL_FIELD, node_id, lang, value)
    }

    pub fn field_label(mut self, field_id: &str, lang: &str, value: &str) -> Self {
        let id = self.next_id("loc");
        self.snapshot.localizations.push(Localization {
            id,
            field_id: field_id.into(),
            node_id: None,
            language: lang.into(),
            value: Some(value.into()),
            href: None,
            relation_reference: None,
        });
        self
    }

    pub fn history(mut self, node_id: &str, versions: &[i32]) -> Self {
        for &version_number in versions {
            let id = self.next_id("history");
            self.snapshot.history.push(VersionHistoryEntry {
                id,
                node_id: node_id.into(),
                version_number,
            });
        }
        self
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.snapshot.clone()
    }

    pub fn store(&self) -> Result<Arc<MemoryStore>> {
        Ok(Arc::new(MemoryStore::from_snapshot(self.snapshot())?))
    }

    pub fn service(&self) -> Result<ItemService> {
        self.service_with(ResolverConfig::default())
    }

    pub fn service_with(&self, config: ResolverConfig) -> Result<ItemService> {
        Ok(ItemService::new(self.store()?, config)?)
    }
}

impl Default for RegistryFixture {
    fn default() -> Self {
        Self::new()
    }
}
