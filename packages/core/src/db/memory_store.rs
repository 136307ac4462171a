//! In-memory Registry Store
//!
//! `MemoryStore` serves a registry loaded from a JSON snapshot. It is the
//! backend used by tests and by the server when it is pointed at an export
//! file instead of a database.
//!
//! # Snapshot Format
//!
//! A snapshot is a flat set of tables keyed by id (`statusGroups`, `statuses`,
//! `itemClasses`, `nodes`, `relations`, `fields`, `fieldMappings`,
//! `localizations`, `statusLocalizations`, `history`). Nodes, statuses and
//! mappings refer to other records by id; every reference is checked when the
//! store is built, so queries never meet a dangling id.
//!
//! Query results keep snapshot order, except field mappings (stable-sorted by
//! `order`) and history (sorted by version number).

use crate::db::error::DatabaseError;
use crate::db::registry_store::RegistryStore;
use crate::models::{
    Field, FieldMapping, ItemClass, Localization, Predicate, RegistryNode, Relation,
    RelationQuery, Status, StatusGroup, StatusLocalization, VersionHistoryEntry,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Status row of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub id: String,
    pub local_id: String,
    pub is_public: bool,
    /// Status group id
    pub group: String,
}

/// Node row of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: String,
    pub local_id: String,
    #[serde(default)]
    pub external: bool,
    /// Item class id
    pub item_class: String,
    /// Status id
    pub status: String,
    pub insert_date: DateTime<Utc>,
    #[serde(default)]
    pub edit_date: Option<DateTime<Utc>>,
}

/// Relation row of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRecord {
    pub id: String,
    pub subject: String,
    pub predicate: Predicate,
    pub object: String,
}

/// Field mapping row of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMappingRecord {
    pub id: String,
    /// Field id
    pub field: String,
    pub item_class: String,
    pub order: i32,
    #[serde(default)]
    pub table_visible: bool,
    #[serde(default)]
    pub hidden: bool,
}

/// Serialized registry contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySnapshot {
    pub status_groups: Vec<StatusGroup>,
    pub statuses: Vec<StatusRecord>,
    pub item_classes: Vec<ItemClass>,
    pub nodes: Vec<NodeRecord>,
    pub relations: Vec<RelationRecord>,
    pub fields: Vec<Field>,
    pub field_mappings: Vec<FieldMappingRecord>,
    pub localizations: Vec<Localization>,
    pub status_localizations: Vec<StatusLocalization>,
    pub history: Vec<VersionHistoryEntry>,
}

/// Registry held in memory, read through `RegistryStore`
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    nodes: Vec<RegistryNode>,
    node_index: HashMap<String, usize>,
    item_classes: Vec<ItemClass>,
    relations: Vec<RelationRecord>,
    fields: Vec<Field>,
    field_mappings: HashMap<String, Vec<FieldMapping>>,
    localizations: Vec<Localization>,
    status_localizations: Vec<StatusLocalization>,
    history: HashMap<String, Vec<VersionHistoryEntry>>,
}

impl MemoryStore {
    /// Build a store from a snapshot, checking every cross reference
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidSnapshot` naming the first dangling id.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Result<Self, DatabaseError> {
        let groups: HashMap<&str, &StatusGroup> = snapshot
            .status_groups
            .iter()
            .map(|g| (g.id.as_str(), g))
            .collect();

        let mut statuses: HashMap<&str, Status> = HashMap::new();
        for record in &snapshot.statuses {
            let group = groups.get(record.group.as_str()).ok_or_else(|| {
                DatabaseError::invalid_snapshot(format!(
                    "status '{}' references unknown status group '{}'",
                    record.id, record.group
                ))
            })?;
            statuses.insert(
                record.id.as_str(),
                Status {
                    id: record.id.clone(),
                    local_id: record.local_id.clone(),
                    is_public: record.is_public,
                    group: (*group).clone(),
                },
            );
        }

        let classes: HashMap<&str, &ItemClass> = snapshot
            .item_classes
            .iter()
            .map(|c| (c.id.as_str(), c))
            .collect();
        for class in &snapshot.item_classes {
            if let Some(parent) = &class.parent_class {
                if !classes.contains_key(parent.as_str()) {
                    return Err(DatabaseError::invalid_snapshot(format!(
                        "item class '{}' references unknown parent class '{}'",
                        class.id, parent
                    )));
                }
            }
        }

        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        let mut node_index = HashMap::with_capacity(snapshot.nodes.len());
        for record in &snapshot.nodes {
            let item_class = classes.get(record.item_class.as_str()).ok_or_else(|| {
                DatabaseError::invalid_snapshot(format!(
                    "node '{}' references unknown item class '{}'",
                    record.id, record.item_class
                ))
            })?;
            let status = statuses.get(record.status.as_str()).ok_or_else(|| {
                DatabaseError::invalid_snapshot(format!(
                    "node '{}' references unknown status '{}'",
                    record.id, record.status
                ))
            })?;
            node_index.insert(record.id.clone(), nodes.len());
            nodes.push(RegistryNode {
                id: record.id.clone(),
                local_id: record.local_id.clone(),
                external: record.external,
                item_class: (*item_class).clone(),
                status: status.clone(),
                insert_date: record.insert_date,
                edit_date: record.edit_date,
            });
        }

        for relation in &snapshot.relations {
            for endpoint in [&relation.subject, &relation.object] {
                if !node_index.contains_key(endpoint) {
                    return Err(DatabaseError::invalid_snapshot(format!(
                        "relation '{}' references unknown node '{}'",
                        relation.id, endpoint
                    )));
                }
            }
        }

        let fields_by_id: HashMap<&str, &Field> =
            snapshot.fields.iter().map(|f| (f.id.as_str(), f)).collect();

        let mut field_mappings: HashMap<String, Vec<FieldMapping>> = HashMap::new();
        for record in &snapshot.field_mappings {
            let field = fields_by_id.get(record.field.as_str()).ok_or_else(|| {
                DatabaseError::invalid_snapshot(format!(
                    "field mapping '{}' references unknown field '{}'",
                    record.id, record.field
                ))
            })?;
            if !classes.contains_key(record.item_class.as_str()) {
                return Err(DatabaseError::invalid_snapshot(format!(
                    "field mapping '{}' references unknown item class '{}'",
                    record.id, record.item_class
                )));
            }
            field_mappings
                .entry(record.item_class.clone())
                .or_default()
                .push(FieldMapping {
                    id: record.id.clone(),
                    field: (*field).clone(),
                    item_class_id: record.item_class.clone(),
                    order: record.order,
                    table_visible: record.table_visible,
                    hidden: record.hidden,
                });
        }
        for mappings in field_mappings.values_mut() {
            mappings.sort_by_key(|m| m.order);
        }

        let relation_ids: HashSet<&str> =
            snapshot.relations.iter().map(|r| r.id.as_str()).collect();
        for loc in &snapshot.localizations {
            if !fields_by_id.contains_key(loc.field_id.as_str()) {
                return Err(DatabaseError::invalid_snapshot(format!(
                    "localization '{}' references unknown field '{}'",
                    loc.id, loc.field_id
                )));
            }
            if let Some(node_id) = &loc.node_id {
                if !node_index.contains_key(node_id) {
                    return Err(DatabaseError::invalid_snapshot(format!(
                        "localization '{}' references unknown node '{}'",
                        loc.id, node_id
                    )));
                }
            }
            if let Some(relation_id) = &loc.relation_reference {
                if !relation_ids.contains(relation_id.as_str()) {
                    return Err(DatabaseError::invalid_snapshot(format!(
                        "localization '{}' references unknown relation '{}'",
                        loc.id, relation_id
                    )));
                }
            }
        }

        for loc in &snapshot.status_localizations {
            if !statuses.contains_key(loc.status_id.as_str()) {
                return Err(DatabaseError::invalid_snapshot(format!(
                    "status localization '{}' references unknown status '{}'",
                    loc.id, loc.status_id
                )));
            }
        }

        let mut history: HashMap<String, Vec<VersionHistoryEntry>> = HashMap::new();
        for entry in &snapshot.history {
            if !node_index.contains_key(&entry.node_id) {
                return Err(DatabaseError::invalid_snapshot(format!(
                    "history entry '{}' references unknown node '{}'",
                    entry.id, entry.node_id
                )));
            }
            history
                .entry(entry.node_id.clone())
                .or_default()
                .push(entry.clone());
        }
        for entries in history.values_mut() {
            entries.sort_by_key(|e| e.version_number);
        }

        tracing::debug!(
            nodes = nodes.len(),
            relations = snapshot.relations.len(),
            localizations = snapshot.localizations.len(),
            "Loaded registry snapshot"
        );

        Ok(Self {
            nodes,
            node_index,
            item_classes: snapshot.item_classes,
            relations: snapshot.relations,
            fields: snapshot.fields,
            field_mappings,
            localizations: snapshot.localizations,
            status_localizations: snapshot.status_localizations,
            history,
        })
    }

    /// Parse a JSON snapshot and build the store
    pub fn from_json_str(json: &str) -> Result<Self, DatabaseError> {
        let snapshot: RegistrySnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    /// Read a JSON snapshot file and build the store
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DatabaseError::SnapshotRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&json)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: &str) -> Option<&RegistryNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    fn hydrate(&self, record: &RelationRecord) -> Result<Relation, DatabaseError> {
        let subject = self.node(&record.subject).ok_or_else(|| {
            DatabaseError::invalid_row(format!("relation '{}' lost its subject", record.id))
        })?;
        let object = self.node(&record.object).ok_or_else(|| {
            DatabaseError::invalid_row(format!("relation '{}' lost its object", record.id))
        })?;
        Ok(Relation {
            id: record.id.clone(),
            subject: subject.clone(),
            predicate: record.predicate,
            object: object.clone(),
        })
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn get_node(&self, id: &str) -> Result<Option<RegistryNode>> {
        Ok(self.node(id).cloned())
    }

    async fn get_nodes_by_local_id(&self, local_id: &str) -> Result<Vec<RegistryNode>> {
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.local_id == local_id)
            .cloned()
            .collect())
    }

    async fn get_node_by_local_id_and_class(
        &self,
        local_id: &str,
        item_class_id: &str,
    ) -> Result<Option<RegistryNode>> {
        Ok(self
            .nodes
            .iter()
            .find(|n| n.local_id == local_id && n.item_class.id == item_class_id)
            .cloned())
    }

    async fn get_nodes_by_item_class(&self, item_class_id: &str) -> Result<Vec<RegistryNode>> {
        Ok(self
            .nodes
            .iter()
            .filter(|n| n.item_class.id == item_class_id)
            .cloned()
            .collect())
    }

    async fn get_item_class_by_local_id(&self, local_id: &str) -> Result<Option<ItemClass>> {
        Ok(self
            .item_classes
            .iter()
            .find(|c| c.local_id == local_id)
            .cloned())
    }

    async fn get_child_item_classes(&self, item_class_id: &str) -> Result<Vec<ItemClass>> {
        Ok(self
            .item_classes
            .iter()
            .filter(|c| c.parent_class.as_deref() == Some(item_class_id))
            .cloned()
            .collect())
    }

    async fn get_relations(&self, query: RelationQuery<'_>) -> Result<Vec<Relation>> {
        if !query.is_bound() {
            return Err(DatabaseError::UnboundRelationQuery(query.predicate).into());
        }
        let mut relations = Vec::new();
        for record in &self.relations {
            if query.matches(&record.subject, record.predicate, &record.object) {
                relations.push(self.hydrate(record)?);
            }
        }
        Ok(relations)
    }

    async fn get_relation(&self, id: &str) -> Result<Option<Relation>> {
        match self.relations.iter().find(|r| r.id == id) {
            Some(record) => Ok(Some(self.hydrate(record)?)),
            None => Ok(None),
        }
    }

    async fn get_history(&self, node_id: &str) -> Result<Vec<VersionHistoryEntry>> {
        Ok(self.history.get(node_id).cloned().unwrap_or_default())
    }

    async fn get_field_by_local_id(&self, local_id: &str) -> Result<Option<Field>> {
        Ok(self.fields.iter().find(|f| f.local_id == local_id).cloned())
    }

    async fn get_field_mappings(&self, item_class_id: &str) -> Result<Vec<FieldMapping>> {
        Ok(self
            .field_mappings
            .get(item_class_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_localizations(
        &self,
        field_id: &str,
        node_id: &str,
        language: &str,
    ) -> Result<Vec<Localization>> {
        Ok(self
            .localizations
            .iter()
            .filter(|l| {
                l.field_id == field_id
                    && l.node_id.as_deref() == Some(node_id)
                    && l.language == language
            })
            .cloned()
            .collect())
    }

    async fn get_node_localizations(
        &self,
        node_id: &str,
        language: &str,
    ) -> Result<Vec<Localization>> {
        Ok(self
            .localizations
            .iter()
            .filter(|l| l.node_id.as_deref() == Some(node_id) && l.language == language)
            .cloned()
            .collect())
    }

    async fn get_field_localization(
        &self,
        field_id: &str,
        language: &str,
    ) -> Result<Option<Localization>> {
        Ok(self
            .localizations
            .iter()
            .find(|l| l.field_id == field_id && l.node_id.is_none() && l.language == language)
            .cloned())
    }

    async fn get_status_localization(
        &self,
        status_id: &str,
        language: &str,
    ) -> Result<Option<StatusLocalization>> {
        Ok(self
            .status_localizations
            .iter()
            .find(|l| l.status_id == status_id && l.language == language)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> serde_json::Value {
        json!({
            "statusGroups": [{"id": "g", "localId": "status", "baseUri": "http://ex"}],
            "statuses": [{"id": "1", "localId": "valid", "isPublic": true, "group": "g"}],
            "itemClasses": [
                {"id": "c-reg", "localId": "codelist", "classType": "register", "baseUri": "http://ex"},
                {"id": "c-item", "localId": "CodeListValue", "classType": "item", "parentClass": "c-reg"}
            ],
            "nodes": [
                {"id": "reg", "localId": "codelist", "itemClass": "c-reg", "status": "1",
                 "insertDate": "2020-05-11T00:00:00Z"},
                {"id": "a", "localId": "a", "itemClass": "c-item", "status": "1",
                 "insertDate": "2020-05-11T00:00:00Z"},
                {"id": "b", "localId": "b", "itemClass": "c-item", "status": "1",
                 "insertDate": "2020-05-11T00:00:00Z"}
            ],
            "relations": [
                {"id": "r1", "subject": "a", "predicate": "register", "object": "reg"},
                {"id": "r2", "subject": "b", "predicate": "register", "object": "reg"},
                {"id": "r3", "subject": "b", "predicate": "parent", "object": "a"}
            ],
            "fields": [
                {"id": "f-label", "localId": "label", "isTitle": true, "fieldType": "plain"},
                {"id": "f-def", "localId": "definition", "fieldType": "plain"}
            ],
            "fieldMappings": [
                {"id": "m2", "field": "f-def", "itemClass": "c-item", "order": 2},
                {"id": "m1", "field": "f-label", "itemClass": "c-item", "order": 1, "tableVisible": true}
            ],
            "history": [
                {"id": "h2", "nodeId": "a", "versionNumber": 2},
                {"id": "h1", "nodeId": "a", "versionNumber": 1}
            ]
        })
    }

    fn store() -> MemoryStore {
        MemoryStore::from_json_str(&snapshot().to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_nodes_are_hydrated() {
        let store = store();
        assert_eq!(store.node_count(), 3);

        let node = store.get_node("a").await.unwrap().unwrap();
        assert_eq!(node.item_class.local_id, "CodeListValue");
        assert!(node.status.is_public);
        assert_eq!(node.status.group.base_uri, "http://ex");
        assert!(store.get_node("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_relation_queries() {
        let store = store();

        let members = store
            .get_relations(RelationQuery::by_object("reg", Predicate::Register))
            .await
            .unwrap();
        let ids: Vec<_> = members.iter().map(|r| r.subject.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let parents = store
            .get_relations(RelationQuery::by_subject("b", Predicate::Parent))
            .await
            .unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].object.id, "a");

        let unbound = RelationQuery {
            subject: None,
            object: None,
            predicate: Predicate::Parent,
        };
        assert!(store.get_relations(unbound).await.is_err());
    }

    #[tokio::test]
    async fn test_mappings_and_history_are_ordered() {
        let store = store();

        let mappings = store.get_field_mappings("c-item").await.unwrap();
        let order: Vec<_> = mappings.iter().map(|m| m.field.local_id.as_str()).collect();
        assert_eq!(order, vec!["label", "definition"]);

        let history = store.get_history("a").await.unwrap();
        let versions: Vec<_> = history.iter().map(|h| h.version_number).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_child_item_classes() {
        let store = store();
        let children = store.get_child_item_classes("c-reg").await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "c-item");
    }

    #[test]
    fn test_dangling_reference_is_rejected() {
        let mut value = snapshot();
        value["nodes"][1]["itemClass"] = json!("nope");
        let err = MemoryStore::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidSnapshot(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_relation_reference_must_exist() {
        let mut value = snapshot();
        value["localizations"] = json!([
            {"id": "l1", "fieldId": "f-def", "nodeId": "a", "language": "en",
             "relationReference": "r3"}
        ]);
        assert!(MemoryStore::from_json_str(&value.to_string()).is_ok());

        value["localizations"][0]["relationReference"] = json!("r9");
        let err = MemoryStore::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidSnapshot(_)));
        assert!(err.to_string().contains("r9"));
    }

    #[test]
    fn test_unknown_class_type_is_rejected() {
        let mut value = snapshot();
        value["itemClasses"][0]["classType"] = json!("folder");
        let err = MemoryStore::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, DatabaseError::SnapshotParse(_)));
    }
}
