//! Fields, field mappings and localized values

use super::node::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic type of a field; drives property assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    /// Free localized text (the default)
    Plain,
    CollectionLink,
    ParentLink,
    SuccessorLink,
    PredecessorLink,
    /// Zero or more references stored as relation-reference localizations
    RelationReferenceLink,
    Status,
    CreationDate,
    EditDate,
    /// Container marker fields; never emitted
    RegistryMarker,
    RegisterMarker,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Plain => "plain",
            FieldType::CollectionLink => "collectionLink",
            FieldType::ParentLink => "parentLink",
            FieldType::SuccessorLink => "successorLink",
            FieldType::PredecessorLink => "predecessorLink",
            FieldType::RelationReferenceLink => "relationReferenceLink",
            FieldType::Status => "status",
            FieldType::CreationDate => "creationDate",
            FieldType::EditDate => "editDate",
            FieldType::RegistryMarker => "registryMarker",
            FieldType::RegisterMarker => "registerMarker",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(FieldType::Plain),
            "collectionLink" => Ok(FieldType::CollectionLink),
            "parentLink" => Ok(FieldType::ParentLink),
            "successorLink" => Ok(FieldType::SuccessorLink),
            "predecessorLink" => Ok(FieldType::PredecessorLink),
            "relationReferenceLink" => Ok(FieldType::RelationReferenceLink),
            "status" => Ok(FieldType::Status),
            "creationDate" => Ok(FieldType::CreationDate),
            "editDate" => Ok(FieldType::EditDate),
            "registryMarker" => Ok(FieldType::RegistryMarker),
            "registerMarker" => Ok(FieldType::RegisterMarker),
            other => Err(ValidationError::InvalidFieldType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub local_id: String,
    #[serde(default)]
    pub is_title: bool,
    pub field_type: FieldType,
}

/// Binding of a field to an item class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub id: String,
    pub field: Field,
    pub item_class_id: String,
    pub order: i32,
    pub table_visible: bool,
    pub hidden: bool,
}

/// A localized value
///
/// - `field_id` + `node_id`: a property value of a node
/// - `field_id` without `node_id`: the display label of the field itself
/// - `relation_reference`: for relation-reference fields, the id of the
///   stored relation whose object is the referenced node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Localization {
    pub id: String,
    pub field_id: String,
    #[serde(default)]
    pub node_id: Option<String>,
    pub language: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub relation_reference: Option<String>,
}

/// Localized label of a status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLocalization {
    pub id: String,
    pub status_id: String,
    pub language: String,
    pub label: String,
}

/// A prior version of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistoryEntry {
    pub id: String,
    pub node_id: String,
    pub version_number: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_names_match_serde() {
        let json = serde_json::to_value(FieldType::RelationReferenceLink).unwrap();
        assert_eq!(json, json!("relationReferenceLink"));
        assert_eq!(
            "relationReferenceLink".parse::<FieldType>().unwrap(),
            FieldType::RelationReferenceLink
        );
        assert!("date".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_localization_minimal() {
        let loc: Localization = serde_json::from_value(json!({
            "id": "l1",
            "fieldId": "f-label",
            "language": "en"
        }))
        .unwrap();
        assert!(loc.node_id.is_none());
        assert!(loc.value.is_none());
        assert!(loc.relation_reference.is_none());
    }
}
