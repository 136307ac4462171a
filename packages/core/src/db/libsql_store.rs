//! libsql Registry Store
//!
//! `LibsqlStore` reads a registry from an embedded libsql/SQLite database. The
//! schema mirrors the snapshot tables one to one, so a JSON export can be
//! imported with [`LibsqlStore::import_snapshot`] and then served from disk.
//!
//! # Database Connection Patterns
//!
//! Every trait method opens its own connection through
//! `connect_with_timeout()`; the 5-second busy timeout lets concurrent
//! resolutions wait on a locked database instead of failing with
//! `SQLITE_BUSY`.
//!
//! # Schema
//!
//! - `status_groups`, `statuses`, `item_classes`: classification
//! - `nodes`: registries, registers and items
//! - `relations`: `(subject, predicate, object)` triples
//! - `fields`, `field_mappings`: field definitions and their class bindings
//! - `localizations`, `status_localizations`: localized values and labels
//! - `node_history`: prior version numbers
//!
//! Storage order is insertion order (`rowid`).

use crate::db::error::DatabaseError;
use crate::db::memory_store::{MemoryStore, RegistrySnapshot};
use crate::db::registry_store::RegistryStore;
use crate::models::{
    Field, FieldMapping, FieldType, ItemClass, Localization, NodeType, Predicate, RegistryNode,
    Relation, RelationQuery, Status, StatusGroup, StatusLocalization, VersionHistoryEntry,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Builder, Connection, Database, Row};
use std::path::PathBuf;
use std::sync::Arc;

/// Joined columns of a hydrated node, see `row_to_node`
const NODE_SELECT: &str = "SELECT n.id, n.local_id, n.external, n.insert_date, n.edit_date,
        c.id, c.local_id, c.base_uri, c.parent_class, c.system_item, c.class_type,
        s.id, s.local_id, s.is_public,
        g.id, g.local_id, g.base_uri
    FROM nodes n
    JOIN item_classes c ON c.id = n.item_class
    JOIN statuses s ON s.id = n.status
    JOIN status_groups g ON g.id = s.status_group";

const ITEM_CLASS_COLUMNS: &str = "id, local_id, base_uri, parent_class, system_item, class_type";

const LOCALIZATION_COLUMNS: &str =
    "id, field_id, node_id, language, value, href, relation_reference";

const SCHEMA: &[(&str, &str)] = &[
    (
        "status_groups",
        "CREATE TABLE IF NOT EXISTS status_groups (
            id TEXT PRIMARY KEY,
            local_id TEXT NOT NULL,
            base_uri TEXT NOT NULL
        )",
    ),
    (
        "statuses",
        "CREATE TABLE IF NOT EXISTS statuses (
            id TEXT PRIMARY KEY,
            local_id TEXT NOT NULL,
            is_public INTEGER NOT NULL DEFAULT 0,
            status_group TEXT NOT NULL REFERENCES status_groups(id)
        )",
    ),
    (
        "item_classes",
        "CREATE TABLE IF NOT EXISTS item_classes (
            id TEXT PRIMARY KEY,
            local_id TEXT NOT NULL,
            base_uri TEXT,
            parent_class TEXT REFERENCES item_classes(id),
            system_item INTEGER NOT NULL DEFAULT 0,
            class_type TEXT NOT NULL
        )",
    ),
    (
        "nodes",
        "CREATE TABLE IF NOT EXISTS nodes (
            id TEXT PRIMARY KEY,
            local_id TEXT NOT NULL,
            external INTEGER NOT NULL DEFAULT 0,
            item_class TEXT NOT NULL REFERENCES item_classes(id),
            status TEXT NOT NULL REFERENCES statuses(id),
            insert_date TEXT NOT NULL,
            edit_date TEXT
        )",
    ),
    (
        "relations",
        "CREATE TABLE IF NOT EXISTS relations (
            id TEXT PRIMARY KEY,
            subject TEXT NOT NULL REFERENCES nodes(id),
            predicate TEXT NOT NULL,
            object TEXT NOT NULL REFERENCES nodes(id)
        )",
    ),
    (
        "fields",
        "CREATE TABLE IF NOT EXISTS fields (
            id TEXT PRIMARY KEY,
            local_id TEXT NOT NULL,
            is_title INTEGER NOT NULL DEFAULT 0,
            field_type TEXT NOT NULL
        )",
    ),
    (
        "field_mappings",
        "CREATE TABLE IF NOT EXISTS field_mappings (
            id TEXT PRIMARY KEY,
            field TEXT NOT NULL REFERENCES fields(id),
            item_class TEXT NOT NULL REFERENCES item_classes(id),
            display_order INTEGER NOT NULL,
            table_visible INTEGER NOT NULL DEFAULT 0,
            hidden INTEGER NOT NULL DEFAULT 0
        )",
    ),
    (
        "localizations",
        "CREATE TABLE IF NOT EXISTS localizations (
            id TEXT PRIMARY KEY,
            field_id TEXT NOT NULL REFERENCES fields(id),
            node_id TEXT REFERENCES nodes(id),
            language TEXT NOT NULL,
            value TEXT,
            href TEXT,
            relation_reference TEXT REFERENCES relations(id)
        )",
    ),
    (
        "status_localizations",
        "CREATE TABLE IF NOT EXISTS status_localizations (
            id TEXT PRIMARY KEY,
            status_id TEXT NOT NULL REFERENCES statuses(id),
            language TEXT NOT NULL,
            label TEXT NOT NULL
        )",
    ),
    (
        "node_history",
        "CREATE TABLE IF NOT EXISTS node_history (
            id TEXT PRIMARY KEY,
            node_id TEXT NOT NULL REFERENCES nodes(id),
            version_number INTEGER NOT NULL
        )",
    ),
];

const INDEXES: &[(&str, &str)] = &[
    (
        "idx_nodes_local_id",
        "CREATE INDEX IF NOT EXISTS idx_nodes_local_id ON nodes(local_id)",
    ),
    (
        "idx_relations_subject",
        "CREATE INDEX IF NOT EXISTS idx_relations_subject ON relations(subject, predicate)",
    ),
    (
        "idx_relations_object",
        "CREATE INDEX IF NOT EXISTS idx_relations_object ON relations(object, predicate)",
    ),
    (
        "idx_localizations_node",
        "CREATE INDEX IF NOT EXISTS idx_localizations_node ON localizations(node_id, language)",
    ),
];

/// Registry store backed by a libsql database file
#[derive(Debug, Clone)]
pub struct LibsqlStore {
    db: Arc<Database>,
    db_path: PathBuf,
}

impl LibsqlStore {
    /// Open (or create) the database at `db_path` and initialize the schema
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created, the
    /// connection fails or schema initialization fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use registry_core::db::LibsqlStore;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = LibsqlStore::new(PathBuf::from("./data/registry.db")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let store = Self {
            db: Arc::new(db),
            db_path,
        };
        store.initialize_schema().await?;

        tracing::info!(path = %store.db_path.display(), "Opened registry database");
        Ok(store)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Synchronous connection handle; prefer `connect_with_timeout()` in async code
    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Connection with a 5-second busy timeout
    pub async fn connect_with_timeout(&self) -> Result<Connection, DatabaseError> {
        let conn = self.connect()?;
        Self::execute_pragma(&conn, "PRAGMA busy_timeout = 5000").await?;
        Ok(conn)
    }

    /// PRAGMA statements return rows, so they go through `query()`
    async fn execute_pragma(conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Create tables and indexes; safe to call on an existing database
    pub async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        Self::execute_pragma(&conn, "PRAGMA journal_mode = WAL").await?;
        Self::execute_pragma(&conn, "PRAGMA foreign_keys = ON").await?;

        for (table, ddl) in SCHEMA {
            conn.execute(ddl, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create {} table: {}",
                    table, e
                ))
            })?;
        }

        for (index, ddl) in INDEXES {
            conn.execute(ddl, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create index '{}': {}",
                    index, e
                ))
            })?;
        }

        Ok(())
    }

    /// Insert the contents of a snapshot in one transaction
    ///
    /// The snapshot's cross references are checked first; a snapshot that
    /// `MemoryStore` would reject is rejected here too and nothing is written.
    pub async fn import_snapshot(&self, snapshot: &RegistrySnapshot) -> Result<(), DatabaseError> {
        MemoryStore::from_snapshot(snapshot.clone())?;

        let conn = self.connect_with_timeout().await?;
        conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin transaction: {}", e))
        })?;

        if let Err(e) = Self::insert_snapshot(&conn, snapshot).await {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(e);
        }

        conn.execute("COMMIT", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to commit transaction: {}", e))
        })?;

        tracing::info!(
            nodes = snapshot.nodes.len(),
            relations = snapshot.relations.len(),
            "Imported registry snapshot"
        );
        Ok(())
    }

    async fn insert_snapshot(
        conn: &Connection,
        snapshot: &RegistrySnapshot,
    ) -> Result<(), DatabaseError> {
        let failed = |what: &str, id: &str, e: libsql::Error| {
            DatabaseError::sql_execution(format!("Failed to insert {} {}: {}", what, id, e))
        };

        for group in &snapshot.status_groups {
            conn.execute(
                "INSERT INTO status_groups (id, local_id, base_uri) VALUES (?, ?, ?)",
                (
                    group.id.as_str(),
                    group.local_id.as_str(),
                    group.base_uri.as_str(),
                ),
            )
            .await
            .map_err(|e| failed("status group", &group.id, e))?;
        }

        for status in &snapshot.statuses {
            conn.execute(
                "INSERT INTO statuses (id, local_id, is_public, status_group) VALUES (?, ?, ?, ?)",
                (
                    status.id.as_str(),
                    status.local_id.as_str(),
                    status.is_public as i64,
                    status.group.as_str(),
                ),
            )
            .await
            .map_err(|e| failed("status", &status.id, e))?;
        }

        // Parents may follow their children in the snapshot
        Self::execute_pragma(conn, "PRAGMA defer_foreign_keys = ON").await?;
        for class in &snapshot.item_classes {
            conn.execute(
                "INSERT INTO item_classes (id, local_id, base_uri, parent_class, system_item, class_type)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    class.id.as_str(),
                    class.local_id.as_str(),
                    class.base_uri.as_deref(),
                    class.parent_class.as_deref(),
                    class.system_item as i64,
                    class.class_type.as_str(),
                ),
            )
            .await
            .map_err(|e| failed("item class", &class.id, e))?;
        }

        for node in &snapshot.nodes {
            let edit_date = node.edit_date.map(|d| d.to_rfc3339());
            conn.execute(
                "INSERT INTO nodes (id, local_id, external, item_class, status, insert_date, edit_date)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                (
                    node.id.as_str(),
                    node.local_id.as_str(),
                    node.external as i64,
                    node.item_class.as_str(),
                    node.status.as_str(),
                    node.insert_date.to_rfc3339(),
                    edit_date,
                ),
            )
            .await
            .map_err(|e| failed("node", &node.id, e))?;
        }

        for relation in &snapshot.relations {
            conn.execute(
                "INSERT INTO relations (id, subject, predicate, object) VALUES (?, ?, ?, ?)",
                (
                    relation.id.as_str(),
                    relation.subject.as_str(),
                    relation.predicate.as_str(),
                    relation.object.as_str(),
                ),
            )
            .await
            .map_err(|e| failed("relation", &relation.id, e))?;
        }

        for field in &snapshot.fields {
            conn.execute(
                "INSERT INTO fields (id, local_id, is_title, field_type) VALUES (?, ?, ?, ?)",
                (
                    field.id.as_str(),
                    field.local_id.as_str(),
                    field.is_title as i64,
                    field.field_type.as_str(),
                ),
            )
            .await
            .map_err(|e| failed("field", &field.id, e))?;
        }

        for mapping in &snapshot.field_mappings {
            conn.execute(
                "INSERT INTO field_mappings (id, field, item_class, display_order, table_visible, hidden)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    mapping.id.as_str(),
                    mapping.field.as_str(),
                    mapping.item_class.as_str(),
                    mapping.order as i64,
                    mapping.table_visible as i64,
                    mapping.hidden as i64,
                ),
            )
            .await
            .map_err(|e| failed("field mapping", &mapping.id, e))?;
        }

        for loc in &snapshot.localizations {
            conn.execute(
                "INSERT INTO localizations (id, field_id, node_id, language, value, href, relation_reference)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                (
                    loc.id.as_str(),
                    loc.field_id.as_str(),
                    loc.node_id.as_deref(),
                    loc.language.as_str(),
                    loc.value.as_deref(),
                    loc.href.as_deref(),
                    loc.relation_reference.as_deref(),
                ),
            )
            .await
            .map_err(|e| failed("localization", &loc.id, e))?;
        }

        for loc in &snapshot.status_localizations {
            conn.execute(
                "INSERT INTO status_localizations (id, status_id, language, label) VALUES (?, ?, ?, ?)",
                (
                    loc.id.as_str(),
                    loc.status_id.as_str(),
                    loc.language.as_str(),
                    loc.label.as_str(),
                ),
            )
            .await
            .map_err(|e| failed("status localization", &loc.id, e))?;
        }

        for entry in &snapshot.history {
            conn.execute(
                "INSERT INTO node_history (id, node_id, version_number) VALUES (?, ?, ?)",
                (
                    entry.id.as_str(),
                    entry.node_id.as_str(),
                    entry.version_number as i64,
                ),
            )
            .await
            .map_err(|e| failed("history entry", &entry.id, e))?;
        }

        Ok(())
    }

    /// Parse a stored timestamp; accepts RFC3339 and SQLite's `YYYY-MM-DD HH:MM:SS`
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }
        Err(DatabaseError::invalid_row(format!("Unable to parse timestamp '{}'", s)).into())
    }

    /// Convert a `NODE_SELECT` row into a hydrated node
    fn row_to_node(row: &Row) -> Result<RegistryNode> {
        let insert_date: String = row.get(3).context("Failed to get insert_date")?;
        let edit_date: Option<String> = row.get(4).context("Failed to get edit_date")?;
        let class_type: String = row.get(10).context("Failed to get class_type")?;

        let item_class = ItemClass {
            id: row.get(5).context("Failed to get item class id")?,
            local_id: row.get(6).context("Failed to get item class local_id")?,
            base_uri: row.get(7).context("Failed to get base_uri")?,
            parent_class: row.get(8).context("Failed to get parent_class")?,
            system_item: row.get::<i64>(9).context("Failed to get system_item")? != 0,
            class_type: class_type
                .parse::<NodeType>()
                .map_err(DatabaseError::from)?,
        };

        let status = Status {
            id: row.get(11).context("Failed to get status id")?,
            local_id: row.get(12).context("Failed to get status local_id")?,
            is_public: row.get::<i64>(13).context("Failed to get is_public")? != 0,
            group: StatusGroup {
                id: row.get(14).context("Failed to get status group id")?,
                local_id: row.get(15).context("Failed to get status group local_id")?,
                base_uri: row.get(16).context("Failed to get status group base_uri")?,
            },
        };

        Ok(RegistryNode {
            id: row.get(0).context("Failed to get id")?,
            local_id: row.get(1).context("Failed to get local_id")?,
            external: row.get::<i64>(2).context("Failed to get external")? != 0,
            item_class,
            status,
            insert_date: Self::parse_timestamp(&insert_date)?,
            edit_date: edit_date.as_deref().map(Self::parse_timestamp).transpose()?,
        })
    }

    fn row_to_item_class(row: &Row) -> Result<ItemClass> {
        let class_type: String = row.get(5).context("Failed to get class_type")?;
        Ok(ItemClass {
            id: row.get(0).context("Failed to get id")?,
            local_id: row.get(1).context("Failed to get local_id")?,
            base_uri: row.get(2).context("Failed to get base_uri")?,
            parent_class: row.get(3).context("Failed to get parent_class")?,
            system_item: row.get::<i64>(4).context("Failed to get system_item")? != 0,
            class_type: class_type
                .parse::<NodeType>()
                .map_err(DatabaseError::from)?,
        })
    }

    fn row_to_localization(row: &Row) -> Result<Localization> {
        Ok(Localization {
            id: row.get(0).context("Failed to get id")?,
            field_id: row.get(1).context("Failed to get field_id")?,
            node_id: row.get(2).context("Failed to get node_id")?,
            language: row.get(3).context("Failed to get language")?,
            value: row.get(4).context("Failed to get value")?,
            href: row.get(5).context("Failed to get href")?,
            relation_reference: row.get(6).context("Failed to get relation_reference")?,
        })
    }

    fn row_to_field(row: &Row, offset: i32) -> Result<Field> {
        let field_type: String = row.get(offset + 3).context("Failed to get field_type")?;
        Ok(Field {
            id: row.get(offset).context("Failed to get field id")?,
            local_id: row.get(offset + 1).context("Failed to get field local_id")?,
            is_title: row.get::<i64>(offset + 2).context("Failed to get is_title")? != 0,
            field_type: field_type
                .parse::<FieldType>()
                .map_err(DatabaseError::from)?,
        })
    }

    async fn query_nodes(&self, filter: &str, params: Vec<libsql::Value>) -> Result<Vec<RegistryNode>> {
        let conn = self.connect_with_timeout().await?;
        let sql = format!("{} WHERE {} ORDER BY n.rowid", NODE_SELECT, filter);
        let mut rows = conn
            .query(&sql, params)
            .await
            .with_context(|| format!("Failed to query nodes where {}", filter))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn query_localizations(
        &self,
        filter: &str,
        params: Vec<libsql::Value>,
    ) -> Result<Vec<Localization>> {
        let conn = self.connect_with_timeout().await?;
        let sql = format!(
            "SELECT {} FROM localizations WHERE {} ORDER BY rowid",
            LOCALIZATION_COLUMNS, filter
        );
        let mut rows = conn
            .query(&sql, params)
            .await
            .with_context(|| format!("Failed to query localizations where {}", filter))?;

        let mut localizations = Vec::new();
        while let Some(row) = rows.next().await? {
            localizations.push(Self::row_to_localization(&row)?);
        }
        Ok(localizations)
    }

    async fn hydrate_relation(
        &self,
        id: String,
        subject_id: String,
        predicate: String,
        object_id: String,
    ) -> Result<Relation> {
        let predicate = predicate
            .parse::<Predicate>()
            .map_err(DatabaseError::from)?;
        let subject = self.get_node(&subject_id).await?.ok_or_else(|| {
            DatabaseError::invalid_row(format!("relation '{}' has no subject '{}'", id, subject_id))
        })?;
        let object = self.get_node(&object_id).await?.ok_or_else(|| {
            DatabaseError::invalid_row(format!("relation '{}' has no object '{}'", id, object_id))
        })?;
        Ok(Relation {
            id,
            subject,
            predicate,
            object,
        })
    }
}

fn text(value: &str) -> libsql::Value {
    libsql::Value::Text(value.to_string())
}

fn nullable(value: Option<&str>) -> libsql::Value {
    value.map_or(libsql::Value::Null, text)
}

#[async_trait]
impl RegistryStore for LibsqlStore {
    async fn get_node(&self, id: &str) -> Result<Option<RegistryNode>> {
        Ok(self
            .query_nodes("n.id = ?", vec![text(id)])
            .await?
            .into_iter()
            .next())
    }

    async fn get_nodes_by_local_id(&self, local_id: &str) -> Result<Vec<RegistryNode>> {
        self.query_nodes("n.local_id = ?", vec![text(local_id)]).await
    }

    async fn get_node_by_local_id_and_class(
        &self,
        local_id: &str,
        item_class_id: &str,
    ) -> Result<Option<RegistryNode>> {
        Ok(self
            .query_nodes(
                "n.local_id = ? AND n.item_class = ?",
                vec![text(local_id), text(item_class_id)],
            )
            .await?
            .into_iter()
            .next())
    }

    async fn get_nodes_by_item_class(&self, item_class_id: &str) -> Result<Vec<RegistryNode>> {
        self.query_nodes("n.item_class = ?", vec![text(item_class_id)])
            .await
    }

    async fn get_item_class_by_local_id(&self, local_id: &str) -> Result<Option<ItemClass>> {
        let conn = self.connect_with_timeout().await?;
        let sql = format!(
            "SELECT {} FROM item_classes WHERE local_id = ? ORDER BY rowid LIMIT 1",
            ITEM_CLASS_COLUMNS
        );
        let mut rows = conn
            .query(&sql, vec![text(local_id)])
            .await
            .context("Failed to query item class")?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_item_class(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_child_item_classes(&self, item_class_id: &str) -> Result<Vec<ItemClass>> {
        let conn = self.connect_with_timeout().await?;
        let sql = format!(
            "SELECT {} FROM item_classes WHERE parent_class = ? ORDER BY rowid",
            ITEM_CLASS_COLUMNS
        );
        let mut rows = conn
            .query(&sql, vec![text(item_class_id)])
            .await
            .context("Failed to query child item classes")?;

        let mut classes = Vec::new();
        while let Some(row) = rows.next().await? {
            classes.push(Self::row_to_item_class(&row)?);
        }
        Ok(classes)
    }

    async fn get_relations(&self, query: RelationQuery<'_>) -> Result<Vec<Relation>> {
        if !query.is_bound() {
            return Err(DatabaseError::UnboundRelationQuery(query.predicate).into());
        }

        // Collect the raw rows before hydrating so the connection is released
        let raw = {
            let conn = self.connect_with_timeout().await?;
            let mut rows = conn
                .query(
                    "SELECT id, subject, predicate, object FROM relations
                     WHERE predicate = ?1
                       AND (?2 IS NULL OR subject = ?2)
                       AND (?3 IS NULL OR object = ?3)
                     ORDER BY rowid",
                    vec![
                        text(query.predicate.as_str()),
                        nullable(query.subject),
                        nullable(query.object),
                    ],
                )
                .await
                .context("Failed to query relations")?;

            let mut raw = Vec::new();
            while let Some(row) = rows.next().await? {
                raw.push((
                    row.get::<String>(0)?,
                    row.get::<String>(1)?,
                    row.get::<String>(2)?,
                    row.get::<String>(3)?,
                ));
            }
            raw
        };

        let mut relations = Vec::with_capacity(raw.len());
        for (id, subject, predicate, object) in raw {
            relations.push(self.hydrate_relation(id, subject, predicate, object).await?);
        }
        Ok(relations)
    }

    async fn get_relation(&self, id: &str) -> Result<Option<Relation>> {
        let raw = {
            let conn = self.connect_with_timeout().await?;
            let mut rows = conn
                .query(
                    "SELECT id, subject, predicate, object FROM relations WHERE id = ?",
                    vec![text(id)],
                )
                .await
                .context("Failed to query relation")?;
            match rows.next().await? {
                Some(row) => Some((
                    row.get::<String>(0)?,
                    row.get::<String>(1)?,
                    row.get::<String>(2)?,
                    row.get::<String>(3)?,
                )),
                None => None,
            }
        };

        match raw {
            Some((id, subject, predicate, object)) => Ok(Some(
                self.hydrate_relation(id, subject, predicate, object).await?,
            )),
            None => Ok(None),
        }
    }

    async fn get_history(&self, node_id: &str) -> Result<Vec<VersionHistoryEntry>> {
        let conn = self.connect_with_timeout().await?;
        let mut rows = conn
            .query(
                "SELECT id, node_id, version_number FROM node_history
                 WHERE node_id = ? ORDER BY version_number, rowid",
                vec![text(node_id)],
            )
            .await
            .context("Failed to query node history")?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(VersionHistoryEntry {
                id: row.get(0).context("Failed to get id")?,
                node_id: row.get(1).context("Failed to get node_id")?,
                version_number: row.get::<i64>(2).context("Failed to get version_number")?
                    as i32,
            });
        }
        Ok(entries)
    }

    async fn get_field_by_local_id(&self, local_id: &str) -> Result<Option<Field>> {
        let conn = self.connect_with_timeout().await?;
        let mut rows = conn
            .query(
                "SELECT id, local_id, is_title, field_type FROM fields
                 WHERE local_id = ? ORDER BY rowid LIMIT 1",
                vec![text(local_id)],
            )
            .await
            .context("Failed to query field")?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_field(&row, 0)?)),
            None => Ok(None),
        }
    }

    async fn get_field_mappings(&self, item_class_id: &str) -> Result<Vec<FieldMapping>> {
        let conn = self.connect_with_timeout().await?;
        let mut rows = conn
            .query(
                "SELECT m.id, m.item_class, m.display_order, m.table_visible, m.hidden,
                        f.id, f.local_id, f.is_title, f.field_type
                 FROM field_mappings m
                 JOIN fields f ON f.id = m.field
                 WHERE m.item_class = ?
                 ORDER BY m.display_order, m.rowid",
                vec![text(item_class_id)],
            )
            .await
            .context("Failed to query field mappings")?;

        let mut mappings = Vec::new();
        while let Some(row) = rows.next().await? {
            mappings.push(FieldMapping {
                id: row.get(0).context("Failed to get id")?,
                item_class_id: row.get(1).context("Failed to get item_class")?,
                order: row.get::<i64>(2).context("Failed to get display_order")? as i32,
                table_visible: row.get::<i64>(3).context("Failed to get table_visible")? != 0,
                hidden: row.get::<i64>(4).context("Failed to get hidden")? != 0,
                field: Self::row_to_field(&row, 5)?,
            });
        }
        Ok(mappings)
    }

    async fn get_localizations(
        &self,
        field_id: &str,
        node_id: &str,
        language: &str,
    ) -> Result<Vec<Localization>> {
        self.query_localizations(
            "field_id = ? AND node_id = ? AND language = ?",
            vec![text(field_id), text(node_id), text(language)],
        )
        .await
    }

    async fn get_node_localizations(
        &self,
        node_id: &str,
        language: &str,
    ) -> Result<Vec<Localization>> {
        self.query_localizations(
            "node_id = ? AND language = ?",
            vec![text(node_id), text(language)],
        )
        .await
    }

    async fn get_field_localization(
        &self,
        field_id: &str,
        language: &str,
    ) -> Result<Option<Localization>> {
        Ok(self
            .query_localizations(
                "field_id = ? AND node_id IS NULL AND language = ?",
                vec![text(field_id), text(language)],
            )
            .await?
            .into_iter()
            .next())
    }

    async fn get_status_localization(
        &self,
        status_id: &str,
        language: &str,
    ) -> Result<Option<StatusLocalization>> {
        let conn = self.connect_with_timeout().await?;
        let mut rows = conn
            .query(
                "SELECT id, status_id, language, label FROM status_localizations
                 WHERE status_id = ? AND language = ? ORDER BY rowid LIMIT 1",
                vec![text(status_id), text(language)],
            )
            .await
            .context("Failed to query status localization")?;
        match rows.next().await? {
            Some(row) => Ok(Some(StatusLocalization {
                id: row.get(0).context("Failed to get id")?,
                status_id: row.get(1).context("Failed to get status_id")?,
                language: row.get(2).context("Failed to get language")?,
                label: row.get(3).context("Failed to get label")?,
            })),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (LibsqlStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LibsqlStore::new(temp_dir.path().join("registry.db"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_schema_initialization_is_idempotent() {
        let (store, _temp_dir) = create_test_store().await;
        store.initialize_schema().await.unwrap();

        let conn = store.connect_with_timeout().await.unwrap();
        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'relations'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let name: String = row.get(0).unwrap();
        assert_eq!(name, "relations");
    }

    #[tokio::test]
    async fn test_empty_database_lookups() {
        let (store, _temp_dir) = create_test_store().await;

        assert!(store.get_node("missing").await.unwrap().is_none());
        assert!(store.get_nodes_by_local_id("x").await.unwrap().is_empty());
        assert!(store.get_history("missing").await.unwrap().is_empty());
        assert!(store
            .get_relations(RelationQuery::by_subject("x", Predicate::Parent))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unbound_relation_query_fails() {
        let (store, _temp_dir) = create_test_store().await;
        let unbound = RelationQuery {
            subject: None,
            object: None,
            predicate: Predicate::Collection,
        };
        assert!(store.get_relations(unbound).await.is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = LibsqlStore::parse_timestamp("2020-05-11T10:00:00+00:00").unwrap();
        let sqlite = LibsqlStore::parse_timestamp("2020-05-11 10:00:00").unwrap();
        assert_eq!(rfc, sqlite);
        assert!(LibsqlStore::parse_timestamp("yesterday").is_err());
    }
}
