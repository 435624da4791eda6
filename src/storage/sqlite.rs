//! SQLite storage backend for the object store

use super::traits::{
    ObjectId, ObjectStore, OpenStore, Properties, ScoredObject, SimilarityQuery, StorageError,
    StorageResult, StoredObject, TextMatch, TextQuery,
};
use crate::semantic::{cosine_similarity, Embedder};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// SQLite-backed object store
///
/// Objects are JSON property maps keyed by a UUID string. Named references
/// live in their own table, and vectors for similarity search are computed
/// on write for the fields registered with [`SqliteStore::with_vectorized_field`].
/// Thread-safe via internal mutex on the connection; the lock is never held
/// across an await point.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn Embedder>,
    /// (kind, field) pairs that get an embedding on write
    vectorized: HashSet<(String, String)>,
}

type ObjectRow = (String, String, String, i64, String);

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS objects (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_objects_kind
                ON objects(kind);

            CREATE TABLE IF NOT EXISTS object_references (
                source_id TEXT NOT NULL,
                name TEXT NOT NULL,
                target_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (source_id, name, target_id),
                FOREIGN KEY (source_id) REFERENCES objects(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_references_target
                ON object_references(target_id, name);

            CREATE TABLE IF NOT EXISTS object_vectors (
                object_id TEXT NOT NULL,
                field TEXT NOT NULL,
                vector_json TEXT NOT NULL,
                PRIMARY KEY (object_id, field),
                FOREIGN KEY (object_id) REFERENCES objects(id) ON DELETE CASCADE
            );

            PRAGMA foreign_keys = ON;

            -- Concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection, embedder: Arc<dyn Embedder>) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
            vectorized: HashSet::new(),
        })
    }

    /// Register a text field whose values are embedded for similarity queries.
    pub fn with_vectorized_field(mut self, kind: impl Into<String>, field: impl Into<String>) -> Self {
        self.vectorized.insert((kind.into(), field.into()));
        self
    }

    fn is_vectorized(&self, kind: &str, field: &str) -> bool {
        self.vectorized
            .contains(&(kind.to_string(), field.to_string()))
    }

    /// Embed every vectorized string property present in `properties`.
    async fn embed_fields(
        &self,
        kind: &str,
        properties: &Properties,
    ) -> StorageResult<Vec<(String, Vec<f32>)>> {
        let mut vectors = Vec::new();
        for (field, value) in properties {
            if !self.is_vectorized(kind, field) {
                continue;
            }
            if let Some(text) = value.as_str() {
                let vector = self
                    .embedder
                    .embed(text)
                    .await
                    .map_err(|e| StorageError::Embedding(e.to_string()))?;
                vectors.push((field.clone(), vector));
            }
        }
        Ok(vectors)
    }

    fn row_to_object(row: ObjectRow, references: HashMap<String, Vec<ObjectId>>) -> StorageResult<StoredObject> {
        let (id, kind, properties_json, version, created_at) = row;
        Ok(StoredObject {
            id: ObjectId::from(id),
            kind,
            properties: serde_json::from_str(&properties_json)?,
            references,
            version: version as u64,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| StorageError::DateParse(e.to_string()))?
                .with_timezone(&Utc),
        })
    }

    fn load_references(conn: &Connection, id: &str) -> StorageResult<HashMap<String, Vec<ObjectId>>> {
        let mut stmt = conn.prepare(
            "SELECT name, target_id FROM object_references
             WHERE source_id = ?1 ORDER BY name, position",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut references: HashMap<String, Vec<ObjectId>> = HashMap::new();
        for row in rows {
            let (name, target) = row?;
            references.entry(name).or_default().push(ObjectId::from(target));
        }
        Ok(references)
    }

    fn load_object(conn: &Connection, id: &str) -> StorageResult<Option<StoredObject>> {
        let row: Option<ObjectRow> = conn
            .query_row(
                "SELECT id, kind, properties_json, version, created_at FROM objects WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        match row {
            Some(row) => {
                let references = Self::load_references(conn, id)?;
                Ok(Some(Self::row_to_object(row, references)?))
            }
            None => Ok(None),
        }
    }

    fn object_kind(&self, id: &ObjectId) -> StorageResult<String> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT kind FROM objects WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StorageError::ObjectNotFound(id.to_string()))
    }

    fn exists(conn: &Connection, id: &ObjectId) -> StorageResult<bool> {
        let found: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM objects WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn upsert_vector(conn: &Connection, id: &str, field: &str, vector: &[f32]) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO object_vectors (object_id, field, vector_json)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(object_id, field) DO UPDATE SET vector_json = excluded.vector_json
            "#,
            params![id, field, serde_json::to_string(vector)?],
        )?;
        Ok(())
    }

    fn insert_object(
        &self,
        id: &ObjectId,
        kind: &str,
        properties: &Properties,
        vectors: &[(String, Vec<f32>)],
    ) -> StorageResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO objects (id, kind, properties_json, version, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                id.as_str(),
                kind,
                serde_json::to_string(properties)?,
                Utc::now().to_rfc3339(),
            ],
        )?;
        for (field, vector) in vectors {
            Self::upsert_vector(&tx, id.as_str(), field, vector)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Read-merge-write under one transaction. With `expected_version`
    /// set, the write only happens if the version is unchanged.
    fn merge_locked(
        &self,
        id: &ObjectId,
        expected_version: Option<u64>,
        properties: Properties,
        vectors: &[(String, Vec<f32>)],
    ) -> StorageResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let current: Option<(String, i64)> = tx
            .query_row(
                "SELECT properties_json, version FROM objects WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((properties_json, version)) = current else {
            return Err(StorageError::ObjectNotFound(id.to_string()));
        };

        if let Some(expected) = expected_version {
            if expected != version as u64 {
                return Ok(false);
            }
        }

        let mut merged: Properties = serde_json::from_str(&properties_json)?;
        for (key, value) in properties {
            merged.insert(key, value);
        }

        let updated = tx.execute(
            "UPDATE objects SET properties_json = ?1, version = version + 1
             WHERE id = ?2 AND version = ?3",
            params![serde_json::to_string(&merged)?, id.as_str(), version],
        )?;
        for (field, vector) in vectors {
            Self::upsert_vector(&tx, id.as_str(), field, vector)?;
        }
        tx.commit()?;

        Ok(updated == 1)
    }

    /// Translate a `Like` pattern into a SQL LIKE pattern with `\` escapes.
    fn like_pattern(pattern: &str) -> String {
        let mut sql = String::with_capacity(pattern.len() + 2);
        sql.push('%');
        for c in pattern.chars() {
            match c {
                '\\' | '%' | '_' => {
                    sql.push('\\');
                    sql.push(c);
                }
                '*' => sql.push('%'),
                '?' => sql.push('_'),
                _ => sql.push(c),
            }
        }
        sql.push('%');
        sql
    }

    fn where_clause(query: &TextQuery) -> (String, Vec<String>) {
        let path = format!("$.{}", query.field);
        match &query.matcher {
            TextMatch::Like(pattern) => (
                "kind = ?1 AND json_extract(properties_json, ?2) LIKE ?3 ESCAPE '\\'".to_string(),
                vec![query.kind.clone(), path, Self::like_pattern(pattern)],
            ),
            TextMatch::Equal(value) => (
                "kind = ?1 AND json_extract(properties_json, ?2) = ?3".to_string(),
                vec![query.kind.clone(), path, value.clone()],
            ),
        }
    }

    fn query_text_locked(&self, query: &TextQuery) -> StorageResult<Vec<StoredObject>> {
        let conn = self.conn.lock().unwrap();

        let (clause, mut args) = Self::where_clause(query);
        let mut sql = format!(
            "SELECT id, kind, properties_json, version, created_at FROM objects WHERE {}",
            clause
        );
        match &query.sort_desc_by {
            Some(field) => {
                sql.push_str(" ORDER BY CAST(json_extract(properties_json, ?4) AS INTEGER) DESC, created_at ASC");
                args.push(format!("$.{}", field));
            }
            None => sql.push_str(" ORDER BY created_at ASC"),
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?;

        let mut objects = Vec::new();
        for row in rows {
            let row: ObjectRow = row?;
            let references = Self::load_references(&conn, &row.0)?;
            objects.push(Self::row_to_object(row, references)?);
        }
        Ok(objects)
    }

    fn query_similar_locked(
        &self,
        query: &SimilarityQuery,
        concept: &[f32],
    ) -> StorageResult<Vec<ScoredObject>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT o.id, o.kind, o.properties_json, o.version, o.created_at, v.vector_json
             FROM object_vectors v JOIN objects o ON o.id = v.object_id
             WHERE o.kind = ?1 AND v.field = ?2",
        )?;
        let rows = stmt.query_map(params![query.kind, query.field], |row| {
            Ok((
                (row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?),
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (object_row, vector_json): (ObjectRow, String) = row?;
            let vector: Vec<f32> = serde_json::from_str(&vector_json)?;
            // Cosine in [-1, 1] mapped onto a certainty in [0, 1]
            let certainty = (1.0 + cosine_similarity(concept, &vector)) / 2.0;
            if certainty < query.min_certainty {
                continue;
            }
            let references = Self::load_references(&conn, &object_row.0)?;
            scored.push(ScoredObject {
                object: Self::row_to_object(object_row, references)?,
                certainty,
            });
        }

        scored.sort_by(|a, b| b.certainty.total_cmp(&a.certainty));
        if let Some(limit) = query.limit {
            scored.truncate(limit);
        }
        Ok(scored)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn, embedder)
    }

    fn open_in_memory(embedder: Arc<dyn Embedder>) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, embedder)
    }
}

#[async_trait]
impl ObjectStore for SqliteStore {
    // === Objects ===

    async fn create_object(&self, kind: &str, properties: Properties) -> StorageResult<ObjectId> {
        let vectors = self.embed_fields(kind, &properties).await?;
        let id = ObjectId::from(Uuid::new_v4().to_string());
        self.insert_object(&id, kind, &properties, &vectors)?;
        Ok(id)
    }

    async fn fetch_object(&self, id: &ObjectId) -> StorageResult<Option<StoredObject>> {
        let conn = self.conn.lock().unwrap();
        Self::load_object(&conn, id.as_str())
    }

    async fn merge_properties(&self, id: &ObjectId, properties: Properties) -> StorageResult<()> {
        let kind = self.object_kind(id)?;
        let vectors = self.embed_fields(&kind, &properties).await?;
        self.merge_locked(id, None, properties, &vectors)?;
        Ok(())
    }

    async fn merge_properties_if_version(
        &self,
        id: &ObjectId,
        expected_version: u64,
        properties: Properties,
    ) -> StorageResult<bool> {
        let kind = self.object_kind(id)?;
        let vectors = self.embed_fields(&kind, &properties).await?;
        self.merge_locked(id, Some(expected_version), properties, &vectors)
    }

    async fn delete_object(&self, id: &ObjectId) -> StorageResult<bool> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM object_references WHERE source_id = ?1 OR target_id = ?1",
            params![id.as_str()],
        )?;
        tx.execute("DELETE FROM object_vectors WHERE object_id = ?1", params![id.as_str()])?;
        let deleted = tx.execute("DELETE FROM objects WHERE id = ?1", params![id.as_str()])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    // === Queries ===

    async fn query_text(&self, query: &TextQuery) -> StorageResult<Vec<StoredObject>> {
        self.query_text_locked(query)
    }

    async fn count_text(&self, query: &TextQuery) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let (clause, args) = Self::where_clause(query);
        let sql = format!("SELECT COUNT(*) FROM objects WHERE {}", clause);
        let count: i64 = conn.query_row(&sql, rusqlite::params_from_iter(args.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn query_similar(&self, query: &SimilarityQuery) -> StorageResult<Vec<ScoredObject>> {
        if !self.is_vectorized(&query.kind, &query.field) {
            return Err(StorageError::Embedding(format!(
                "{}.{} is not a vectorized field",
                query.kind, query.field
            )));
        }
        let concept = self
            .embedder
            .embed(&query.concept)
            .await
            .map_err(|e| StorageError::Embedding(e.to_string()))?;
        self.query_similar_locked(query, &concept)
    }

    // === References ===

    async fn set_reference(&self, source: &ObjectId, name: &str, target: &ObjectId) -> StorageResult<()> {
        let mut conn = self.conn.lock().unwrap();
        for id in [source, target] {
            if !Self::exists(&conn, id)? {
                return Err(StorageError::ObjectNotFound(id.to_string()));
            }
        }

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM object_references WHERE source_id = ?1 AND name = ?2",
            params![source.as_str(), name],
        )?;
        tx.execute(
            "INSERT INTO object_references (source_id, name, target_id, position)
             VALUES (?1, ?2, ?3, 0)",
            params![source.as_str(), name, target.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn add_reference(&self, source: &ObjectId, name: &str, target: &ObjectId) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        for id in [source, target] {
            if !Self::exists(&conn, id)? {
                return Err(StorageError::ObjectNotFound(id.to_string()));
            }
        }

        conn.execute(
            r#"
            INSERT OR IGNORE INTO object_references (source_id, name, target_id, position)
            VALUES (?1, ?2, ?3, (
                SELECT COALESCE(MAX(position) + 1, 0) FROM object_references
                WHERE source_id = ?1 AND name = ?2
            ))
            "#,
            params![source.as_str(), name, target.as_str()],
        )?;
        Ok(())
    }

    async fn references(&self, source: &ObjectId, name: &str) -> StorageResult<Vec<ObjectId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT target_id FROM object_references
             WHERE source_id = ?1 AND name = ?2 ORDER BY position",
        )?;
        let targets = stmt
            .query_map(params![source.as_str(), name], |row| row.get::<_, String>(0))?
            .map(|r| r.map(ObjectId::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::HashingEmbedder;
    use serde_json::json;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory(Arc::new(HashingEmbedder::default()))
            .unwrap()
            .with_vectorized_field("Summary", "text")
    }

    fn props(value: serde_json::Value) -> Properties {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_create_and_fetch_object() {
        let store = create_test_store();
        let id = store
            .create_object("Prompt", props(json!({"code": "print('x')", "rank": 1})))
            .await
            .unwrap();

        let object = store.fetch_object(&id).await.unwrap().unwrap();
        assert_eq!(object.kind, "Prompt");
        assert_eq!(object.properties["code"], json!("print('x')"));
        assert_eq!(object.version, 1);
        assert!(object.references.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_missing_object() {
        let store = create_test_store();
        let missing = store.fetch_object(&ObjectId::from("nope")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_merge_bumps_version_and_keeps_other_fields() {
        let store = create_test_store();
        let id = store
            .create_object("Prompt", props(json!({"code": "a", "rank": 1})))
            .await
            .unwrap();

        store.merge_properties(&id, props(json!({"rank": 5}))).await.unwrap();

        let object = store.fetch_object(&id).await.unwrap().unwrap();
        assert_eq!(object.properties["rank"], json!(5));
        assert_eq!(object.properties["code"], json!("a"));
        assert_eq!(object.version, 2);
    }

    #[tokio::test]
    async fn test_compare_and_swap_rejects_stale_version() {
        let store = create_test_store();
        let id = store
            .create_object("Prompt", props(json!({"rank": 1})))
            .await
            .unwrap();

        assert!(store
            .merge_properties_if_version(&id, 1, props(json!({"rank": 2})))
            .await
            .unwrap());
        // Version is now 2; a writer still holding version 1 must lose
        assert!(!store
            .merge_properties_if_version(&id, 1, props(json!({"rank": 0})))
            .await
            .unwrap());

        let object = store.fetch_object(&id).await.unwrap().unwrap();
        assert_eq!(object.properties["rank"], json!(2));
    }

    #[tokio::test]
    async fn test_merge_missing_object_is_not_found() {
        let store = create_test_store();
        let err = store
            .merge_properties(&ObjectId::from("ghost"), props(json!({"rank": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_like_query_matches_substring_and_sorts() {
        let store = create_test_store();
        for (code, rank) in [("print('x')", 1), ("print('y')", 3), ("len(xs)", 9)] {
            store
                .create_object("Prompt", props(json!({"code": code, "rank": rank})))
                .await
                .unwrap();
        }

        let query = TextQuery::like("Prompt", "code", "print").sorted_desc_by("rank");
        let results = store.query_text(&query).await.unwrap();
        let codes: Vec<_> = results
            .iter()
            .map(|o| o.properties["code"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(codes, vec!["print('y')", "print('x')"]);
        assert_eq!(store.count_text(&query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_like_query_treats_sql_wildcards_literally() {
        let store = create_test_store();
        store
            .create_object("Prompt", props(json!({"code": "a_b"})))
            .await
            .unwrap();
        store
            .create_object("Prompt", props(json!({"code": "axb"})))
            .await
            .unwrap();

        let literal = store
            .query_text(&TextQuery::like("Prompt", "code", "a_b"))
            .await
            .unwrap();
        assert_eq!(literal.len(), 1);

        let wildcard = store
            .query_text(&TextQuery::like("Prompt", "code", "a?b"))
            .await
            .unwrap();
        assert_eq!(wildcard.len(), 2);
    }

    #[tokio::test]
    async fn test_limit_applies_after_sorting() {
        let store = create_test_store();
        for (code, rank) in [("f(1)", 1), ("f(2)", 7), ("f(3)", 4)] {
            store
                .create_object("Prompt", props(json!({"code": code, "rank": rank})))
                .await
                .unwrap();
        }

        let query = TextQuery::like("Prompt", "code", "f(")
            .sorted_desc_by("rank")
            .with_limit(2);
        let results = store.query_text(&query).await.unwrap();
        let ranks: Vec<_> = results.iter().map(|o| o.properties["rank"].as_i64().unwrap()).collect();
        assert_eq!(ranks, vec![7, 4]);
    }

    #[tokio::test]
    async fn test_similarity_limit_keeps_most_certain() {
        let store = create_test_store();
        let exact = store
            .create_object("Summary", props(json!({"text": "parse json configuration file"})))
            .await
            .unwrap();
        store
            .create_object("Summary", props(json!({"text": "parse json configuration files quickly"})))
            .await
            .unwrap();

        let query = SimilarityQuery::new("Summary", "text", "parse json configuration file", 0.0).with_limit(1);
        let results = store.query_similar(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].object.id, exact);
    }

    #[tokio::test]
    async fn test_delete_removes_object_and_incoming_references() {
        let store = create_test_store();
        let prompt = store.create_object("Prompt", Properties::new()).await.unwrap();
        let summary = store
            .create_object("Summary", props(json!({"text": "parse json"})))
            .await
            .unwrap();
        store.set_reference(&prompt, "hasSummary", &summary).await.unwrap();
        store.set_reference(&summary, "hasPrompt", &prompt).await.unwrap();

        assert!(store.delete_object(&summary).await.unwrap());
        assert!(!store.delete_object(&summary).await.unwrap());

        assert!(store.fetch_object(&summary).await.unwrap().is_none());
        assert!(store.references(&prompt, "hasSummary").await.unwrap().is_empty());
        let query = SimilarityQuery::new("Summary", "text", "parse json", 0.0);
        assert!(store.query_similar(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_equal_query_is_exact() {
        let store = create_test_store();
        store
            .create_object("Prompt", props(json!({"code": "print('x')"})))
            .await
            .unwrap();

        let exact = store
            .query_text(&TextQuery::equal("Prompt", "code", "print('x')"))
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);

        let partial = store
            .query_text(&TextQuery::equal("Prompt", "code", "print"))
            .await
            .unwrap();
        assert!(partial.is_empty());
    }

    #[tokio::test]
    async fn test_set_reference_replaces_targets() {
        let store = create_test_store();
        let source = store.create_object("Prompt", Properties::new()).await.unwrap();
        let first = store.create_object("Summary", props(json!({"text": "one"}))).await.unwrap();
        let second = store.create_object("Summary", props(json!({"text": "two"}))).await.unwrap();

        store.set_reference(&source, "hasSummary", &first).await.unwrap();
        store.set_reference(&source, "hasSummary", &second).await.unwrap();

        let targets = store.references(&source, "hasSummary").await.unwrap();
        assert_eq!(targets, vec![second.clone()]);

        let object = store.fetch_object(&source).await.unwrap().unwrap();
        assert_eq!(object.reference("hasSummary"), &[second]);
    }

    #[tokio::test]
    async fn test_add_reference_appends_in_order() {
        let store = create_test_store();
        let source = store.create_object("Prompt", Properties::new()).await.unwrap();
        let a = store.create_object("Response", Properties::new()).await.unwrap();
        let b = store.create_object("Response", Properties::new()).await.unwrap();

        store.add_reference(&source, "hasResponse", &a).await.unwrap();
        store.add_reference(&source, "hasResponse", &b).await.unwrap();
        store.add_reference(&source, "hasResponse", &a).await.unwrap();

        let targets = store.references(&source, "hasResponse").await.unwrap();
        assert_eq!(targets, vec![a, b]);
    }

    #[tokio::test]
    async fn test_reference_to_missing_object_fails() {
        let store = create_test_store();
        let source = store.create_object("Prompt", Properties::new()).await.unwrap();
        let err = store
            .set_reference(&source, "hasResponse", &ObjectId::from("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_similarity_query_ranks_by_certainty() {
        let store = create_test_store();
        let close = store
            .create_object("Summary", props(json!({"text": "parse json configuration file"})))
            .await
            .unwrap();
        store
            .create_object("Summary", props(json!({"text": "render triangle mesh on gpu"})))
            .await
            .unwrap();

        let query = SimilarityQuery::new("Summary", "text", "parse json configuration", 0.8);
        let results = store.query_similar(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].object.id, close);
        assert!(results[0].certainty >= 0.8);
    }

    #[tokio::test]
    async fn test_similarity_on_unvectorized_field_fails() {
        let store = create_test_store();
        let query = SimilarityQuery::new("Prompt", "code", "anything", 0.5);
        let err = store.query_similar(&query).await.unwrap_err();
        assert!(matches!(err, StorageError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_objects_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("store.db");

        let id = {
            let store = SqliteStore::open(&db_path, Arc::new(HashingEmbedder::default())).unwrap();
            store
                .create_object("Response", props(json!({"response": "it prints x"})))
                .await
                .unwrap()
        };

        let store = SqliteStore::open(&db_path, Arc::new(HashingEmbedder::default())).unwrap();
        let object = store.fetch_object(&id).await.unwrap().unwrap();
        assert_eq!(object.properties["response"], json!("it prints x"));
    }

    #[test]
    fn test_like_pattern_translation() {
        assert_eq!(SqliteStore::like_pattern("print"), "%print%");
        assert_eq!(SqliteStore::like_pattern("a*b?"), "%a%b_%");
        assert_eq!(SqliteStore::like_pattern("100%_"), "%100\\%\\_%");
    }
}
