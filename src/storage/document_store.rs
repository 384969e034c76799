// SQLite-backed document collections
//
// Each row holds one JSON document tagged with its collection name, which is
// enough to stand in for a document database collection.
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::types::SourceDocument;

pub struct DocumentStore {
    conn: Connection,
    path: Option<PathBuf>,
    collection: String,
}

impl DocumentStore {
    pub fn open(path: &Path, collection: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open document store {}", path.display()))?;
        Self::with_connection(conn, Some(path.to_path_buf()), collection)
    }

    /// Open read-only, leaving the schema alone. A missing file is an error
    /// instead of a fresh empty store.
    pub fn open_existing(path: &Path, collection: &str) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Document store {} does not exist", path.display());
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open document store {}", path.display()))?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            collection: collection.to_string(),
        })
    }

    pub fn in_memory(collection: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None, collection)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>, collection: &str) -> Result<Self> {
        Self::create_schema(&conn)?;
        Ok(Self {
            conn,
            path,
            collection: collection.to_string(),
        })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY,
                collection TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_documents_collection
                ON documents(collection);
        "#,
        )?;
        Ok(())
    }

    pub fn describe(&self) -> String {
        match &self.path {
            Some(p) => format!("{} [{}]", p.display(), self.collection),
            None => format!(":memory: [{}]", self.collection),
        }
    }

    pub fn insert_document<T: Serialize>(&self, document: &T) -> Result<i64> {
        let body = serde_json::to_string(document)?;
        self.conn.execute(
            "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
            params![self.collection, body],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// A store created elsewhere may not have the documents table yet.
    fn has_documents_table(&self) -> Result<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'documents'",
            [],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn count(&self) -> Result<usize> {
        if !self.has_documents_table()? {
            return Ok(0);
        }
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }

    /// Every document of the collection, projected to `field`, in insertion order.
    pub fn fetch_documents(&self, field: &str) -> Result<Vec<SourceDocument>> {
        if !self.has_documents_table()? {
            tracing::warn!("{} has no documents table", self.describe());
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![self.collection], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let value: Value = serde_json::from_str(&body)
                .with_context(|| format!("Document {} is not valid JSON", id))?;
            documents.push(SourceDocument::new(id.to_string(), project_text(&value, field)));
        }
        Ok(documents)
    }
}

/// String value of `field`, or `None` if absent or of another JSON type.
pub fn project_text(document: &Value, field: &str) -> Option<String> {
    document.get(field).and_then(Value::as_str).map(str::to_string)
}
