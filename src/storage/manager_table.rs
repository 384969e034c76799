// Destination table for migrated manager records
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{IntakeError, ManagerRecord, MigrationError, StoredManager};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex"));

/// How a batch of inserts is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// One transaction around the whole batch; any failure rolls everything back.
    #[default]
    Atomic,
    /// Each row commits on its own; rows before a failure stay written.
    PerRecord,
}

pub struct ManagerTable {
    conn: Connection,
    table: String,
}

impl ManagerTable {
    pub fn open(path: &Path, table: &str) -> Result<Self, MigrationError> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open destination {}", path.display()))?;
        Self::with_connection(conn, table)
    }

    pub fn with_connection(conn: Connection, table: &str) -> Result<Self, MigrationError> {
        if !IDENTIFIER_RE.is_match(table) {
            return Err(IntakeError::InvalidTableName(table.to_string()).into());
        }
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    /// Raw handle, for callers that need to inspect or extend the schema.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn ensure_table(&self) -> Result<(), MigrationError> {
        let sql = format!(
            r#"CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                manager_id VARCHAR(100),
                name VARCHAR(255),
                phone VARCHAR(20)
            )"#,
            self.table
        );
        self.conn.execute_batch(&sql).map_err(IntakeError::from)?;
        Ok(())
    }

    /// Insert one row per record. Returns the number of rows written.
    pub fn insert_records(
        &mut self,
        records: &[ManagerRecord],
        mode: CommitMode,
    ) -> Result<usize, MigrationError> {
        let sql = format!(
            "INSERT INTO {} (manager_id, name, phone) VALUES (?1, ?2, ?3)",
            self.table
        );

        match mode {
            CommitMode::Atomic => {
                let tx = self.conn.transaction().map_err(IntakeError::from)?;
                {
                    let mut stmt = tx.prepare(&sql).map_err(IntakeError::from)?;
                    for (index, record) in records.iter().enumerate() {
                        stmt.execute(params![record.manager_id, record.name, record.phone])
                            .map_err(|source| MigrationError::Insert { index, durable: 0, source })?;
                    }
                }
                tx.commit().map_err(IntakeError::from)?;
                tracing::debug!("Committed {} rows in one transaction", records.len());
            }
            CommitMode::PerRecord => {
                let mut stmt = self.conn.prepare(&sql).map_err(IntakeError::from)?;
                for (index, record) in records.iter().enumerate() {
                    stmt.execute(params![record.manager_id, record.name, record.phone])
                        .map_err(|source| MigrationError::Insert { index, durable: index, source })?;
                }
            }
        }

        Ok(records.len())
    }

    pub fn count(&self) -> Result<usize, MigrationError> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| row.get(0))
            .map_err(IntakeError::from)?;
        Ok(n as usize)
    }

    pub fn rows(&self) -> Result<Vec<StoredManager>, MigrationError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT id, manager_id, name, phone FROM {} ORDER BY id",
                self.table
            ))
            .map_err(IntakeError::from)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredManager {
                    id: row.get(0)?,
                    record: ManagerRecord {
                        manager_id: row.get(1)?,
                        name: row.get(2)?,
                        phone: row.get(3)?,
                    },
                })
            })
            .map_err(IntakeError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(IntakeError::from)?;
        Ok(rows)
    }
}
