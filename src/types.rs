// Core types shared by the migrator and the OCR tool
use serde::{Deserialize, Serialize};
use std::fmt;

/// One document from the source collection, projected to its text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub id: String,
    /// `None` when the document has no string value under the text field.
    pub extracted_text: Option<String>,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, extracted_text: Option<String>) -> Self {
        Self {
            id: id.into(),
            extracted_text,
        }
    }
}

/// Fields pulled out of a document's text. All `None` when the pattern misses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerRecord {
    pub manager_id: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl ManagerRecord {
    pub fn new(manager_id: &str, phone: &str, name: &str) -> Self {
        Self {
            manager_id: Some(manager_id.to_string()),
            name: Some(name.to_string()),
            phone: Some(phone.to_string()),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.manager_id.is_some() && self.phone.is_some() && self.name.is_some()
    }
}

impl fmt::Display for ManagerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "NULL".to_string());
        write!(
            f,
            "manager_id={} name={} phone={}",
            show(&self.manager_id),
            show(&self.name),
            show(&self.phone)
        )
    }
}

/// A row read back from the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredManager {
    pub id: i64,
    pub record: ManagerRecord,
}

/// Text produced by the OCR tool; serialises as `{"text": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub text: String,
}

/// Shape of a document written into the manager collection after an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerDocument {
    #[serde(rename = "extractedText")]
    pub extracted_text: String,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: String,
}

impl ManagerDocument {
    pub fn now(extracted_text: impl Into<String>) -> Self {
        Self {
            extracted_text: extracted_text.into(),
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Failures of a migration run. The precondition variants are raised before
/// the destination table is touched.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("no documents found in source collection {collection:?}")]
    EmptySource { collection: String },

    #[error("field {field:?} not found in document {document}")]
    MissingField { field: String, document: String },

    #[error("insert of record {index} failed ({durable} rows durable)")]
    Insert {
        index: usize,
        durable: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
