// Storage layer module
pub mod document_store;
pub mod json_export;
pub mod manager_table;

pub use document_store::DocumentStore;
pub use json_export::JsonExportSource;
pub use manager_table::{CommitMode, ManagerTable};

use anyhow::Result;

use crate::config::{SourceConfig, SourceKind};
use crate::types::SourceDocument;

/// Where the migrator reads documents from.
pub enum DocumentSource {
    Sqlite(DocumentStore),
    JsonExport(JsonExportSource),
}

impl DocumentSource {
    pub fn open(config: &SourceConfig) -> Result<Self> {
        Ok(match config.kind {
            SourceKind::Sqlite => {
                DocumentSource::Sqlite(DocumentStore::open_existing(&config.path, &config.collection)?)
            }
            SourceKind::Json => DocumentSource::JsonExport(JsonExportSource::new(&config.path)),
        })
    }

    pub fn fetch_documents(&self, field: &str) -> Result<Vec<SourceDocument>> {
        match self {
            DocumentSource::Sqlite(store) => store.fetch_documents(field),
            DocumentSource::JsonExport(export) => export.fetch_documents(field),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DocumentSource::Sqlite(store) => store.describe(),
            DocumentSource::JsonExport(export) => export.describe(),
        }
    }

    pub fn source_type(&self) -> &'static str {
        match self {
            DocumentSource::Sqlite(_) => "sqlite",
            DocumentSource::JsonExport(_) => "json-export",
        }
    }
}
