// MANAGER MIGRATION TOOL
// One-time migrator: document collection -> managers table
use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::config::{DestinationConfig, SourceConfig};
use crate::extraction::extract_manager_fields;
use crate::storage::{DocumentSource, ManagerTable};
use crate::types::{ManagerRecord, MigrationError, SourceDocument};

/// Moves manager details out of free text into the destination table
pub struct MigrationTool {
    source: SourceConfig,
    destination: DestinationConfig,
}

impl MigrationTool {
    pub fn new(source: SourceConfig, destination: DestinationConfig) -> Self {
        Self { source, destination }
    }

    /// Fetch every document and check the preconditions. Nothing is written.
    pub fn load_documents(&self) -> Result<Vec<SourceDocument>, MigrationError> {
        let source = DocumentSource::open(&self.source)?;
        info!("Reading {} source {}", source.source_type(), source.describe());

        let documents = source.fetch_documents(&self.source.field)?;
        debug!("Fetched {} documents", documents.len());
        self.check_preconditions(&documents)?;
        Ok(documents)
    }

    fn check_preconditions(&self, documents: &[SourceDocument]) -> Result<(), MigrationError> {
        if documents.is_empty() {
            return Err(MigrationError::EmptySource {
                collection: self.source.collection.clone(),
            });
        }
        if let Some(doc) = documents.iter().find(|d| d.extracted_text.is_none()) {
            return Err(MigrationError::MissingField {
                field: self.source.field.clone(),
                document: doc.id.clone(),
            });
        }
        Ok(())
    }

    /// Extract one record per document, in document order.
    pub fn plan(documents: &[SourceDocument]) -> Vec<ManagerRecord> {
        documents
            .iter()
            .map(|doc| extract_manager_fields(doc.extracted_text.as_deref().unwrap_or_default()))
            .collect()
    }

    /// Run the whole migration. The destination is only opened once the
    /// source has passed its checks.
    pub fn run(&self) -> Result<MigrationStats, MigrationError> {
        let documents = self.load_documents()?;
        let records = Self::plan(&documents);

        let matched = records.iter().filter(|r| r.is_matched()).count();
        let unmatched = records.len() - matched;
        if unmatched > 0 {
            warn!("{} of {} documents did not match the manager pattern", unmatched, records.len());
        }

        let to_insert: Vec<ManagerRecord> = if self.destination.skip_unmatched {
            records.into_iter().filter(ManagerRecord::is_matched).collect()
        } else {
            records
        };

        let mut table = ManagerTable::open(&self.destination.path, &self.destination.table)?;
        table.ensure_table()?;
        let before = table.count()?;
        let inserted = table.insert_records(&to_insert, self.destination.commit_mode)?;
        let after = table.count()?;
        if after != before + inserted {
            return Err(MigrationError::Other(anyhow!(
                "row count went from {} to {} after inserting {}",
                before,
                after,
                inserted
            )));
        }
        info!(
            "Inserted {} rows into {} ({:?} commit)",
            inserted,
            self.destination.table,
            self.destination.commit_mode
        );

        Ok(MigrationStats {
            documents: documents.len(),
            matched,
            unmatched,
            inserted,
            skipped: documents.len() - inserted,
        })
    }
}

/// Migration statistics for user display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStats {
    pub documents: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub inserted: usize,
    pub skipped: usize,
}

impl std::fmt::Display for MigrationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,
            "Migration Stats:\n\
             - Documents: {}\n\
             - Matched: {}\n\
             - Unmatched: {}\n\
             - Rows inserted: {}\n\
             - Skipped: {}",
            self.documents,
            self.matched,
            self.unmatched,
            self.inserted,
            self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_keeps_document_order() {
        let docs = vec![
            SourceDocument::new("a", Some("MANAGER ID 1 PHONE: 11 Ann".into())),
            SourceDocument::new("b", Some("blank scan".into())),
            SourceDocument::new("c", Some("MANAGER ID 3 PHONE: 33 Cy".into())),
        ];
        let plan = MigrationTool::plan(&docs);
        assert_eq!(plan[0], ManagerRecord::new("1", "11", "Ann"));
        assert_eq!(plan[1], ManagerRecord::default());
        assert_eq!(plan[2], ManagerRecord::new("3", "33", "Cy"));
    }

    #[test]
    fn stats_display_lists_counts() {
        let stats = MigrationStats { documents: 4, matched: 3, unmatched: 1, inserted: 4, skipped: 0 };
        let shown = stats.to_string();
        assert!(shown.contains("Documents: 4"));
        assert!(shown.contains("Unmatched: 1"));
        assert!(shown.contains("Rows inserted: 4"));
    }
}
