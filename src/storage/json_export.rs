// Collection export files (mongoexport style)
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::document_store::project_text;
use crate::types::SourceDocument;

/// A collection dumped to disk, either as one JSON array or as one object per line.
pub struct JsonExportSource {
    path: PathBuf,
}

impl JsonExportSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn describe(&self) -> String {
        self.path.display().to_string()
    }

    pub fn fetch_documents(&self, field: &str) -> Result<Vec<SourceDocument>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read export {}", self.path.display()))?;
        let values = parse_export(&content)
            .with_context(|| format!("Invalid export {}", self.path.display()))?;

        Ok(values
            .iter()
            .enumerate()
            .map(|(i, v)| SourceDocument::new(document_id(v, i), project_text(v, field)))
            .collect())
    }
}

fn parse_export(content: &str) -> Result<Vec<Value>> {
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(content)?);
    }
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<Value>(line).with_context(|| format!("line {}", n + 1))
        })
        .collect()
}

/// `_id` as exported (`{"$oid": ...}` or a plain value), else the ordinal.
fn document_id(document: &Value, ordinal: usize) -> String {
    match document.get("_id") {
        Some(Value::Object(obj)) => obj
            .get("$oid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| ordinal.to_string()),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => ordinal.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_export(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_line_delimited_export() {
        let file = write_export(concat!(
            r#"{"_id":{"$oid":"65f0a1"},"extractedText":"MANAGER ID 1 PHONE: 2 Ann"}"#,
            "\n\n",
            r#"{"_id":{"$oid":"65f0a2"},"extractedText":"nothing"}"#,
            "\n"
        ));
        let docs = JsonExportSource::new(file.path()).fetch_documents("extractedText").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "65f0a1");
        assert_eq!(docs[1].extracted_text.as_deref(), Some("nothing"));
    }

    #[test]
    fn reads_array_export() {
        let file = write_export(r#"[{"extractedText":"a"},{"_id":7,"text":"b"}]"#);
        let docs = JsonExportSource::new(file.path()).fetch_documents("extractedText").unwrap();
        assert_eq!(docs[0].id, "0");
        assert_eq!(docs[1].id, "7");
        assert_eq!(docs[1].extracted_text, None);
    }

    #[test]
    fn bad_line_reports_line_number() {
        let file = write_export("{\"extractedText\":\"a\"}\n{oops\n");
        let err = JsonExportSource::new(file.path()).fetch_documents("extractedText").unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
