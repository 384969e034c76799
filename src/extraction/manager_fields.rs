// Manager id / phone / name extraction
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ManagerRecord;

/// Searched anywhere in the text. `.` stops at newlines, so the id and the
/// phone have to sit on the same line.
pub const MANAGER_PATTERN: &str = r"MANAGER ID (\d+).*PHONE:\s*(\d+)\s*(\w+)";

static MANAGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(MANAGER_PATTERN).expect("manager pattern is a valid regex"));

/// Pull `(manager_id, phone, name)` out of a document's text.
///
/// A miss yields a record with every field `None`; this never fails.
pub fn extract_manager_fields(text: &str) -> ManagerRecord {
    match MANAGER_RE.captures(text) {
        Some(caps) => ManagerRecord {
            manager_id: caps.get(1).map(|m| m.as_str().to_string()),
            phone: caps.get(2).map(|m| m.as_str().to_string()),
            name: caps.get(3).map(|m| m.as_str().to_string()),
        },
        None => ManagerRecord::default(),
    }
}
