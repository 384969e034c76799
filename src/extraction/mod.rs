// Field extraction from free text
pub mod manager_fields;

pub use manager_fields::{extract_manager_fields, MANAGER_PATTERN};
