// manager-intake: manager record migration and image text extraction
pub mod config;
pub mod extraction;
pub mod logging;
pub mod migration_tool;
pub mod ocr;
pub mod storage;
pub mod types;

pub use config::IntakeConfig;
pub use migration_tool::{MigrationStats, MigrationTool};
pub use types::{ManagerRecord, MigrationError, RecognizedText, SourceDocument};
