// Configuration for manager-intake
//
// Settings come from a TOML file and are then overridden by environment
// variables. Nothing is hardcoded beyond local file defaults.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::CommitMode;
use crate::types::IntakeError;

pub const CONFIG_FILE_NAME: &str = "intake.toml";

// Environment overrides
pub const ENV_CONFIG: &str = "INTAKE_CONFIG";
pub const ENV_SOURCE_PATH: &str = "INTAKE_SOURCE_PATH";
pub const ENV_SOURCE_COLLECTION: &str = "INTAKE_SOURCE_COLLECTION";
pub const ENV_DEST_PATH: &str = "INTAKE_DEST_PATH";
pub const ENV_MODEL_DIR: &str = "INTAKE_MODEL_DIR";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IntakeConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub destination: DestinationConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Document collection stored in SQLite
    #[default]
    Sqlite,
    /// Exported collection file (JSON array or one object per line)
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_text_field")]
    pub field: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            path: default_source_path(),
            collection: default_collection(),
            field: default_text_field(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DestinationConfig {
    #[serde(default = "default_dest_path")]
    pub path: PathBuf,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub commit_mode: CommitMode,
    /// Leave documents whose text does not match out of the table.
    #[serde(default)]
    pub skip_unmatched: bool,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            path: default_dest_path(),
            table: default_table(),
            commit_mode: CommitMode::default(),
            skip_unmatched: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OcrConfig {
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    #[serde(default = "default_max_side_len")]
    pub max_side_len: u32,
    #[serde(default = "default_det_threshold")]
    pub det_threshold: f32,
    #[serde(default = "default_box_threshold")]
    pub box_threshold: f32,
    #[serde(default = "default_unclip_ratio")]
    pub unclip_ratio: f32,
    /// Minimum recognition confidence; 0.0 keeps every non-empty detection.
    #[serde(default = "default_rec_threshold")]
    pub rec_threshold: f32,
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            max_side_len: default_max_side_len(),
            det_threshold: default_det_threshold(),
            box_threshold: default_box_threshold(),
            unclip_ratio: default_unclip_ratio(),
            rec_threshold: default_rec_threshold(),
            intra_threads: default_intra_threads(),
        }
    }
}

fn default_source_path() -> PathBuf { PathBuf::from("documents.db") }
fn default_collection() -> String { "managers".to_string() }
fn default_text_field() -> String { "extractedText".to_string() }
fn default_dest_path() -> PathBuf { PathBuf::from("inventory.db") }
fn default_table() -> String { "managers".to_string() }
fn default_model_dir() -> PathBuf { PathBuf::from("models") }
fn default_max_side_len() -> u32 { 960 }
fn default_det_threshold() -> f32 { 0.3 }
fn default_box_threshold() -> f32 { 0.6 }
fn default_unclip_ratio() -> f32 { 1.5 }
fn default_rec_threshold() -> f32 { 0.0 }
fn default_intra_threads() -> usize { 4 }

impl IntakeConfig {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::types::Result<()> {
        if self.source.field.trim().is_empty() {
            return Err(IntakeError::Config("source.field must not be empty".into()));
        }
        if self.source.collection.trim().is_empty() {
            return Err(IntakeError::Config("source.collection must not be empty".into()));
        }
        if self.ocr.max_side_len < 32 {
            return Err(IntakeError::Config(format!(
                "ocr.max_side_len must be at least 32, got {}",
                self.ocr.max_side_len
            )));
        }
        for (name, value) in [
            ("ocr.det_threshold", self.ocr.det_threshold),
            ("ocr.box_threshold", self.ocr.box_threshold),
            ("ocr.rec_threshold", self.ocr.rec_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(IntakeError::Config(format!("{} must be within 0..=1, got {}", name, value)));
            }
        }
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// An explicit path must exist; the fallbacks are only used when present.
    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = explicit {
            return Some(p.to_path_buf());
        }
        if let Ok(p) = env::var(ENV_CONFIG) {
            return Some(PathBuf::from(p));
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("manager-intake").join(CONFIG_FILE_NAME))
            .filter(|p| p.exists())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_SOURCE_PATH) {
            self.source.path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_SOURCE_COLLECTION) {
            self.source.collection = v;
        }
        if let Some(v) = lookup(ENV_DEST_PATH) {
            self.destination.path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_MODEL_DIR) {
            self.ocr.model_dir = PathBuf::from(v);
        }
    }
}
