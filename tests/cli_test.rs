// CLI behaviour of both binaries
use manager_intake::storage::{DocumentStore, ManagerTable};
use rexpect::session::spawn_command;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Command;

const TIMEOUT_MS: u64 = 10000;
const MIGRATE_BIN: &str = env!("CARGO_BIN_EXE_manager-migrate");
const OCR_BIN: &str = env!("CARGO_BIN_EXE_ocr-extract");

fn write_config(dir: &Path) -> PathBuf {
    let config = dir.join("intake.toml");
    std::fs::write(
        &config,
        format!(
            "[source]\npath = {:?}\n\n[destination]\npath = {:?}\n",
            dir.join("documents.db"),
            dir.join("inventory.db")
        ),
    )
    .unwrap();
    config
}

fn migrate_command(config: &Path) -> Command {
    let mut cmd = Command::new(MIGRATE_BIN);
    cmd.arg("--config").arg(config).env("RUST_LOG", "off");
    cmd
}

#[test]
fn migrate_reports_success_and_counts() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::open(&dir.path().join("documents.db"), "managers").unwrap();
    store.insert_document(&json!({"extractedText": "MANAGER ID 42 PHONE: 5551234 John"})).unwrap();
    store.insert_document(&json!({"extractedText": "coffee stain"})).unwrap();
    let config = write_config(dir.path());

    let mut p = spawn_command(migrate_command(&config), Some(TIMEOUT_MS)).unwrap();
    p.exp_string("Data migrated successfully!").unwrap();
    p.exp_string("Rows inserted: 2").unwrap();
    p.exp_eof().unwrap();

    let table = ManagerTable::open(&dir.path().join("inventory.db"), "managers").unwrap();
    assert_eq!(table.count().unwrap(), 2);
}

#[test]
fn migrate_exits_early_on_empty_collection() {
    let dir = tempfile::tempdir().unwrap();
    DocumentStore::open(&dir.path().join("documents.db"), "managers").unwrap();
    let config = write_config(dir.path());

    let output = migrate_command(&config).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No data found in source collection!"));
    assert!(!dir.path().join("inventory.db").exists());
}

#[test]
fn migrate_dry_run_prints_records_only() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::open(&dir.path().join("documents.db"), "managers").unwrap();
    store.insert_document(&json!({"extractedText": "MANAGER ID 7 PHONE: 700 Raj"})).unwrap();
    let config = write_config(dir.path());

    let mut cmd = migrate_command(&config);
    cmd.arg("--dry-run");
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Loaded 1 documents"));
    assert!(stdout.contains("manager_id=7 name=Raj phone=700"));
    assert!(!dir.path().join("inventory.db").exists());
}

#[test]
fn ocr_fails_loudly_on_missing_image() {
    let output = Command::new(OCR_BIN)
        .arg("/definitely/not/here.png")
        .env("RUST_LOG", "off")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("/definitely/not/here.png"));
}

#[test]
fn ocr_requires_exactly_one_path() {
    let output = Command::new(OCR_BIN).output().unwrap();
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn ocr_reports_missing_models() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("blank.png");
    image::RgbImage::from_pixel(64, 32, image::Rgb([255, 255, 255]))
        .save(&image_path)
        .unwrap();

    let mut cmd = Command::new(OCR_BIN);
    cmd.arg(&image_path)
        .arg("--model-dir")
        .arg(dir.path().join("models"))
        .env("RUST_LOG", "off");
    let mut p = spawn_command(cmd, Some(TIMEOUT_MS)).unwrap();
    p.exp_string("OCR model files not found").unwrap();
    p.exp_eof().unwrap();
}
