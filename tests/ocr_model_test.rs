// OCR runs against real models. Skipped when the model files are not installed.
use manager_intake::config::OcrConfig;
use manager_intake::ocr::{recognize_file, ModelPaths, OcrEngine};
use manager_intake::storage::DocumentStore;
use manager_intake::RecognizedText;
use std::path::{Path, PathBuf};
use std::process::Command;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/hello_world.png");

fn model_dir() -> Option<PathBuf> {
    let dir = std::env::var("INTAKE_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| Path::new(env!("CARGO_MANIFEST_DIR")).join("models"));
    if ModelPaths::in_dir(&dir).missing().is_empty() {
        Some(dir)
    } else {
        println!("Skipping: OCR models not found in {}", dir.display());
        None
    }
}

fn normalise(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

#[test]
fn reads_hello_world_in_order() {
    let Some(dir) = model_dir() else { return };
    let config = OcrConfig { model_dir: dir, ..OcrConfig::default() };
    let mut engine = OcrEngine::new(&config).unwrap();

    let out = recognize_file(&mut engine, Path::new(FIXTURE)).unwrap();
    let text = normalise(&out.text);
    let hello = text.find("HELLO").expect("HELLO recognised");
    let world = text.find("WORLD").expect("WORLD recognised");
    assert!(hello < world, "got {:?}", out.text);
}

#[test]
fn missing_image_is_an_error_not_empty_text() {
    let Some(dir) = model_dir() else { return };
    let config = OcrConfig { model_dir: dir, ..OcrConfig::default() };
    let mut engine = OcrEngine::new(&config).unwrap();
    assert!(recognize_file(&mut engine, Path::new("/no/such/file.png")).is_err());
}

#[test]
fn cli_prints_json_and_stores_document() {
    let Some(dir) = model_dir() else { return };
    let scratch = tempfile::tempdir().unwrap();
    let store_path = scratch.path().join("documents.db");

    let output = Command::new(env!("CARGO_BIN_EXE_ocr-extract"))
        .arg(FIXTURE)
        .arg("--model-dir")
        .arg(&dir)
        .arg("--store")
        .arg(&store_path)
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1);
    let parsed: RecognizedText = serde_json::from_str(stdout.trim()).unwrap();
    assert!(normalise(&parsed.text).contains("HELLO"));

    let store = DocumentStore::open(&store_path, "managers").unwrap();
    let docs = store.fetch_documents("extractedText").unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].extracted_text.as_deref(), Some(parsed.text.as_str()));
}
