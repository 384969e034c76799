// Read the text in an image and print it as {"text": "..."}
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use manager_intake::config::IntakeConfig;
use manager_intake::logging::init_tracing;
use manager_intake::ocr::{accept_recognized, load_image, recognize_image, OcrEngine};
use manager_intake::storage::DocumentStore;

#[derive(Parser, Debug)]
#[command(name = "ocr-extract", version, about = "Print the text found in an image as JSON")]
struct Args {
    image_path: PathBuf,
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding en_det.onnx, en_rec.onnx and en_dict.txt
    #[arg(long)]
    model_dir: Option<PathBuf>,
    /// Also save the text as a manager document in this SQLite store
    #[arg(long)]
    store: Option<PathBuf>,
    /// Fail when no text is found instead of printing an empty string
    #[arg(long)]
    require_text: bool,
}

fn main() -> Result<()> {
    init_tracing("warn");
    let args = Args::parse();

    let mut config = IntakeConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.model_dir {
        config.ocr.model_dir = dir;
    }

    let image = load_image(&args.image_path)?;
    info!("Processing image: {}", args.image_path.display());

    let mut engine = OcrEngine::new(&config.ocr)?;
    let recognized = recognize_image(&mut engine, &image)?;

    let store = args
        .store
        .as_deref()
        .map(|path| DocumentStore::open(path, &config.source.collection))
        .transpose()?;
    accept_recognized(&recognized, args.require_text, store.as_ref())
        .with_context(|| format!("Rejected {}", args.image_path.display()))?;

    println!("{}", serde_json::to_string(&recognized)?);
    Ok(())
}
