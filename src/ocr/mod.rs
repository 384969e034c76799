// OCR module: image in, recognized text out
pub mod ocr_engine;
pub mod text_detection;
pub mod text_recognition;

pub use ocr_engine::{ModelPaths, OcrEngine, LANGUAGE};

use anyhow::{bail, Context, Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::storage::DocumentStore;
use crate::types::{ManagerDocument, RecognizedText};

/// Axis-aligned box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Region {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// One located text fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub region: Region,
    pub text: String,
    pub confidence: f32,
}

/// Anything that can find and read text in an image.
pub trait TextRecognizer {
    /// Detections in reading order.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Drop detections with no text, and those under `min_confidence` when it is set.
pub fn retain_readable(detections: Vec<Detection>, min_confidence: f32) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| {
            let keep = !d.text.is_empty() && d.confidence >= min_confidence;
            if !keep {
                tracing::debug!("Dropping region {:?} ({:?}, {:.2})", d.region, d.text, d.confidence);
            }
            keep
        })
        .collect()
}

/// Texts joined with single spaces, in detection order.
pub fn join_detections(detections: &[Detection]) -> String {
    detections
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("Failed to load image {}", path.display()))
}

pub fn recognize_image<R: TextRecognizer + ?Sized>(
    recognizer: &mut R,
    image: &DynamicImage,
) -> Result<RecognizedText> {
    let detections = recognizer.detect(image)?;
    tracing::debug!("{} detections", detections.len());
    Ok(RecognizedText {
        text: join_detections(&detections),
    })
}

pub fn recognize_file<R: TextRecognizer + ?Sized>(recognizer: &mut R, path: &Path) -> Result<RecognizedText> {
    let image = load_image(path)?;
    recognize_image(recognizer, &image)
}

/// Check recognized text against the upload rules and optionally save it as a
/// manager document. Returns the stored document id.
pub fn accept_recognized(
    recognized: &RecognizedText,
    require_text: bool,
    store: Option<&DocumentStore>,
) -> Result<Option<i64>> {
    if require_text && recognized.text.trim().is_empty() {
        bail!("No text could be extracted from the image");
    }
    match store {
        Some(store) => {
            let id = store.insert_document(&ManagerDocument::now(recognized.text.clone()))?;
            tracing::info!("Stored as document {} in {}", id, store.describe());
            Ok(Some(id))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Vec<Detection>);

    impl TextRecognizer for Scripted {
        fn detect(&mut self, _image: &DynamicImage) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    fn det(text: &str, x0: f32) -> Detection {
        scored(text, x0, 0.9)
    }

    fn scored(text: &str, x0: f32, confidence: f32) -> Detection {
        Detection {
            region: Region { x0, y0: 0.0, x1: x0 + 10.0, y1: 10.0 },
            text: text.to_string(),
            confidence,
        }
    }

    fn read(detections: Vec<Detection>) -> RecognizedText {
        let mut r = Scripted(detections);
        recognize_image(&mut r, &DynamicImage::new_rgb8(4, 4)).unwrap()
    }

    #[test]
    fn joins_in_detection_order_with_single_spaces() {
        let dets = vec![det("WORLD", 50.0), det("HELLO", 0.0)];
        assert_eq!(join_detections(&dets), "WORLD HELLO");
    }

    #[test]
    fn no_detections_gives_empty_text() {
        assert_eq!(read(vec![]).text, "");
    }

    #[test]
    fn recognize_file_reports_missing_path() {
        let mut r = Scripted(vec![det("X", 0.0)]);
        let err = recognize_file(&mut r, Path::new("/no/such/image.png")).unwrap_err();
        assert!(err.to_string().contains("/no/such/image.png"));
    }

    #[test]
    fn low_confidence_words_are_kept_by_default() {
        let kept = retain_readable(
            vec![scored("HELLO", 0.0, 0.95), scored("W0RLD", 60.0, 0.12), scored("", 120.0, 0.99)],
            crate::config::OcrConfig::default().rec_threshold,
        );
        let texts: Vec<_> = kept.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["HELLO", "W0RLD"]);
    }

    #[test]
    fn confidence_floor_is_opt_in() {
        let kept = retain_readable(vec![scored("HELLO", 0.0, 0.95), scored("W0RLD", 60.0, 0.12)], 0.5);
        assert_eq!(join_detections(&kept), "HELLO");
    }

    #[test]
    fn require_text_rejects_blank_result_without_storing() -> Result<()> {
        let store = DocumentStore::in_memory("managers")?;
        let recognized = read(vec![]);

        let err = accept_recognized(&recognized, true, Some(&store)).unwrap_err();
        assert!(err.to_string().contains("No text could be extracted"));
        assert_eq!(store.count()?, 0);
        Ok(())
    }

    #[test]
    fn blank_result_passes_when_text_not_required() -> Result<()> {
        assert_eq!(accept_recognized(&read(vec![]), false, None)?, None);
        Ok(())
    }

    #[test]
    fn stored_result_feeds_the_migrator() -> Result<()> {
        let store = DocumentStore::in_memory("managers")?;
        let recognized = read(vec![det("MANAGER ID 42", 0.0), det("PHONE: 5551234 John", 0.0)]);

        let id = accept_recognized(&recognized, true, Some(&store))?;
        assert!(id.is_some());
        let docs = store.fetch_documents("extractedText")?;
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].extracted_text.as_deref(),
            Some("MANAGER ID 42 PHONE: 5551234 John")
        );
        assert_eq!(
            crate::extraction::extract_manager_fields(&recognized.text),
            crate::types::ManagerRecord::new("42", "5551234", "John")
        );
        Ok(())
    }
}
