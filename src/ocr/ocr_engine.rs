// OCR engine: text detector + CTC recogniser on ONNX Runtime
use anyhow::{anyhow, Context, Result};
use image::{DynamicImage, RgbImage};
use ndarray::Array2;
use ort::{
    inputs,
    session::builder::GraphOptimizationLevel,
    session::Session,
    value::Value,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::text_detection::{prepare_det_input, DbPostProcess};
use super::text_recognition::{crop_region, ctc_greedy_decode, prepare_rec_input, CharDictionary, REC_HEIGHT};
use super::{retain_readable, Detection, Region, TextRecognizer};
use crate::config::OcrConfig;

/// The engine is built for this language only.
pub const LANGUAGE: &str = "en";

/// Model files the engine expects inside the model directory.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub detector: PathBuf,
    pub recognizer: PathBuf,
    pub dictionary: PathBuf,
}

impl ModelPaths {
    pub fn in_dir(model_dir: &Path) -> Self {
        Self {
            detector: model_dir.join(format!("{}_det.onnx", LANGUAGE)),
            recognizer: model_dir.join(format!("{}_rec.onnx", LANGUAGE)),
            dictionary: model_dir.join(format!("{}_dict.txt", LANGUAGE)),
        }
    }

    pub fn missing(&self) -> Vec<&Path> {
        [&self.detector, &self.recognizer, &self.dictionary]
            .into_iter()
            .map(PathBuf::as_path)
            .filter(|p| !p.exists())
            .collect()
    }
}

pub struct OcrEngine {
    detector: Session,
    recognizer: Session,
    dictionary: CharDictionary,
    post: DbPostProcess,
    max_side_len: u32,
    rec_threshold: f32,
}

impl OcrEngine {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let paths = ModelPaths::in_dir(&config.model_dir);
        let missing = paths.missing();
        if !missing.is_empty() {
            return Err(anyhow!(
                "OCR model files not found: {}",
                missing.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
            ));
        }

        info!("Loading {} OCR models from {}", LANGUAGE, config.model_dir.display());
        let detector = load_session(&paths.detector, config.intra_threads)?;
        let recognizer = load_session(&paths.recognizer, config.intra_threads)?;
        let dictionary = CharDictionary::from_file(&paths.dictionary)?;
        debug!("Dictionary has {} classes", dictionary.len());

        Ok(Self {
            detector,
            recognizer,
            dictionary,
            post: DbPostProcess {
                threshold: config.det_threshold,
                box_threshold: config.box_threshold,
                unclip_ratio: config.unclip_ratio,
                ..DbPostProcess::default()
            },
            max_side_len: config.max_side_len,
            rec_threshold: config.rec_threshold,
        })
    }

    fn detect_regions(&mut self, image: &RgbImage) -> Result<Vec<Region>> {
        let det = prepare_det_input(image, self.max_side_len);
        let input = Value::from_array((
            [1_usize, 3, det.height as usize, det.width as usize],
            det.data.into_boxed_slice(),
        ))?;

        let map = {
            let outputs = self.detector.run(inputs![input])?;
            let (shape, probs) = outputs[0].try_extract_tensor::<f32>()?;
            if shape.len() != 4 {
                return Err(anyhow!("Unexpected detector output shape {:?}", shape));
            }
            let rows = shape[2] as usize;
            let cols = shape[3] as usize;
            if probs.len() < rows * cols {
                return Err(anyhow!("Detector returned {} values for a {}x{} map", probs.len(), rows, cols));
            }
            Array2::from_shape_vec((rows, cols), probs[..rows * cols].to_vec())
                .context("Detector output does not match its shape")?
        };

        // The map can come back at a different resolution than the input.
        let (rows, cols) = map.dim();
        let scale_x = det.scale_x * det.width as f32 / cols as f32;
        let scale_y = det.scale_y * det.height as f32 / rows as f32;
        Ok(self.post.regions(&map, scale_x, scale_y, image.width(), image.height()))
    }

    fn recognize_crop(&mut self, crop: &RgbImage) -> Result<(String, f32)> {
        let rec = prepare_rec_input(crop);
        let input = Value::from_array((
            [1_usize, 3, REC_HEIGHT as usize, rec.width as usize],
            rec.data.into_boxed_slice(),
        ))?;

        let outputs = self.recognizer.run(inputs![input])?;
        let (shape, probs) = outputs[0].try_extract_tensor::<f32>()?;
        if shape.len() != 3 {
            return Err(anyhow!("Unexpected recognizer output shape {:?}", shape));
        }
        let classes = shape[2] as usize;
        if classes != self.dictionary.len() {
            return Err(anyhow!(
                "Recognizer emits {} classes but the dictionary has {}",
                classes,
                self.dictionary.len()
            ));
        }
        Ok(ctc_greedy_decode(probs, classes, &self.dictionary))
    }
}

impl TextRecognizer for OcrEngine {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let rgb = image.to_rgb8();
        let regions = self.detect_regions(&rgb)?;
        debug!("Detector found {} text regions", regions.len());

        let mut detections = Vec::with_capacity(regions.len());
        for region in regions {
            let crop = crop_region(&rgb, &region);
            let (text, confidence) = self.recognize_crop(&crop)?;
            detections.push(Detection { region, text, confidence });
        }
        Ok(retain_readable(detections, self.rec_threshold))
    }
}

fn load_session(path: &Path, threads: usize) -> Result<Session> {
    debug!("Loading model {}", path.display());
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(threads)?
        .commit_from_file(path)
        .with_context(|| format!("Failed to load model {}", path.display()))?;
    Ok(session)
}
