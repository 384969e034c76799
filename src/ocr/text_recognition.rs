// Text recognition: line crops in, CTC-decoded strings out
use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::Path;

use super::Region;

pub const REC_HEIGHT: u32 = 48;
pub const REC_MIN_WIDTH: u32 = 320;

/// Character table for the recogniser's output classes.
///
/// Class 0 is the CTC blank, classes `1..=n` are the dictionary lines and the
/// last class is a space.
#[derive(Debug, Clone)]
pub struct CharDictionary {
    symbols: Vec<String>,
}

impl CharDictionary {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read character dictionary {}", path.display()))?;
        let dict = Self::from_lines(content.lines());
        if dict.len() <= 2 {
            anyhow::bail!("Character dictionary {} is empty", path.display());
        }
        Ok(dict)
    }

    pub fn from_lines<'a, I: IntoIterator<Item = &'a str>>(lines: I) -> Self {
        let mut symbols = vec![String::new()];
        symbols.extend(lines.into_iter().map(|l| l.trim_end_matches('\r').to_string()));
        symbols.push(" ".to_string());
        Self { symbols }
    }

    /// Number of output classes, blank included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, class: usize) -> Option<&str> {
        self.symbols.get(class).map(String::as_str)
    }
}

/// Greedy CTC decoding of a `[steps, classes]` probability matrix.
///
/// Returns the text and the mean probability of the emitted characters.
pub fn ctc_greedy_decode(probs: &[f32], classes: usize, dict: &CharDictionary) -> (String, f32) {
    if classes == 0 {
        return (String::new(), 0.0);
    }
    let mut text = String::new();
    let mut scores = Vec::new();
    let mut prev = 0usize;

    for step in probs.chunks_exact(classes) {
        let (best, p) = step
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });
        if best != 0 && best != prev {
            if let Some(sym) = dict.symbol(best) {
                text.push_str(sym);
                scores.push(p);
            }
        }
        prev = best;
    }

    let confidence = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f32>() / scores.len() as f32
    };
    (text, confidence)
}

/// Cut a region out of the image. Always at least 1x1.
pub fn crop_region(image: &RgbImage, region: &Region) -> RgbImage {
    let x = (region.x0.floor() as u32).min(image.width().saturating_sub(1));
    let y = (region.y0.floor() as u32).min(image.height().saturating_sub(1));
    let w = ((region.x1.ceil() as u32).saturating_sub(x)).clamp(1, image.width() - x);
    let h = ((region.y1.ceil() as u32).saturating_sub(y)).clamp(1, image.height() - y);
    imageops::crop_imm(image, x, y, w, h).to_image()
}

/// Recogniser input: height 48, aspect kept, right-padded to at least 320 wide.
pub struct RecInput {
    pub data: Vec<f32>,
    pub width: u32,
}

pub fn prepare_rec_input(crop: &RgbImage) -> RecInput {
    let ratio = crop.width() as f32 / crop.height().max(1) as f32;
    let resized_w = ((REC_HEIGHT as f32 * ratio).ceil() as u32).max(1);
    let width = resized_w.max(REC_MIN_WIDTH);
    let resized = imageops::resize(crop, resized_w, REC_HEIGHT, FilterType::Triangle);

    let plane = (width * REC_HEIGHT) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = (y * width + x) as usize;
        for c in 0..3 {
            data[c * plane + offset] = (pixel[c] as f32 / 255.0 - 0.5) / 0.5;
        }
    }
    RecInput { data, width }
}
