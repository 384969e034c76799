// Text detection pre/post-processing (DB-style probability maps)
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array2;

use super::Region;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Boxes whose tops are closer than this are treated as one line.
const SAME_LINE_TOLERANCE: f32 = 10.0;

/// Detector input tensor plus the factors mapping it back onto the image.
pub struct DetInput {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
    pub scale_x: f32,
    pub scale_y: f32,
}

/// Cap the longest side at `max_side_len`, then snap both sides to multiples of 32.
pub fn det_input_size(width: u32, height: u32, max_side_len: u32) -> (u32, u32) {
    let longest = width.max(height) as f32;
    let ratio = if longest > max_side_len as f32 {
        max_side_len as f32 / longest
    } else {
        1.0
    };
    let snap = |side: u32| {
        let scaled = (side as f32 * ratio / 32.0).round() as u32 * 32;
        scaled.max(32)
    };
    (snap(width), snap(height))
}

pub fn prepare_det_input(image: &RgbImage, max_side_len: u32) -> DetInput {
    let (w, h) = det_input_size(image.width(), image.height(), max_side_len);
    let resized = imageops::resize(image, w, h, FilterType::Triangle);

    let plane = (w * h) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let offset = (y * w + x) as usize;
        for c in 0..3 {
            data[c * plane + offset] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    DetInput {
        data,
        width: w,
        height: h,
        scale_x: image.width() as f32 / w as f32,
        scale_y: image.height() as f32 / h as f32,
    }
}

/// Turns a probability map into text regions.
#[derive(Debug, Clone)]
pub struct DbPostProcess {
    pub threshold: f32,
    pub box_threshold: f32,
    pub unclip_ratio: f32,
    pub min_size: f32,
}

impl Default for DbPostProcess {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            box_threshold: 0.6,
            unclip_ratio: 1.5,
            min_size: 3.0,
        }
    }
}

struct Component {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    score_sum: f32,
    pixels: usize,
}

impl DbPostProcess {
    /// Regions in image coordinates, in reading order.
    pub fn regions(
        &self,
        map: &Array2<f32>,
        scale_x: f32,
        scale_y: f32,
        image_width: u32,
        image_height: u32,
    ) -> Vec<Region> {
        let mut regions: Vec<Region> = self
            .components(map)
            .into_iter()
            .filter_map(|c| {
                let w = (c.x1 - c.x0 + 1) as f32;
                let h = (c.y1 - c.y0 + 1) as f32;
                if w.min(h) < self.min_size {
                    return None;
                }
                if c.score_sum / (c.pixels as f32) < self.box_threshold {
                    return None;
                }
                let d = w * h * self.unclip_ratio / (2.0 * (w + h));
                let clamp_x = |v: f32| v.clamp(0.0, image_width as f32);
                let clamp_y = |v: f32| v.clamp(0.0, image_height as f32);
                Some(Region {
                    x0: clamp_x((c.x0 as f32 - d) * scale_x),
                    y0: clamp_y((c.y0 as f32 - d) * scale_y),
                    x1: clamp_x(((c.x1 + 1) as f32 + d) * scale_x),
                    y1: clamp_y(((c.y1 + 1) as f32 + d) * scale_y),
                })
            })
            .filter(|r| r.width() >= 1.0 && r.height() >= 1.0)
            .collect();

        sort_regions(&mut regions);
        regions
    }

    /// 8-connected components of the binarised map.
    fn components(&self, map: &Array2<f32>) -> Vec<Component> {
        let (rows, cols) = map.dim();
        let mut seen = Array2::<bool>::from_elem((rows, cols), false);
        let mut out = Vec::new();
        let mut stack = Vec::new();

        for y in 0..rows {
            for x in 0..cols {
                if seen[[y, x]] || map[[y, x]] <= self.threshold {
                    continue;
                }
                let mut comp = Component { x0: x, y0: y, x1: x, y1: y, score_sum: 0.0, pixels: 0 };
                seen[[y, x]] = true;
                stack.push((y, x));

                while let Some((cy, cx)) = stack.pop() {
                    comp.x0 = comp.x0.min(cx);
                    comp.x1 = comp.x1.max(cx);
                    comp.y0 = comp.y0.min(cy);
                    comp.y1 = comp.y1.max(cy);
                    comp.score_sum += map[[cy, cx]];
                    comp.pixels += 1;

                    for ny in cy.saturating_sub(1)..=(cy + 1).min(rows - 1) {
                        for nx in cx.saturating_sub(1)..=(cx + 1).min(cols - 1) {
                            if !seen[[ny, nx]] && map[[ny, nx]] > self.threshold {
                                seen[[ny, nx]] = true;
                                stack.push((ny, nx));
                            }
                        }
                    }
                }
                out.push(comp);
            }
        }
        out
    }
}

/// Top-to-bottom, then left-to-right within a line.
pub fn sort_regions(regions: &mut [Region]) {
    regions.sort_by(|a, b| {
        a.y0.total_cmp(&b.y0).then(a.x0.total_cmp(&b.x0))
    });
    for i in 0..regions.len().saturating_sub(1) {
        for j in (0..=i).rev() {
            let same_line = (regions[j + 1].y0 - regions[j].y0).abs() < SAME_LINE_TOLERANCE;
            if same_line && regions[j + 1].x0 < regions[j].x0 {
                regions.swap(j, j + 1);
            } else {
                break;
            }
        }
    }
}
