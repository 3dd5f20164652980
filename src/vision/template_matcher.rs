//! Normalized cross-correlation template matching over decoded raster
//! images. Templates are loaded lazily, keyed by file stem.

use std::collections::HashMap;
use std::path::Path;

use image::{GenericImageView, GrayImage, Luma};

use crate::error::TemplateError;

/// A located template match in the input image's local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f64,
    pub key: String,
}

impl MatchResult {
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn bbox(&self) -> (u32, u32, u32, u32) {
        (self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// Lazily-loaded grayscale template cache plus NCC matching.
#[derive(Debug, Default)]
pub struct TemplateMatcher {
    templates: HashMap<String, GrayImage>,
    pub default_threshold: f64,
}

impl TemplateMatcher {
    pub fn new(default_threshold: f64) -> Self {
        Self { templates: HashMap::new(), default_threshold }
    }

    /// Loads and caches a template under `path`'s file stem, or a supplied
    /// `name`. Idempotent: re-loading the same key overwrites it, matching
    /// the write-once-per-key contract with no observable race since the
    /// matcher is single-owner.
    pub fn add_template(&mut self, path: &Path, name: Option<&str>) -> Result<String, TemplateError> {
        let img = image::open(path).map_err(|e| TemplateError::Decode(e.to_string()))?;
        let key = name
            .map(|s| s.to_string())
            .unwrap_or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());
        self.templates.insert(key.clone(), img.to_luma8());
        Ok(key)
    }

    pub fn add_template_from_image(&mut self, name: impl Into<String>, image: GrayImage) {
        self.templates.insert(name.into(), image);
    }

    pub fn has_template(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn list_templates(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    /// Matches a single template against `image`, optionally across a
    /// caller-supplied finite scale set, returning the global max.
    pub fn match_template(
        &self,
        image: &GrayImage,
        key: &str,
        threshold: Option<f64>,
        multi_scale: Option<&[f64]>,
    ) -> Option<MatchResult> {
        let template = self.templates.get(key)?;
        let threshold = threshold.unwrap_or(self.default_threshold);

        match multi_scale {
            None => single_scale_match(image, template, key, threshold),
            Some(scales) => scales
                .iter()
                .filter_map(|&scale| {
                    let scaled = scale_template(template, scale);
                    single_scale_match(image, &scaled, key, threshold)
                })
                .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap()),
        }
    }

    /// Matches every named template (or all loaded templates), sorted by
    /// confidence descending.
    pub fn match_all(
        &self,
        image: &GrayImage,
        keys: Option<&[String]>,
        threshold: Option<f64>,
        multi_scale: Option<&[f64]>,
    ) -> Vec<MatchResult> {
        let names: Vec<String> = keys.map(|k| k.to_vec()).unwrap_or_else(|| self.list_templates());
        let mut results: Vec<MatchResult> = names
            .iter()
            .filter_map(|k| self.match_template(image, k, threshold, multi_scale))
            .collect();
        results.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
        results
    }

    /// Finds every above-threshold occurrence of a template, suppressing
    /// duplicates within Chebyshev distance `min_distance`.
    pub fn find_all_occurrences(
        &self,
        image: &GrayImage,
        key: &str,
        threshold: Option<f64>,
        min_distance: u32,
    ) -> Vec<MatchResult> {
        let Some(template) = self.templates.get(key) else {
            return Vec::new();
        };
        let threshold = threshold.unwrap_or(self.default_threshold);
        let mut candidates = all_positions_above_threshold(image, template, key, threshold);
        candidates.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());

        let mut accepted: Vec<MatchResult> = Vec::new();
        for cand in candidates {
            let is_dup = accepted.iter().any(|existing| {
                let dx = (existing.x as i64 - cand.x as i64).unsigned_abs() as u32;
                let dy = (existing.y as i64 - cand.y as i64).unsigned_abs() as u32;
                dx.max(dy) < min_distance
            });
            if !is_dup {
                accepted.push(cand);
            }
        }
        accepted
    }
}

fn scale_template(template: &GrayImage, scale: f64) -> GrayImage {
    if (scale - 1.0).abs() < f64::EPSILON {
        return template.clone();
    }
    let (w, h) = template.dimensions();
    let new_w = ((w as f64 * scale) as u32).max(1);
    let new_h = ((h as f64 * scale) as u32).max(1);
    image::imageops::resize(template, new_w, new_h, image::imageops::FilterType::Triangle)
}

/// Normalized cross-correlation of `template` against `image` at a given
/// top-left offset. Returns `None` if the template does not fit.
fn ncc_at(image: &GrayImage, template: &GrayImage, ox: u32, oy: u32) -> Option<f64> {
    let (tw, th) = template.dimensions();
    let (iw, ih) = image.dimensions();
    if ox + tw > iw || oy + th > ih {
        return None;
    }

    let mut sum_i = 0f64;
    let mut sum_t = 0f64;
    let n = (tw * th) as f64;
    for y in 0..th {
        for x in 0..tw {
            sum_i += image.get_pixel(ox + x, oy + y)[0] as f64;
            sum_t += template.get_pixel(x, y)[0] as f64;
        }
    }
    let mean_i = sum_i / n;
    let mean_t = sum_t / n;

    let mut numerator = 0f64;
    let mut denom_i = 0f64;
    let mut denom_t = 0f64;
    for y in 0..th {
        for x in 0..tw {
            let vi = image.get_pixel(ox + x, oy + y)[0] as f64 - mean_i;
            let vt = template.get_pixel(x, y)[0] as f64 - mean_t;
            numerator += vi * vt;
            denom_i += vi * vi;
            denom_t += vt * vt;
        }
    }
    let denom = (denom_i * denom_t).sqrt();
    if denom == 0.0 {
        return Some(if numerator == 0.0 { 1.0 } else { 0.0 });
    }
    Some((numerator / denom).clamp(-1.0, 1.0))
}

fn single_scale_match(
    image: &GrayImage,
    template: &GrayImage,
    key: &str,
    threshold: f64,
) -> Option<MatchResult> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw > iw || th > ih {
        return None;
    }

    let mut best: Option<(u32, u32, f64)> = None;
    for oy in 0..=(ih - th) {
        for ox in 0..=(iw - tw) {
            if let Some(score) = ncc_at(image, template, ox, oy) {
                if best.map(|(_, _, b)| score > b).unwrap_or(true) {
                    best = Some((ox, oy, score));
                }
            }
        }
    }
    best.and_then(|(x, y, confidence)| {
        if confidence >= threshold {
            Some(MatchResult { x, y, width: tw, height: th, confidence, key: key.to_string() })
        } else {
            None
        }
    })
}

fn all_positions_above_threshold(
    image: &GrayImage,
    template: &GrayImage,
    key: &str,
    threshold: f64,
) -> Vec<MatchResult> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    let mut out = Vec::new();
    if tw > iw || th > ih {
        return out;
    }
    for oy in 0..=(ih - th) {
        for ox in 0..=(iw - tw) {
            if let Some(score) = ncc_at(image, template, ox, oy) {
                if score >= threshold {
                    out.push(MatchResult { x: ox, y: oy, width: tw, height: th, confidence: score, key: key.to_string() });
                }
            }
        }
    }
    out
}

/// A flat-color patch helper used by tests to synthesize templates/images
/// without decoding PNGs from disk.
pub fn solid_patch(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas_with_patch(w: u32, h: u32, px: u32, py: u32, patch: &GrayImage, bg: u8) -> GrayImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([bg]));
        for y in 0..patch.height() {
            for x in 0..patch.width() {
                img.put_pixel(px + x, py + y, *patch.get_pixel(x, y));
            }
        }
        img
    }

    #[test]
    fn exact_match_has_confidence_near_one() {
        let mut matcher = TemplateMatcher::new(0.75);
        let template = solid_patch(10, 10, 200);
        // introduce variance so NCC is well-defined (flat templates yield
        // a degenerate zero-variance denominator).
        let mut template = template;
        template.put_pixel(0, 0, Luma([50]));
        matcher.add_template_from_image("ahri", template.clone());

        let image = canvas_with_patch(40, 40, 15, 12, &template, 10);
        let result = matcher.match_template(&image, "ahri", None, None).unwrap();
        assert!(result.confidence > 0.99);
        assert_eq!((result.x, result.y), (15, 12));
    }

    #[test]
    fn below_threshold_returns_none() {
        let mut matcher = TemplateMatcher::new(0.99);
        let mut template = solid_patch(8, 8, 100);
        template.put_pixel(0, 0, Luma([0]));
        matcher.add_template_from_image("x", template.clone());

        // Pure noise-free flat image should not cross a near-1.0 threshold
        // except at the exact location, so shift the canvas entirely.
        let image = solid_patch(20, 20, 128);
        assert!(matcher.match_template(&image, "x", Some(0.999), None).is_none());
    }

    #[test]
    fn find_all_occurrences_dedups_by_chebyshev_distance() {
        let mut matcher = TemplateMatcher::new(0.5);
        let mut template = solid_patch(4, 4, 200);
        template.put_pixel(0, 0, Luma([0]));
        matcher.add_template_from_image("t", template.clone());

        let mut image = GrayImage::from_pixel(30, 30, Luma([50]));
        for (px, py) in [(2u32, 2u32), (3, 3), (20, 20)] {
            for y in 0..4 {
                for x in 0..4 {
                    image.put_pixel(px + x, py + y, *template.get_pixel(x, y));
                }
            }
        }

        let occurrences = matcher.find_all_occurrences(&image, "t", Some(0.9), 5);
        // (2,2) and (3,3) are within Chebyshev distance 5 of each other and
        // collapse to one; (20,20) survives as a separate occurrence.
        assert_eq!(occurrences.len(), 2);
    }

    #[test]
    fn unknown_key_returns_none() {
        let matcher = TemplateMatcher::new(0.75);
        let image = solid_patch(10, 10, 100);
        assert!(matcher.match_template(&image, "missing", None, None).is_none());
        assert!(matcher.find_all_occurrences(&image, "missing", None, 5).is_empty());
    }
}
