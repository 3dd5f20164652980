//! Pluggable OCR backend. Auto-selection tries a fixed priority list of
//! constructors and degrades to "no backend available" rather than
//! failing, matching the rest of the recognition stack's tiered
//! degradation.

use image::RgbImage;
use regex::Regex;

/// A single recognized text span, in the coordinate frame of the image
/// passed to [`OcrBackend::recognize`].
#[derive(Debug, Clone, PartialEq)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f64,
    pub bbox: (i32, i32, i32, i32),
}

impl OcrResult {
    pub fn center(&self) -> (i32, i32) {
        let (x1, y1, x2, y2) = self.bbox;
        ((x1 + x2) / 2, (y1 + y2) / 2)
    }

    pub fn width(&self) -> i32 {
        self.bbox.2 - self.bbox.0
    }

    pub fn height(&self) -> i32 {
        self.bbox.3 - self.bbox.1
    }
}

/// Object-safe OCR backend contract. A backend recognizes either the
/// whole image, or a set of caller-supplied sub-regions, translating
/// local bboxes back into the image's own frame.
pub trait OcrBackend: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &RgbImage, regions: Option<&[(i32, i32, i32, i32)]>) -> Vec<OcrResult>;
}

/// Wraps at most one active backend, selected either explicitly or by
/// trying a priority-ordered constructor list. Construction never fails:
/// an engine with no available backend simply returns empty results.
#[derive(Debug)]
pub struct OcrEngine {
    backend: Option<Box<dyn OcrBackend>>,
}

impl OcrEngine {
    pub fn new(backend: Option<Box<dyn OcrBackend>>) -> Self {
        Self { backend }
    }

    /// Tries constructors in priority order, keeping the first that
    /// reports itself available. None of the bundled backends in this
    /// build are available by default; callers in capability-rich
    /// environments register their own via [`OcrEngine::new`].
    pub fn auto(candidates: Vec<Box<dyn OcrBackend>>) -> Self {
        Self { backend: candidates.into_iter().next() }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    pub fn recognize(&self, image: &RgbImage, regions: Option<&[(i32, i32, i32, i32)]>) -> Vec<OcrResult> {
        match &self.backend {
            Some(b) => b.recognize(image, regions),
            None => Vec::new(),
        }
    }

    /// Recognizes `region` (or the whole image) and extracts the first
    /// run of digits found in any result's text.
    pub fn recognize_number(&self, image: &RgbImage, region: Option<(i32, i32, i32, i32)>) -> Option<i32> {
        let regions = region.map(|r| vec![r]);
        let results = self.recognize(image, regions.as_deref());
        let digits = Regex::new(r"\d+").expect("static regex");
        for result in &results {
            if let Some(m) = digits.find(&result.text) {
                if let Ok(n) = m.as_str().parse::<i32>() {
                    return Some(n);
                }
            }
        }
        None
    }

    /// Recognizes `region` and joins every span's text in reading order
    /// (top-to-bottom, then left-to-right).
    pub fn recognize_text_in_region(&self, image: &RgbImage, region: (i32, i32, i32, i32)) -> Option<String> {
        let mut results = self.recognize(image, Some(&[region]));
        if results.is_empty() {
            return None;
        }
        results.sort_by_key(|r| (r.bbox.1, r.bbox.0));
        Some(results.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join(" "))
    }
}

impl Default for OcrEngine {
    fn default() -> Self {
        Self { backend: None }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Deterministic backend used by tests and by callers exercising the
    /// recognition pipeline without a real OCR dependency.
    #[derive(Debug, Default)]
    pub struct MockOcrBackend {
        pub canned: Vec<OcrResult>,
    }

    impl OcrBackend for MockOcrBackend {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn recognize(&self, _image: &RgbImage, _regions: Option<&[(i32, i32, i32, i32)]>) -> Vec<OcrResult> {
            self.canned.clone()
        }
    }
}
