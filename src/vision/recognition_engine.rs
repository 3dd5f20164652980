//! Combines template matching and OCR into typed game entities.

use std::path::{Path, PathBuf};

use image::{imageops, RgbImage};

use crate::geometry::transform::{CoordinateTransform, Rect, Size};
use crate::vision::ocr_engine::OcrEngine;
use crate::vision::regions::{RegionCatalog, UIRegion};
use crate::vision::template_matcher::TemplateMatcher;
use crate::vision::template_registry::{EntityKind, TemplateRegistry};

/// How a [`RecognizedEntity`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMethod {
    Template,
    Ocr,
    Hybrid,
}

impl RecognitionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Ocr => "ocr",
            Self::Hybrid => "hybrid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedEntity {
    pub kind: EntityKind,
    pub id: String,
    pub confidence: f64,
    pub method: RecognitionMethod,
    pub bbox_global: (i32, i32, i32, i32),
    pub slot_index: Option<usize>,
}

impl RecognizedEntity {
    pub fn center(&self) -> (i32, i32) {
        let (x1, y1, x2, y2) = self.bbox_global;
        ((x1 + x2) / 2, (y1 + y2) / 2)
    }

    pub fn width(&self) -> i32 {
        self.bbox_global.2 - self.bbox_global.0
    }

    pub fn height(&self) -> i32 {
        self.bbox_global.3 - self.bbox_global.1
    }
}

struct LocalMatch {
    name: String,
    confidence: f64,
    local_bbox: (i32, i32, i32, i32),
}

/// Combines a [`TemplateRegistry`]/[`TemplateMatcher`] pair with an
/// [`OcrEngine`] to recognize shop/bench/board/item/synergy entities from
/// a full-window screenshot.
pub struct RecognitionEngine {
    registry: TemplateRegistry,
    matcher: TemplateMatcher,
    ocr: OcrEngine,
    template_root: PathBuf,
    transform: CoordinateTransform,
    base_size: Size,
    pub template_threshold: f64,
    pub ocr_confidence_threshold: f64,
}

impl RecognitionEngine {
    pub fn new(
        registry: TemplateRegistry,
        matcher: TemplateMatcher,
        ocr: OcrEngine,
        template_root: impl Into<PathBuf>,
    ) -> Result<Self, crate::error::GeometryError> {
        let base_size = Size::new(1920, 1080);
        let transform = CoordinateTransform::new(base_size, base_size, None)?;
        Ok(Self {
            registry,
            matcher,
            ocr,
            template_root: template_root.into(),
            transform,
            base_size,
            template_threshold: 0.75,
            ocr_confidence_threshold: 0.6,
        })
    }

    /// The coordinate transform in effect after the most recent
    /// `recognize_*` call, for callers that need to log or reuse the
    /// current scale/offset (e.g. `SessionLoop`'s tick observation).
    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Recomputes the coordinate transform if the screenshot size changed
    /// since the last call.
    fn sync_transform(&mut self, screenshot: &RgbImage) -> Result<(), crate::error::GeometryError> {
        let current = Size::new(screenshot.width(), screenshot.height());
        if current != self.transform.current_size() {
            self.transform = CoordinateTransform::new(self.base_size, current, None)?;
        }
        Ok(())
    }

    pub fn recognize_shop(&mut self, screenshot: &RgbImage) -> Vec<Option<RecognizedEntity>> {
        self.recognize_slots(screenshot, EntityKind::Hero, &RegionCatalog::all_shop_slots())
    }

    pub fn recognize_bench(&mut self, screenshot: &RgbImage) -> Vec<Option<RecognizedEntity>> {
        self.recognize_slots(screenshot, EntityKind::Hero, &RegionCatalog::all_bench_slots())
    }

    fn recognize_slots(
        &mut self,
        screenshot: &RgbImage,
        kind: EntityKind,
        regions: &[UIRegion],
    ) -> Vec<Option<RecognizedEntity>> {
        if self.sync_transform(screenshot).is_err() {
            return vec![None; regions.len()];
        }
        regions
            .iter()
            .enumerate()
            .map(|(idx, region)| self.recognize_in_region(screenshot, *region, kind, Some(idx)))
            .collect()
    }

    /// Recognizes every board cell. Cells never dedup against each other;
    /// a hero template matching in two adjacent cells yields two entities.
    pub fn recognize_board(&mut self, screenshot: &RgbImage) -> Vec<RecognizedEntity> {
        if self.sync_transform(screenshot).is_err() {
            return Vec::new();
        }
        RegionCatalog::all_board_cells()
            .into_iter()
            .filter_map(|cell| self.recognize_in_region(screenshot, cell, EntityKind::Hero, None))
            .collect()
    }

    pub fn recognize_items(&mut self, screenshot: &RgbImage) -> Vec<RecognizedEntity> {
        if self.sync_transform(screenshot).is_err() {
            return Vec::new();
        }
        (0..10)
            .filter_map(|i| RegionCatalog::item_slot(i).ok())
            .enumerate()
            .filter_map(|(idx, region)| self.recognize_in_region(screenshot, region, EntityKind::Item, Some(idx)))
            .collect()
    }

    /// Recognizes active synergy badges, sorted top-to-bottom.
    pub fn recognize_synergies(&mut self, screenshot: &RgbImage) -> Vec<RecognizedEntity> {
        if self.sync_transform(screenshot).is_err() {
            return Vec::new();
        }
        let mut results = Vec::new();
        for idx in 0..10 {
            let Ok(badge) = RegionCatalog::synergy_badge(idx) else { continue };
            let scaled = badge.scale(&self.transform);
            let Some(cropped) = safe_crop(screenshot, scaled) else { continue };
            let gray = image::DynamicImage::ImageRgb8(cropped).to_luma8();

            for id in self.registry.list_ids(EntityKind::Synergy) {
                let Some(path) = self.registry.get_template_path(EntityKind::Synergy, &id) else { continue };
                let full = self.template_root.join(path);
                if !full.exists() {
                    continue;
                }
                if !self.matcher.has_template(&id) {
                    let _ = self.matcher.add_template(&full, Some(&id));
                }
                if let Some(m) = self.matcher.match_template(&gray, &id, Some(self.template_threshold), None) {
                    let global = (
                        scaled.x + m.x as i32,
                        scaled.y + m.y as i32,
                        scaled.x + m.x as i32 + m.width as i32,
                        scaled.y + m.y as i32 + m.height as i32,
                    );
                    results.push(RecognizedEntity {
                        kind: EntityKind::Synergy,
                        id,
                        confidence: m.confidence,
                        method: RecognitionMethod::Template,
                        bbox_global: global,
                        slot_index: None,
                    });
                }
            }
        }
        results.sort_by_key(|e| e.bbox_global.1);
        results
    }

    /// Recognizes gold and level from their fixed display regions,
    /// upscaling 3x before OCR for better digit recognition.
    pub fn recognize_player_info(&mut self, screenshot: &RgbImage) -> (Option<i32>, Option<i32>) {
        if self.sync_transform(screenshot).is_err() {
            return (None, None);
        }
        let gold = self.recognize_number_region(screenshot, RegionCatalog::gold_display());
        let level = self.recognize_number_region(screenshot, RegionCatalog::level_display());
        (gold, level)
    }

    fn recognize_number_region(&self, screenshot: &RgbImage, region: UIRegion) -> Option<i32> {
        let scaled = region.scale(&self.transform);
        let cropped = safe_crop(screenshot, scaled)?;
        let big = imageops::resize(&cropped, cropped.width() * 3, cropped.height() * 3, imageops::FilterType::Lanczos3);
        self.ocr.recognize_number(&big, None)
    }

    fn recognize_in_region(
        &mut self,
        screenshot: &RgbImage,
        region: UIRegion,
        kind: EntityKind,
        slot_index: Option<usize>,
    ) -> Option<RecognizedEntity> {
        let scaled = region.scale(&self.transform);
        let cropped = safe_crop(screenshot, scaled)?;

        let template_result = self.match_template_in(&cropped, kind);
        let ocr_result = self.recognize_ocr_in(&cropped, kind);

        fuse_results(template_result, ocr_result, scaled, kind, slot_index)
    }

    fn match_template_in(&mut self, cropped: &RgbImage, kind: EntityKind) -> Option<LocalMatch> {
        let gray = image::DynamicImage::ImageRgb8(cropped.clone()).to_luma8();
        let mut best: Option<LocalMatch> = None;
        for id in self.registry.list_ids(kind) {
            let Some(path) = self.registry.get_template_path(kind, &id) else { continue };
            let full = self.template_root.join(path);
            if !full.exists() {
                continue;
            }
            if !self.matcher.has_template(&id) {
                let _ = self.matcher.add_template(&full, Some(&id));
            }
            if let Some(m) = self.matcher.match_template(&gray, &id, Some(self.template_threshold), None) {
                let better = best.as_ref().map(|b| m.confidence > b.confidence).unwrap_or(true);
                if better {
                    best = Some(LocalMatch {
                        name: id,
                        confidence: m.confidence,
                        local_bbox: (m.x as i32, m.y as i32, (m.x + m.width) as i32, (m.y + m.height) as i32),
                    });
                }
            }
        }
        best
    }

    fn recognize_ocr_in(&self, cropped: &RgbImage, _kind: EntityKind) -> Option<LocalMatch> {
        let results = self.ocr.recognize(cropped, None);
        for result in &results {
            if result.confidence < self.ocr_confidence_threshold {
                continue;
            }
            if let Some((_, id)) = self.registry.lookup_by_ocr(&result.text) {
                return Some(LocalMatch { name: id, confidence: result.confidence, local_bbox: result.bbox });
            }
            if let Some((_, id)) = self.registry.lookup_by_ocr_fuzzy(&result.text, 0.7) {
                return Some(LocalMatch { name: id, confidence: result.confidence * 0.9, local_bbox: result.bbox });
            }
        }
        None
    }
}

fn fuse_results(
    template_result: Option<LocalMatch>,
    ocr_result: Option<LocalMatch>,
    region: Rect,
    kind: EntityKind,
    slot_index: Option<usize>,
) -> Option<RecognizedEntity> {
    let globalize = |local: (i32, i32, i32, i32)| {
        (region.x + local.0, region.y + local.1, region.x + local.2, region.y + local.3)
    };

    match (template_result, ocr_result) {
        (None, None) => None,
        (None, Some(o)) => Some(RecognizedEntity {
            kind,
            id: o.name,
            confidence: o.confidence,
            method: RecognitionMethod::Ocr,
            bbox_global: globalize(o.local_bbox),
            slot_index,
        }),
        (Some(t), None) => Some(RecognizedEntity {
            kind,
            id: t.name,
            confidence: t.confidence,
            method: RecognitionMethod::Template,
            bbox_global: globalize(t.local_bbox),
            slot_index,
        }),
        (Some(t), Some(o)) if t.name == o.name => Some(RecognizedEntity {
            kind,
            id: t.name,
            confidence: (t.confidence + o.confidence) / 2.0 + 0.1,
            method: RecognitionMethod::Hybrid,
            bbox_global: globalize(t.local_bbox),
            slot_index,
        })
        .map(|mut e| {
            e.confidence = e.confidence.min(1.0);
            e
        }),
        (Some(t), Some(o)) => {
            if t.confidence >= o.confidence {
                Some(RecognizedEntity {
                    kind,
                    id: t.name,
                    confidence: t.confidence,
                    method: RecognitionMethod::Template,
                    bbox_global: globalize(t.local_bbox),
                    slot_index,
                })
            } else {
                Some(RecognizedEntity {
                    kind,
                    id: o.name,
                    confidence: o.confidence,
                    method: RecognitionMethod::Ocr,
                    bbox_global: globalize(o.local_bbox),
                    slot_index,
                })
            }
        }
    }
}

/// Crops `rect` out of `image`, clamping to the image bounds. Returns
/// `None` if the clamped rect is degenerate.
fn safe_crop(image: &RgbImage, rect: Rect) -> Option<RgbImage> {
    let (iw, ih) = (image.width() as i32, image.height() as i32);
    let x0 = rect.x.clamp(0, iw);
    let y0 = rect.y.clamp(0, ih);
    let x1 = (rect.x + rect.width as i32).clamp(0, iw);
    let y1 = (rect.y + rect.height as i32).clamp(0, ih);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(imageops::crop_imm(image, x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::ocr_engine::testing::MockOcrBackend;
    use crate::vision::ocr_engine::OcrResult;
    use crate::vision::template_registry::TemplateEntry;

    fn engine_with_empty_registry() -> RecognitionEngine {
        RecognitionEngine::new(TemplateRegistry::new(), TemplateMatcher::new(0.75), OcrEngine::default(), "/nonexistent")
            .unwrap()
    }

    #[test]
    fn shop_recognition_returns_five_slots_all_none_without_templates() {
        let mut engine = engine_with_empty_registry();
        let screenshot = RgbImage::new(1920, 1080);
        let results = engine.recognize_shop(&screenshot);
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.is_none()));
    }

    #[test]
    fn board_recognition_returns_empty_without_templates() {
        let mut engine = engine_with_empty_registry();
        let screenshot = RgbImage::new(1920, 1080);
        assert!(engine.recognize_board(&screenshot).is_empty());
    }

    #[test]
    fn ocr_only_result_is_tagged_ocr_method() {
        let mut registry = TemplateRegistry::new();
        registry.register(TemplateEntry::new(EntityKind::Hero, "ahri", "heroes/ahri.png"));
        let backend = MockOcrBackend {
            canned: vec![OcrResult { text: "ahri".to_string(), confidence: 0.8, bbox: (0, 0, 10, 10) }],
        };
        let mut engine = RecognitionEngine::new(
            registry,
            TemplateMatcher::new(0.75),
            OcrEngine::new(Some(Box::new(backend))),
            "/nonexistent",
        )
        .unwrap();
        let screenshot = RgbImage::new(1920, 1080);
        let results = engine.recognize_shop(&screenshot);
        let first = results[0].as_ref().expect("expected ocr-only match");
        assert_eq!(first.method, RecognitionMethod::Ocr);
        assert_eq!(first.id, "ahri");
    }

    #[test]
    fn fuse_results_prefers_higher_confidence_on_disagreement() {
        let region = Rect::new(100, 100, 50, 50);
        let t = LocalMatch { name: "ahri".to_string(), confidence: 0.9, local_bbox: (0, 0, 10, 10) };
        let o = LocalMatch { name: "lux".to_string(), confidence: 0.5, local_bbox: (0, 0, 10, 10) };
        let fused = fuse_results(Some(t), Some(o), region, EntityKind::Hero, None).unwrap();
        assert_eq!(fused.id, "ahri");
        assert_eq!(fused.method, RecognitionMethod::Template);
    }

    #[test]
    fn fuse_results_hybrid_on_agreement() {
        let region = Rect::new(0, 0, 50, 50);
        let t = LocalMatch { name: "ahri".to_string(), confidence: 0.8, local_bbox: (0, 0, 10, 10) };
        let o = LocalMatch { name: "ahri".to_string(), confidence: 0.7, local_bbox: (0, 0, 10, 10) };
        let fused = fuse_results(Some(t), Some(o), region, EntityKind::Hero, Some(2)).unwrap();
        assert_eq!(fused.method, RecognitionMethod::Hybrid);
        assert!((fused.confidence - 0.85).abs() < 1e-9);
        assert_eq!(fused.slot_index, Some(2));
    }
}
