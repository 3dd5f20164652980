//! Set-of-Mark annotation: draws numbered boxes over UI regions so a VLM
//! can refer to elements by id instead of raw coordinates.
//!
//! Label glyphs are not rendered (no bundled font), so annotation draws
//! colored bounding boxes only; the numeric id and label text still ride
//! along in each [`Region`] for the prompt text the image accompanies.

use std::collections::HashMap;

use image::{Rgb, RgbImage};

/// A single annotated region: a numbered box with an optional label.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: u32,
    pub bbox: (i32, i32, i32, i32),
    pub label: Option<String>,
    pub color: RegionColor,
}

impl Region {
    pub fn new(id: u32, bbox: (i32, i32, i32, i32)) -> Self {
        Self { id, bbox, label: None, color: RegionColor::Red }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_color(mut self, color: RegionColor) -> Self {
        self.color = color;
        self
    }

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionColor {
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    Orange,
    White,
}

impl RegionColor {
    pub fn rgb(&self) -> Rgb<u8> {
        match self {
            Self::Red => Rgb([255, 0, 0]),
            Self::Green => Rgb([0, 255, 0]),
            Self::Blue => Rgb([0, 0, 255]),
            Self::Yellow => Rgb([255, 255, 0]),
            Self::Cyan => Rgb([0, 255, 255]),
            Self::Magenta => Rgb([255, 0, 255]),
            Self::Orange => Rgb([255, 165, 0]),
            Self::White => Rgb([255, 255, 255]),
        }
    }
}

/// Draws numbered bounding boxes on a copy of the input image.
#[derive(Debug, Clone)]
pub struct SoMAnnotator {
    pub box_width: u32,
}

impl Default for SoMAnnotator {
    fn default() -> Self {
        Self { box_width: 2 }
    }
}

impl SoMAnnotator {
    pub fn new(box_width: u32) -> Self {
        Self { box_width: box_width.max(1) }
    }

    pub fn annotate(&self, image: &RgbImage, regions: &[Region]) -> RgbImage {
        let mut out = image.clone();
        for region in regions {
            draw_rect_border(&mut out, region.bbox, region.color.rgb(), self.box_width);
        }
        out
    }

    /// Annotates an evenly-spaced `rows` x `cols` grid over the full image.
    pub fn annotate_grid(&self, image: &RgbImage, rows: u32, cols: u32, start_id: u32) -> (RgbImage, Vec<Region>) {
        let (w, h) = image.dimensions();
        let cell_w = (w / cols).max(1);
        let cell_h = (h / rows).max(1);
        let mut regions = Vec::with_capacity((rows * cols) as usize);
        let mut id = start_id;
        for row in 0..rows {
            for col in 0..cols {
                let x1 = (col * cell_w) as i32;
                let y1 = (row * cell_h) as i32;
                regions.push(Region::new(id, (x1, y1, x1 + cell_w as i32, y1 + cell_h as i32)).with_label(format!("({row},{col})")).with_color(RegionColor::Green));
                id += 1;
            }
        }
        (self.annotate(image, &regions), regions)
    }

    /// Heuristic full-interface annotation: gold/level badges, shop slots,
    /// and board cells, numbered in that order. Layout is proportional to
    /// the image's own dimensions, not the base resolution, since this is
    /// meant to run directly on a live screenshot.
    pub fn create_full_annotation(&self, image: &RgbImage) -> (RgbImage, HashMap<&'static str, Vec<Region>>) {
        let (w, h) = image.dimensions();
        let mut groups: HashMap<&'static str, Vec<Region>> = HashMap::new();
        let mut next_id = 1u32;

        let gold = Region::new(next_id, (w as i32 - 150, 10, w as i32 - 50, 40))
            .with_label("gold")
            .with_color(RegionColor::Yellow);
        next_id += 1;
        let level = Region::new(next_id, (w as i32 - 150, 90, w as i32 - 50, 120))
            .with_label("level")
            .with_color(RegionColor::Blue);
        next_id += 1;
        groups.insert("gold", vec![gold]);
        groups.insert("level", vec![level]);

        let shop_height = (h as f64 * 0.1) as i32;
        let shop_top = h as i32 - shop_height - (h as f64 * 0.05) as i32;
        let slot_width = w as i32 / 5;
        let mut shop = Vec::with_capacity(5);
        for i in 0..5 {
            let x1 = i * slot_width;
            shop.push(
                Region::new(next_id, (x1, shop_top, x1 + slot_width, shop_top + shop_height))
                    .with_label(format!("shop{}", i + 1))
                    .with_color(RegionColor::Yellow),
            );
            next_id += 1;
        }
        groups.insert("shop", shop);

        let board_width = (w as f64 * 0.7) as i32;
        let board_height = (h as f64 * 0.35) as i32;
        let board_left = (w as i32 - board_width) / 2;
        let board_top = (h as f64 * 0.45) as i32;
        let cell_w = board_width / 7;
        let cell_h = board_height / 4;
        let mut board = Vec::with_capacity(28);
        for row in 0..4 {
            for col in 0..7 {
                let x1 = board_left + col * cell_w;
                let y1 = board_top + row * cell_h;
                board.push(
                    Region::new(next_id, (x1, y1, x1 + cell_w, y1 + cell_h))
                        .with_label(format!("({row},{col})"))
                        .with_color(RegionColor::Green),
                );
                next_id += 1;
            }
        }
        groups.insert("board", board);

        let all: Vec<Region> = groups.values().flatten().cloned().collect();
        (self.annotate(image, &all), groups)
    }
}

fn draw_rect_border(image: &mut RgbImage, bbox: (i32, i32, i32, i32), color: Rgb<u8>, width: u32) {
    let (iw, ih) = (image.width() as i32, image.height() as i32);
    let (x1, y1, x2, y2) = bbox;
    let x1 = x1.clamp(0, iw - 1);
    let y1 = y1.clamp(0, ih - 1);
    let x2 = x2.clamp(0, iw - 1);
    let y2 = y2.clamp(0, ih - 1);
    let width = width as i32;

    for dx in 0..width {
        draw_vertical_line(image, x1 + dx, y1, y2, color);
        draw_vertical_line(image, x2 - dx, y1, y2, color);
    }
    for dy in 0..width {
        draw_horizontal_line(image, y1 + dy, x1, x2, color);
        draw_horizontal_line(image, y2 - dy, x1, x2, color);
    }
}

fn draw_horizontal_line(image: &mut RgbImage, y: i32, x1: i32, x2: i32, color: Rgb<u8>) {
    if y < 0 || y >= image.height() as i32 {
        return;
    }
    for x in x1.max(0)..=x2.min(image.width() as i32 - 1) {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_vertical_line(image: &mut RgbImage, x: i32, y1: i32, y2: i32, color: Rgb<u8>) {
    if x < 0 || x >= image.width() as i32 {
        return;
    }
    for y in y1.max(0)..=y2.min(image.height() as i32 - 1) {
        image.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_draws_border_without_mutating_interior() {
        let image = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let annotator = SoMAnnotator::new(1);
        let region = Region::new(1, (2, 2, 10, 10)).with_color(RegionColor::Red);
        let annotated = annotator.annotate(&image, &[region]);
        assert_eq!(*annotated.get_pixel(2, 2), Rgb([255, 0, 0]));
        assert_eq!(*annotated.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn annotate_grid_produces_rows_times_cols_regions() {
        let image = RgbImage::from_pixel(140, 80, Rgb([0, 0, 0]));
        let annotator = SoMAnnotator::default();
        let (_, regions) = annotator.annotate_grid(&image, 4, 7, 1);
        assert_eq!(regions.len(), 28);
        assert_eq!(regions[0].id, 1);
        assert_eq!(regions.last().unwrap().id, 28);
    }

    #[test]
    fn full_annotation_covers_expected_groups() {
        let image = RgbImage::from_pixel(1920, 1080, Rgb([10, 10, 10]));
        let annotator = SoMAnnotator::default();
        let (_, groups) = annotator.create_full_annotation(&image);
        assert_eq!(groups.get("shop").unwrap().len(), 5);
        assert_eq!(groups.get("board").unwrap().len(), 28);
        assert_eq!(groups.get("gold").unwrap().len(), 1);
    }
}
