//! Resolution-independent coordinate mapping with letterbox inference.
//!
//! Maps base-resolution (1920x1080) coordinates to the current window's
//! coordinates and back, inferring a centered letterbox content rect when
//! the window's aspect ratio differs from the base.

use crate::error::GeometryError;

/// A pixel size (width, height).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

fn validate_size(size: Size) -> Result<(), GeometryError> {
    if size.width == 0 || size.height == 0 {
        return Err(GeometryError::InvalidGeometry(format!(
            "non-positive size {}x{}",
            size.width, size.height
        )));
    }
    Ok(())
}

/// The largest base-aspect-ratio rect centered inside `current`.
pub fn infer_letterbox_content_rect(base: Size, current: Size) -> Rect {
    let scale = (current.width as f64 / base.width as f64)
        .min(current.height as f64 / base.height as f64);
    let content_w = ((base.width as f64 * scale) as u32).max(1);
    let content_h = ((base.height as f64 * scale) as u32).max(1);
    let offset_x = current.width.saturating_sub(content_w) / 2;
    let offset_y = current.height.saturating_sub(content_h) / 2;
    Rect::new(offset_x as i32, offset_y as i32, content_w, content_h)
}

/// Maps points/sizes/rects between the base resolution and a current
/// window resolution, caching scale and offset at construction.
#[derive(Debug, Clone, Copy)]
pub struct CoordinateTransform {
    base: Size,
    current: Size,
    content_rect: Rect,
    scale_x: f64,
    scale_y: f64,
}

impl CoordinateTransform {
    /// Constructs a transform. If `content_rect` is `None`, a centered
    /// letterbox rect is inferred.
    pub fn new(
        base: Size,
        current: Size,
        content_rect: Option<Rect>,
    ) -> Result<Self, GeometryError> {
        validate_size(base)?;
        validate_size(current)?;
        let content_rect = content_rect.unwrap_or_else(|| infer_letterbox_content_rect(base, current));
        if content_rect.x < 0
            || content_rect.y < 0
            || (content_rect.x as i64 + content_rect.width as i64) > current.width as i64
            || (content_rect.y as i64 + content_rect.height as i64) > current.height as i64
        {
            return Err(GeometryError::InvalidGeometry(
                "content rect escapes current window bounds".to_string(),
            ));
        }
        let scale_x = content_rect.width as f64 / base.width as f64;
        let scale_y = content_rect.height as f64 / base.height as f64;
        Ok(Self {
            base,
            current,
            content_rect,
            scale_x,
            scale_y,
        })
    }

    pub fn base_size(&self) -> Size {
        self.base
    }

    pub fn current_size(&self) -> Size {
        self.current
    }

    pub fn content_rect(&self) -> Rect {
        self.content_rect
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    pub fn offset_x(&self) -> i32 {
        self.content_rect.x
    }

    pub fn offset_y(&self) -> i32 {
        self.content_rect.y
    }

    /// Maps a base-coordinate point to a current-coordinate point,
    /// truncating toward zero like the reference implementation.
    pub fn map_point(&self, x: f64, y: f64) -> (i32, i32) {
        let mx = self.offset_x() as f64 + x * self.scale_x;
        let my = self.offset_y() as f64 + y * self.scale_y;
        (mx as i32, my as i32)
    }

    /// Maps a base size to a current size, clamping each dimension to >= 1.
    pub fn map_size(&self, width: f64, height: f64) -> (u32, u32) {
        let w = ((width * self.scale_x) as i64).max(1) as u32;
        let h = ((height * self.scale_y) as i64).max(1) as u32;
        (w, h)
    }

    pub fn map_rect(&self, rect: Rect) -> Rect {
        let (x, y) = self.map_point(rect.x as f64, rect.y as f64);
        let (w, h) = self.map_size(rect.width as f64, rect.height as f64);
        Rect::new(x, y, w, h)
    }

    pub fn map_bbox(&self, bbox: (f64, f64, f64, f64)) -> (i32, i32, i32, i32) {
        let (x1, y1) = self.map_point(bbox.0, bbox.1);
        let (x2, y2) = self.map_point(bbox.2, bbox.3);
        (x1, y1, x2, y2)
    }

    /// Inverts `map_point`. Fails with `DegenerateTransform` if scale is zero.
    pub fn unmap_point(&self, x: i32, y: i32) -> Result<(f64, f64), GeometryError> {
        if self.scale_x == 0.0 || self.scale_y == 0.0 {
            return Err(GeometryError::DegenerateTransform);
        }
        let bx = (x as f64 - self.offset_x() as f64) / self.scale_x;
        let by = (y as f64 - self.offset_y() as f64) / self.scale_y;
        Ok((bx, by))
    }

    /// A diagnostics snapshot suitable for structured logging.
    pub fn diagnostics(&self) -> String {
        format!(
            "base={}x{} current={}x{} content_rect=({},{},{},{}) scale=({:.4},{:.4})",
            self.base.width,
            self.base.height,
            self.current.width,
            self.current.height,
            self.content_rect.x,
            self.content_rect.y,
            self.content_rect.width,
            self.content_rect.height,
            self.scale_x,
            self.scale_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_at_base_resolution() {
        let t = CoordinateTransform::new(Size::new(1920, 1080), Size::new(1920, 1080), None).unwrap();
        assert_eq!(t.map_point(100.0, 200.0), (100, 200));
        assert_eq!(t.content_rect(), Rect::new(0, 0, 1920, 1080));
    }

    #[test]
    fn letterbox_centers_narrower_window() {
        // current window is wider than base aspect ratio -> pillarbox left/right
        let t = CoordinateTransform::new(Size::new(1920, 1080), Size::new(2400, 1080), None).unwrap();
        assert!(t.offset_x() > 0);
        assert_eq!(t.offset_y(), 0);
    }

    #[test]
    fn map_unmap_roundtrip() {
        let t = CoordinateTransform::new(Size::new(1920, 1080), Size::new(1440, 810), None).unwrap();
        let (x, y) = t.map_point(960.0, 540.0);
        let (bx, by) = t.unmap_point(x, y).unwrap();
        assert!((bx - 960.0).abs() < 1.0);
        assert!((by - 540.0).abs() < 1.0);
    }

    #[test]
    fn map_size_never_below_one() {
        let t = CoordinateTransform::new(Size::new(1920, 1080), Size::new(100, 100), None).unwrap();
        let (w, h) = t.map_size(0.1, 0.1);
        assert!(w >= 1 && h >= 1);
    }

    #[test]
    fn invalid_geometry_rejected() {
        assert!(CoordinateTransform::new(Size::new(0, 1080), Size::new(1920, 1080), None).is_err());
        assert!(CoordinateTransform::new(Size::new(1920, 1080), Size::new(1920, 0), None).is_err());
    }

    #[test]
    fn content_rect_must_fit_inside_current() {
        let bad = Rect::new(0, 0, 5000, 5000);
        assert!(CoordinateTransform::new(Size::new(1920, 1080), Size::new(1920, 1080), Some(bad)).is_err());
    }
}
