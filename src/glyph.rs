//! Page primitives handed over by the PDF layer
//!
//! Coordinates follow the top-down convention: `top` grows towards the bottom
//! of the page, so `top < bottom` for every glyph.

/// Axis-aligned bounding box in page units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).abs()
    }
}

/// A single positioned character
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// The character as decoded from the content stream
    pub text: char,
    pub bbox: BBox,
    /// Base font name (subset prefix included, e.g. `ABCDEF+CIDFont+F3`)
    pub font_name: String,
    /// Rendered size; for rotated glyphs this is the bbox height
    pub font_size: f64,
    /// False for rotated or mirrored glyphs
    pub upright: bool,
}

impl Glyph {
    pub fn new(text: char, bbox: BBox, font_name: impl Into<String>, font_size: f64) -> Self {
        Self {
            text,
            bbox,
            font_name: font_name.into(),
            font_size,
            upright: true,
        }
    }

    pub fn rotated(mut self) -> Self {
        self.upright = false;
        self
    }

    pub fn is_digit(&self) -> bool {
        self.text.is_ascii_digit()
    }

    pub fn is_decimal_point(&self) -> bool {
        self.text == '.'
    }

    /// Grouping origin: left edge and top edge of the box
    pub fn origin(&self) -> (f64, f64) {
        (self.bbox.x0, self.bbox.top)
    }

    pub fn distance_to(&self, other: &Glyph) -> f64 {
        let (ax, ay) = self.origin();
        let (bx, by) = other.origin();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }
}

/// A stroked straight segment
///
/// `y` grows downwards, in the same frame as glyph `top`/`bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl LineSegment {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn length(&self) -> f64 {
        ((self.x1 - self.x0).powi(2) + (self.y1 - self.y0).powi(2)).sqrt()
    }

    pub fn is_horizontal(&self, tolerance: f64) -> bool {
        (self.y1 - self.y0).abs() <= tolerance
    }

    pub fn is_vertical(&self, tolerance: f64) -> bool {
        (self.x1 - self.x0).abs() <= tolerance
    }
}

/// Everything the analysis needs from one page
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub glyphs: Vec<Glyph>,
    pub lines: Vec<LineSegment>,
    pub width: f64,
    pub height: f64,
}

impl PageContent {
    pub fn new(glyphs: Vec<Glyph>, lines: Vec<LineSegment>) -> Self {
        Self {
            glyphs,
            lines,
            width: 0.0,
            height: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let bbox = BBox::new(10.0, 20.0, 16.0, 30.0);
        assert_eq!(bbox.width(), 6.0);
        assert_eq!(bbox.height(), 10.0);
    }

    #[test]
    fn test_glyph_distance_uses_left_top_origin() {
        let a = Glyph::new('1', BBox::new(0.0, 0.0, 6.0, 10.0), "F1", 10.0);
        let b = Glyph::new('2', BBox::new(3.0, 4.0, 9.0, 14.0), "F1", 10.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_orientation() {
        let line = LineSegment::new(0.0, 10.0, 100.0, 10.4);
        assert!(line.is_horizontal(0.5));
        assert!(!line.is_vertical(0.5));
    }
}
