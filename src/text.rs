//! Rebuild reading lines from positioned glyphs
//!
//! Upright glyphs are merged into horizontal lines by their `top`; rotated
//! glyphs are merged into columns by their `x0` and read top to bottom, so
//! text rotated counter-clockwise comes out reversed (`NIARG`, `LIOF`).

use crate::glyph::Glyph;
use crate::tokens::Axis;

/// Same-line tolerance in page units
const LINE_TOLERANCE: f64 = 3.0;

/// Gap (in multiples of font size) that is read as a word break
const WORD_GAP_RATIO: f64 = 0.25;

/// A line of text (grouped glyphs)
#[derive(Debug, Clone)]
pub struct TextLine {
    pub glyphs: Vec<Glyph>,
    pub axis: Axis,
    /// `top` of horizontal lines, `x0` of vertical ones
    pub position: f64,
}

impl TextLine {
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut prev: Option<&Glyph> = None;

        for glyph in &self.glyphs {
            if let Some(p) = prev {
                let gap = match self.axis {
                    Axis::Horizontal => glyph.bbox.x0 - p.bbox.x1,
                    Axis::Vertical => glyph.bbox.top - p.bbox.bottom,
                };
                let size = p.font_size.min(glyph.font_size);
                if gap > size * WORD_GAP_RATIO && p.text != ' ' && glyph.text != ' ' {
                    out.push(' ');
                }
            }
            out.push(glyph.text);
            prev = Some(glyph);
        }

        out
    }

    /// Mean (x0, top) of the glyphs
    pub fn centroid(&self) -> (f64, f64) {
        let n = self.glyphs.len().max(1) as f64;
        (
            self.glyphs.iter().map(|g| g.bbox.x0).sum::<f64>() / n,
            self.glyphs.iter().map(|g| g.bbox.top).sum::<f64>() / n,
        )
    }
}

/// Group glyphs into horizontal lines (top to bottom) followed by vertical
/// columns (left to right)
pub fn group_into_lines(glyphs: &[Glyph]) -> Vec<TextLine> {
    let (upright, rotated): (Vec<&Glyph>, Vec<&Glyph>) = glyphs
        .iter()
        .filter(|g| !g.text.is_control())
        .partition(|g| g.upright);

    let mut lines = merge_runs(upright, Axis::Horizontal);
    lines.extend(merge_runs(rotated, Axis::Vertical));
    lines
}

/// Merge glyphs whose cross-axis coordinate is within tolerance of the
/// most recent line, then order each line along its axis
fn merge_runs(mut glyphs: Vec<&Glyph>, axis: Axis) -> Vec<TextLine> {
    let cross = |g: &Glyph| match axis {
        Axis::Horizontal => g.bbox.top,
        Axis::Vertical => g.bbox.x0,
    };
    let along = |g: &Glyph| match axis {
        Axis::Horizontal => g.bbox.x0,
        Axis::Vertical => g.bbox.top,
    };

    glyphs.sort_by(|a, b| {
        cross(*a)
            .total_cmp(&cross(*b))
            .then(along(*a).total_cmp(&along(*b)))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    for glyph in glyphs {
        match lines.last_mut() {
            Some(line) if (line.position - cross(glyph)).abs() < LINE_TOLERANCE => {
                line.glyphs.push(glyph.clone());
            }
            _ => lines.push(TextLine {
                glyphs: vec![glyph.clone()],
                axis,
                position: cross(glyph),
            }),
        }
    }

    for line in &mut lines {
        line.glyphs.sort_by(|a, b| along(a).total_cmp(&along(b)));
    }

    lines
}

/// Plain text of a page, one line per `TextLine`
pub fn page_text(glyphs: &[Glyph]) -> String {
    group_into_lines(glyphs)
        .iter()
        .map(|line| line.text())
        .collect::<Vec<_>>()
        .join("\n")
}
