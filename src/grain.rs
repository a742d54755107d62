//! GRAIN marker lookup
//!
//! A drawing may print `GRAIN` along the grain direction of the panel. Read
//! upside down or rotated it comes out as `NIARG`; both spellings count.

use crate::glyph::Glyph;
use crate::metrics::MeasuredToken;
use crate::text::group_into_lines;
use crate::tokens::Axis;
use serde::Serialize;

const MARKERS: [&str; 2] = ["GRAIN", "NIARG"];

/// A grain marker found on the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrainHint {
    /// Direction the grain runs in
    pub axis: Axis,
    /// Mean (x0, top) of the marker's line
    pub position: (f64, f64),
    pub text: String,
}

/// Every line carrying a grain marker
pub fn find_grain_hints(glyphs: &[Glyph]) -> Vec<GrainHint> {
    group_into_lines(glyphs)
        .into_iter()
        .filter_map(|line| {
            let text = line.text();
            let upper = text.to_uppercase();
            if !MARKERS.iter().any(|m| upper.contains(m)) {
                return None;
            }
            Some(GrainHint {
                axis: line.axis,
                position: line.centroid(),
                text,
            })
        })
        .collect()
}

/// The hint closest to any of `tokens`, if within `radius`
pub fn nearest_hint<'a>(
    hints: &'a [GrainHint],
    tokens: &[&MeasuredToken],
    radius: f64,
) -> Option<&'a GrainHint> {
    let mut best: Option<(&GrainHint, f64)> = None;

    for hint in hints {
        let (hx, hy) = hint.position;
        for token in tokens {
            let (tx, ty) = token.token.position;
            let distance = ((hx - tx).powi(2) + (hy - ty).powi(2)).sqrt();
            if distance <= radius && best.map_or(true, |(_, d)| distance < d) {
                best = Some((hint, distance));
            }
        }
    }

    best.map(|(hint, _)| hint)
}
