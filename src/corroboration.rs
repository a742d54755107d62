//! Line support for dimension tokens
//!
//! Dimension numbers sit next to a dimension line drawn parallel to them. The
//! share of tokens that have such a line is a confidence signal reported
//! next to the result; it does not influence grouping or assignment.

use crate::config::AnalysisConfig;
use crate::glyph::LineSegment;
use crate::metrics::MeasuredToken;
use crate::tokens::Axis;

/// Slack when deciding whether a segment is axis-aligned
const ALIGNMENT_TOLERANCE: f64 = 0.5;

/// Span of a token: (along-axis min, along-axis max, cross-axis center)
fn extent(token: &MeasuredToken, axis: Axis) -> (f64, f64, f64) {
    let members = &token.token.members;
    let (x, y) = token.token.position;
    if members.is_empty() {
        return match axis {
            Axis::Horizontal => (x, x, y),
            Axis::Vertical => (y, y, x),
        };
    }

    let n = members.len() as f64;
    match axis {
        Axis::Horizontal => (
            members.iter().map(|g| g.bbox.x0).fold(f64::INFINITY, f64::min),
            members.iter().map(|g| g.bbox.x1).fold(f64::NEG_INFINITY, f64::max),
            members.iter().map(|g| (g.bbox.top + g.bbox.bottom) / 2.0).sum::<f64>() / n,
        ),
        Axis::Vertical => (
            members.iter().map(|g| g.bbox.top).fold(f64::INFINITY, f64::min),
            members.iter().map(|g| g.bbox.bottom).fold(f64::NEG_INFINITY, f64::max),
            members.iter().map(|g| (g.bbox.x0 + g.bbox.x1) / 2.0).sum::<f64>() / n,
        ),
    }
}

/// Whether a line parallel to `axis` lies within `gap` of the token and
/// overlaps it along the axis
fn is_supported(token: &MeasuredToken, axis: Axis, lines: &[LineSegment], gap: f64) -> bool {
    let (start, end, cross) = extent(token, axis);

    lines.iter().any(|line| {
        let (lo, hi, offset) = match axis {
            Axis::Horizontal if line.is_horizontal(ALIGNMENT_TOLERANCE) => (
                line.x0.min(line.x1),
                line.x0.max(line.x1),
                (line.y0 + line.y1) / 2.0,
            ),
            Axis::Vertical if line.is_vertical(ALIGNMENT_TOLERANCE) => (
                line.y0.min(line.y1),
                line.y0.max(line.y1),
                (line.x0 + line.x1) / 2.0,
            ),
            _ => return false,
        };
        (offset - cross).abs() <= gap && lo <= end && hi >= start
    })
}

/// Fraction of `tokens` with a parallel dimension line nearby
///
/// Single-glyph tokens may be supported along either axis. Returns 0 for an
/// empty token list.
pub fn line_support(tokens: &[&MeasuredToken], lines: &[LineSegment], config: &AnalysisConfig) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }

    let gap = config.dimension_line_gap;
    let supported = tokens
        .iter()
        .filter(|t| match t.token.orientation.axis() {
            Some(axis) => is_supported(t, axis, lines, gap),
            None => {
                is_supported(t, Axis::Horizontal, lines, gap)
                    || is_supported(t, Axis::Vertical, lines, gap)
            }
        })
        .count();

    log::trace!("{} of {} tokens have a dimension line", supported, tokens.len());
    supported as f64 / tokens.len() as f64
}
