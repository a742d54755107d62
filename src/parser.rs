//! Turn a glyph run into a numeric value
//!
//! Horizontal runs read left to right. Vertical runs read bottom to top,
//! which is how the drawings render vertical dimension text.

use crate::config::AnalysisConfig;
use crate::glyph::Glyph;
use crate::tokens::Axis;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// A dimension number as printed on the drawing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumberValue {
    Integer(u32),
    Decimal(f64),
}

impl NumberValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            NumberValue::Integer(v) => *v as f64,
            NumberValue::Decimal(v) => *v,
        }
    }

    pub fn is_decimal(&self) -> bool {
        matches!(self, NumberValue::Decimal(_))
    }

    /// Numeric order; `504` and `504.0` compare equal
    pub fn cmp_value(&self, other: &NumberValue) -> Ordering {
        self.as_f64().total_cmp(&other.as_f64())
    }

    pub fn same_value(&self, other: &NumberValue) -> bool {
        self.cmp_value(other) == Ordering::Equal
    }
}

impl fmt::Display for NumberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberValue::Integer(v) => write!(f, "{}", v),
            NumberValue::Decimal(v) if v.fract() == 0.0 => write!(f, "{:.1}", v),
            NumberValue::Decimal(v) => write!(f, "{}", v),
        }
    }
}

/// Order glyphs the way the number is read along `axis`
pub fn reading_order<'a>(glyphs: &[&'a Glyph], axis: Axis) -> Vec<&'a Glyph> {
    let mut ordered = glyphs.to_vec();
    match axis {
        Axis::Horizontal => ordered.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0)),
        Axis::Vertical => ordered.sort_by(|a, b| b.bbox.top.total_cmp(&a.bbox.top)),
    }
    ordered
}

/// Parse the concatenated text of a run
///
/// Decimals need exactly one inner dot and must lie in
/// `[min_decimal_value, max_value]`; integers must lie in `(0, max_value]`.
/// Anything else is rejected, never clamped.
pub fn parse_text(text: &str, config: &AnalysisConfig) -> Option<NumberValue> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    if text.contains('.') {
        if text.matches('.').count() != 1 || text.starts_with('.') || text.ends_with('.') {
            return None;
        }
        let value: f64 = text.parse().ok()?;
        if (config.min_decimal_value..=config.max_value).contains(&value) {
            return Some(NumberValue::Decimal(value));
        }
        return None;
    }

    let value: u32 = text.parse().ok()?;
    if value > 0 && value as f64 <= config.max_value {
        Some(NumberValue::Integer(value))
    } else {
        None
    }
}

/// Parse a multi-glyph run read along `axis`
pub fn parse_token(glyphs: &[&Glyph], axis: Axis, config: &AnalysisConfig) -> Option<NumberValue> {
    if glyphs.len() < 2 {
        return None;
    }
    let text: String = reading_order(glyphs, axis).iter().map(|g| g.text).collect();
    let parsed = parse_text(&text, config);
    if parsed.is_none() {
        log::trace!("rejected run {:?}", text);
    }
    parsed
}

/// A lone digit is taken as an integer as-is
pub fn parse_single(glyph: &Glyph, config: &AnalysisConfig) -> Option<NumberValue> {
    let digit = glyph.text.to_digit(10)?;
    if digit > 0 && digit as f64 <= config.max_value {
        Some(NumberValue::Integer(digit))
    } else {
        None
    }
}
