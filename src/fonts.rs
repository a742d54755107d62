//! Font classification and dimension-font resolution
//!
//! Drawings mix the call-out font with many annotation fonts, so plain
//! frequency counting is not enough. The resolver ranks fonts with a static
//! priority table first and only falls back to frequency and position when
//! no known call-out font is present.

use crate::config::{AnalysisConfig, TRIPLET_FREQUENCY};
use crate::glyph::Glyph;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Stroke weight guessed from the font name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FontWeight {
    Bold,
    Light,
    Medium,
    Regular,
}

impl FontWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontWeight::Bold => "Bold",
            FontWeight::Light => "Light",
            FontWeight::Medium => "Medium",
            FontWeight::Regular => "Regular",
        }
    }
}

/// Derive the weight from keywords in the font name
pub fn font_weight(font_name: &str) -> FontWeight {
    let lower = font_name.to_lowercase();
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if has_any(&["bold", "black", "heavy"]) {
        FontWeight::Bold
    } else if has_any(&["light", "thin"]) {
        FontWeight::Light
    } else if has_any(&["medium", "semi"]) {
        FontWeight::Medium
    } else {
        FontWeight::Regular
    }
}

/// Priority of a font for dimension call-outs; 0 when the font is unknown
///
/// Table entries are matched as substrings of the font name. A bare resource
/// name equal to the entry's last `+` segment matches too, so `F3` hits
/// `CIDFont+F3`.
pub fn font_priority(font_name: &str, config: &AnalysisConfig) -> i32 {
    config
        .font_priorities
        .iter()
        .find(|(fragment, _)| {
            font_name.contains(fragment.as_str())
                || fragment.rsplit('+').next() == Some(font_name)
        })
        .map(|(_, priority)| *priority)
        .unwrap_or(0)
}

/// Pick the font most likely used for the dimension labels
///
/// Returns `None` when no font qualifies.
pub fn resolve_dimension_font(glyphs: &[Glyph], config: &AnalysisConfig) -> Option<String> {
    let fonts: BTreeSet<&str> = glyphs
        .iter()
        .filter(|g| g.is_digit() || g.is_decimal_point())
        .map(|g| g.font_name.as_str())
        .collect();

    if fonts.is_empty() {
        return None;
    }

    let digits: Vec<&Glyph> = glyphs
        .iter()
        .filter(|g| g.is_digit() && !config.is_noise_size(g.font_size))
        .collect();

    let preferred: Vec<(&str, i32)> = fonts
        .iter()
        .map(|font| (*font, font_priority(font, config)))
        .filter(|(_, priority)| *priority > 0)
        .collect();

    if !preferred.is_empty() {
        let mut by_font: BTreeMap<&str, Vec<&Glyph>> = BTreeMap::new();
        for glyph in &digits {
            if preferred.iter().any(|(font, _)| *font == glyph.font_name) {
                by_font.entry(glyph.font_name.as_str()).or_default().push(glyph);
            }
        }

        let total: usize = by_font.values().map(Vec::len).sum();
        if total >= TRIPLET_FREQUENCY && by_font.len() >= 2 {
            log::debug!("dimension font: {} preferred fonts, breaking tie by position", by_font.len());
            return pick_by_position(&by_font);
        }

        let mut best = preferred[0];
        for candidate in &preferred[1..] {
            if candidate.1 > best.1 {
                best = *candidate;
            }
        }
        return Some(best.0.to_string());
    }

    let mut frequencies: BTreeMap<&str, Vec<&Glyph>> = BTreeMap::new();
    for glyph in &digits {
        if font_priority(&glyph.font_name, config) < 0 {
            continue;
        }
        frequencies.entry(glyph.font_name.as_str()).or_default().push(glyph);
    }

    let triplet_fonts: BTreeMap<&str, Vec<&Glyph>> = frequencies
        .iter()
        .filter(|(_, glyphs)| glyphs.len() == TRIPLET_FREQUENCY)
        .map(|(font, glyphs)| (*font, glyphs.clone()))
        .collect();

    match triplet_fonts.len() {
        0 => {}
        1 => return triplet_fonts.keys().next().map(|f| f.to_string()),
        _ => {
            if let Some(font) = pick_by_position(&triplet_fonts) {
                return Some(font);
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (font, glyphs) in &frequencies {
        if glyphs.len() < TRIPLET_FREQUENCY {
            continue;
        }
        if best.map_or(true, |(_, count)| glyphs.len() > count) {
            best = Some((font, glyphs.len()));
        }
    }
    best.map(|(font, _)| font.to_string())
}

/// Font whose glyphs sit at the largest mean `top`, then the largest mean `x0`
fn pick_by_position(by_font: &BTreeMap<&str, Vec<&Glyph>>) -> Option<String> {
    let mut best: Option<(&str, f64, f64)> = None;

    for (font, glyphs) in by_font {
        if glyphs.is_empty() {
            continue;
        }
        let n = glyphs.len() as f64;
        let mean_x = glyphs.iter().map(|g| g.bbox.x0).sum::<f64>() / n;
        let mean_y = glyphs.iter().map(|g| g.bbox.top).sum::<f64>() / n;

        let better = match best {
            None => true,
            Some((_, bx, by)) => mean_y
                .total_cmp(&by)
                .then(mean_x.total_cmp(&bx))
                .is_gt(),
        };
        if better {
            best = Some((font, mean_x, mean_y));
        }
    }

    best.map(|(font, _, _)| font.to_string())
}
