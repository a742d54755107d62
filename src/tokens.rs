//! Cluster digit glyphs into number tokens
//!
//! Candidates are the digits and decimal points of the page. Each unused
//! glyph, taken in (top, x0) order, seeds a run and absorbs every other unused
//! glyph that passes the grouping predicate against the seed and the run so far.

use crate::config::AnalysisConfig;
use crate::fonts::{font_weight, FontWeight};
use crate::glyph::Glyph;
use crate::parser::{parse_single, parse_token, reading_order, NumberValue};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Principal reading axis of a glyph run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Reading direction of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
    /// One glyph, axis undetermined
    Single,
}

impl Orientation {
    pub fn axis(&self) -> Option<Axis> {
        match self {
            Orientation::Horizontal => Some(Axis::Horizontal),
            Orientation::Vertical => Some(Axis::Vertical),
            Orientation::Single => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Horizontal => "Horizontal",
            Orientation::Vertical => "Vertical",
            Orientation::Single => "Single",
        }
    }
}

impl From<Axis> for Orientation {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => Orientation::Horizontal,
            Axis::Vertical => Orientation::Vertical,
        }
    }
}

/// A run of glyphs read as one number
#[derive(Debug, Clone)]
pub struct NumberToken {
    pub value: NumberValue,
    pub orientation: Orientation,
    /// Member glyphs in reading order
    pub members: Vec<Glyph>,
    /// Majority font of the members
    pub font_name: String,
    pub font_weight: FontWeight,
    /// Mean (x0, top) of the members
    pub position: (f64, f64),
}

impl NumberToken {
    pub fn digits(&self) -> impl Iterator<Item = &Glyph> {
        self.members.iter().filter(|g| g.is_digit())
    }
}

/// Principal axis of a run: vertical when the height span dominates
pub fn principal_axis(glyphs: &[&Glyph], config: &AnalysisConfig) -> Axis {
    let span = |f: fn(&Glyph) -> f64| {
        let (min, max) = glyphs
            .iter()
            .map(|g| f(g))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if min.is_finite() {
            max - min
        } else {
            0.0
        }
    };
    let x_span = span(|g| g.bbox.x0);
    let y_span = span(|g| g.bbox.top);

    if y_span > x_span * config.vertical_axis_ratio {
        Axis::Vertical
    } else {
        Axis::Horizontal
    }
}

/// Whether `other` may join the run seeded by `seed`
fn should_group(seed: &Glyph, other: &Glyph, run: &[&Glyph], config: &AnalysisConfig) -> bool {
    let distance = seed.distance_to(other);
    if distance > config.glyph_cutoff {
        return false;
    }
    if seed.font_name != other.font_name && distance > config.mixed_font_cutoff {
        return false;
    }

    if run.len() > 1 {
        let n = run.len() as f64;
        match principal_axis(run, config) {
            Axis::Vertical => {
                let center_x = run.iter().map(|g| g.bbox.x0).sum::<f64>() / n;
                if (other.bbox.x0 - center_x).abs() > config.vertical_perpendicular_tolerance {
                    return false;
                }
            }
            Axis::Horizontal => {
                let center_y = run.iter().map(|g| g.bbox.top).sum::<f64>() / n;
                if (other.bbox.top - center_y).abs() > config.horizontal_perpendicular_tolerance {
                    return false;
                }
            }
        }
    }

    true
}

/// Total order on glyphs used to seed runs deterministically
fn glyph_order(a: &Glyph, b: &Glyph) -> Ordering {
    a.bbox
        .top
        .total_cmp(&b.bbox.top)
        .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        .then(a.bbox.bottom.total_cmp(&b.bbox.bottom))
        .then(a.bbox.x1.total_cmp(&b.bbox.x1))
        .then(a.text.cmp(&b.text))
        .then(a.font_name.cmp(&b.font_name))
        .then(a.font_size.total_cmp(&b.font_size))
}

/// Greedy spatial clustering of digit and decimal-point glyphs
pub fn cluster_glyphs<'a>(glyphs: &'a [Glyph], config: &AnalysisConfig) -> Vec<Vec<&'a Glyph>> {
    let mut candidates: Vec<&Glyph> = glyphs
        .iter()
        .filter(|g| (g.is_digit() || g.is_decimal_point()) && !config.is_noise_size(g.font_size))
        .collect();
    candidates.sort_by(|a, b| glyph_order(a, b));

    let mut used = vec![false; candidates.len()];
    let mut runs = Vec::new();

    for i in 0..candidates.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let seed = candidates[i];
        let mut run = vec![seed];

        for j in 0..candidates.len() {
            if used[j] {
                continue;
            }
            if should_group(seed, candidates[j], &run, config) {
                run.push(candidates[j]);
                used[j] = true;
            }
        }

        runs.push(run);
    }

    runs
}

/// Most frequent item; ties go to the first one seen
fn majority<T: Clone + Eq + std::hash::Hash>(items: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut order: Vec<T> = Vec::new();
    for item in items {
        let count = counts.entry(item.clone()).or_insert(0);
        if *count == 0 {
            order.push(item);
        }
        *count += 1;
    }

    let mut best: Option<(T, usize)> = None;
    for item in order {
        let count = counts[&item];
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((item, count));
        }
    }
    best.map(|(item, _)| item)
}

/// Build a token from a run, or reject it
fn token_from_run(run: &[&Glyph], config: &AnalysisConfig) -> Option<NumberToken> {
    match run {
        [] => None,
        [glyph] => {
            let value = parse_single(glyph, config)?;
            Some(NumberToken {
                value,
                orientation: Orientation::Single,
                members: vec![(*glyph).clone()],
                font_name: glyph.font_name.clone(),
                font_weight: font_weight(&glyph.font_name),
                position: glyph.origin(),
            })
        }
        _ => {
            let axis = principal_axis(run, config);
            let value = parse_token(run, axis, config)?;
            let n = run.len() as f64;

            Some(NumberToken {
                value,
                orientation: axis.into(),
                members: reading_order(run, axis).into_iter().cloned().collect(),
                font_name: majority(run.iter().map(|g| g.font_name.clone()))?,
                font_weight: majority(run.iter().map(|g| font_weight(&g.font_name)))?,
                position: (
                    run.iter().map(|g| g.bbox.x0).sum::<f64>() / n,
                    run.iter().map(|g| g.bbox.top).sum::<f64>() / n,
                ),
            })
        }
    }
}

/// All valid number tokens of a page
pub fn build_tokens(glyphs: &[Glyph], config: &AnalysisConfig) -> Vec<NumberToken> {
    let runs = cluster_glyphs(glyphs, config);
    let tokens: Vec<NumberToken> = runs
        .iter()
        .filter_map(|run| token_from_run(run, config))
        .collect();

    log::debug!(
        "{} glyph runs, {} valid number tokens",
        runs.len(),
        tokens.len()
    );
    tokens
}
