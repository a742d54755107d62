//! Orientation-normalized token metrics
//!
//! Vertical tokens are rotated into the horizontal frame before measuring:
//! their mean glyph height becomes `char_width` and their mean glyph width
//! becomes `char_height`. Only digit glyphs are measured.

use crate::config::{round_to, AnalysisConfig};
use crate::glyph::Glyph;
use crate::tokens::{NumberToken, Orientation};
use serde::Serialize;

/// The eight scalars used to compare tokens
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TokenMetrics {
    pub font_size: f64,
    pub char_width: f64,
    pub char_height: f64,
    pub density_score: f64,
    pub distance_from_origin: f64,
    pub aspect_ratio: f64,
    pub char_spacing: f64,
    pub text_angle: f64,
}

impl TokenMetrics {
    pub fn is_finite(&self) -> bool {
        [
            self.font_size,
            self.char_width,
            self.char_height,
            self.density_score,
            self.distance_from_origin,
            self.aspect_ratio,
            self.char_spacing,
            self.text_angle,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// A token together with its metrics
#[derive(Debug, Clone)]
pub struct MeasuredToken {
    pub token: NumberToken,
    pub metrics: TokenMetrics,
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Compute the metrics of a token
///
/// Returns `None` when the mean digit font size is the noise sentinel; that
/// check runs before anything else is measured.
pub fn compute_metrics(token: &NumberToken, config: &AnalysisConfig) -> Option<TokenMetrics> {
    let digits: Vec<&Glyph> = token.digits().collect();
    let count = digits.len() as f64;

    let font_size = round_to(mean(digits.iter().map(|g| g.font_size)).unwrap_or(0.0), 1);
    if config.is_noise_size(font_size) {
        return None;
    }

    let is_vertical = token.orientation == Orientation::Vertical;

    let (char_width, char_height) = match (
        mean(digits.iter().map(|g| g.bbox.width())),
        mean(digits.iter().map(|g| g.bbox.height())),
    ) {
        (Some(w), Some(h)) if is_vertical => (round_to(h, 1), round_to(w, 1)),
        (Some(w), Some(h)) => (round_to(w, 1), round_to(h, 1)),
        _ => (0.0, 0.0),
    };

    let density_score = if char_width > 0.0 && char_height > 0.0 {
        let area = char_width * count * char_height;
        if area > 0.0 {
            round_to(count / area * 1000.0, 2)
        } else {
            0.0
        }
    } else {
        0.0
    };

    let (x, y) = token.position;
    let distance_from_origin = round_to((x * x + y * y).sqrt(), 1);

    let aspect_ratio = if char_height > 0.0 {
        round_to(char_width * count / char_height, 2)
    } else {
        0.0
    };

    let char_spacing = round_to(mean_spacing(&digits, is_vertical), 1);
    let text_angle = if is_vertical {
        0.0
    } else {
        round_to(baseline_angle(&digits), 1)
    };

    Some(TokenMetrics {
        font_size,
        char_width,
        char_height,
        density_score,
        distance_from_origin,
        aspect_ratio,
        char_spacing,
        text_angle,
    })
}

/// Mean gap between consecutive glyphs along the reading axis
fn mean_spacing(digits: &[&Glyph], is_vertical: bool) -> f64 {
    if digits.len() < 2 {
        return 0.0;
    }
    let mut sorted = digits.to_vec();
    if is_vertical {
        sorted.sort_by(|a, b| a.bbox.top.total_cmp(&b.bbox.top));
    } else {
        sorted.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    }

    let gaps = sorted.windows(2).map(|pair| {
        if is_vertical {
            (pair[1].bbox.top - pair[0].bbox.bottom).abs()
        } else {
            (pair[1].bbox.x0 - pair[0].bbox.x1).abs()
        }
    });
    mean(gaps).unwrap_or(0.0)
}

/// Angle in degrees of the line through the first and last glyph
fn baseline_angle(digits: &[&Glyph]) -> f64 {
    if digits.len() < 2 {
        return 0.0;
    }
    let mut sorted = digits.to_vec();
    sorted.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
    let first = sorted[0];
    let last = sorted[sorted.len() - 1];

    let dx = last.bbox.x0 - first.bbox.x0;
    let dy = last.bbox.top - first.bbox.top;
    if dx == 0.0 {
        0.0
    } else {
        dy.atan2(dx).to_degrees()
    }
}

/// Measure every token, dropping the noise-font ones
pub fn measure_tokens(tokens: Vec<NumberToken>, config: &AnalysisConfig) -> Vec<MeasuredToken> {
    let total = tokens.len();
    let measured: Vec<MeasuredToken> = tokens
        .into_iter()
        .filter_map(|token| {
            let metrics = compute_metrics(&token, config)?;
            Some(MeasuredToken { token, metrics })
        })
        .collect();

    if measured.len() < total {
        log::debug!("{} tokens dropped by the noise font size", total - measured.len());
    }
    measured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::glyph::BBox;
    use crate::tokens::build_tokens;

    fn row(text: &str, x: f64, top: f64, width: f64, gap: f64, size: f64) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f64 * (width + gap);
                Glyph::new(c, BBox::new(x0, top, x0 + width, top + 10.0), "F1", size)
            })
            .collect()
    }

    fn measure(glyphs: &[Glyph]) -> Option<TokenMetrics> {
        let config = AnalysisConfig::default();
        let tokens = build_tokens(glyphs, &config);
        assert_eq!(tokens.len(), 1);
        compute_metrics(&tokens[0], &config)
    }

    #[test]
    fn test_horizontal_metrics() {
        let metrics = measure(&row("504", 30.0, 40.0, 6.0, 0.5, 10.0)).unwrap();
        assert_eq!(metrics.font_size, 10.0);
        assert_eq!(metrics.char_width, 6.0);
        assert_eq!(metrics.char_height, 10.0);
        assert_eq!(metrics.char_spacing, 0.5);
        assert_eq!(metrics.aspect_ratio, 1.8);
        assert_eq!(metrics.density_score, 16.67);
        assert_eq!(metrics.text_angle, 0.0);
        // position is (36.5, 40.0)
        assert_eq!(metrics.distance_from_origin, 54.2);
    }

    #[test]
    fn test_vertical_metrics_are_swapped() {
        let glyphs: Vec<Glyph> = "300"
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let top = 200.0 - (i as f64 + 1.0) * 6.0;
                Glyph::new(c, BBox::new(50.0, top, 60.0, top + 6.0), "F1", 6.0).rotated()
            })
            .collect();
        let metrics = measure(&glyphs).unwrap();
        assert_eq!(metrics.char_width, 6.0);
        assert_eq!(metrics.char_height, 10.0);
        assert_eq!(metrics.font_size, metrics.char_width);
        assert_eq!(metrics.char_spacing, 0.0);
        assert_eq!(metrics.text_angle, 0.0);
    }

    #[test]
    fn test_decimal_point_is_not_measured() {
        let mut glyphs = row("185", 0.0, 0.0, 6.0, 0.0, 10.0);
        glyphs.insert(2, Glyph::new('.', BBox::new(12.0, 0.0, 14.0, 10.0), "F1", 10.0));
        glyphs[3].bbox = BBox::new(14.0, 0.0, 20.0, 10.0);
        let metrics = measure(&glyphs).unwrap();
        assert_eq!(metrics.char_width, 6.0);
        assert_eq!(metrics.aspect_ratio, 1.8);
    }

    #[test]
    fn test_noise_font_size_returns_none() {
        let config = AnalysisConfig::default();
        let mut tokens = build_tokens(&row("12", 0.0, 0.0, 6.0, 0.0, 10.0), &config);
        for glyph in &mut tokens[0].members {
            glyph.font_size = 20.6;
        }
        assert!(compute_metrics(&tokens[0], &config).is_none());
    }

    #[test]
    fn test_mean_font_size_can_hit_sentinel() {
        let config = AnalysisConfig::default();
        let mut tokens = build_tokens(&row("12", 0.0, 0.0, 6.0, 0.0, 10.0), &config);
        tokens[0].members[0].font_size = 20.5;
        tokens[0].members[1].font_size = 20.7;
        assert!(compute_metrics(&tokens[0], &config).is_none());
    }

    #[test]
    fn test_angle_of_sloped_run() {
        let glyphs = vec![
            Glyph::new('4', BBox::new(0.0, 0.0, 6.0, 10.0), "F1", 10.0),
            Glyph::new('5', BBox::new(6.0, 6.0, 12.0, 16.0), "F1", 10.0),
        ];
        let metrics = measure(&glyphs).unwrap();
        assert_eq!(metrics.text_angle, 45.0);
    }
}
