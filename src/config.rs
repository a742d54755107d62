//! Tuning constants for the dimension engine
//!
//! All thresholds were fitted on one family of cabinetry drawing templates.
//! They are kept together so they can be tuned per template family.

/// Font size that marks title-block and legend text
pub const NOISE_FONT_SIZE: f64 = 20.6;

/// Maximum distance between a seed glyph and a candidate glyph
pub const GLYPH_CUTOFF: f64 = 30.0;

/// Tighter cutoff applied when the two glyphs use different fonts
pub const MIXED_FONT_CUTOFF: f64 = 20.0;

/// A run is vertical when its height span exceeds this multiple of its width span
pub const VERTICAL_AXIS_RATIO: f64 = 1.5;

/// Allowed offset from the run centroid across a vertical run
pub const VERTICAL_PERPENDICULAR_TOLERANCE: f64 = 10.0;

/// Allowed offset from the run centroid across a horizontal run
pub const HORIZONTAL_PERPENDICULAR_TOLERANCE: f64 = 8.0;

/// Char-height slack when comparing token signatures
pub const CHAR_HEIGHT_TOLERANCE: f64 = 0.2;

/// Char-spacing spread below which a group earns the consistency bonus
pub const SPACING_SPREAD_THRESHOLD: f64 = 0.2;

pub const MIN_DECIMAL_VALUE: f64 = 0.1;
pub const MAX_VALUE: f64 = 3500.0;

/// Font-name fragments and their priority for dimension call-outs
pub const DEFAULT_FONT_PRIORITIES: &[(&str, i32)] = &[
    ("CIDFont+F3", 4),
    ("CIDFont+F2", 3),
    ("ZapfDingbats", -1),
    ("Symbol", -1),
];

/// Number of glyphs expected from one dimension triplet font
pub const TRIPLET_FREQUENCY: usize = 3;

/// How far a GRAIN marker may sit from the winning group's tokens
pub const GRAIN_SEARCH_RADIUS: f64 = 150.0;

/// Maximum gap between a token and a parallel dimension line
pub const DIMENSION_LINE_GAP: f64 = 15.0;

/// Configuration for one page analysis
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub noise_font_size: f64,
    pub glyph_cutoff: f64,
    pub mixed_font_cutoff: f64,
    pub vertical_axis_ratio: f64,
    pub vertical_perpendicular_tolerance: f64,
    pub horizontal_perpendicular_tolerance: f64,
    pub char_height_tolerance: f64,
    pub spacing_spread_threshold: f64,
    pub min_decimal_value: f64,
    pub max_value: f64,
    /// Font-name fragment → priority; a name equal to the fragment's last
    /// `+`-separated part also matches (`F3` for `CIDFont+F3`)
    pub font_priorities: Vec<(String, i32)>,
    /// Only group tokens set in the resolved dimension font
    pub restrict_to_dimension_font: bool,
    /// Let a nearby GRAIN/NIARG marker decide which axis is the length
    pub use_grain_hint: bool,
    pub grain_search_radius: f64,
    pub dimension_line_gap: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            noise_font_size: NOISE_FONT_SIZE,
            glyph_cutoff: GLYPH_CUTOFF,
            mixed_font_cutoff: MIXED_FONT_CUTOFF,
            vertical_axis_ratio: VERTICAL_AXIS_RATIO,
            vertical_perpendicular_tolerance: VERTICAL_PERPENDICULAR_TOLERANCE,
            horizontal_perpendicular_tolerance: HORIZONTAL_PERPENDICULAR_TOLERANCE,
            char_height_tolerance: CHAR_HEIGHT_TOLERANCE,
            spacing_spread_threshold: SPACING_SPREAD_THRESHOLD,
            min_decimal_value: MIN_DECIMAL_VALUE,
            max_value: MAX_VALUE,
            font_priorities: DEFAULT_FONT_PRIORITIES
                .iter()
                .map(|(name, priority)| (name.to_string(), *priority))
                .collect(),
            restrict_to_dimension_font: false,
            use_grain_hint: false,
            grain_search_radius: GRAIN_SEARCH_RADIUS,
            dimension_line_gap: DIMENSION_LINE_GAP,
        }
    }
}

impl AnalysisConfig {
    /// True when a font size, rounded to one decimal, hits the noise sentinel
    pub fn is_noise_size(&self, font_size: f64) -> bool {
        (round_to(font_size, 1) - self.noise_font_size).abs() < 1e-6
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
