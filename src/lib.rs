//! Dimension extraction from cabinetry drawing PDFs using lopdf
//!
//! This crate provides:
//! - First-page glyph and line extraction from vector drawings
//! - Assembly of positioned digit glyphs into number tokens
//! - Font and metric based grouping that singles out the Length, Width and
//!   Height triplet among unrelated numbers
//! - Keyword tags (laminate, foil, edgeband, profile) from the page text

pub mod assign;
pub mod classify;
pub mod config;
pub mod corroboration;
pub mod detector;
pub mod extractor;
pub mod fonts;
pub mod glyph;
pub mod grain;
pub mod grouping;
pub mod metrics;
pub mod parser;
pub mod report;
pub mod text;
pub mod tokens;

pub use assign::{assign_dimensions, select_winning_group, Dimensions};
pub use classify::{classify_text, Classification};
pub use config::AnalysisConfig;
pub use detector::{detect_drawing_kind, detect_drawing_kind_mem, DrawingKind};
pub use extractor::{extract_first_page, extract_first_page_mem};
pub use glyph::{BBox, Glyph, LineSegment, PageContent};
pub use grouping::{build_groups, GroupLabel, GroupSet};
pub use metrics::{MeasuredToken, TokenMetrics};
pub use parser::NumberValue;
pub use report::{DimensionResult, DrawingRecord, Status, TokenRow};
pub use tokens::{NumberToken, Orientation};

use grain::GrainHint;
use lopdf::Document;
use rayon::prelude::*;
use std::path::Path;

/// Everything learned about one drawing
#[derive(Debug, Clone)]
pub struct DrawingAnalysis {
    /// Valid number tokens of the page with their metrics
    pub tokens: Vec<MeasuredToken>,
    pub groups: GroupSet,
    /// Grouping hit an internal inconsistency; all tokens were used instead
    pub grouping_failed: bool,
    /// Id of the group the dimensions were read from
    pub winning_group: Option<usize>,
    /// Font the page's dimension numbers are set in, when it can be told
    pub dimension_font: Option<String>,
    pub dimensions: Dimensions,
    /// Grain marker that decided the length direction
    pub grain: Option<GrainHint>,
    /// Share of the dimension tokens that sit next to a dimension line
    pub line_support: f64,
    pub classification: Classification,
    pub result: DimensionResult,
    pub status: Status,
}

impl DrawingAnalysis {
    /// Group label of a token as shown in the token table
    pub fn label_of(&self, token: usize) -> GroupLabel {
        if self.grouping_failed {
            GroupLabel::Error
        } else {
            self.groups.label_of(token)
        }
    }

    /// Where the dimensions came from
    pub fn source_label(&self) -> GroupLabel {
        if self.tokens.is_empty() {
            GroupLabel::InsufficientData
        } else if self.grouping_failed {
            GroupLabel::Error
        } else {
            self.winning_group
                .map(GroupLabel::Group)
                .unwrap_or(GroupLabel::Ungrouped)
        }
    }

    /// One row per token, in token order
    pub fn token_rows(&self) -> Vec<TokenRow> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(index, measured)| {
                let group = if self.grouping_failed {
                    None
                } else {
                    self.groups.group_of(index)
                };
                let token = &measured.token;
                TokenRow {
                    value: token.value,
                    font_name: token.font_name.clone(),
                    font_weight: token.font_weight.as_str().to_string(),
                    orientation: token.orientation.as_str().to_string(),
                    x: token.position.0,
                    y: token.position.1,
                    glyph_count: token.members.len(),
                    metrics: measured.metrics,
                    group: self.label_of(index).to_string(),
                    has_orientation_mix: group.map_or(false, |g| g.has_orientation_mix),
                    score: group.map(|g| g.score),
                }
            })
            .collect()
    }

    pub fn record(&self, drawing: impl Into<String>) -> DrawingRecord {
        DrawingRecord::new(drawing, self.result.clone(), self.status)
    }
}

/// Run the full analysis on an already extracted page
///
/// Never fails: a grouping error falls back to all tokens, and a page
/// without numbers yields an empty result flagged for review.
pub fn analyze_page(page: &PageContent, config: &AnalysisConfig) -> DrawingAnalysis {
    let classification = classify_text(&text::page_text(&page.glyphs));
    let dimension_font = fonts::resolve_dimension_font(&page.glyphs, config);

    let mut measured =
        metrics::measure_tokens(tokens::build_tokens(&page.glyphs, config), config);
    if config.restrict_to_dimension_font {
        if let Some(font) = &dimension_font {
            let kept: Vec<MeasuredToken> = measured
                .iter()
                .filter(|t| &t.token.font_name == font)
                .cloned()
                .collect();
            if kept.is_empty() {
                log::debug!("no tokens in dimension font {}, keeping all", font);
            } else {
                measured = kept;
            }
        }
    }

    let (groups, grouping_failed) = match build_groups(&measured, config) {
        Ok(set) => (set, false),
        Err(e) => {
            log::warn!("grouping failed, using all tokens: {}", e);
            (GroupSet::default(), true)
        }
    };

    let winner = select_winning_group(&groups);
    let winning_group = winner.map(|g| g.id);
    let selected: Vec<&MeasuredToken> = match winner {
        Some(group) => {
            log::debug!("GROUP_{} wins with score {}", group.id, group.score);
            group.members.iter().filter_map(|&i| measured.get(i)).collect()
        }
        None => {
            log::debug!("no group of three, using all {} tokens", measured.len());
            measured.iter().collect()
        }
    };

    let values: Vec<NumberValue> = selected.iter().map(|t| t.token.value).collect();
    let mut dimensions = assign_dimensions(&values);

    let grain = if config.use_grain_hint {
        let hints = grain::find_grain_hints(&page.glyphs);
        grain::nearest_hint(&hints, &selected, config.grain_search_radius).cloned()
    } else {
        None
    };
    if let Some(hint) = &grain {
        dimensions = assign::apply_grain_hint(dimensions, hint, &selected);
    }

    let line_support = corroboration::line_support(&selected, &page.lines, config);

    let (result, status) = if dimensions.is_empty() {
        (DimensionResult::default(), Status::Recheck)
    } else if grouping_failed {
        (DimensionResult::new(&dimensions, &classification), Status::Recheck)
    } else {
        (DimensionResult::new(&dimensions, &classification), Status::Done)
    };

    DrawingAnalysis {
        tokens: measured,
        groups,
        grouping_failed,
        winning_group,
        dimension_font,
        dimensions,
        grain,
        line_support,
        classification,
        result,
        status,
    }
}

/// Analyze the first page of a PDF file
pub fn analyze_drawing<P: AsRef<Path>>(
    path: P,
    config: &AnalysisConfig,
) -> Result<DrawingAnalysis, DrawingError> {
    let doc = Document::load(path)?;
    analyze_document(&doc, config)
}

/// Analyze the first page of a PDF held in memory
pub fn analyze_drawing_mem(
    buffer: &[u8],
    config: &AnalysisConfig,
) -> Result<DrawingAnalysis, DrawingError> {
    let doc = Document::load_mem(buffer)?;
    analyze_document(&doc, config)
}

fn analyze_document(doc: &Document, config: &AnalysisConfig) -> Result<DrawingAnalysis, DrawingError> {
    let detection = detector::detect_from_document(doc)?;
    if detection.kind == DrawingKind::Raster {
        return Err(DrawingError::Raster);
    }

    let page = extractor::first_page_content(doc)?;
    Ok(analyze_page(&page, config))
}

/// Analyze one drawing file into an output row
///
/// Errors never escape: an unreadable or scanned drawing yields an empty
/// row with status `Recheck`.
pub fn process_drawing<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> DrawingRecord {
    let path = path.as_ref();
    let drawing = report::drawing_number(path);

    match analyze_drawing(path, config) {
        Ok(analysis) => {
            log::info!(
                "{}: {} from {}",
                drawing,
                analysis.status,
                analysis.source_label()
            );
            analysis.record(drawing)
        }
        Err(e) => {
            log::warn!("{}: {}", path.display(), e);
            DrawingRecord::empty(drawing)
        }
    }
}

/// Analyze many drawings in parallel; output order follows input order
pub fn process_drawings<P: AsRef<Path> + Sync>(
    paths: &[P],
    config: &AnalysisConfig,
) -> Vec<DrawingRecord> {
    paths
        .par_iter()
        .map(|path| process_drawing(path, config))
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum DrawingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("PDF has no pages")]
    NoPages,
    #[error("drawing is a raster scan")]
    Raster,
}

impl From<lopdf::Error> for DrawingError {
    fn from(e: lopdf::Error) -> Self {
        DrawingError::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str, x: f64, top: f64) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let x0 = x + i as f64 * 6.0;
                Glyph::new(c, BBox::new(x0, top, x0 + 6.0, top + 10.0), "F1", 10.0)
            })
            .collect()
    }

    #[test]
    fn test_empty_page_needs_review() {
        let analysis = analyze_page(&PageContent::default(), &AnalysisConfig::default());
        assert_eq!(analysis.status, Status::Recheck);
        assert_eq!(analysis.result, DimensionResult::default());
        assert_eq!(analysis.source_label(), GroupLabel::InsufficientData);
    }

    #[test]
    fn test_token_rows_follow_tokens() {
        let mut glyphs = row("600", 100.0, 100.0);
        glyphs.extend(row("300", 100.0, 200.0));
        glyphs.extend(row("18", 100.0, 300.0));
        let analysis = analyze_page(&PageContent::new(glyphs, Vec::new()), &AnalysisConfig::default());

        let rows = analysis.token_rows();
        assert_eq!(rows.len(), analysis.tokens.len());
        assert!(rows.iter().all(|r| r.group.starts_with("GROUP_")));
    }

    #[test]
    fn test_grouping_error_falls_back_to_all_tokens() {
        let mut glyphs = row("1200", 100.0, 100.0);
        glyphs.extend(row("600", 100.0, 200.0));
        let mut broken = Glyph::new('7', BBox::new(400.0, 100.0, 406.0, 110.0), "F1", 10.0);
        broken.bbox.bottom = f64::INFINITY;
        glyphs.push(broken);

        let analysis = analyze_page(&PageContent::new(glyphs, Vec::new()), &AnalysisConfig::default());

        assert_eq!(analysis.tokens.len(), 3);
        assert!(analysis.grouping_failed);
        assert_eq!(analysis.winning_group, None);
        assert_eq!(analysis.source_label(), GroupLabel::Error);
        for index in 0..analysis.tokens.len() {
            assert_eq!(analysis.label_of(index), GroupLabel::Error);
        }
        assert!(analysis.token_rows().iter().all(|r| r.group == "ERROR"));

        assert_eq!(analysis.dimensions.length, Some(NumberValue::Integer(1200)));
        assert_eq!(analysis.dimensions.width, Some(NumberValue::Integer(600)));
        assert_eq!(analysis.dimensions.height, Some(NumberValue::Integer(7)));
        assert_eq!(analysis.result.length, "1200");
        assert_eq!(analysis.status, Status::Recheck);
    }

    #[test]
    fn test_lopdf_error_maps_to_parse() {
        let err = Document::load_mem(b"not a pdf").map_err(DrawingError::from);
        assert!(matches!(err, Err(DrawingError::Parse(_))));
    }
}
