//! Per-drawing result records and their table rendering

use crate::assign::Dimensions;
use crate::classify::Classification;
use crate::metrics::TokenMetrics;
use crate::parser::NumberValue;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Review flag of a drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Done,
    /// Needs a human look
    Recheck,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Done => "Done",
            Status::Recheck => "Recheck",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible fields of one drawing; empty strings for unknowns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DimensionResult {
    #[serde(rename = "Length (mm)")]
    pub length: String,
    #[serde(rename = "Width (mm)")]
    pub width: String,
    #[serde(rename = "Height (mm)")]
    pub height: String,
    #[serde(rename = "Laminate")]
    pub laminate: String,
    #[serde(rename = "FOIL")]
    pub foil: String,
    #[serde(rename = "EDGEBAND")]
    pub edgeband: String,
    #[serde(rename = "Profile")]
    pub profile: String,
    #[serde(rename = "Profile2")]
    pub profile2: String,
    #[serde(rename = "Profile3")]
    pub profile3: String,
}

fn value_text(value: Option<NumberValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl DimensionResult {
    pub fn new(dimensions: &Dimensions, classification: &Classification) -> Self {
        Self {
            length: value_text(dimensions.length),
            width: value_text(dimensions.width),
            height: value_text(dimensions.height),
            laminate: classification.laminate.clone(),
            foil: classification.foil.clone(),
            edgeband: classification.edgeband.clone(),
            profile: classification.profile(0).to_string(),
            profile2: classification.profile(1).to_string(),
            profile3: classification.profile(2).to_string(),
        }
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawingRecord {
    #[serde(rename = "Drawing#")]
    pub drawing: String,
    #[serde(flatten)]
    pub result: DimensionResult,
    #[serde(rename = "Status")]
    pub status: Status,
}

impl DrawingRecord {
    pub fn new(drawing: impl Into<String>, result: DimensionResult, status: Status) -> Self {
        Self {
            drawing: drawing.into(),
            result,
            status,
        }
    }

    /// All-empty record flagged for review
    pub fn empty(drawing: impl Into<String>) -> Self {
        Self::new(drawing, DimensionResult::default(), Status::Recheck)
    }

    pub fn to_row(&self) -> Vec<&str> {
        let r = &self.result;
        vec![
            self.drawing.as_str(),
            r.length.as_str(),
            r.width.as_str(),
            r.height.as_str(),
            r.laminate.as_str(),
            r.foil.as_str(),
            r.edgeband.as_str(),
            r.profile.as_str(),
            r.profile2.as_str(),
            r.profile3.as_str(),
            self.status.as_str(),
        ]
    }
}

pub const TABLE_HEADER: [&str; 11] = [
    "Drawing#",
    "Length (mm)",
    "Width (mm)",
    "Height (mm)",
    "Laminate",
    "FOIL",
    "EDGEBAND",
    "Profile",
    "Profile2",
    "Profile3",
    "Status",
];

/// Drawing number of a file: its name without the `.pdf` extension
pub fn drawing_number(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".pdf") => {
            name[..cut].to_string()
        }
        _ => name,
    }
}

/// Tab-separated table with a header line
pub fn render_table(records: &[DrawingRecord]) -> String {
    let mut out = TABLE_HEADER.join("\t");
    out.push('\n');
    for record in records {
        out.push_str(&record.to_row().join("\t"));
        out.push('\n');
    }
    out
}

/// One line of the token table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenRow {
    pub value: NumberValue,
    pub font_name: String,
    pub font_weight: String,
    pub orientation: String,
    pub x: f64,
    pub y: f64,
    pub glyph_count: usize,
    pub metrics: TokenMetrics,
    pub group: String,
    pub has_orientation_mix: bool,
    pub score: Option<i32>,
}

pub const TOKEN_TABLE_HEADER: [&str; 17] = [
    "Value",
    "Font",
    "Weight",
    "Orientation",
    "X",
    "Y",
    "Glyphs",
    "FontSize",
    "CharWidth",
    "CharHeight",
    "Density",
    "Distance",
    "Aspect",
    "Spacing",
    "Angle",
    "Group",
    "Score",
];

/// Tab-separated token table
pub fn render_token_table(rows: &[TokenRow]) -> String {
    let mut out = TOKEN_TABLE_HEADER.join("\t");
    out.push('\n');
    for row in rows {
        let m = &row.metrics;
        let group = if row.has_orientation_mix {
            format!("{}*", row.group)
        } else {
            row.group.clone()
        };
        let fields = [
            row.value.to_string(),
            row.font_name.clone(),
            row.font_weight.clone(),
            row.orientation.clone(),
            format!("{:.1}", row.x),
            format!("{:.1}", row.y),
            row.glyph_count.to_string(),
            m.font_size.to_string(),
            m.char_width.to_string(),
            m.char_height.to_string(),
            m.density_score.to_string(),
            m.distance_from_origin.to_string(),
            m.aspect_ratio.to_string(),
            m.char_spacing.to_string(),
            m.text_angle.to_string(),
            group,
            row.score.map(|s| s.to_string()).unwrap_or_default(),
        ];
        out.push_str(&fields.join("\t"));
        out.push('\n');
    }
    out
}
