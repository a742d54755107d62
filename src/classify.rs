//! Keyword tags read from the page's plain text
//!
//! FOIL and EDGEBAND are counted in both reading directions: a word printed
//! along a long edge reads forwards, one on a short (rotated) edge comes out
//! reversed (`LIOF`, `DNABEGDE`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Laminate keywords, checked in this order on every line
const LAMINATE_KEYWORDS: [&str; 6] = [
    "FLEX PAPER/PAPER",
    "GLUEABLE LAM",
    "GLUEABLE LAM/TC BLACK (IF APPLICABLE)",
    "LAM/MASKING (IF APPLICABLE)",
    "RAW",
    "LAM",
];

/// At most this many long or short edges are reported
const MAX_EDGE_COUNT: usize = 2;

const MAX_PROFILES: usize = 3;

/// Keyword tags of one drawing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub laminate: String,
    pub laminate_detail: String,
    pub foil: String,
    pub foil_detail: String,
    pub edgeband: String,
    pub edgeband_detail: String,
    /// Profile codes in page order, deduplicated
    pub profiles: Vec<String>,
}

impl Classification {
    pub fn profile(&self, index: usize) -> &str {
        self.profiles.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Scan the page text for every keyword tag
pub fn classify_text(text: &str) -> Classification {
    let upper = text.to_uppercase();
    let (foil, foil_detail) = edge_code(&upper, "FOIL", "LIOF");
    let (edgeband, edgeband_detail) = edge_code(&upper, "EDGEBAND", "DNABEGDE");
    let (laminate, laminate_detail) = laminate(text);
    let profiles = profiles(text);

    log::debug!(
        "classification: laminate={:?} foil={:?} edgeband={:?} profiles={:?}",
        laminate,
        foil,
        edgeband,
        profiles
    );

    Classification {
        laminate,
        laminate_detail,
        foil,
        foil_detail,
        edgeband,
        edgeband_detail,
        profiles,
    }
}

/// `{n}L{m}S` code and detail for a forward/reversed keyword pair
///
/// `upper` must already be uppercased.
pub fn edge_code(upper: &str, long: &str, short: &str) -> (String, String) {
    let long_count = upper.matches(long).count();
    let short_count = upper.matches(short).count();

    let mut code = String::new();
    if long_count > 0 {
        code.push_str(&format!("{}L", long_count.min(MAX_EDGE_COUNT)));
    }
    if short_count > 0 {
        code.push_str(&format!("{}S", short_count.min(MAX_EDGE_COUNT)));
    }

    let mut detail = Vec::new();
    if long_count > 0 {
        detail.push(format!("{} {}", long_count, long));
    }
    if short_count > 0 {
        detail.push(format!("{} {}", short_count, short));
    }

    (code, detail.join(", "))
}

/// First two laminate keyword hits, joined with `/`
///
/// A single hit is not enough to classify and yields empty strings.
fn laminate(text: &str) -> (String, String) {
    let mut found: Vec<(&str, usize)> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        for keyword in LAMINATE_KEYWORDS {
            if line.contains(keyword) {
                found.push((keyword, index + 1));
            }
        }
        if found.len() >= 2 {
            break;
        }
    }

    match found.as_slice() {
        [(first, first_line), (second, second_line), ..] => (
            format!("{}/{}", first, second),
            format!(
                "Found: {} (line {}), {} (line {})",
                first, first_line, second, second_line
            ),
        ),
        _ => (String::new(), String::new()),
    }
}

/// Profile codes: every `PROFILE:` label, or failing that the first code on
/// a line mentioning "profile"
fn profiles(text: &str) -> Vec<String> {
    static LABELLED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)PROFILE:\s*([A-Z0-9\-]+)").unwrap());
    static CODE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)([A-Z0-9]+[A-Z]-[A-Z0-9]+)").unwrap());

    let mut out: Vec<String> = Vec::new();
    let push = |out: &mut Vec<String>, code: &str| {
        let code = code.trim();
        if !code.is_empty() && out.len() < MAX_PROFILES && !out.iter().any(|p| p == code) {
            out.push(code.to_string());
        }
    };

    for caps in LABELLED.captures_iter(text) {
        push(&mut out, &caps[1]);
    }

    if out.is_empty() {
        for line in text.lines().filter(|l| l.to_lowercase().contains("profile")) {
            if let Some(caps) = CODE.captures(line) {
                push(&mut out, &caps[1]);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foil_code() {
        let c = classify_text("FOIL TOP\nfoil bottom\nFOIL side\nLIOF");
        assert_eq!(c.foil, "2L1S");
        assert_eq!(c.foil_detail, "3 FOIL, 1 LIOF");
    }

    #[test]
    fn test_edgeband_short_only() {
        let c = classify_text("DNABEGDE DNABEGDE");
        assert_eq!(c.edgeband, "2S");
        assert_eq!(c.edgeband_detail, "2 DNABEGDE");
        assert_eq!(c.foil, "");
    }

    #[test]
    fn test_laminate_first_two_hits() {
        let text = "PART 12\nRAW\nnotes\nGLUEABLE LAM\nLAM";
        let c = classify_text(text);
        assert_eq!(c.laminate, "RAW/GLUEABLE LAM");
        assert_eq!(
            c.laminate_detail,
            "Found: RAW (line 2), GLUEABLE LAM (line 4)"
        );
    }

    #[test]
    fn test_laminate_one_line_two_keywords() {
        // "GLUEABLE LAM" also contains "LAM"
        let c = classify_text("GLUEABLE LAM");
        assert_eq!(c.laminate, "GLUEABLE LAM/LAM");
    }

    #[test]
    fn test_laminate_single_hit_is_empty() {
        let c = classify_text("RAW EDGE");
        assert_eq!(c.laminate, "");
        assert_eq!(c.laminate_detail, "");
    }

    #[test]
    fn test_profile_label() {
        let c = classify_text("Profile: ab-123\nPROFILE: X9-7\nPROFILE: AB-123");
        assert_eq!(c.profiles, vec!["ab-123", "X9-7", "AB-123"]);
        assert_eq!(c.profile(1), "X9-7");
        assert_eq!(c.profile(3), "");
    }

    #[test]
    fn test_profile_fallback() {
        let c = classify_text("EDGE PROFILE SEE DETAIL 12A-B4\nOTHER 99Z-1");
        assert_eq!(c.profiles, vec!["12A-B4"]);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(classify_text(""), Classification::default());
    }
}
