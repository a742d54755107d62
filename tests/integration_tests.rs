//! Integration tests for the drawing dimension pipeline

use drawing_dimensions::config::AnalysisConfig;
use drawing_dimensions::grouping::{build_groups, match_rule, MatchRule};
use drawing_dimensions::metrics::measure_tokens;
use drawing_dimensions::tokens::build_tokens;
use drawing_dimensions::{
    analyze_drawing_mem, analyze_page, detect_drawing_kind_mem, extract_first_page_mem,
    process_drawing, process_drawings, BBox, DrawingKind, Glyph, GroupLabel, LineSegment,
    NumberValue, Orientation, PageContent, Status,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

// Horizontal run: glyphs 6 wide, 10 tall, set at size 10
fn horizontal(text: &str, x: f64, top: f64, font: &str) -> Vec<Glyph> {
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            let x0 = x + i as f64 * 6.0;
            Glyph::new(c, BBox::new(x0, top, x0 + 6.0, top + 10.0), font, 10.0)
        })
        .collect()
}

// Text rotated counter-clockwise: reads upwards, first glyph lowest.
// Each glyph is 10 wide and 6 tall, so its size equals its advance.
fn vertical(text: &str, x: f64, bottom: f64, font: &str) -> Vec<Glyph> {
    text.chars()
        .enumerate()
        .map(|(i, c)| {
            let top = bottom - (i as f64 + 1.0) * 6.0;
            Glyph::new(c, BBox::new(x, top, x + 10.0, top + 6.0), font, 6.0).rotated()
        })
        .collect()
}

fn page(runs: Vec<Vec<Glyph>>) -> PageContent {
    PageContent::new(runs.into_iter().flatten().collect(), Vec::new())
}

fn int(v: u32) -> Option<NumberValue> {
    Some(NumberValue::Integer(v))
}

// ============================================================================
// Scenario tests
// ============================================================================

#[test]
fn test_repeated_length_fills_width() {
    let content = page(vec![
        horizontal("504", 100.0, 100.0, "F1"),
        horizontal("504", 100.0, 200.0, "F1"),
        horizontal("9", 300.0, 300.0, "F1"),
    ]);
    let analysis = analyze_page(&content, &AnalysisConfig::default());

    assert_eq!(analysis.groups.groups.len(), 1);
    let group = &analysis.groups.groups[0];
    assert_eq!(group.len(), 3);
    assert_eq!(group.score, 40);
    assert!(!group.has_orientation_mix);

    assert_eq!(analysis.winning_group, Some(group.id));
    assert_eq!(analysis.dimensions.length, int(504));
    assert_eq!(analysis.dimensions.width, int(504));
    assert_eq!(analysis.dimensions.height, int(9));
    assert_eq!(analysis.status, Status::Done);
}

#[test]
fn test_rotated_pair_groups_across_orientations() {
    let content = page(vec![
        horizontal("600", 100.0, 100.0, "F1"),
        vertical("300", 300.0, 400.0, "F1"),
    ]);
    let config = AnalysisConfig::default();
    let analysis = analyze_page(&content, &config);

    assert_eq!(analysis.tokens.len(), 2);
    let vertical_token = analysis
        .tokens
        .iter()
        .find(|t| t.token.orientation == Orientation::Vertical)
        .expect("vertical token");
    assert_eq!(vertical_token.token.value, NumberValue::Integer(300));
    assert_eq!(
        vertical_token.metrics.font_size,
        vertical_token.metrics.char_width
    );

    assert_eq!(
        match_rule(&analysis.tokens[0], &analysis.tokens[1], &config),
        Some(MatchRule::RotatedPair)
    );
    assert_eq!(analysis.groups.groups.len(), 1);
    assert!(analysis.groups.groups[0].has_orientation_mix);

    assert_eq!(analysis.dimensions.length, int(600));
    assert_eq!(analysis.dimensions.width, int(300));
    assert_eq!(analysis.dimensions.height, int(300));
}

#[test]
fn test_noise_font_numbers_never_reach_the_result() {
    let noise: Vec<Glyph> = horizontal("2024", 400.0, 50.0, "F1")
        .into_iter()
        .map(|mut g| {
            g.font_size = 20.6;
            g
        })
        .collect();
    let content = page(vec![
        noise,
        horizontal("1200", 100.0, 100.0, "F1"),
        horizontal("600", 100.0, 200.0, "F1"),
        horizontal("18", 100.0, 300.0, "F1"),
    ]);
    let analysis = analyze_page(&content, &AnalysisConfig::default());

    assert!(analysis
        .tokens
        .iter()
        .all(|t| t.token.value != NumberValue::Integer(2024)));
    let r = &analysis.result;
    assert!([&r.length, &r.width, &r.height].iter().all(|v| *v != "2024"));
}

#[test]
fn test_fallback_uses_all_tokens() {
    // Three different signatures: no group forms
    let content = page(vec![
        horizontal("1200", 100.0, 100.0, "F1"),
        horizontal("600", 100.0, 200.0, "F2"),
        horizontal("300", 100.0, 300.0, "F3"),
    ]);
    let analysis = analyze_page(&content, &AnalysisConfig::default());

    assert!(analysis.groups.groups.is_empty());
    assert_eq!(analysis.winning_group, None);
    assert_eq!(analysis.source_label(), GroupLabel::Ungrouped);
    assert_eq!(analysis.dimensions.length, int(1200));
    assert_eq!(analysis.dimensions.width, int(600));
    assert_eq!(analysis.dimensions.height, int(300));
}

#[test]
fn test_single_token_is_a_complete_result() {
    let content = page(vec![horizontal("450", 100.0, 100.0, "F1")]);
    let analysis = analyze_page(&content, &AnalysisConfig::default());

    assert_eq!(analysis.result.length, "450");
    assert_eq!(analysis.result.width, "450");
    assert_eq!(analysis.result.height, "450");
    assert_eq!(analysis.status, Status::Done);
}

// ============================================================================
// Pipeline property tests
// ============================================================================

#[test]
fn test_range_invariant() {
    let content = page(vec![
        horizontal("0", 100.0, 100.0, "F1"),
        horizontal("3501", 100.0, 200.0, "F1"),
        horizontal("3500", 100.0, 300.0, "F1"),
        horizontal("0.05", 100.0, 400.0, "F1"),
        horizontal("0.1", 100.0, 500.0, "F1"),
    ]);
    let config = AnalysisConfig::default();
    let tokens = build_tokens(&content.glyphs, &config);

    assert!(!tokens.is_empty());
    for token in &tokens {
        let v = token.value.as_f64();
        if token.value.is_decimal() {
            assert!((0.1..=3500.0).contains(&v), "{} out of range", v);
        } else {
            assert!(v > 0.0 && v <= 3500.0, "{} out of range", v);
        }
    }
}

#[test]
fn test_vertical_metrics_swap_width_and_height() {
    let glyphs = vertical("250", 50.0, 300.0, "F1");
    let config = AnalysisConfig::default();
    let measured = measure_tokens(build_tokens(&glyphs, &config), &config);

    assert_eq!(measured.len(), 1);
    let raw_height = glyphs[0].bbox.height();
    let raw_width = glyphs[0].bbox.width();
    assert_eq!(measured[0].metrics.char_width, raw_height);
    assert_eq!(measured[0].metrics.char_height, raw_width);
}

#[test]
fn test_grouping_is_idempotent() {
    let content = page(vec![
        horizontal("800", 100.0, 100.0, "F1"),
        horizontal("400", 100.0, 200.0, "F1"),
        horizontal("18", 100.0, 300.0, "F1"),
        horizontal("12", 400.0, 100.0, "F2"),
        horizontal("34", 400.0, 200.0, "F2"),
    ]);
    let config = AnalysisConfig::default();

    let first = analyze_page(&content, &config);
    let second = analyze_page(&content, &config);
    assert_eq!(first.groups, second.groups);
    assert_eq!(first.winning_group, second.winning_group);
    assert_eq!(first.result, second.result);
}

#[test]
fn test_pair_is_expanded_with_available_donor() {
    // 600 and 300 pair up exactly; 18 has a slightly taller box, so it only
    // joins through expansion
    let mut short = horizontal("18", 100.0, 300.0, "F1");
    for g in &mut short {
        g.bbox.bottom += 0.1;
        g.font_size = 9.0;
    }
    let content = page(vec![
        horizontal("600", 100.0, 100.0, "F1"),
        horizontal("300", 100.0, 200.0, "F1"),
        short,
    ]);
    let config = AnalysisConfig::default();
    let tokens = measure_tokens(build_tokens(&content.glyphs, &config), &config);
    let groups = build_groups(&tokens, &config).expect("groups");

    assert_eq!(groups.groups.len(), 1);
    assert_eq!(groups.groups[0].len(), 3);
}

#[test]
fn test_pair_takes_donor_from_triplet() {
    // 600 and 400 pair up at size 10; 18, 19 and 20 form a triplet at size
    // 12 with the same font and glyph boxes
    let larger = |text: &str, top: f64| -> Vec<Glyph> {
        horizontal(text, 300.0, top, "F1")
            .into_iter()
            .map(|mut g| {
                g.font_size = 12.0;
                g
            })
            .collect()
    };
    let content = page(vec![
        horizontal("600", 100.0, 100.0, "F1"),
        horizontal("400", 100.0, 200.0, "F1"),
        larger("18", 100.0),
        larger("19", 200.0),
        larger("20", 300.0),
    ]);
    let config = AnalysisConfig::default();
    let tokens = measure_tokens(build_tokens(&content.glyphs, &config), &config);
    let groups = build_groups(&tokens, &config).expect("groups");

    let index_of = |v: u32| {
        tokens
            .iter()
            .position(|t| t.token.value == NumberValue::Integer(v))
            .expect("token")
    };
    let pair = groups.group_of(index_of(600)).expect("pair group");
    assert_eq!(pair.len(), 3);
    assert!(groups.groups.iter().all(|g| g.len() >= 2));
    assert_eq!(groups.groups.iter().map(|g| g.len()).sum::<usize>(), 5);
}

#[test]
fn test_line_support_is_reported() {
    let mut content = page(vec![
        horizontal("1200", 100.0, 100.0, "F1"),
        horizontal("600", 100.0, 200.0, "F1"),
        horizontal("18", 100.0, 300.0, "F1"),
    ]);
    content.lines = vec![
        LineSegment::new(50.0, 115.0, 300.0, 115.0),
        LineSegment::new(50.0, 215.0, 300.0, 215.0),
    ];
    let analysis = analyze_page(&content, &AnalysisConfig::default());
    assert!((analysis.line_support - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_keyword_tags_are_reported() {
    let content = page(vec![
        horizontal("1200", 100.0, 100.0, "F1"),
        horizontal("FOIL", 300.0, 100.0, "F9"),
        horizontal("RAW", 300.0, 150.0, "F9"),
        horizontal("LAM", 300.0, 200.0, "F9"),
        horizontal("PROFILE: K12-A", 300.0, 250.0, "F9"),
    ]);
    let analysis = analyze_page(&content, &AnalysisConfig::default());
    assert_eq!(analysis.result.foil, "1L");
    assert_eq!(analysis.result.laminate, "RAW/LAM");
    assert_eq!(analysis.result.profile, "K12-A");
}

#[test]
fn test_grain_marker_swaps_length() {
    let mut grain = vertical("GRAIN", 140.0, 400.0, "F9");
    grain.reverse();
    let content = page(vec![
        horizontal("1200", 100.0, 100.0, "F1"),
        vertical("600", 120.0, 400.0, "F1"),
        horizontal("18", 100.0, 300.0, "F1"),
        grain,
    ]);

    let plain = analyze_page(&content, &AnalysisConfig::default());
    assert_eq!(plain.dimensions.length, int(1200));

    let config = AnalysisConfig {
        use_grain_hint: true,
        ..AnalysisConfig::default()
    };
    let hinted = analyze_page(&content, &config);
    assert!(hinted.grain.is_some());
    assert_eq!(hinted.dimensions.length, int(600));
    assert_eq!(hinted.dimensions.width, int(1200));
}

// ============================================================================
// PDF end-to-end tests
// ============================================================================

fn show(ops: &mut Vec<Operation>, size: i64, matrix: [i64; 6], text: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec!["F1".into(), Object::Integer(size)]));
    ops.push(Operation::new(
        "Tm",
        matrix.iter().map(|v| Object::Integer(*v)).collect(),
    ));
    ops.push(Operation::new("Tj", vec![Object::string_literal(text)]));
    ops.push(Operation::new("ET", vec![]));
}

fn drawing_pdf() -> Vec<u8> {
    let mut operations = Vec::new();
    show(&mut operations, 10, [1, 0, 0, 1, 100, 700], "1200");
    show(&mut operations, 10, [1, 0, 0, 1, 100, 600], "600");
    show(&mut operations, 10, [1, 0, 0, 1, 100, 500], "18");
    show(&mut operations, 10, [1, 0, 0, 1, 300, 700], "FOIL");
    // Rotated callout in a smaller size, not part of the triplet
    show(&mut operations, 8, [0, 1, -1, 0, 400, 300], "250");
    operations.push(Operation::new("m", vec![90.into(), 690.into()]));
    operations.push(Operation::new("l", vec![200.into(), 690.into()]));
    operations.push(Operation::new("S", vec![]));
    single_page_pdf(operations)
}

fn single_page_pdf(operations: Vec<Operation>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save pdf");
    buffer
}

#[test]
fn test_extract_glyph_boxes() {
    let content = extract_first_page_mem(&drawing_pdf()).expect("extract");
    assert_eq!(content.width, 595.0);
    assert_eq!(content.height, 842.0);

    // Courier has no Widths entry: 500/1000 of the size per glyph
    let one = content
        .glyphs
        .iter()
        .find(|g| g.text == '1' && g.upright)
        .expect("glyph 1");
    assert!((one.bbox.x0 - 100.0).abs() < 1e-3);
    assert!((one.bbox.x1 - 105.0).abs() < 1e-3);
    assert!((one.bbox.top - 132.0).abs() < 1e-3);
    assert!((one.bbox.bottom - 142.0).abs() < 1e-3);
    assert!((one.font_size - 10.0).abs() < 1e-3);
    assert_eq!(one.font_name, "Courier");

    let rotated = content.glyphs.iter().filter(|g| !g.upright).count();
    assert_eq!(rotated, 3);

    assert_eq!(content.lines.len(), 1);
    assert!(content.lines[0].is_horizontal(0.01));
}

#[test]
fn test_restore_resets_font_size() {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(10)]),
        Operation::new("ET", vec![]),
        Operation::new("q", vec![]),
    ];
    show(&mut operations, 20, [1, 0, 0, 1, 100, 700], "4");
    operations.push(Operation::new("Q", vec![]));
    // No Tf here: the size set before q applies again
    operations.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tm", [1, 0, 0, 1, 100, 600].iter().map(|v| Object::Integer(*v)).collect()),
        Operation::new("Tj", vec![Object::string_literal("5")]),
        Operation::new("ET", vec![]),
    ]);

    let content = extract_first_page_mem(&single_page_pdf(operations)).expect("extract");
    let size_of = |c: char| {
        content
            .glyphs
            .iter()
            .find(|g| g.text == c)
            .map(|g| g.font_size)
            .expect("glyph")
    };
    assert!((size_of('4') - 20.0).abs() < 1e-3);
    assert!((size_of('5') - 10.0).abs() < 1e-3);
}

#[test]
fn test_analyze_generated_drawing() {
    let bytes = drawing_pdf();
    let detection = detect_drawing_kind_mem(&bytes).expect("detect");
    assert_eq!(detection.kind, DrawingKind::Vector);

    let analysis = analyze_drawing_mem(&bytes, &AnalysisConfig::default()).expect("analyze");
    let rotated = analysis
        .tokens
        .iter()
        .find(|t| t.token.orientation == Orientation::Vertical)
        .expect("vertical token");
    assert_eq!(rotated.token.value, NumberValue::Integer(250));

    assert_eq!(analysis.result.length, "1200");
    assert_eq!(analysis.result.width, "600");
    assert_eq!(analysis.result.height, "18");
    assert_eq!(analysis.result.foil, "1L");
    assert_eq!(analysis.status, Status::Done);
}

#[test]
fn test_process_drawing_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("OKE-1001.pdf");
    std::fs::write(&good, drawing_pdf()).expect("write pdf");
    let bad = dir.path().join("OKE-1002.pdf");
    std::fs::write(&bad, b"%PDF-1.5 truncated").expect("write pdf");

    let records = process_drawings(&[&good, &bad], &AnalysisConfig::default());
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].drawing, "OKE-1001");
    assert_eq!(records[0].result.length, "1200");
    assert_eq!(records[0].status, Status::Done);

    assert_eq!(records[1].drawing, "OKE-1002");
    assert_eq!(records[1].result.length, "");
    assert_eq!(records[1].status, Status::Recheck);

    let missing = process_drawing(dir.path().join("missing.pdf"), &AnalysisConfig::default());
    assert_eq!(missing.status, Status::Recheck);
}
