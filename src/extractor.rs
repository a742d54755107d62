//! First-page glyph and line extraction using lopdf
//!
//! Every shown character becomes a `Glyph` with its own box, computed from
//! the font's advance widths and descent through the text and graphics
//! matrices. Stroked straight path segments become `LineSegment`s. All
//! output coordinates are relative to the media box with `y` growing down.

use crate::glyph::{BBox, Glyph, LineSegment, PageContent};
use crate::DrawingError;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// US Letter, used when no MediaBox is found
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Advance width (thousandths of text space) for fonts without metrics
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// Default CID font width (PDF 32000-1, 9.7.4.3)
const DEFAULT_CID_WIDTH: f32 = 1000.0;

/// Nesting limit for form XObjects
const MAX_FORM_DEPTH: usize = 8;

/// Extract the first page of a PDF file
pub fn extract_first_page<P: AsRef<Path>>(path: P) -> Result<PageContent, DrawingError> {
    let doc = Document::load(path)?;
    first_page_content(&doc)
}

/// Extract the first page of a PDF held in memory
pub fn extract_first_page_mem(buffer: &[u8]) -> Result<PageContent, DrawingError> {
    let doc = Document::load_mem(buffer)?;
    first_page_content(&doc)
}

/// Glyphs and lines of the first page of a loaded document
pub fn first_page_content(doc: &Document) -> Result<PageContent, DrawingError> {
    let page_id = first_page_id(doc)?;
    let page = doc.get_dictionary(page_id)?;

    let media_box = media_box(doc, page);
    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
    let resources = inherited(doc, page, b"Resources").and_then(|o| o.as_dict().ok());

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| DrawingError::Parse(e.to_string()))?;

    let mut walker = PageWalker::new(doc, media_box);
    walker.walk(&content_data, resources, &fonts, IDENTITY, 0)?;

    log::debug!(
        "page {:?}: {} glyphs, {} line segments",
        page_id,
        walker.glyphs.len(),
        walker.lines.len()
    );

    Ok(PageContent {
        glyphs: walker.glyphs,
        lines: walker.lines,
        width: (media_box[2] - media_box[0]) as f64,
        height: (media_box[3] - media_box[1]) as f64,
    })
}

pub(crate) fn first_page_id(doc: &Document) -> Result<ObjectId, DrawingError> {
    doc.get_pages()
        .into_values()
        .next()
        .ok_or(DrawingError::NoPages)
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn transform_point(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn translation(tx: f32, ty: f32) -> [f32; 6] {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(get_number).collect()
}

/// Follow a reference, or return the object itself
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|o| resolve(doc, o))
}

/// Look up a page attribute, walking up the page tree
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..32 {
        if let Some(value) = entry(doc, current, key) {
            return Some(value);
        }
        current = entry(doc, current, b"Parent")?.as_dict().ok()?;
    }
    None
}

fn media_box(doc: &Document, page: &Dictionary) -> [f32; 4] {
    let Some(values) = inherited(doc, page, b"MediaBox").and_then(|o| o.as_array().ok()) else {
        return DEFAULT_MEDIA_BOX;
    };
    let nums: Vec<f32> = values.iter().filter_map(|o| get_number(resolve(doc, o))).collect();
    match nums.as_slice() {
        [x0, y0, x1, y1] => [x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)],
        _ => DEFAULT_MEDIA_BOX,
    }
}

/// Font dictionaries of a resource dictionary, keyed by resource name
fn resource_fonts<'a>(doc: &'a Document, resources: &'a Dictionary) -> BTreeMap<Vec<u8>, &'a Dictionary> {
    let mut fonts = BTreeMap::new();
    if let Some(Ok(dict)) = entry(doc, resources, b"Font").map(|o| o.as_dict()) {
        for (name, obj) in dict.iter() {
            if let Ok(font) = resolve(doc, obj).as_dict() {
                fonts.insert(name.clone(), font);
            }
        }
    }
    fonts
}

/// Metrics needed to place a font's glyphs
#[derive(Debug, Clone)]
struct FontMetrics<'a> {
    dict: Option<&'a Dictionary>,
    /// BaseFont, or the resource name when missing
    name: String,
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
    descent: f32,
}

impl<'a> FontMetrics<'a> {
    fn fallback(resource: &[u8]) -> Self {
        Self {
            dict: None,
            name: String::from_utf8_lossy(resource).to_string(),
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: DEFAULT_GLYPH_WIDTH,
            descent: 0.0,
        }
    }

    fn load(doc: &'a Document, resource: &[u8], dict: &'a Dictionary) -> Self {
        let mut metrics = Self::fallback(resource);
        metrics.dict = Some(dict);

        if let Some(Ok(base)) = entry(doc, dict, b"BaseFont").map(|o| o.as_name()) {
            metrics.name = String::from_utf8_lossy(base).to_string();
        }

        let is_type0 = matches!(
            entry(doc, dict, b"Subtype").map(|o| o.as_name()),
            Some(Ok(b"Type0"))
        );

        if is_type0 {
            metrics.two_byte = true;
            metrics.default_width = DEFAULT_CID_WIDTH;
            let descendant = entry(doc, dict, b"DescendantFonts")
                .and_then(|o| o.as_array().ok())
                .and_then(|a| a.first())
                .and_then(|o| resolve(doc, o).as_dict().ok());
            if let Some(cid_font) = descendant {
                if let Some(dw) = entry(doc, cid_font, b"DW").and_then(get_number) {
                    metrics.default_width = dw;
                }
                if let Some(Ok(w)) = entry(doc, cid_font, b"W").map(|o| o.as_array()) {
                    metrics.cid_widths = parse_cid_widths(doc, w);
                }
                metrics.descent = descent(doc, cid_font);
            }
        } else {
            metrics.first_char = entry(doc, dict, b"FirstChar")
                .and_then(get_number)
                .map(|v| v.max(0.0) as u32)
                .unwrap_or(0);
            if let Some(Ok(widths)) = entry(doc, dict, b"Widths").map(|o| o.as_array()) {
                metrics.widths = widths
                    .iter()
                    .map(|o| get_number(resolve(doc, o)).unwrap_or(0.0))
                    .collect();
            }
            if let Some(missing) = entry(doc, dict, b"FontDescriptor")
                .and_then(|o| o.as_dict().ok())
                .and_then(|fd| entry(doc, fd, b"MissingWidth"))
                .and_then(get_number)
            {
                metrics.default_width = missing;
            }
            metrics.descent = descent(doc, dict);
        }

        metrics
    }

    /// Advance width of a character code, in thousandths of text space
    fn width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self.cid_widths.get(&code).copied().unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }
}

fn descent(doc: &Document, font: &Dictionary) -> f32 {
    entry(doc, font, b"FontDescriptor")
        .and_then(|o| o.as_dict().ok())
        .and_then(|fd| entry(doc, fd, b"Descent"))
        .and_then(get_number)
        .unwrap_or(0.0)
}

/// Parse a CID font `W` array: `c [w1 w2 ...]` and `c_first c_last w` runs
fn parse_cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < w.len() {
        let Some(first) = get_number(resolve(doc, &w[i])).map(|v| v.max(0.0) as u32) else {
            break;
        };
        match w.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (k, obj) in list.iter().enumerate() {
                    if let Some(width) = get_number(resolve(doc, obj)) {
                        widths.insert(first + k as u32, width);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let last = get_number(last).map(|v| v.max(0.0) as u32).unwrap_or(first);
                let width = w.get(i + 2).and_then(|o| get_number(resolve(doc, o)));
                if let Some(width) = width {
                    for code in first..=last.min(first.saturating_add(0xFFFF)) {
                        widths.insert(code, width);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// Text state parameters (PDF 32000-1, 9.3)
#[derive(Debug, Clone)]
struct TextState<'a> {
    font: Option<FontMetrics<'a>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState<'_> {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Interprets content streams and collects glyphs and line segments
struct PageWalker<'a> {
    doc: &'a Document,
    media_box: [f32; 4],
    glyphs: Vec<Glyph>,
    lines: Vec<LineSegment>,
}

impl<'a> PageWalker<'a> {
    fn new(doc: &'a Document, media_box: [f32; 4]) -> Self {
        Self {
            doc,
            media_box,
            glyphs: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Device point to (x, top) relative to the media box
    fn to_page(&self, x: f32, y: f32) -> (f64, f64) {
        ((x - self.media_box[0]) as f64, (self.media_box[3] - y) as f64)
    }

    fn walk(
        &mut self,
        content_data: &[u8],
        resources: Option<&'a Dictionary>,
        fonts: &BTreeMap<Vec<u8>, &'a Dictionary>,
        initial_ctm: [f32; 6],
        depth: usize,
    ) -> Result<(), DrawingError> {
        let content =
            Content::decode(content_data).map_err(|e| DrawingError::Parse(e.to_string()))?;

        // Graphics state tracking
        let mut ctm = initial_ctm;
        let mut state = TextState::default();
        // Text state parameters are part of the graphics state
        let mut saved_states = Vec::new();
        let mut text_matrix = IDENTITY;
        let mut line_matrix = IDENTITY;
        let mut in_text_block = false;

        // Path construction in device space
        let mut current: Option<(f32, f32)> = None;
        let mut subpath_start: Option<(f32, f32)> = None;
        let mut pending: Vec<((f32, f32), (f32, f32))> = Vec::new();

        for op in &content.operations {
            let args = numbers(&op.operands);
            match op.operator.as_str() {
                "q" => saved_states.push((ctm, state.clone())),
                "Q" => {
                    if let Some((saved_ctm, saved_state)) = saved_states.pop() {
                        ctm = saved_ctm;
                        state = saved_state;
                    }
                }
                "cm" => {
                    if let [a, b, c, d, e, f] = args[..] {
                        ctm = multiply_matrices(&[a, b, c, d, e, f], &ctm);
                    }
                }
                "BT" => {
                    in_text_block = true;
                    text_matrix = IDENTITY;
                    line_matrix = IDENTITY;
                }
                "ET" => in_text_block = false,
                "Tf" => {
                    if let (Some(name), Some(size)) = (
                        op.operands.first().and_then(|o| o.as_name().ok()),
                        op.operands.get(1).and_then(get_number),
                    ) {
                        state.font = Some(match fonts.get(name) {
                            Some(dict) => FontMetrics::load(self.doc, name, *dict),
                            None => FontMetrics::fallback(name),
                        });
                        state.font_size = size;
                    }
                }
                "Tc" => state.char_spacing = args.first().copied().unwrap_or(0.0),
                "Tw" => state.word_spacing = args.first().copied().unwrap_or(0.0),
                "Tz" => state.horizontal_scaling = args.first().copied().unwrap_or(100.0) / 100.0,
                "TL" => state.leading = args.first().copied().unwrap_or(0.0),
                "Ts" => state.rise = args.first().copied().unwrap_or(0.0),
                "Td" | "TD" => {
                    if let [tx, ty] = args[..] {
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        line_matrix = multiply_matrices(&translation(tx, ty), &line_matrix);
                        text_matrix = line_matrix;
                    }
                }
                "Tm" => {
                    if let [a, b, c, d, e, f] = args[..] {
                        text_matrix = [a, b, c, d, e, f];
                        line_matrix = text_matrix;
                    }
                }
                "T*" => {
                    line_matrix = multiply_matrices(&translation(0.0, -state.leading), &line_matrix);
                    text_matrix = line_matrix;
                }
                "Tj" if in_text_block => {
                    if let Some(Object::String(bytes, _)) = op.operands.first() {
                        self.show_string(bytes, &state, &mut text_matrix, &ctm);
                    }
                }
                "TJ" if in_text_block => {
                    if let Some(Ok(array)) = op.operands.first().map(|o| o.as_array()) {
                        for item in array {
                            match item {
                                Object::String(bytes, _) => {
                                    self.show_string(bytes, &state, &mut text_matrix, &ctm);
                                }
                                other => {
                                    if let Some(n) = get_number(other) {
                                        let tx = -n / 1000.0
                                            * state.font_size
                                            * state.horizontal_scaling;
                                        text_matrix =
                                            multiply_matrices(&translation(tx, 0.0), &text_matrix);
                                    }
                                }
                            }
                        }
                    }
                }
                "'" | "\"" if in_text_block => {
                    if op.operator == "\"" {
                        if let [aw, ac, ..] = args[..] {
                            state.word_spacing = aw;
                            state.char_spacing = ac;
                        }
                    }
                    line_matrix = multiply_matrices(&translation(0.0, -state.leading), &line_matrix);
                    text_matrix = line_matrix;
                    if let Some(Object::String(bytes, _)) = op.operands.last() {
                        self.show_string(bytes, &state, &mut text_matrix, &ctm);
                    }
                }
                "m" => {
                    if let [x, y] = args[..] {
                        let p = transform_point(&ctm, x, y);
                        current = Some(p);
                        subpath_start = Some(p);
                    }
                }
                "l" => {
                    if let [x, y] = args[..] {
                        let p = transform_point(&ctm, x, y);
                        if let Some(from) = current {
                            pending.push((from, p));
                        }
                        current = Some(p);
                    }
                }
                "re" => {
                    if let [x, y, w, h] = args[..] {
                        let corners = [
                            transform_point(&ctm, x, y),
                            transform_point(&ctm, x + w, y),
                            transform_point(&ctm, x + w, y + h),
                            transform_point(&ctm, x, y + h),
                        ];
                        for i in 0..4 {
                            pending.push((corners[i], corners[(i + 1) % 4]));
                        }
                        current = Some(corners[0]);
                        subpath_start = Some(corners[0]);
                    }
                }
                "c" | "v" | "y" => {
                    // Curves are not dimension lines; only the pen moves
                    if let [.., x, y] = args[..] {
                        current = Some(transform_point(&ctm, x, y));
                    }
                }
                "h" => {
                    if let (Some(from), Some(start)) = (current, subpath_start) {
                        if from != start {
                            pending.push((from, start));
                        }
                        current = Some(start);
                    }
                }
                "S" | "B" | "B*" => self.stroke(&mut pending),
                "s" | "b" | "b*" => {
                    if let (Some(from), Some(start)) = (current, subpath_start) {
                        if from != start {
                            pending.push((from, start));
                        }
                    }
                    self.stroke(&mut pending);
                }
                "f" | "F" | "f*" | "n" => pending.clear(),
                "Do" => {
                    if let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) {
                        self.draw_form(name, resources, &ctm, depth);
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn stroke(&mut self, pending: &mut Vec<((f32, f32), (f32, f32))>) {
        for ((x0, y0), (x1, y1)) in pending.drain(..) {
            let (px0, py0) = self.to_page(x0, y0);
            let (px1, py1) = self.to_page(x1, y1);
            self.lines.push(LineSegment::new(px0, py0, px1, py1));
        }
    }

    /// Place every character of a string and advance the text matrix
    fn show_string(
        &mut self,
        bytes: &[u8],
        state: &TextState<'a>,
        text_matrix: &mut [f32; 6],
        ctm: &[f32; 6],
    ) {
        let Some(font) = &state.font else {
            return;
        };
        let encoding = font.dict.and_then(|d| d.get_font_encoding(self.doc).ok());
        let code_len = if font.two_byte { 2 } else { 1 };
        let size = state.font_size;
        let scaling = state.horizontal_scaling;

        for code_bytes in bytes.chunks(code_len) {
            let code = code_bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
            let text = match &encoding {
                Some(enc) => Document::decode_text(enc, code_bytes)
                    .unwrap_or_else(|_| fallback_text(code, font.two_byte)),
                None => fallback_text(code, font.two_byte),
            };

            let advance = font.width(code) / 1000.0 * size;
            let rendering = multiply_matrices(text_matrix, ctm);
            self.place_glyphs(&text, advance * scaling, font, state, &rendering);

            let mut tx = advance + state.char_spacing;
            if code_len == 1 && code == 32 {
                tx += state.word_spacing;
            }
            *text_matrix = multiply_matrices(&translation(tx * scaling, 0.0), text_matrix);
        }
    }

    /// Emit one glyph per character of a decoded code, splitting its advance
    fn place_glyphs(
        &mut self,
        text: &str,
        advance: f32,
        font: &FontMetrics<'a>,
        state: &TextState<'a>,
        m: &[f32; 6],
    ) {
        let chars: Vec<char> = text.chars().filter(|c| !c.is_control()).collect();
        if chars.is_empty() {
            return;
        }

        let size = state.font_size;
        let bottom = font.descent / 1000.0 * size + state.rise;
        let top = bottom + size;
        let step = advance / chars.len() as f32;
        let upright = m[0] * m[3] * state.horizontal_scaling > 0.0 && m[1] * m[2] <= 0.0;

        for (i, ch) in chars.into_iter().enumerate() {
            let left = step * i as f32;
            let right = left + step;
            let corners = [
                transform_point(m, left, bottom),
                transform_point(m, right, bottom),
                transform_point(m, left, top),
                transform_point(m, right, top),
            ];
            let (min_x, max_x, min_y, max_y) = corners.iter().fold(
                (f32::INFINITY, f32::NEG_INFINITY, f32::INFINITY, f32::NEG_INFINITY),
                |(x0, x1, y0, y1), (x, y)| (x0.min(*x), x1.max(*x), y0.min(*y), y1.max(*y)),
            );

            let (x0, top_edge) = self.to_page(min_x, max_y);
            let (x1, bottom_edge) = self.to_page(max_x, min_y);
            let bbox = BBox::new(x0, top_edge, x1, bottom_edge);
            let mut glyph = Glyph::new(ch, bbox, font.name.clone(), bbox.height());
            glyph.upright = upright;
            self.glyphs.push(glyph);
        }
    }

    /// Run a form XObject's content with its matrix applied
    fn draw_form(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: &[f32; 6],
        depth: usize,
    ) {
        if depth >= MAX_FORM_DEPTH {
            log::warn!("form XObjects nested deeper than {}, skipping", MAX_FORM_DEPTH);
            return;
        }
        let doc = self.doc;
        let Some(stream) = resources
            .and_then(|r| entry(doc, r, b"XObject"))
            .and_then(|o| o.as_dict().ok())
            .and_then(|x| entry(doc, x, name))
            .and_then(|o| o.as_stream().ok())
        else {
            return;
        };
        if !matches!(entry(doc, &stream.dict, b"Subtype").map(|o| o.as_name()), Some(Ok(b"Form"))) {
            return;
        }

        let matrix = match entry(doc, &stream.dict, b"Matrix")
            .and_then(|o| o.as_array().ok())
            .map(|a| numbers(a))
            .as_deref()
        {
            Some(&[a, b, c, d, e, f]) => [a, b, c, d, e, f],
            _ => IDENTITY,
        };
        let form_resources = entry(doc, &stream.dict, b"Resources")
            .and_then(|o| o.as_dict().ok())
            .or(resources);
        let fonts = form_resources
            .map(|r| resource_fonts(doc, r))
            .unwrap_or_default();

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let form_ctm = multiply_matrices(&matrix, ctm);
        if let Err(e) = self.walk(&data, form_resources, &fonts, form_ctm, depth + 1) {
            log::warn!("skipping unreadable form XObject: {}", e);
        }
    }
}

/// Text of a code when the font has no usable encoding: UTF-16BE for
/// two-byte codes, Latin-1 otherwise
fn fallback_text(code: u32, two_byte: bool) -> String {
    if two_byte {
        String::from_utf16_lossy(&[code as u16])
    } else {
        char::from_u32(code).map(String::from).unwrap_or_default()
    }
}
