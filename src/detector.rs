//! Vector vs raster drawing detection
//!
//! A drawing exported from CAD carries its dimensions as text operators. A
//! scanned drawing is a page-sized image with no text to read. Only the
//! first page is inspected, by scanning its content streams for text
//! operators and its resources for image XObjects.

use crate::extractor::first_page_id;
use crate::DrawingError;
use lopdf::{Document, Object, ObjectId};
use std::path::Path;

/// How the first page of a drawing is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingKind {
    /// Text and vector paths, readable without OCR
    Vector,
    /// Image only; dimensions cannot be read
    Raster,
}

/// Result of drawing detection
#[derive(Debug)]
pub struct DrawingDetection {
    pub kind: DrawingKind,
    /// Number of pages in the document
    pub page_count: u32,
    /// Text-showing operators in the first page's own content
    pub text_operator_count: u32,
    /// Whether the first page places an image XObject
    pub has_images: bool,
    /// Whether the first page places a form XObject (which may hold text)
    pub has_forms: bool,
    /// Title from metadata (if available)
    pub title: Option<String>,
}

/// Detect the drawing kind of a PDF file
pub fn detect_drawing_kind<P: AsRef<Path>>(path: P) -> Result<DrawingDetection, DrawingError> {
    let doc = Document::load(path)?;
    detect_from_document(&doc)
}

/// Detect the drawing kind of a PDF held in memory
pub fn detect_drawing_kind_mem(buffer: &[u8]) -> Result<DrawingDetection, DrawingError> {
    let doc = Document::load_mem(buffer)?;
    detect_from_document(&doc)
}

/// Detection on a loaded document
pub fn detect_from_document(doc: &Document) -> Result<DrawingDetection, DrawingError> {
    let page_count = doc.get_pages().len() as u32;
    let page_id = first_page_id(doc)?;

    let text_operator_count = count_page_text_operators(doc, page_id);
    let (has_images, has_forms) = page_xobject_kinds(doc, page_id);

    // Text inside a form XObject is not counted above, so a page with forms
    // is never called raster
    let kind = if text_operator_count == 0 && has_images && !has_forms {
        DrawingKind::Raster
    } else {
        DrawingKind::Vector
    };

    log::debug!(
        "{:?} drawing: {} pages, {} text ops, images={}, forms={}",
        kind,
        page_count,
        text_operator_count,
        has_images,
        has_forms
    );

    Ok(DrawingDetection {
        kind,
        page_count,
        text_operator_count,
        has_images,
        has_forms,
        title: get_document_title(doc),
    })
}

fn count_page_text_operators(doc: &Document, page_id: ObjectId) -> u32 {
    let mut text_ops = 0u32;

    for content_id in doc.get_page_contents(page_id) {
        if let Ok(Object::Stream(stream)) = doc.get_object(content_id) {
            let content = match stream.decompressed_content() {
                Ok(data) => data,
                Err(_) => stream.content.clone(),
            };
            text_ops += scan_content_for_text_operators(&content);
        }
    }

    text_ops
}

/// Fast scan of content stream bytes for text-showing operators
///
/// Counts `Tj`, `TJ`, `'` and `"` when they stand as operators, that is
/// followed by whitespace or the end of the stream.
fn scan_content_for_text_operators(content: &[u8]) -> u32 {
    let is_end = |i: usize| i >= content.len() || content[i].is_ascii_whitespace();
    let is_start = |i: usize| i == 0 || content[i - 1].is_ascii_whitespace();

    let mut text_ops = 0u32;
    let mut i = 0;
    while i < content.len() {
        match content[i] {
            b'T' if i + 1 < content.len()
                && matches!(content[i + 1], b'j' | b'J')
                && is_end(i + 2) =>
            {
                text_ops += 1;
                i += 2;
                continue;
            }
            b'\'' | b'"' if is_start(i) && is_end(i + 1) => text_ops += 1,
            b'(' => {
                // Skip string literals so their contents are not scanned
                let mut depth = 0usize;
                while i < content.len() {
                    match content[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    text_ops
}

/// Which XObject subtypes the page's resources hold: (images, forms)
fn page_xobject_kinds(doc: &Document, page_id: ObjectId) -> (bool, bool) {
    let mut has_images = false;
    let mut has_forms = false;

    let Ok(page_dict) = doc.get_dictionary(page_id) else {
        return (false, false);
    };
    let resources = match page_dict.get(b"Resources") {
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let xobjects = match resources.and_then(|r| r.get(b"XObject").ok()) {
        Some(Object::Reference(id)) => doc.get_dictionary(*id).ok(),
        Some(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };

    for (_, value) in xobjects.into_iter().flat_map(|x| x.iter()) {
        let stream = match value {
            Object::Reference(id) => doc.get_object(*id).and_then(|o| o.as_stream()),
            other => other.as_stream(),
        };
        let Ok(stream) = stream else {
            continue;
        };
        match stream.dict.get(b"Subtype").and_then(|s| s.as_name()) {
            Ok(b"Image") => has_images = true,
            Ok(b"Form") => has_forms = true,
            _ => {}
        }
    }

    (has_images, has_forms)
}

/// Get document title from Info dictionary
fn get_document_title(doc: &Document) -> Option<String> {
    let info_ref = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_dictionary(info_ref).ok()?;

    match info.get(b"Title").ok()? {
        Object::String(bytes, _) => {
            // UTF-16BE with BOM
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let utf16: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                    .collect();
                Some(String::from_utf16_lossy(&utf16))
            } else {
                Some(String::from_utf8_lossy(bytes).to_string())
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_content_operators() {
        let content = b"BT /F1 12 Tf 100 700 Td (600) Tj ET";
        assert_eq!(scan_content_for_text_operators(content), 1);

        let content = b"BT /F1 12 Tf 100 700 Td [(6) 10 (00)] TJ ET";
        assert_eq!(scan_content_for_text_operators(content), 1);

        let content = b"BT 14 TL (300) ' 1 0 (18) \" ET";
        assert_eq!(scan_content_for_text_operators(content), 2);
    }

    #[test]
    fn test_operators_inside_strings_are_ignored() {
        let content = b"BT (Tj TJ (nested) ' ) Tj ET";
        assert_eq!(scan_content_for_text_operators(content), 1);
    }

    #[test]
    fn test_image_only_content() {
        let content = b"q 595 0 0 842 0 0 cm /Im0 Do Q";
        assert_eq!(scan_content_for_text_operators(content), 0);
    }
}
