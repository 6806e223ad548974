//! Paragraph layout straight from PDF content streams.
//!
//! Text-showing operators are collected into lines (a new line starts at every
//! vertical move), and consecutive lines at the same effective glyph size and
//! normal line spacing are merged into paragraphs. Each paragraph reports the
//! largest glyph size among its lines. Fonts are decoded as Latin-1, or
//! UTF-16 when the string carries a byte-order mark; multi-column reflow,
//! tables and figures are not handled.

use lopdf::content::{Content, Operation};
use lopdf::{Document as PdfDocument, Object};
use tracing::{debug, warn};

use scholarbot_shared::{Paragraph, Result, ScholarbotError};

use crate::layout::{DocumentLayout, LayoutExtractor};
use crate::store::Document;

/// `TJ` adjustments (thousandths of an em) wider than this separate words.
const SAME_WORD_THRESHOLD: f32 = 60.0;
/// Lines whose sizes differ by less than this belong to the same paragraph.
const LINE_SIZE_TOLERANCE: f32 = 0.5;
/// Largest baseline gap, in multiples of the glyph size, inside one paragraph.
const MAX_LINE_GAP: f32 = 1.6;

/// Reads PDF bytes with `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLayoutExtractor;

impl LayoutExtractor for PdfLayoutExtractor {
    fn extract(&self, document: &Document) -> Result<DocumentLayout> {
        let pdf = PdfDocument::load_mem(&document.bytes).map_err(|e| {
            ScholarbotError::validation(format!("unreadable PDF {}: {e}", document.id))
        })?;

        let mut pages = Vec::new();
        for (page_index, (_, page_id)) in pdf.get_pages().into_iter().enumerate() {
            let operations = match pdf
                .get_page_content(page_id)
                .and_then(|raw| Content::decode(&raw))
            {
                Ok(content) => content.operations,
                Err(e) => {
                    warn!(page = page_index, error = %e, "page content unreadable, left empty");
                    Vec::new()
                }
            };
            pages.push(page_paragraphs(&operations, page_index));
        }

        debug!(pages = pages.len(), "PDF layout extracted");
        Ok(DocumentLayout {
            title: info_title(&pdf),
            abstract_text: None,
            pages,
        })
    }
}

// ---------------------------------------------------------------------------
// Content stream walking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Line {
    text: String,
    size: f32,
    y: f32,
}

/// Text state carried across operators of one page.
struct TextWalker {
    font_size: f32,
    /// Vertical scale of the text matrix.
    scale: f32,
    leading: f32,
    y: f32,
    current: Line,
    lines: Vec<Line>,
}

impl TextWalker {
    fn new() -> Self {
        Self {
            font_size: 0.0,
            scale: 1.0,
            leading: 0.0,
            y: 0.0,
            current: Line {
                text: String::new(),
                size: 0.0,
                y: 0.0,
            },
            lines: Vec::new(),
        }
    }

    fn apply(&mut self, op: &Operation) {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                self.break_line();
                self.scale = 1.0;
                self.y = 0.0;
            }
            "ET" => self.break_line(),
            "Tf" => self.font_size = number(operands, 1).abs(),
            "TL" => self.leading = number(operands, 0),
            "Td" | "TD" => {
                let (tx, ty) = (number(operands, 0), number(operands, 1));
                if op.operator == "TD" {
                    self.leading = -ty;
                }
                if ty != 0.0 {
                    self.break_line();
                    self.y += ty * self.scale;
                } else if tx != 0.0 {
                    self.word_gap();
                }
            }
            "Tm" => {
                let (c, d, f) = (number(operands, 2), number(operands, 3), number(operands, 5));
                let scale = c.hypot(d);
                self.scale = if scale > 0.0 { scale } else { 1.0 };
                if (f - self.y).abs() > f32::EPSILON {
                    self.break_line();
                    self.y = f;
                } else {
                    self.word_gap();
                }
            }
            "T*" => self.next_line(),
            "Tj" => self.show(operands.first()),
            "'" => {
                self.next_line();
                self.show(operands.first());
            }
            "\"" => {
                self.next_line();
                self.show(operands.get(2));
            }
            "TJ" => {
                let Some(Object::Array(items)) = operands.first() else {
                    return;
                };
                for item in items {
                    match item {
                        Object::String(..) => self.show(Some(item)),
                        other => {
                            if other.as_float().is_ok_and(|n| n < -SAME_WORD_THRESHOLD) {
                                self.word_gap();
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn next_line(&mut self) {
        self.break_line();
        self.y -= self.leading * self.scale;
    }

    fn show(&mut self, operand: Option<&Object>) {
        let Some(Object::String(bytes, _)) = operand else {
            return;
        };
        let text = decode_pdf_string(bytes);
        if text.trim().is_empty() {
            self.word_gap();
            return;
        }
        if self.current.text.is_empty() {
            self.current.y = self.y;
        }
        self.current.text.push_str(&text);
        self.current.size = self.current.size.max(self.font_size * self.scale);
    }

    fn word_gap(&mut self) {
        if !self.current.text.is_empty() && !self.current.text.ends_with(char::is_whitespace) {
            self.current.text.push(' ');
        }
    }

    fn break_line(&mut self) {
        let text = self.current.text.trim();
        if !text.is_empty() {
            self.lines.push(Line {
                text: text.to_string(),
                size: self.current.size,
                y: self.current.y,
            });
        }
        self.current.text.clear();
        self.current.size = 0.0;
    }

    fn finish(mut self) -> Vec<Line> {
        self.break_line();
        self.lines
    }
}

/// Walk one page's operators and group its lines into paragraphs.
fn page_paragraphs(operations: &[Operation], page: usize) -> Vec<Paragraph> {
    let mut walker = TextWalker::new();
    for op in operations {
        walker.apply(op);
    }
    group_lines(walker.finish(), page)
}

fn group_lines(lines: Vec<Line>, page: usize) -> Vec<Paragraph> {
    let mut paragraphs: Vec<Paragraph> = Vec::new();
    let mut previous: Option<Line> = None;

    for line in lines {
        let continues = previous.as_ref().is_some_and(|prev| {
            let gap = prev.y - line.y;
            (prev.size - line.size).abs() < LINE_SIZE_TOLERANCE
                && gap > 0.0
                && gap <= MAX_LINE_GAP * line.size.max(prev.size)
        });

        match paragraphs.last_mut() {
            Some(paragraph) if continues => {
                paragraph.text.push('\n');
                paragraph.text.push_str(&line.text);
                paragraph.font_size = paragraph.font_size.max(line.size);
            }
            _ => paragraphs.push(Paragraph::new(line.text.as_str(), line.size, page)),
        }
        previous = Some(line);
    }

    paragraphs
}

fn number(operands: &[Object], index: usize) -> f32 {
    operands
        .get(index)
        .and_then(|o| o.as_float().ok())
        .unwrap_or(0.0)
}

/// Decode a PDF text string: UTF-16BE with a byte-order mark, otherwise
/// Latin-1 with the TeX ligature slots mapped back to letters.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    let mut text = String::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            0x0B => text.push_str("ff"),
            0x0C => text.push_str("fi"),
            0x0D => text.push_str("fl"),
            0x0E => text.push_str("ffi"),
            0x0F => text.push_str("ffl"),
            b if b < 0x20 || b == 0x7F => {}
            b => text.push(char::from(b)),
        }
    }
    text
}

/// `/Title` from the document information dictionary, if any.
fn info_title(pdf: &PdfDocument) -> Option<String> {
    let info = match pdf.trailer.get(b"Info").ok()? {
        Object::Reference(id) => pdf.get_object(*id).ok()?,
        other => other,
    };
    let Object::Dictionary(info) = info else {
        return None;
    };
    let Object::String(bytes, _) = info.get(b"Title").ok()? else {
        return None;
    };
    let title = decode_pdf_string(bytes).trim().to_string();
    (!title.is_empty()).then_some(title)
}

#[cfg(test)]
mod tests {
    use lopdf::{Stream, dictionary};

    use scholarbot_segmenter::{PageTextSource, segment};
    use scholarbot_shared::SegmenterConfig;

    use super::*;
    use crate::store::DocumentId;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn text_block(size: i64, x: i64, y: i64, lines: &[&str]) -> Vec<Operation> {
        let mut ops = vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), size.into()]),
            op("Td", vec![x.into(), y.into()]),
        ];
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ops.push(op("Td", vec![0.into(), (-(size + 2)).into()]));
            }
            ops.push(op("Tj", vec![Object::string_literal(*line)]));
        }
        ops.push(op("ET", vec![]));
        ops
    }

    /// A three-page paper: front matter, a method page whose heading is
    /// scaled through the text matrix, and references.
    fn sample_pdf() -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let first = [
            text_block(20, 72, 740, &["A Study of Things"]),
            text_block(14, 72, 700, &["Abstract"]),
            text_block(10, 72, 680, &["We study things", "in detail."]),
            text_block(14, 72, 640, &["1 Introduction"]),
            text_block(10, 72, 620, &["Things matter."]),
        ]
        .concat();
        let second = [
            vec![
                op("BT", vec![]),
                op("Tf", vec!["F1".into(), 1.into()]),
                op(
                    "Tm",
                    vec![14.into(), 0.into(), 0.into(), 14.into(), 72.into(), 740.into()],
                ),
                op(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal("2"),
                        (-500).into(),
                        Object::string_literal("Method"),
                    ])],
                ),
                op("ET", vec![]),
            ],
            text_block(10, 72, 720, &["We did e\u{e}cient things."]),
        ]
        .concat();
        let third = [
            text_block(14, 72, 740, &["References"]),
            text_block(10, 72, 720, &["[1] Someone."]),
        ]
        .concat();

        let mut kids: Vec<Object> = Vec::new();
        for operations in [first, second, third] {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => 3,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn extract_sample() -> DocumentLayout {
        let document = Document::new(DocumentId::Path("paper.pdf".into()), sample_pdf());
        PdfLayoutExtractor.extract(&document).unwrap()
    }

    #[test]
    fn paragraphs_carry_their_glyph_size() {
        let layout = extract_sample();
        assert_eq!(layout.page_count(), 3);

        let first: Vec<(&str, f32)> = layout.pages[0]
            .iter()
            .map(|p| (p.text.as_str(), p.font_size))
            .collect();
        assert_eq!(
            first,
            vec![
                ("A Study of Things", 20.0),
                ("Abstract", 14.0),
                ("We study things\nin detail.", 10.0),
                ("1 Introduction", 14.0),
                ("Things matter.", 10.0),
            ]
        );
        assert!(layout.pages[2].iter().all(|p| p.page == 2));
    }

    #[test]
    fn text_matrix_scale_and_tj_spacing_are_applied() {
        let layout = extract_sample();
        let heading = &layout.pages[1][0];
        assert_eq!(heading.text, "2 Method");
        assert_eq!(heading.font_size, 14.0);
        assert_eq!(layout.pages[1][1].text, "We did efficient things.");
    }

    #[test]
    fn extracted_pdf_segments_like_a_paper() {
        let layout = extract_sample();
        let paper = segment(&layout.pages, &SegmenterConfig::default()).unwrap();
        let names: Vec<&str> = paper.section_names().collect();
        assert_eq!(names, vec!["1 Introduction", "2 Method"]);

        let text = paper.section_text("2 Method", &layout).unwrap();
        assert!(text.starts_with("2 Method"));
        assert!(text.contains("References"));
        assert_eq!(layout.page_range_text(1, 1).unwrap(), "2 Method\n\nWe did efficient things.");
    }

    #[test]
    fn garbage_is_a_validation_error() {
        let document =
            Document::new(DocumentId::Path("x.pdf".into()), b"definitely not a PDF".to_vec());
        let err = PdfLayoutExtractor.extract(&document).unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn strings_decode_latin1_ligatures_and_utf16() {
        assert_eq!(decode_pdf_string(b"e\x0Ecient caf\xE9"), "efficient café");
        assert_eq!(
            decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]),
            "Hi"
        );
    }

    #[test]
    fn line_grouping_splits_on_size_and_gap() {
        let line = |text: &str, size: f32, y: f32| Line {
            text: text.into(),
            size,
            y,
        };
        let paragraphs = group_lines(
            vec![
                line("3 Results", 14.0, 700.0),
                line("It worked", 10.0, 680.0),
                line("really well.", 10.0, 668.0),
                line("New paragraph.", 10.0, 630.0),
                line("Next column.", 10.0, 700.0),
            ],
            4,
        );
        let texts: Vec<&str> = paragraphs.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "3 Results",
                "It worked\nreally well.",
                "New paragraph.",
                "Next column."
            ]
        );
        assert!(paragraphs.iter().all(|p| p.page == 4));
    }
}
