//! Paragraph layout of a paper and the extractors that produce it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use scholarbot_segmenter::{PageTextSource, page_span_text};
use scholarbot_shared::{Paragraph, Result, ScholarbotError};

use crate::pdf::PdfLayoutExtractor;
use crate::store::Document;

/// Pages of paragraphs, plus the bibliographic bits a layout tool could find.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentLayout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    /// Page order, then paragraph order within each page.
    pub pages: Vec<Vec<Paragraph>>,
}

impl DocumentLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

impl PageTextSource for DocumentLayout {
    fn page_range_text(&self, start_page: usize, end_page: usize) -> Result<String> {
        page_span_text(&self.pages, start_page, end_page)
    }
}

/// Turns fetched bytes into a [`DocumentLayout`].
///
/// An implementation only has to report paragraph text and its largest glyph size.
pub trait LayoutExtractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<DocumentLayout>;
}

/// Picks [`PdfLayoutExtractor`] for PDF bytes and [`JsonLayoutExtractor`]
/// for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoLayoutExtractor;

impl LayoutExtractor for AutoLayoutExtractor {
    fn extract(&self, document: &Document) -> Result<DocumentLayout> {
        if is_pdf(&document.bytes) {
            PdfLayoutExtractor.extract(document)
        } else {
            JsonLayoutExtractor.extract(document)
        }
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Reads the JSON layout emitted by an external PDF layout tool:
///
/// ```json
/// { "title": "...", "abstract": "...",
///   "pages": [[{ "text": "1 Introduction", "font_size": 11.96 }]] }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLayoutExtractor;

impl LayoutExtractor for JsonLayoutExtractor {
    fn extract(&self, document: &Document) -> Result<DocumentLayout> {
        if is_pdf(&document.bytes) {
            return Err(ScholarbotError::validation(format!(
                "{} is a PDF, not a JSON layout; use a PDF layout extractor",
                document.id
            )));
        }

        let mut layout: DocumentLayout = serde_json::from_slice(&document.bytes).map_err(|e| {
            ScholarbotError::validation(format!("invalid layout for {}: {e}", document.id))
        })?;

        for (page_index, page) in layout.pages.iter_mut().enumerate() {
            for paragraph in page.iter_mut() {
                if !paragraph.font_size.is_finite() || paragraph.font_size < 0.0 {
                    return Err(ScholarbotError::validation(format!(
                        "page {page_index}: bad font size {}",
                        paragraph.font_size
                    )));
                }
                paragraph.page = page_index;
            }
        }

        debug!(pages = layout.pages.len(), "layout extracted");
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentId;

    fn doc(json: &str) -> Document {
        Document::new(DocumentId::Path("paper.json".into()), json.as_bytes().to_vec())
    }

    const LAYOUT: &str = r#"{
        "title": "Attention Is All You Need",
        "abstract": "The dominant sequence transduction models...",
        "pages": [
            [{"text": "Abstract", "font_size": 12.0}, {"text": "We propose...", "font_size": 10.0}],
            [{"text": "1 Introduction\n", "font_size": 12.0, "page": 7}, {"text": "RNNs...", "font_size": 10.0}]
        ]
    }"#;

    #[test]
    fn extracts_pages_and_metadata() {
        let layout = JsonLayoutExtractor.extract(&doc(LAYOUT)).unwrap();
        assert_eq!(layout.title.as_deref(), Some("Attention Is All You Need"));
        assert!(layout.abstract_text.is_some());
        assert_eq!(layout.page_count(), 2);
        // Page indices come from position, not from the file.
        assert_eq!(layout.pages[1][0].page, 1);
    }

    #[test]
    fn page_text_joins_paragraphs() {
        let layout = JsonLayoutExtractor.extract(&doc(LAYOUT)).unwrap();
        let text = layout.page_range_text(1, 1).unwrap();
        assert_eq!(text, "1 Introduction\n\nRNNs...");
        assert!(layout.page_range_text(0, 2).is_err());
    }

    #[test]
    fn rejects_raw_pdf() {
        let err = JsonLayoutExtractor.extract(&doc("%PDF-1.7 ...")).unwrap_err();
        assert!(err.to_string().contains("not a JSON layout"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = JsonLayoutExtractor.extract(&doc(r#"{"pages": "nope"}"#)).unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn rejects_negative_font_size() {
        let err = JsonLayoutExtractor
            .extract(&doc(r#"{"pages": [[{"text": "x", "font_size": -1.0}]]}"#))
            .unwrap_err();
        assert!(err.to_string().contains("bad font size"));
    }

    #[test]
    fn auto_extractor_routes_by_content() {
        let layout = AutoLayoutExtractor.extract(&doc(LAYOUT)).unwrap();
        assert_eq!(layout.page_count(), 2);

        // PDF bytes reach the PDF reader, whose error differs from the JSON one.
        let err = AutoLayoutExtractor.extract(&doc("%PDF-1.7 truncated")).unwrap_err();
        assert!(!err.to_string().contains("not a JSON layout"));
    }
}
