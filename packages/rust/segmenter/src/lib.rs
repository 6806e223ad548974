//! Section segmentation for research papers.
//!
//! A paper arrives as pages of paragraphs, each tagged with the largest glyph
//! size it contains. Headings are recognised typographically: the size of the
//! first paragraph mentioning the introduction keyword becomes the header size,
//! and every later paragraph set at that size opens a new section. Front matter
//! (up to the abstract heading) and back matter (from the references heading on)
//! are trimmed away.
//!
//! The heuristic is intentionally simple and has known blind spots:
//! - a paper without an introduction paragraph yields no sections at all;
//! - a body paragraph rendered at heading size (a pull-quote, say) opens a
//!   spurious section;
//! - only a literal abstract keyword triggers front trimming. When the first
//!   heading is the introduction itself nothing is trimmed, so the introduction
//!   stays in the body.

use serde::Serialize;
use tracing::{debug, instrument};

use scholarbot_shared::{Paragraph, Result, ScholarbotError, Section, SegmenterConfig};

// ---------------------------------------------------------------------------
// Page text access
// ---------------------------------------------------------------------------

/// Supplies the extracted text of an inclusive page range.
pub trait PageTextSource {
    fn page_range_text(&self, start_page: usize, end_page: usize) -> Result<String>;
}

/// Join the paragraph text of pages `start_page..=end_page`.
///
/// Paragraphs are separated by a blank line. Fails when the range falls
/// outside the document.
pub fn page_span_text(
    pages: &[Vec<Paragraph>],
    start_page: usize,
    end_page: usize,
) -> Result<String> {
    if start_page > end_page || end_page >= pages.len() {
        return Err(ScholarbotError::validation(format!(
            "page range {start_page}..={end_page} outside document of {} pages",
            pages.len()
        )));
    }

    let text = pages[start_page..=end_page]
        .iter()
        .flatten()
        .map(|p| p.text.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(text)
}

// ---------------------------------------------------------------------------
// SegmentedPaper
// ---------------------------------------------------------------------------

/// Immutable result of segmenting one paper.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentedPaper {
    sections: Vec<Section>,
    page_count: usize,
    header_font_size: Option<f32>,
}

impl SegmentedPaper {
    /// Body sections in document order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Glyph size that was used to recognise headings, if one was found.
    pub fn header_font_size(&self) -> Option<f32> {
        self.header_font_size
    }

    /// Look up a section by exact name (first occurrence).
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Extract the text of the named section from `source`.
    ///
    /// The section's heading must appear verbatim in the extracted text; if it
    /// does not, the page index is out of step with the source and a
    /// [`ScholarbotError::StructuralInconsistency`] is returned.
    pub fn section_text(&self, name: &str, source: &dyn PageTextSource) -> Result<String> {
        let section = self
            .section(name)
            .ok_or_else(|| ScholarbotError::section_not_found(name))?;

        let text = source.page_range_text(section.start_page, section.end_page)?;

        if !text.contains(section.name.as_str()) {
            return Err(ScholarbotError::structural(format!(
                "heading {:?} missing from pages {}..={}",
                section.name, section.start_page, section.end_page
            )));
        }

        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Split page-ordered paragraphs into named body sections.
///
/// 1. Fix the header size at the first paragraph containing the introduction keyword
/// 2. Record every paragraph at that size (within tolerance) as a heading
/// 3. Close each section at the next heading's page, the last at the final page
/// 4. Trim front matter through the abstract heading
/// 5. Trim back matter from the first references/citations heading
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn segment(pages: &[Vec<Paragraph>], config: &SegmenterConfig) -> Result<SegmentedPaper> {
    let page_count = pages.len();

    let mut header_font_size: Option<f32> = None;
    let mut names: Vec<String> = Vec::new();
    let mut start_pages: Vec<usize> = Vec::new();

    for (page_index, page) in pages.iter().enumerate() {
        for paragraph in page {
            if header_font_size.is_none()
                && paragraph.text.contains(config.introduction_keyword.as_str())
            {
                debug!(
                    page = page_index,
                    size = paragraph.font_size,
                    "header font size fixed"
                );
                header_font_size = Some(paragraph.font_size);
            }

            let Some(header_size) = header_font_size else {
                continue;
            };

            let name = paragraph.text.trim();
            // Written as a negated `<` so NaN sizes never match.
            let same_size = (paragraph.font_size - header_size).abs() < config.font_size_tolerance;
            if name.is_empty() || !same_size {
                continue;
            }

            names.push(name.to_string());
            start_pages.push(page_index);
        }
    }

    let mut end_pages: Vec<usize> = start_pages.iter().skip(1).copied().collect();
    if !start_pages.is_empty() {
        end_pages.push(page_count.saturating_sub(1));
    }

    // Front matter: everything through the abstract heading.
    let mut abstract_index = None;
    for (i, name) in names.iter().enumerate() {
        if name.contains(config.abstract_keyword.as_str()) {
            abstract_index = Some(i);
            break;
        }
        if name.contains(config.introduction_keyword.as_str()) {
            break;
        }
    }
    if let Some(i) = abstract_index {
        names.drain(..=i);
        start_pages.drain(..=i);
        end_pages.drain(..=i);
    }

    // Back matter: the references heading and everything after it.
    let back_matter_index = names.iter().position(|name| {
        config
            .back_matter_keywords
            .iter()
            .any(|keyword| name.contains(keyword.as_str()))
    });
    if let Some(i) = back_matter_index {
        names.truncate(i);
        start_pages.truncate(i);
        end_pages.truncate(i);
    }

    if names.len() != start_pages.len() || start_pages.len() != end_pages.len() {
        return Err(ScholarbotError::structural(format!(
            "{} names, {} start pages, {} end pages",
            names.len(),
            start_pages.len(),
            end_pages.len()
        )));
    }

    let sections: Vec<Section> = names
        .into_iter()
        .zip(start_pages)
        .zip(end_pages)
        .map(|((name, start_page), end_page)| Section {
            name,
            start_page,
            end_page,
        })
        .collect();

    debug!(
        sections = sections.len(),
        header_font_size = ?header_font_size,
        "segmentation complete"
    );

    Ok(SegmentedPaper {
        sections,
        page_count,
        header_font_size,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
