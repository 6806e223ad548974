//! Paper acquisition: identifiers, per-turn download cache, and layout extraction.
//!
//! A paper is named by a URL or a local path ([`DocumentId`]). The
//! [`DocumentStore`] fetches its bytes once per turn and hands out shared
//! copies afterwards. A [`LayoutExtractor`] then turns the bytes into pages of
//! paragraphs ([`DocumentLayout`]) that the segmenter consumes, reading PDFs
//! directly or JSON layouts produced elsewhere. [`ArxivApi`] supplies the
//! title and abstract of arXiv papers.

pub mod arxiv;
mod layout;
mod pdf;
mod store;

pub use arxiv::{ArxivApi, ArxivEntry};
pub use layout::{AutoLayoutExtractor, DocumentLayout, JsonLayoutExtractor, LayoutExtractor};
pub use pdf::PdfLayoutExtractor;
pub use store::{Document, DocumentId, DocumentStore, FetchOptions};
