//! Format extractors and format detection.
//!
//! Each supported format implements [`Extractor`], turning raw bytes into a
//! flat, ordered sequence of classified blocks plus an optional native table
//! of contents and document metadata. [`extractor_for`] returns the right
//! extractor for a [`DocumentFormat`].

pub mod doc;
pub mod docx;
pub mod encoding;
pub mod epub;
pub mod html;
pub mod markdown;
pub mod mobi;
pub mod pdf;
pub mod txt;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::block::{Block, Classifier};
use crate::config::ParserConfig;
use crate::error::ParseResult;

/// Everything an extractor needs besides the bytes.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub config: &'a ParserConfig,
    pub classifier: &'a Classifier,
    /// Source path, for diagnostics.
    pub origin: &'a str,
}

/// Trait for format-specific extractors.
pub trait Extractor: Send + Sync {
    /// Extract classified blocks from raw file bytes.
    fn extract(&self, data: &[u8], ctx: &ExtractContext<'_>) -> ParseResult<Extraction>;

    /// The format this extractor handles.
    fn format(&self) -> DocumentFormat;
}

/// Flat output of one extractor run.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Blocks in reading order, already classified.
    pub blocks: Vec<Block>,
    /// Native navigation entries (PDF outline, EPUB nav, MOBI TOC).
    pub toc: Vec<TocEntry>,
    pub meta: DocumentMeta,
    /// Whether display numbering is synthesized for unnumbered headings.
    pub numbering: bool,
}

impl Extraction {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            numbering: true,
            ..Self::default()
        }
    }
}

/// A native table-of-contents entry. `level` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub title: String,
    pub level: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl TocEntry {
    pub fn new(title: impl Into<String>, level: u32) -> Self {
        Self {
            title: title.into(),
            level,
            page: None,
        }
    }
}

/// Document metadata carried into the front matter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Ebook contributor: EPUB `dc:creator` or the MOBI author.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub image_count: usize,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl DocumentMeta {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.creator.is_none()
            && self.language.is_none()
            && self.isbn.is_none()
            && self.image_count == 0
            && self.extra.is_empty()
    }
}

/// Trimmed, non-empty metadata value.
pub(crate) fn meta_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Docx,
    Doc,
    Pdf,
    Epub,
    Mobi,
    Html,
    Txt,
    Markdown,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 8] = [
        DocumentFormat::Docx,
        DocumentFormat::Doc,
        DocumentFormat::Pdf,
        DocumentFormat::Epub,
        DocumentFormat::Mobi,
        DocumentFormat::Html,
        DocumentFormat::Txt,
        DocumentFormat::Markdown,
    ];

    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extensions().contains(&ext.as_str()))
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            DocumentFormat::Docx => &["docx"],
            DocumentFormat::Doc => &["doc"],
            DocumentFormat::Pdf => &["pdf"],
            DocumentFormat::Epub => &["epub"],
            DocumentFormat::Mobi => &["mobi", "azw", "prc"],
            DocumentFormat::Html => &["html", "htm", "xhtml"],
            DocumentFormat::Txt => &["txt", "text"],
            DocumentFormat::Markdown => &["md", "markdown"],
        }
    }

    /// Value of the `file_format` front matter key.
    pub fn label(self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Epub => "epub",
            DocumentFormat::Mobi => "mobi",
            DocumentFormat::Html => "html",
            DocumentFormat::Txt => "txt",
            DocumentFormat::Markdown => "md",
        }
    }
}

/// Get the extractor for a format.
///
/// The PDF extractor picks up an OCR engine when OCR is enabled and
/// credentials are configured.
pub fn extractor_for(format: DocumentFormat, config: &ParserConfig) -> Box<dyn Extractor> {
    match format {
        DocumentFormat::Docx => Box::new(docx::DocxExtractor),
        DocumentFormat::Doc => Box::new(doc::DocExtractor::default()),
        DocumentFormat::Pdf => Box::new(pdf::PdfExtractor::from_config(config)),
        DocumentFormat::Epub => Box::new(epub::EpubExtractor),
        DocumentFormat::Mobi => Box::new(mobi::MobiExtractor),
        DocumentFormat::Html => Box::new(html::HtmlExtractor),
        DocumentFormat::Txt => Box::new(txt::TxtExtractor::default()),
        DocumentFormat::Markdown => Box::new(markdown::MarkdownExtractor),
    }
}
