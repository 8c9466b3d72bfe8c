//! MOBI extractor using the `mobi` crate.
//!
//! The embedded HTML TOC is made of `filepos` anchors; those anchors become
//! TOC entries and are removed from the body before it is converted to
//! Markdown lines.

use std::sync::LazyLock;

use ::mobi::Mobi;
use ::mobi::headers::Language;
use regex::Regex;
use scraper::{Html, Selector};

use crate::block::Detection;
use crate::error::{ParseError, ParseResult};

use super::html::markdown_blocks;
use super::{DocumentFormat, DocumentMeta, ExtractContext, Extraction, Extractor, TocEntry, meta_value};

static RE_FILEPOS_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\s[^>]*filepos[^>]*>.*?</a>").unwrap());

/// MOBI extractor.
pub struct MobiExtractor;

impl Extractor for MobiExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Mobi
    }

    fn extract(&self, data: &[u8], ctx: &ExtractContext<'_>) -> ParseResult<Extraction> {
        let book = Mobi::new(data.to_vec()).map_err(|e| ParseError::malformed("mobi", e))?;
        let meta = mobi_meta(&book);
        let content = book.content_as_string_lossy();

        let toc = anchor_toc(&content);
        let body = RE_FILEPOS_ANCHOR.replace_all(&content, "");
        let markdown = html2md::parse_html(&body);
        let blocks = markdown_blocks(&markdown, ctx.classifier, Detection::Auto);
        tracing::debug!(
            origin = ctx.origin,
            blocks = blocks.len(),
            toc = toc.len(),
            "mobi extracted"
        );

        Ok(Extraction {
            toc,
            meta,
            ..Extraction::new(blocks)
        })
    }
}

fn mobi_meta(book: &Mobi) -> DocumentMeta {
    let language = book.language();
    DocumentMeta {
        title: meta_value(Some(book.title())),
        creator: meta_value(book.author()),
        isbn: meta_value(book.isbn()),
        language: (language != Language::Neutral).then(|| format!("{language:?}")),
        ..DocumentMeta::default()
    }
}

/// TOC entries from `filepos` anchors, in document order.
pub fn anchor_toc(html: &str) -> Vec<TocEntry> {
    let doc = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[filepos]") else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|a| {
            let text = a.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then(|| TocEntry::new(text, 1))
        })
        .collect()
}
