//! EPUB extractor using the `epub` crate.
//!
//! Spine items are converted to Markdown and split into lines; the nav tree
//! becomes leveled TOC entries.

use std::io::Cursor;

use ::epub::doc::{EpubDoc, NavPoint};

use crate::block::Detection;
use crate::error::{ParseError, ParseResult};

use super::html::markdown_blocks;
use super::{DocumentFormat, DocumentMeta, ExtractContext, Extraction, Extractor, TocEntry, meta_value};

/// EPUB extractor.
pub struct EpubExtractor;

impl Extractor for EpubExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Epub
    }

    fn extract(&self, data: &[u8], ctx: &ExtractContext<'_>) -> ParseResult<Extraction> {
        let mut doc = EpubDoc::from_reader(Cursor::new(data.to_vec()))
            .map_err(|e| ParseError::malformed("epub", e))?;

        let meta = epub_meta(&doc);
        let toc = flatten_nav(&doc.toc);

        let mut blocks = Vec::new();
        for chapter in 0..doc.get_num_chapters() {
            doc.set_current_chapter(chapter);
            let Some((content, _mime)) = doc.get_current_str() else {
                tracing::warn!(origin = ctx.origin, chapter, "unreadable spine item");
                continue;
            };
            if content.trim().is_empty() {
                continue;
            }
            let markdown = html2md::parse_html(&content);
            blocks.extend(markdown_blocks(&markdown, ctx.classifier, Detection::Auto));
        }
        tracing::debug!(
            origin = ctx.origin,
            blocks = blocks.len(),
            toc = toc.len(),
            "epub extracted"
        );

        Ok(Extraction {
            toc,
            meta,
            ..Extraction::new(blocks)
        })
    }
}

fn epub_meta(doc: &EpubDoc<Cursor<Vec<u8>>>) -> DocumentMeta {
    let field = |name: &str| meta_value(doc.mdata(name).map(|m| m.value.clone()));
    let mut meta = DocumentMeta {
        title: field("title"),
        creator: field("creator"),
        language: field("language"),
        ..DocumentMeta::default()
    };
    if let Some(publisher) = field("publisher") {
        meta.extra
            .insert("publisher".into(), serde_yaml::Value::String(publisher));
    }
    meta
}

/// Depth-first flattening of the nav tree; top-level entries are level 1.
pub fn flatten_nav(points: &[NavPoint]) -> Vec<TocEntry> {
    let mut out = Vec::new();
    let mut stack: Vec<(u32, &NavPoint)> = points.iter().rev().map(|p| (1, p)).collect();
    while let Some((level, point)) = stack.pop() {
        let title = point.label.trim();
        if !title.is_empty() {
            out.push(TocEntry::new(title, level));
        }
        stack.extend(point.children.iter().rev().map(|c| (level + 1, c)));
    }
    out
}
