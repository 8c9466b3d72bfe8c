//! HTML extractor.
//!
//! The page is converted to Markdown with `html2md` and then treated line by
//! line like plain text. Link syntax is reduced to its label and marks the
//! block as linked, which is what lets table-of-contents entries collapse
//! under a TOC title. EPUB and MOBI reuse [`markdown_blocks`].

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::block::{Block, Classifier, Detection};
use crate::error::ParseResult;
use crate::text::cleanup::pure_text;

use super::encoding::decode_text;
use super::{DocumentFormat, DocumentMeta, ExtractContext, Extraction, Extractor, meta_value};

static RE_IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static RE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").unwrap());
static RE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([\\`*_{}\[\]()#+\-.!|>])").unwrap());
static RE_RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[=\-*_\s|:]+$").unwrap());
static RE_BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:[*+\->]\s+)+").unwrap());

/// HTML extractor.
pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Html
    }

    fn extract(&self, data: &[u8], ctx: &ExtractContext<'_>) -> ParseResult<Extraction> {
        let (source, _) = decode_text(data);
        let meta = html_meta(&source);
        let markdown = html2md::parse_html(&source);
        let mut extraction = Extraction::new(markdown_blocks(
            &markdown,
            ctx.classifier,
            Detection::Auto,
        ));
        extraction.meta = meta;
        Ok(extraction)
    }
}

/// Classify the lines of `html2md` output.
pub fn markdown_blocks(markdown: &str, classifier: &Classifier, detection: Detection) -> Vec<Block> {
    markdown
        .lines()
        .filter_map(clean_line)
        .map(|(text, has_link)| {
            if has_link {
                classifier.linked_paragraph(text, detection)
            } else {
                classifier.paragraph(text, detection)
            }
        })
        .collect()
}

/// Strip Markdown syntax from one line. Returns the text and whether it held
/// a link, or `None` when nothing readable is left.
fn clean_line(line: &str) -> Option<(String, bool)> {
    let line = line.trim();
    if line.is_empty() || RE_RULE.is_match(line) {
        return None;
    }
    let line = RE_IMAGE.replace_all(line, "");
    let has_link = RE_LINK.is_match(&line);
    let line = RE_LINK.replace_all(&line, "$1");
    let line = RE_BULLET.replace(line.trim(), "");
    let line = RE_ESCAPE.replace_all(&line, "$1");
    let line = pure_text(line.trim());
    let line = line.trim();
    if line.is_empty() {
        None
    } else {
        Some((line.to_string(), has_link))
    }
}

/// Title, author and language from the document head.
pub fn html_meta(source: &str) -> DocumentMeta {
    let html = Html::parse_document(source);
    let first_text = |selector: &str| -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        let text = html.select(&sel).next()?.text().collect::<String>();
        meta_value(Some(text))
    };
    let first_attr = |selector: &str, attr: &str| -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        let value = html.select(&sel).next()?.value().attr(attr)?;
        meta_value(Some(value.to_string()))
    };
    DocumentMeta {
        title: first_text("title"),
        author: first_attr(r#"meta[name="author"]"#, "content"),
        language: first_attr("html", "lang"),
        ..DocumentMeta::default()
    }
}
