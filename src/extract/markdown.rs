//! Markdown extractor built on `pulldown-cmark`.
//!
//! Headings keep their `#` depth and list items their nesting depth, so the
//! tree comes from the source structure rather than from numbering
//! detection. A leading YAML front matter block becomes document metadata.

use std::sync::LazyLock;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::block::{Block, BlockKind, Classifier, Detection, Table};
use crate::error::ParseResult;

use super::encoding::decode_text;
use super::{DocumentFormat, DocumentMeta, ExtractContext, Extraction, Extractor};

static RE_FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A---\r?\n(.*?)\r?\n---\r?\n").unwrap());

/// Markdown extractor.
pub struct MarkdownExtractor;

impl Extractor for MarkdownExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Markdown
    }

    fn extract(&self, data: &[u8], ctx: &ExtractContext<'_>) -> ParseResult<Extraction> {
        let (source, _) = decode_text(data);
        let (meta, body) = split_front_matter(&source);
        let mut extraction = Extraction::new(markdown_to_blocks(body, ctx.classifier));
        extraction.meta = meta;
        extraction.numbering = false;
        Ok(extraction)
    }
}

/// Separate and parse a leading `---` YAML block. Malformed YAML is logged
/// and ignored; the block is still removed from the body.
pub fn split_front_matter(source: &str) -> (DocumentMeta, &str) {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let Some(caps) = RE_FRONT_MATTER.captures(source) else {
        return (DocumentMeta::default(), source);
    };
    let body = &source[caps.get(0).map_or(0, |m| m.end())..];
    let yaml = caps.get(1).map_or("", |m| m.as_str());
    let mapping: serde_yaml::Mapping = match serde_yaml::from_str(yaml) {
        Ok(Some(mapping)) => mapping,
        Ok(None) => return (DocumentMeta::default(), body),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed front matter");
            return (DocumentMeta::default(), body);
        }
    };
    let mut meta = DocumentMeta::default();
    for (key, value) in mapping {
        let Some(key) = key.as_str().map(str::to_string) else {
            continue;
        };
        match key.as_str() {
            "title" => meta.title = scalar_string(&value),
            "author" => meta.author = scalar_string(&value),
            "creator" => meta.creator = scalar_string(&value),
            "language" | "lang" => meta.language = scalar_string(&value),
            "isbn" => meta.isbn = scalar_string(&value),
            _ => {
                meta.extra.insert(key, value);
            }
        }
    }
    (meta, body)
}

fn scalar_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

enum Pending {
    Paragraph,
    Heading(u32),
    Item(u32),
    Code,
}

struct ListItemState {
    /// The item's own text has been emitted; later paragraphs are body text.
    emitted: bool,
}

struct Collector<'c> {
    classifier: &'c Classifier,
    blocks: Vec<Block>,
    buf: String,
    link: bool,
    pending: Pending,
    items: Vec<ListItemState>,
    list_depth: u32,
    table: Option<Vec<Vec<String>>>,
    row: Vec<String>,
}

impl<'c> Collector<'c> {
    fn new(classifier: &'c Classifier) -> Self {
        Self {
            classifier,
            blocks: Vec::new(),
            buf: String::new(),
            link: false,
            pending: Pending::Paragraph,
            items: Vec::new(),
            list_depth: 0,
            table: None,
            row: Vec::new(),
        }
    }

    fn flush(&mut self) {
        let text = self.buf.trim().to_string();
        let link = self.link;
        self.buf.clear();
        self.link = false;
        let pending = std::mem::replace(&mut self.pending, Pending::Paragraph);
        if text.is_empty() {
            return;
        }
        let block = match pending {
            Pending::Heading(level) => self.classifier.heading(BlockKind::Heading, text, Some(level)),
            Pending::Item(depth) => {
                if let Some(item) = self.items.last_mut() {
                    item.emitted = true;
                }
                self.classifier.classify(
                    Block::new(BlockKind::ListItem, text)
                        .with_level(depth)
                        .with_link(link),
                    Detection::Off,
                )
            }
            Pending::Code => Block::new(BlockKind::Paragraph, text),
            Pending::Paragraph if link => self.classifier.linked_paragraph(text, Detection::Off),
            Pending::Paragraph => self.classifier.paragraph(text, Detection::Off),
        };
        self.blocks.push(block);
    }

    fn in_open_item(&self) -> bool {
        self.items.last().is_some_and(|i| !i.emitted)
    }

    fn push_text(&mut self, text: &str) {
        if self.table.is_some() {
            if let Some(cell) = self.row.last_mut() {
                cell.push_str(text);
            }
        } else {
            self.buf.push_str(text);
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.flush();
                self.pending = Pending::Heading(level as u32);
            }
            Event::End(TagEnd::Heading(_)) => self.flush(),
            Event::Start(Tag::Paragraph) => {
                if !self.in_open_item() {
                    self.flush();
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if !self.in_open_item() || !self.buf.trim().is_empty() {
                    self.flush();
                }
            }
            Event::Start(Tag::List(_)) => {
                self.flush();
                self.list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                self.flush();
                self.list_depth = self.list_depth.saturating_sub(1);
            }
            Event::Start(Tag::Item) => {
                self.flush();
                self.items.push(ListItemState { emitted: false });
                self.pending = Pending::Item(self.list_depth.max(1));
            }
            Event::End(TagEnd::Item) => {
                self.flush();
                self.items.pop();
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.pending = Pending::Code;
            }
            Event::End(TagEnd::CodeBlock) => self.flush(),
            Event::Start(Tag::Table(_)) => {
                self.flush();
                self.table = Some(Vec::new());
            }
            Event::Start(Tag::TableHead | Tag::TableRow) => self.row.clear(),
            Event::Start(Tag::TableCell) => self.row.push(String::new()),
            Event::End(TagEnd::TableHead | TagEnd::TableRow) => {
                let row = std::mem::take(&mut self.row);
                if let Some(rows) = self.table.as_mut() {
                    rows.push(row.into_iter().map(|c| c.trim().to_string()).collect());
                }
            }
            Event::End(TagEnd::Table) => {
                if let Some(rows) = self.table.take() {
                    let table = Table::new(rows);
                    if !table.is_empty() {
                        self.blocks.push(Block::table(table));
                    }
                }
            }
            Event::Start(Tag::Link { .. }) => {
                if self.table.is_none() {
                    self.link = true;
                }
            }
            Event::Text(text) | Event::Code(text) | Event::InlineHtml(text) => {
                self.push_text(&text)
            }
            Event::SoftBreak | Event::HardBreak => {
                let sep = if matches!(self.pending, Pending::Code) { "\n" } else { " " };
                self.push_text(sep);
            }
            Event::Html(html) => {
                if !matches!(self.pending, Pending::Code) {
                    self.flush();
                    self.pending = Pending::Code;
                }
                self.buf.push_str(&html);
            }
            Event::End(TagEnd::HtmlBlock) | Event::Rule => self.flush(),
            _ => {}
        }
    }
}

/// Convert Markdown source to classified blocks.
pub fn markdown_to_blocks(source: &str, classifier: &Classifier) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let mut collector = Collector::new(classifier);
    for event in Parser::new_ext(source, options) {
        collector.handle(event);
    }
    collector.flush();
    collector.blocks
}
