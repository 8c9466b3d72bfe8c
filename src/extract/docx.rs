//! DOCX extractor: `zip` for the container, `quick-xml` for the parts.
//!
//! Paragraph kinds come from style names (resolved through `styles.xml`):
//! outline styles give leveled headings, `toc N` styles give TOC items,
//! `List*` styles give list items, and native numbering (`numPr`, direct or
//! inherited from the style) gives numbered items. Everything else is a
//! body paragraph classified from its text.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::block::{Block, BlockKind, Classifier, Detection, NumberingStyle, Table};
use crate::error::{ParseError, ParseResult};
use crate::toc::reconcile_inline;

use super::{DocumentFormat, DocumentMeta, ExtractContext, Extraction, Extractor, meta_value};

/// DOCX extractor.
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn extract(&self, data: &[u8], ctx: &ExtractContext<'_>) -> ParseResult<Extraction> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(data)).map_err(|e| ParseError::malformed("docx", e))?;

        let document = read_part(&mut archive, "word/document.xml")?
            .ok_or_else(|| ParseError::malformed("docx", "missing word/document.xml"))?;
        let styles = match read_part(&mut archive, "word/styles.xml")? {
            Some(xml) => read_styles(&xml)?,
            None => StyleMap::default(),
        };
        let meta = match read_part(&mut archive, "docProps/core.xml")? {
            Some(xml) => read_core(&xml),
            None => DocumentMeta::default(),
        };

        let mut blocks = read_document(&document, &styles, ctx.classifier)?;
        let matched = reconcile_inline(&mut blocks);
        tracing::debug!(
            origin = ctx.origin,
            blocks = blocks.len(),
            toc_matched = matched,
            "docx extracted"
        );

        Ok(Extraction {
            meta,
            ..Extraction::new(blocks)
        })
    }
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> ParseResult<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ParseError::malformed("docx", e)),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| ParseError::malformed("docx", format!("{name}: {e}")))?;
    Ok(Some(content))
}

/// A `numPr` reference: numbering definition and indent level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct NumRef {
    num_id: u32,
    ilvl: u32,
}

#[derive(Debug, Clone, Default)]
struct StyleDef {
    name: String,
    based_on: Option<String>,
    num: Option<NumRef>,
}

/// Paragraph styles by style id.
#[derive(Debug, Default)]
pub struct StyleMap {
    styles: HashMap<String, StyleDef>,
}

impl StyleMap {
    /// Display name of a style id, falling back to the id itself.
    pub fn name_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.styles.get(id).map(|s| s.name.as_str()).unwrap_or(id)
    }

    /// Numbering inherited through the `basedOn` chain.
    fn numbering_of(&self, id: &str) -> Option<NumRef> {
        let mut current = self.styles.get(id);
        for _ in 0..16 {
            let style = current?;
            if style.num.is_some() {
                return style.num;
            }
            current = style.based_on.as_deref().and_then(|b| self.styles.get(b));
        }
        None
    }
}

fn attr(reader: &Reader<&[u8]>, e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.decode_and_unescape_value(reader).ok())
        .map(|v| v.to_string())
}

fn attr_u32(reader: &Reader<&[u8]>, e: &BytesStart<'_>, key: &[u8]) -> Option<u32> {
    attr(reader, e, key).and_then(|v| v.trim().parse().ok())
}

/// Parse `word/styles.xml`.
pub fn read_styles(xml: &str) -> ParseResult<StyleMap> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut map = StyleMap::default();
    let mut current: Option<(String, StyleDef)> = None;
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ParseError::malformed("docx", e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"style" => {
                    if let Some(id) = attr(&reader, e, b"styleId") {
                        current = Some((id, StyleDef::default()));
                    }
                }
                b"name" => {
                    if let (Some((_, def)), Some(name)) = (current.as_mut(), attr(&reader, e, b"val")) {
                        def.name = name;
                    }
                }
                b"basedOn" => {
                    if let Some((_, def)) = current.as_mut() {
                        def.based_on = attr(&reader, e, b"val");
                    }
                }
                b"ilvl" => {
                    if let Some((_, def)) = current.as_mut() {
                        def.num.get_or_insert_with(NumRef::default).ilvl =
                            attr_u32(&reader, e, b"val").unwrap_or(0);
                    }
                }
                b"numId" => {
                    if let Some((_, def)) = current.as_mut() {
                        def.num.get_or_insert_with(NumRef::default).num_id =
                            attr_u32(&reader, e, b"val").unwrap_or(0);
                    }
                }
                _ => {}
            },
            Event::End(ref e) if e.local_name().as_ref() == b"style" => {
                if let Some((id, mut def)) = current.take() {
                    if def.num.is_some_and(|n| n.num_id == 0) {
                        def.num = None;
                    }
                    map.styles.insert(id, def);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(map)
}

/// What a paragraph style name says about the paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleClass {
    Heading(u32),
    TocItem(u32),
    List,
    Body,
}

fn classify_style_name(name: &str) -> StyleClass {
    let lower = name.trim().to_lowercase();
    for prefix in ["heading", "mach", "fwb_l"] {
        if let Some(n) = lower.strip_prefix(prefix).and_then(|r| r.trim().parse::<u32>().ok()) {
            return StyleClass::Heading(n.max(1));
        }
    }
    if let Some(n) = lower.strip_prefix("toc").and_then(|r| r.trim().parse::<u32>().ok()) {
        return StyleClass::TocItem(n.max(1));
    }
    if lower.starts_with("list") {
        return StyleClass::List;
    }
    StyleClass::Body
}

#[derive(Default)]
struct Paragraph {
    style_id: Option<String>,
    num: Option<NumRef>,
    text: String,
    has_link: bool,
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

/// Parse `word/document.xml` into blocks in reading order.
pub fn read_document(xml: &str, styles: &StyleMap, classifier: &Classifier) -> ParseResult<Vec<Block>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut blocks = Vec::new();
    let mut paras: Vec<Paragraph> = Vec::new();
    let mut tables: Vec<TableState> = Vec::new();
    let mut in_run = false;
    let mut in_text = false;
    let mut in_num_pr = false;
    let mut link_depth = 0usize;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ParseError::malformed("docx", e))?;
        match event {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"p" => paras.push(Paragraph::default()),
                b"r" => in_run = true,
                b"t" => in_text = true,
                b"hyperlink" => link_depth += 1,
                b"numPr" => in_num_pr = true,
                b"tbl" => tables.push(TableState::default()),
                b"tr" => {
                    if let Some(t) = tables.last_mut() {
                        t.row.clear();
                    }
                }
                b"tc" => {
                    if let Some(t) = tables.last_mut() {
                        t.cell.clear();
                    }
                }
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"pStyle" => {
                    if let Some(p) = paras.last_mut() {
                        p.style_id = attr(&reader, e, b"val");
                    }
                }
                b"ilvl" if in_num_pr => {
                    if let Some(p) = paras.last_mut() {
                        p.num.get_or_insert_with(NumRef::default).ilvl =
                            attr_u32(&reader, e, b"val").unwrap_or(0);
                    }
                }
                b"numId" if in_num_pr => {
                    if let Some(p) = paras.last_mut() {
                        p.num.get_or_insert_with(NumRef::default).num_id =
                            attr_u32(&reader, e, b"val").unwrap_or(0);
                    }
                }
                b"tab" if in_run => {
                    if let Some(p) = paras.last_mut() {
                        p.text.push('\t');
                    }
                }
                b"br" | b"cr" if in_run => {
                    if let Some(p) = paras.last_mut() {
                        p.text.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(ref e) if in_text => {
                if let Some(p) = paras.last_mut() {
                    let text = e.unescape().map_err(|e| ParseError::malformed("docx", e))?;
                    p.text.push_str(&text);
                    if link_depth > 0 {
                        p.has_link = true;
                    }
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => in_run = false,
                b"hyperlink" => link_depth = link_depth.saturating_sub(1),
                b"numPr" => in_num_pr = false,
                b"p" => {
                    if let Some(p) = paras.pop() {
                        match tables.last_mut() {
                            Some(table) => {
                                let text = p.text.trim();
                                if !text.is_empty() {
                                    if !table.cell.is_empty() {
                                        table.cell.push(' ');
                                    }
                                    table.cell.push_str(text);
                                }
                            }
                            None => blocks.extend(paragraph_block(p, styles, classifier)),
                        }
                    }
                }
                b"tc" => {
                    if let Some(t) = tables.last_mut() {
                        let cell = std::mem::take(&mut t.cell).replace('\n', " ");
                        t.row.push(cell.trim().to_string());
                    }
                }
                b"tr" => {
                    if let Some(t) = tables.last_mut() {
                        let row = std::mem::take(&mut t.row);
                        t.rows.push(row);
                    }
                }
                b"tbl" => {
                    if let Some(done) = tables.pop() {
                        let table = Table::new(done.rows);
                        match tables.last_mut() {
                            // Nested tables flatten into the enclosing cell.
                            Some(outer) => {
                                let text = table.to_text().replace('\n', " ");
                                if !outer.cell.is_empty() {
                                    outer.cell.push(' ');
                                }
                                outer.cell.push_str(&text);
                            }
                            None if !table.is_empty() => blocks.push(Block::table(table)),
                            None => {}
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(blocks)
}

fn paragraph_block(p: Paragraph, styles: &StyleMap, classifier: &Classifier) -> Option<Block> {
    let text = p.text.trim();
    if text.is_empty() {
        return None;
    }
    let class = p
        .style_id
        .as_deref()
        .map(|id| classify_style_name(styles.name_of(id)))
        .unwrap_or(StyleClass::Body);
    let num = p
        .num
        .or_else(|| p.style_id.as_deref().and_then(|id| styles.numbering_of(id)))
        .filter(|n| n.num_id != 0);

    let block = match class {
        StyleClass::Heading(level) => classifier.heading(BlockKind::Heading, text, Some(level)),
        StyleClass::TocItem(level) => Block::new(BlockKind::TocItem, text).with_level(level),
        StyleClass::List => Block::new(BlockKind::ListItem, text).with_link(p.has_link),
        StyleClass::Body => match num {
            Some(n) => Block::new(BlockKind::NumberedItem, text).with_style(NumberingStyle::List {
                list_id: n.num_id,
                indent: n.ilvl,
            }),
            None if p.has_link => classifier.linked_paragraph(text, Detection::Auto),
            None => classifier.paragraph(text, Detection::Auto),
        },
    };
    Some(block)
}

/// Dublin Core fields from `docProps/core.xml`.
fn read_core(xml: &str) -> DocumentMeta {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut meta = DocumentMeta::default();
    let mut field: Option<Vec<u8>> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => field = Some(e.local_name().as_ref().to_vec()),
            Ok(Event::Text(ref e)) => {
                let value = meta_value(e.unescape().ok().map(|v| v.to_string()));
                match field.as_deref() {
                    Some(b"title") => meta.title = meta.title.take().or(value),
                    Some(b"creator") => meta.author = meta.author.take().or(value),
                    Some(b"language") => meta.language = meta.language.take().or(value),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => field = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable docx core properties");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    meta
}
