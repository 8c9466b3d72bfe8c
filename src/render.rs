//! Markdown serialization of a block tree, with YAML front matter.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::block::{Block, BlockKind, Table};
use crate::error::{ParseError, ParseResult};
use crate::extract::{DocumentFormat, DocumentMeta};

/// Deepest Markdown heading.
const MAX_HEADING_DEPTH: usize = 6;

static RE_BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Facts about the source file that head the front matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub file_name: String,
    pub file_size: u64,
    pub file_md5: String,
    pub file_format: String,
    pub convert_date: String,
}

impl FileInfo {
    /// Describe a source file from its name and content, dated today.
    pub fn new(file_name: impl Into<String>, data: &[u8], format: DocumentFormat) -> Self {
        Self {
            file_name: file_name.into(),
            file_size: data.len() as u64,
            file_md5: format!("{:x}", md5::compute(data)),
            file_format: format.label().to_string(),
            convert_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Serialize)]
struct FrontMatter<'a> {
    #[serde(flatten)]
    file: &'a FileInfo,
    #[serde(flatten)]
    meta: &'a DocumentMeta,
}

/// The `---` delimited YAML header.
pub fn front_matter(file: &FileInfo, meta: &DocumentMeta) -> ParseResult<String> {
    let yaml = serde_yaml::to_string(&FrontMatter { file, meta })
        .map_err(|e| ParseError::malformed("yaml", e))?;
    Ok(format!("---\n{yaml}---\n\n"))
}

/// Complete Markdown document: front matter followed by the body.
pub fn render_document(root: &Block, file: &FileInfo, meta: &DocumentMeta) -> ParseResult<String> {
    let mut out = front_matter(file, meta)?;
    out.push_str(&render_body(root));
    Ok(out)
}

/// Markdown body of a tree. Sentinels produce no output of their own.
pub fn render_body(root: &Block) -> String {
    let mut out = String::new();
    // (block, heading depth of its parent)
    let mut stack: Vec<(&Block, usize)> = vec![(root, 0)];
    while let Some((block, depth)) = stack.pop() {
        let own_depth = if block.is_sentinel() {
            depth
        } else {
            render_block(&mut out, block, depth)
        };
        for child in block.children.iter().rev() {
            stack.push((child, own_depth));
        }
    }
    let body = RE_BLANK_RUNS.replace_all(&out, "\n\n");
    let body = body.trim_start_matches('\n');
    if body.is_empty() {
        String::new()
    } else {
        format!("{}\n", body.trim_end())
    }
}

fn is_heading_kind(kind: BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::Heading | BlockKind::TopLevel | BlockKind::NumberedHeading | BlockKind::KeywordHeading
    )
}

/// Write one block; returns the heading depth its children see.
fn render_block(out: &mut String, block: &Block, parent_depth: usize) -> usize {
    match block.kind {
        kind if is_heading_kind(kind) => {
            let explicit = match kind {
                BlockKind::Heading => block.level.unwrap_or(0) as usize,
                _ => 0,
            };
            let depth = explicit.max(parent_depth + 1);
            let _ = write!(
                out,
                "\n{} {}\n\n",
                "#".repeat(depth.min(MAX_HEADING_DEPTH)),
                one_line(block.display_text())
            );
            depth
        }
        BlockKind::Toc => {
            let _ = write!(out, "\n{}\n\n", one_line(block.display_text()));
            parent_depth
        }
        BlockKind::TocItem => {
            let indent = indent(block.level);
            let text = one_line(&block.text);
            let _ = writeln!(out, "{indent}- [{text}](#{})", anchor(&text));
            parent_depth
        }
        BlockKind::ListItem | BlockKind::NumberedItem => {
            let _ = writeln!(out, "{}- {}", indent(block.level), one_line(block.display_text()));
            parent_depth
        }
        BlockKind::Table => {
            if let Some(table) = &block.table {
                let _ = write!(out, "\n{}\n", pipe_table(table));
            }
            parent_depth
        }
        _ => {
            if !block.text.trim().is_empty() {
                let _ = write!(out, "\n{}\n\n", block.text.trim());
            }
            parent_depth
        }
    }
}

fn indent(level: Option<u32>) -> String {
    "  ".repeat(level.unwrap_or(1).saturating_sub(1) as usize)
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Link target of a TOC item: its text with spaces and tabs replaced.
pub fn anchor(text: &str) -> String {
    text.replace([' ', '\t'], "_")
}

fn table_cell(cell: &str) -> String {
    one_line(cell).replace('|', "\\|")
}

/// Pipe table with the first row as header. Short rows are padded.
pub fn pipe_table(table: &Table) -> String {
    let width = table.width();
    if width == 0 {
        return String::new();
    }
    let row_line = |row: &[String]| {
        let mut cells: Vec<String> = row.iter().map(|c| table_cell(c)).collect();
        cells.resize(width, String::new());
        format!("|{}|", cells.join("|"))
    };
    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(row_line(table.header().unwrap_or(&[])));
    lines.push(format!("|{}|", vec!["---"; width].join("|")));
    lines.extend(table.body().iter().map(|row| row_line(row)));
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(text: &str, level: u32) -> Block {
        Block::new(BlockKind::Heading, text).with_level(level)
    }

    #[test]
    fn headings_follow_tree_depth() {
        let mut root = Block::root();
        let mut appendix = Block::new(BlockKind::TopLevel, "附件一 说明");
        let mut overview = Block::new(BlockKind::NumberedHeading, "1. 概述");
        overview
            .children
            .push(Block::new(BlockKind::NumberedHeading, "1.1 背景"));
        overview
            .children
            .push(Block::new(BlockKind::Paragraph, "正文。"));
        appendix.children.push(overview);
        root.children.push(appendix);

        assert_eq!(
            render_body(&root),
            "# 附件一 说明\n\n## 1. 概述\n\n### 1.1 背景\n\n正文。\n"
        );
    }

    #[test]
    fn explicit_heading_level_wins_and_is_capped() {
        let mut root = Block::root();
        let mut h = heading("Deep", 3);
        h.children.push(heading("Deeper", 9));
        root.children.push(h);
        assert_eq!(render_body(&root), "### Deep\n\n###### Deeper\n");
    }

    #[test]
    fn sentinels_and_heading_text() {
        let mut root = Block::root();
        let mut content = Block::content();
        content
            .children
            .push(Block::new(BlockKind::Paragraph, "Preamble."));
        root.children.push(content);
        let mut h = heading("Intro", 1);
        h.heading_text = Some("1 Intro".into());
        root.children.push(h);
        assert_eq!(render_body(&root), "Preamble.\n\n# 1 Intro\n");
    }

    #[test]
    fn toc_and_lists() {
        let mut root = Block::root();
        let mut toc = Block::new(BlockKind::Toc, "目录");
        toc.children
            .push(Block::new(BlockKind::TocItem, "Getting started").with_level(1));
        toc.children
            .push(Block::new(BlockKind::TocItem, "First\tsteps").with_level(2));
        root.children.push(toc);
        root.children
            .push(Block::new(BlockKind::ListItem, "apples"));
        root.children
            .push(Block::new(BlockKind::NumberedItem, "pears").with_level(2));

        assert_eq!(
            render_body(&root),
            "目录\n\n- [Getting started](#Getting_started)\n  - [First steps](#First_steps)\n- apples\n  - pears\n"
        );
    }

    #[test]
    fn tables_render_as_pipe_tables() {
        let table = Table::new(vec![
            vec!["Name".into(), "Qty".into()],
            vec!["A|B".into()],
        ]);
        assert_eq!(pipe_table(&table), "|Name|Qty|\n|---|---|\n|A\\|B||\n");
        assert_eq!(pipe_table(&Table::default()), "");

        let mut root = Block::root();
        root.children.push(Block::table(table));
        assert!(render_body(&root).starts_with("|Name|Qty|\n"));
    }

    #[test]
    fn blank_runs_collapse() {
        let mut root = Block::root();
        root.children.push(Block::new(BlockKind::Paragraph, "a\n\n\n\nb"));
        assert_eq!(render_body(&root), "a\n\nb\n");
        assert_eq!(render_body(&Block::root()), "");
    }

    #[test]
    fn front_matter_key_order() {
        let file = FileInfo::new("report.txt", b"hello", DocumentFormat::Txt);
        assert_eq!(file.file_md5, "5d41402abc4b2a76b9719d911017c592");
        let meta = DocumentMeta {
            title: Some("Report".into()),
            ..DocumentMeta::default()
        };
        let fm = front_matter(&file, &meta).unwrap();
        assert!(fm.starts_with("---\nfile_name: report.txt\nfile_size: 5\n"));
        assert!(fm.ends_with("title: Report\n---\n\n"));
        let keys: Vec<&str> = fm
            .lines()
            .filter_map(|l| l.split_once(':').map(|(k, _)| k))
            .collect();
        assert_eq!(
            keys,
            vec!["file_name", "file_size", "file_md5", "file_format", "convert_date", "title"]
        );
    }

    #[test]
    fn ebook_contributor_is_written_as_creator() {
        let file = FileInfo::new("book.epub", b"", DocumentFormat::Epub);
        let meta = DocumentMeta {
            title: Some("Walden".into()),
            creator: Some("Henry David Thoreau".into()),
            ..DocumentMeta::default()
        };
        let doc = render_document(&Block::root(), &file, &meta).unwrap();
        assert!(doc.contains("\ncreator: Henry David Thoreau\n"));
        assert!(!doc.contains("author:"));

        let (read, _) = crate::extract::markdown::split_front_matter(&doc);
        assert_eq!(read.creator.as_deref(), Some("Henry David Thoreau"));
        assert!(read.author.is_none());
    }

    #[test]
    fn front_matter_reads_back_as_metadata() {
        let file = FileInfo::new("a.md", b"", DocumentFormat::Markdown);
        let meta = DocumentMeta {
            author: Some("Ann".into()),
            ..DocumentMeta::default()
        };
        let doc = render_document(&Block::root(), &file, &meta).unwrap() + "# Title\n";
        let (read, body) = crate::extract::markdown::split_front_matter(&doc);
        assert_eq!(read.author.as_deref(), Some("Ann"));
        assert_eq!(read.extra["file_format"], serde_yaml::Value::from("md"));
        assert_eq!(body.trim(), "# Title");
    }
}
