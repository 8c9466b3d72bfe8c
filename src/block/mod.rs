//! The document tree: node type, classification, insertion and post-passes.
//!
//! A [`Block`] is created once per extracted line, paragraph or table,
//! classified at construction ([`Classifier`]), attached exactly once by the
//! [`TreeBuilder`], and afterwards only touched by [`adjust`] (levels) and
//! [`calc_heading`] (display numbering).

mod builder;
mod classify;
mod post;

use std::fmt::Write as _;

use serde::Serialize;

pub use builder::{TreeBuilder, is_same_level};
pub use classify::{Classifier, Detection};
pub use post::{adjust, calc_heading};

/// Fixed text of the root sentinel.
pub const ROOT_TEXT: &str = "Root";
/// Fixed text of the sentinel wrapping leading body content.
pub const CONTENT_TEXT: &str = "Content";

/// Node type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Explicitly leveled heading (Word outline style, Markdown `#`, PDF outline match).
    Heading,
    /// Appendix, preface and similar sections that always sit at the top.
    TopLevel,
    /// The table-of-contents title.
    Toc,
    /// Heading recognized from its numbering prefix.
    NumberedHeading,
    /// Heading recognized from a configured keyword.
    KeywordHeading,
    ListItem,
    /// Item of a native multi-level list (Word `numPr`).
    NumberedItem,
    Paragraph,
    Table,
    TocItem,
}

impl BlockKind {
    /// Heading priority bucket; smaller is higher in the hierarchy.
    pub fn priority(self) -> u8 {
        match self {
            BlockKind::Heading | BlockKind::TopLevel | BlockKind::Toc => 0,
            BlockKind::NumberedHeading | BlockKind::NumberedItem | BlockKind::ListItem => 1,
            BlockKind::KeywordHeading => 2,
            BlockKind::Paragraph | BlockKind::Table | BlockKind::TocItem => 4,
        }
    }

    /// Heading kinds plus list items: anything that can own children.
    pub fn is_heading(self) -> bool {
        !matches!(
            self,
            BlockKind::Paragraph | BlockKind::Table | BlockKind::TocItem
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::TopLevel => "top-level",
            BlockKind::Toc => "toc",
            BlockKind::NumberedHeading => "numbered-heading",
            BlockKind::KeywordHeading => "keyword-heading",
            BlockKind::ListItem => "list-item",
            BlockKind::NumberedItem => "numbered-item",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Table => "table",
            BlockKind::TocItem => "toc-item",
        }
    }
}

/// Numbering-scheme discriminator. Items under different schemes are never
/// siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingStyle {
    #[default]
    None,
    /// Index of the numbering rule that recognized the heading.
    Rule(usize),
    Keyword,
    /// Native list: numbering definition id and indent level.
    List { list_id: u32, indent: u32 },
}

/// Sentinel nodes are structural only and never rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentinel {
    Root,
    Content,
}

/// Rows of cell text. The first row is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(|c| c.trim().is_empty()))
    }

    /// Widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Space-joined cells, one row per line.
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
    /// Explicit depth from the source; `None` until known.
    pub level: Option<u32>,
    /// Numbering token used for ordering comparisons.
    pub idx: Option<String>,
    pub style: NumberingStyle,
    pub has_link: bool,
    /// Level of the native TOC entry this block was matched to.
    pub match_toc: Option<u32>,
    /// Display text with reconstructed numbering; set once.
    pub heading_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Sentinel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    /// Unclassified block of the given kind.
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            level: None,
            idx: None,
            style: NumberingStyle::None,
            has_link: false,
            match_toc: None,
            heading_text: None,
            table: None,
            marker: None,
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self {
            level: Some(0),
            marker: Some(Sentinel::Root),
            ..Self::new(BlockKind::Heading, ROOT_TEXT)
        }
    }

    pub(crate) fn content() -> Self {
        Self {
            level: Some(1),
            marker: Some(Sentinel::Content),
            ..Self::new(BlockKind::Heading, CONTENT_TEXT)
        }
    }

    pub fn table(table: Table) -> Self {
        Self {
            table: Some(table.clone()),
            ..Self::new(BlockKind::Table, table.to_text())
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_link(mut self, has_link: bool) -> Self {
        self.has_link = has_link;
        self
    }

    pub fn with_style(mut self, style: NumberingStyle) -> Self {
        self.style = style;
        self
    }

    pub fn is_heading(&self) -> bool {
        self.kind.is_heading()
    }

    pub fn is_sentinel(&self) -> bool {
        self.marker.is_some()
    }

    /// Headings that never receive a synthesized index.
    pub fn heading_no_idx(&self) -> bool {
        matches!(self.kind, BlockKind::Toc | BlockKind::TopLevel) || self.is_sentinel()
    }

    /// `heading_text` when computed, the raw text otherwise.
    pub fn display_text(&self) -> &str {
        self.heading_text.as_deref().unwrap_or(&self.text)
    }

    /// Level as a comparable rank where unknown sorts below every known level.
    pub fn level_rank(&self) -> i64 {
        self.level.map(i64::from).unwrap_or(-1)
    }

    /// Pre-order walk yielding `(depth, block)`, starting with `self` at depth 0.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self)],
        }
    }

    /// Number of non-sentinel blocks in this subtree.
    pub fn count(&self) -> usize {
        self.walk().filter(|(_, b)| !b.is_sentinel()).count()
    }

    /// Indented outline of the tree, one block per line, for debugging.
    pub fn outline(&self, with_content: bool) -> String {
        let mut out = String::new();
        for (depth, block) in self.walk() {
            if depth == 0 || !(with_content || block.is_heading()) {
                continue;
            }
            let preview: String = block.display_text().chars().take(40).collect();
            let level = block
                .level
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".into());
            let _ = writeln!(
                out,
                "{}{} [{} level={} children={}]",
                "  ".repeat(depth - 1),
                preview,
                block.kind.label(),
                level,
                block.children.len()
            );
        }
        out
    }
}

/// Pre-order iterator over a block subtree.
pub struct Walk<'a> {
    stack: Vec<(usize, &'a Block)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Block);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, block) = self.stack.pop()?;
        for child in block.children.iter().rev() {
            self.stack.push((depth + 1, child));
        }
        Some((depth, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_follow_bucket_table() {
        assert_eq!(BlockKind::Heading.priority(), 0);
        assert_eq!(BlockKind::Toc.priority(), 0);
        assert_eq!(BlockKind::ListItem.priority(), 1);
        assert_eq!(BlockKind::KeywordHeading.priority(), 2);
        assert_eq!(BlockKind::TocItem.priority(), 4);
    }

    #[test]
    fn list_items_are_heading_like() {
        assert!(BlockKind::ListItem.is_heading());
        assert!(BlockKind::NumberedItem.is_heading());
        assert!(!BlockKind::Paragraph.is_heading());
        assert!(!BlockKind::TocItem.is_heading());
    }

    #[test]
    fn sentinels_have_no_index() {
        assert!(Block::root().heading_no_idx());
        assert!(Block::content().heading_no_idx());
        assert!(!Block::new(BlockKind::Heading, "Intro").heading_no_idx());
    }

    #[test]
    fn table_text_and_header() {
        let table = Table::new(vec![
            vec!["Name".into(), "Qty".into()],
            vec!["Apple".into(), " ".into()],
        ]);
        assert_eq!(table.to_text(), "Name Qty\nApple");
        assert_eq!(table.header().unwrap(), &["Name".to_string(), "Qty".to_string()]);
        assert_eq!(table.body().len(), 1);
        assert_eq!(table.width(), 2);
        assert!(Table::default().body().is_empty());
    }

    #[test]
    fn walk_is_preorder() {
        let mut root = Block::root();
        let mut a = Block::new(BlockKind::Heading, "A");
        a.children.push(Block::new(BlockKind::Paragraph, "a1"));
        root.children.push(a);
        root.children.push(Block::new(BlockKind::Heading, "B"));
        let order: Vec<(usize, &str)> = root.walk().map(|(d, b)| (d, b.text.as_str())).collect();
        assert_eq!(order, vec![(0, "Root"), (1, "A"), (2, "a1"), (1, "B")]);
        assert_eq!(root.count(), 3);
    }
}
