//! Block classification from text and configured heading tables.

use crate::config::HeadingConfig;
use crate::text::numbering::{
    MAX_BASE_HEADING_LEN, MAX_TOP_KEYWORD_HEADING_LEN, get_number_str, is_base_title,
    is_keyword_title,
};

use super::{Block, BlockKind, NumberingStyle};

/// How aggressively numbering prefixes promote paragraphs to headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Any line with a numbering prefix is a heading.
    Auto,
    /// Like `Auto`, but only for lines within the base-title length cutoff.
    Strict,
    /// Numbering prefixes are ignored; keywords and top-level checks still apply.
    Off,
}

/// Turns raw text into classified [`Block`]s.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: Vec<String>,
    strict: bool,
    top_level_prefixes: Vec<String>,
    top_level_markers: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&HeadingConfig::default())
    }
}

impl Classifier {
    pub fn new(config: &HeadingConfig) -> Self {
        Self {
            keywords: config
                .keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            strict: config.strict,
            top_level_prefixes: config
                .top_level_prefixes
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            top_level_markers: config.top_level_markers.clone(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn has_keywords(&self) -> bool {
        !self.keywords.is_empty()
    }

    /// Classify a body line. The result is a paragraph unless one of the
    /// heading rules fires.
    pub fn paragraph(&self, text: impl Into<String>, detection: Detection) -> Block {
        self.classify(Block::new(BlockKind::Paragraph, text), detection)
    }

    /// Paragraph carrying a hyperlink.
    pub fn linked_paragraph(&self, text: impl Into<String>, detection: Detection) -> Block {
        self.classify(
            Block::new(BlockKind::Paragraph, text).with_link(true),
            detection,
        )
    }

    /// Explicitly typed heading; only the top-level and TOC-title checks apply.
    pub fn heading(&self, kind: BlockKind, text: impl Into<String>, level: Option<u32>) -> Block {
        let mut block = Block::new(kind, text);
        block.level = level;
        self.classify(block, Detection::Off)
    }

    /// Apply the detection chain to an already constructed block.
    ///
    /// Paragraphs go through numbering, keyword, top-level and TOC-title
    /// checks in that order; heading kinds only through the last two. Lists,
    /// tables and TOC items pass unchanged.
    pub fn classify(&self, mut block: Block, detection: Detection) -> Block {
        match block.kind {
            BlockKind::Paragraph => {
                self.detect_numbering(&mut block, detection);
                self.detect_keyword(&mut block);
                self.detect_top_level(&mut block);
                detect_toc_title(&mut block);
            }
            BlockKind::Heading
            | BlockKind::TopLevel
            | BlockKind::NumberedHeading
            | BlockKind::KeywordHeading => {
                self.detect_top_level(&mut block);
                detect_toc_title(&mut block);
            }
            BlockKind::Toc
            | BlockKind::ListItem
            | BlockKind::NumberedItem
            | BlockKind::Table
            | BlockKind::TocItem => {}
        }
        block
    }

    fn detect_numbering(&self, block: &mut Block, detection: Detection) {
        let max_len = match detection {
            Detection::Off => return,
            Detection::Strict => Some(MAX_BASE_HEADING_LEN),
            Detection::Auto if self.strict => Some(MAX_BASE_HEADING_LEN),
            Detection::Auto => None,
        };
        if let Some(m) = is_base_title(&block.text, max_len) {
            block.kind = BlockKind::NumberedHeading;
            if block.style == NumberingStyle::None {
                block.style = NumberingStyle::Rule(m.rule);
            }
            block.idx = Some(get_number_str(&m.prefix));
        }
    }

    fn detect_keyword(&self, block: &mut Block) {
        if block.kind == BlockKind::Paragraph && is_keyword_title(&block.text, &self.keywords) {
            block.kind = BlockKind::KeywordHeading;
            block.style = NumberingStyle::Keyword;
        }
    }

    fn detect_top_level(&self, block: &mut Block) {
        let lower = block.text.to_lowercase();
        let by_prefix = !block.has_link
            && self
                .top_level_prefixes
                .iter()
                .any(|p| !p.is_empty() && lower.starts_with(p.as_str()));
        let by_marker = block.text.chars().count() <= MAX_TOP_KEYWORD_HEADING_LEN
            && self
                .top_level_markers
                .iter()
                .any(|m| !m.is_empty() && block.text.contains(m.as_str()));
        if by_prefix || by_marker {
            block.kind = BlockKind::TopLevel;
        }
    }
}

fn detect_toc_title(block: &mut Block) {
    let compact: String = block.text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact == "目录" || block.text.trim().to_lowercase() == "table of contents" {
        block.kind = BlockKind::Toc;
    }
}
