//! Tree assembly: from an extractor's flat output to a finished tree.

use crate::block::{Block, BlockKind, TreeBuilder, adjust, calc_heading};
use crate::config::ParserConfig;
use crate::extract::{DocumentMeta, Extraction, TocEntry};

/// Title of the TOC section built from native navigation entries.
pub const TOC_TITLE: &str = "Table of Contents";

/// Blocks for a native TOC: a `Toc` heading followed by its items.
pub fn toc_blocks(entries: &[TocEntry]) -> Vec<Block> {
    if entries.is_empty() {
        return Vec::new();
    }
    let mut blocks = Vec::with_capacity(entries.len() + 1);
    blocks.push(Block::new(BlockKind::Toc, TOC_TITLE));
    blocks.extend(
        entries
            .iter()
            .map(|e| Block::new(BlockKind::TocItem, e.title.clone()).with_level(e.level)),
    );
    blocks
}

/// Insert `blocks` (preceded by the native TOC, if any) into a new tree and
/// run the post-passes. Display numbering is synthesized only when
/// `numbering` is set.
pub fn build_tree(blocks: Vec<Block>, toc: &[TocEntry], numbering: bool) -> Block {
    let mut builder = TreeBuilder::new();
    builder.extend(toc_blocks(toc));
    builder.extend(blocks);
    tracing::debug!(blocks = builder.len(), "tree built");

    let mut root = builder.finish();
    adjust(&mut root, 1);
    if numbering {
        calc_heading(&mut root);
    }
    root
}

/// Finished tree and metadata of an extraction.
pub fn assemble(extraction: Extraction, config: &ParserConfig) -> (Block, DocumentMeta) {
    let numbering = extraction.numbering && config.number_headings;
    let root = build_tree(extraction.blocks, &extraction.toc, numbering);
    (root, extraction.meta)
}
