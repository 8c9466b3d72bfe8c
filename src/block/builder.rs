//! Incremental tree construction.
//!
//! Blocks arrive in document order. Each one walks down the rightmost spine
//! of the tree, starting at the root, until it finds the scope where it is
//! either a sibling of the last child or plain content of the scope itself.

use std::cmp::Ordering;

use crate::text::numbering::compare_number_str;

use super::{Block, BlockKind, Sentinel};

enum Placement {
    /// Append to the current scope (wrapping in a content sentinel at root).
    Content,
    /// Append after the current scope's last child.
    Sibling,
    /// Move into the last child and retry.
    Descend,
}

/// Builds a block tree from blocks in reading order.
#[derive(Debug)]
pub struct TreeBuilder {
    root: Block,
    added: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            root: Block::root(),
            added: 0,
        }
    }

    /// Number of blocks added so far.
    pub fn len(&self) -> usize {
        self.added
    }

    pub fn is_empty(&self) -> bool {
        self.added == 0
    }

    pub fn root(&self) -> &Block {
        &self.root
    }

    /// Attach `block` at its place in the tree.
    pub fn add(&mut self, mut block: Block) {
        self.added += 1;
        let mut scope = &mut self.root;
        loop {
            let placement = match scope.children.last() {
                None => Placement::Content,
                Some(current) => place(current, &mut block),
            };
            match placement {
                Placement::Content => {
                    add_content(scope, block);
                    return;
                }
                Placement::Sibling => {
                    scope.children.push(block);
                    return;
                }
                Placement::Descend => {
                    let last = scope.children.len() - 1;
                    scope = &mut scope.children[last];
                }
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = Block>>(&mut self, blocks: I) {
        for block in blocks {
            self.add(block);
        }
    }

    pub fn finish(self) -> Block {
        self.root
    }
}

fn place(current: &Block, block: &mut Block) -> Placement {
    if current.kind == BlockKind::Toc {
        if block.has_link || matches!(block.kind, BlockKind::TopLevel | BlockKind::TocItem) {
            block.kind = BlockKind::TocItem;
            return Placement::Descend;
        }
        return Placement::Content;
    }
    if block.kind == BlockKind::Heading && block.level == Some(1) {
        return Placement::Sibling;
    }
    if block.match_toc == Some(1) || block.kind == BlockKind::TopLevel {
        return Placement::Sibling;
    }
    if is_same_level(current, block) {
        return Placement::Sibling;
    }
    if current.is_heading() {
        Placement::Descend
    } else {
        Placement::Sibling
    }
}

fn add_content(scope: &mut Block, block: Block) {
    if block.is_heading() || scope.marker != Some(Sentinel::Root) {
        scope.children.push(block);
    } else {
        let mut content = Block::content();
        content.children.push(block);
        scope.children.push(content);
    }
}

/// Whether `new` belongs beside `current` rather than beneath it.
///
/// Priority decides first, then explicit level (unknown levels rank lowest).
/// At equal priority and level, only items of the same numbering style whose
/// number does not go backwards are siblings.
pub fn is_same_level(current: &Block, new: &Block) -> bool {
    match current.kind.priority().cmp(&new.kind.priority()) {
        Ordering::Less => return false,
        Ordering::Greater => return true,
        Ordering::Equal => {}
    }
    match current.level_rank().cmp(&new.level_rank()) {
        Ordering::Less => false,
        Ordering::Greater => true,
        Ordering::Equal => {
            current.style == new.style
                && compare_number_str(new.idx.as_deref(), current.idx.as_deref())
                    .is_some_and(|o| o != Ordering::Less)
        }
    }
}
