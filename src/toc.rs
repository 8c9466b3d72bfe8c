//! Table-of-contents reconciliation.
//!
//! Both passes walk the TOC in order and look for the most similar body
//! block after the previous match, so a TOC never reorders the document.

use crate::block::{Block, BlockKind};
use crate::extract::TocEntry;
use crate::text::similarity::best_match_after;

/// Split a DOCX TOC line (`"1.2\tScope\t7"` or `"1.2_Scope_7"`) into its
/// three fields, if it has exactly three.
fn toc_fields(text: &str) -> Option<[&str; 3]> {
    for sep in ['_', '\t'] {
        let parts: Vec<&str> = text.split(sep).collect();
        if let [number, title, page] = parts[..] {
            return Some([number, title, page]);
        }
    }
    None
}

/// Title part of a TOC line.
pub fn toc_title(text: &str) -> &str {
    toc_fields(text).map_or(text, |[_, title, _]| title)
}

/// Number and title of a TOC line, without the page.
pub fn toc_detail(text: &str) -> String {
    toc_fields(text).map_or_else(|| text.to_string(), |[number, title, _]| format!("{number} {title}"))
}

fn candidates(blocks: &[Block]) -> impl Iterator<Item = (usize, &str)> {
    blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| !matches!(b.kind, BlockKind::TocItem | BlockKind::Table))
        .map(|(i, b)| (i, b.text.as_str()))
}

/// Match inline TOC items (DOCX `toc N` paragraphs) to body blocks.
///
/// A matched block takes the TOC line's number and title as its display
/// text and records the TOC level in `match_toc`. Returns the number of
/// matched items.
pub fn reconcile_inline(blocks: &mut [Block]) -> usize {
    let items: Vec<(String, String, u32)> = blocks
        .iter()
        .filter(|b| b.kind == BlockKind::TocItem)
        .map(|b| {
            (
                toc_title(&b.text).to_string(),
                toc_detail(&b.text),
                b.level.unwrap_or(1),
            )
        })
        .collect();

    let mut last = None;
    let mut matched = 0;
    for (title, detail, level) in items {
        if title.trim().is_empty() {
            continue;
        }
        let Some(idx) = best_match_after(&title, candidates(blocks), last) else {
            tracing::warn!(title = %title, "no body text matches toc item");
            last = None;
            continue;
        };
        let block = &mut blocks[idx];
        block.heading_text = Some(detail);
        block.match_toc = Some(level);
        last = Some(idx);
        matched += 1;
    }
    matched
}

/// Match native outline entries (PDF bookmarks) to body blocks.
///
/// A matched block becomes a `Heading` at the entry's level. After a miss
/// the search restarts from the top once before the entry is dropped.
/// Returns the number of matched entries.
pub fn reconcile_outline(blocks: &mut [Block], entries: &[TocEntry]) -> usize {
    let mut last = None;
    let mut matched = 0;
    for entry in entries {
        if entry.title.trim().is_empty() {
            continue;
        }
        let mut found = best_match_after(&entry.title, candidates(blocks), last);
        if found.is_none() {
            tracing::warn!(title = %entry.title, level = entry.level, "no body text matches outline entry");
            last = None;
            found = best_match_after(&entry.title, candidates(blocks), None);
        }
        let Some(idx) = found else {
            continue;
        };
        let block = &mut blocks[idx];
        block.kind = BlockKind::Heading;
        block.level = Some(entry.level);
        last = Some(idx);
        matched += 1;
    }
    matched
}
