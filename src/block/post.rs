//! Post-passes over a finished tree: level assignment and display numbering.
//!
//! Both walk the tree with an explicit stack so document depth never turns
//! into call-stack depth.

use crate::text::numbering::{
    calc_index_by_level, get_index_level, get_index_str, get_number_str, get_real_index,
    is_base_title, is_synthesized_marker,
};

use super::{Block, BlockKind};

/// Assign levels to numbered and keyword headings that have none, from their
/// depth among such headings, starting at `level`.
pub fn adjust(root: &mut Block, level: u32) {
    let mut stack = vec![(root, level)];
    while let Some((node, level)) = stack.pop() {
        for child in node.children.iter_mut() {
            let inferred = matches!(
                child.kind,
                BlockKind::NumberedHeading | BlockKind::KeywordHeading
            ) && child.level.is_none();
            if inferred {
                child.level = Some(level);
                stack.push((child, level + 1));
            } else {
                stack.push((child, level));
            }
        }
    }
}

/// Compute `heading_text` for every heading-like block that lacks one.
///
/// Headings whose text already carries a numbering prefix keep it. Others get
/// an index derived from their parent's number and their position among
/// numbered siblings: `2.3` style while the parent is at most two segments
/// deep, then `(n)`, `(a)`, `(i)` and finally `*`.
pub fn calc_heading(root: &mut Block) {
    let mut stack: Vec<(&mut Block, String, Option<usize>)> = vec![(root, String::new(), None)];
    while let Some((node, parent_num, position)) = stack.pop() {
        if !node.is_heading() {
            continue;
        }
        if node.heading_text.is_none() {
            node.heading_text = Some(heading_text(node, &parent_num, position));
        }
        let own_num = child_prefix(node.display_text());
        let mut counter = 0;
        for child in node.children.iter_mut() {
            if child.is_heading() && !child.heading_no_idx() {
                counter += 1;
            }
            stack.push((child, own_num.clone(), Some(counter)));
        }
    }
}

fn heading_text(node: &Block, parent_num: &str, position: Option<usize>) -> String {
    let Some(n) = position else {
        return node.text.clone();
    };
    if node.heading_no_idx() || is_base_title(&node.text, None).is_some() {
        return node.text.clone();
    }
    if parent_num.is_empty() {
        return match node.kind {
            BlockKind::NumberedItem | BlockKind::Heading => format!("{n} {}", node.text),
            _ => node.text.clone(),
        };
    }
    format!("{} {}", index_string(parent_num, n), node.text)
}

fn index_string(parent_num: &str, n: usize) -> String {
    if is_synthesized_marker(parent_num) || get_index_level(parent_num) > 2 {
        calc_index_by_level(parent_num, n)
    } else {
        format!("{}.{n}", get_number_str(parent_num))
    }
}

/// The number a heading hands down to its children.
fn child_prefix(display: &str) -> String {
    let token = get_index_str(display);
    if is_synthesized_marker(token) {
        token.to_string()
    } else {
        get_real_index(display).join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Classifier, Detection, TreeBuilder};

    fn heading(text: &str, level: u32) -> Block {
        Block::new(BlockKind::Heading, text).with_level(level)
    }

    fn displays(root: &Block) -> Vec<String> {
        root.walk()
            .skip(1)
            .filter(|(_, b)| b.is_heading() && !b.is_sentinel())
            .map(|(_, b)| b.display_text().to_string())
            .collect()
    }

    #[test]
    fn adjust_infers_levels_by_depth() {
        let c = Classifier::default();
        let mut builder = TreeBuilder::new();
        for line in ["附件一 说明", "1. 概述", "1.1 背景", "2. 结论"] {
            builder.add(c.paragraph(line, Detection::Auto));
        }
        let mut root = builder.finish();
        adjust(&mut root, 1);
        let appendix = &root.children[0];
        assert_eq!(appendix.kind, BlockKind::TopLevel);
        assert_eq!(appendix.level, None);
        assert_eq!(appendix.children[0].level, Some(1));
        assert_eq!(appendix.children[0].children[0].level, Some(2));
        assert_eq!(appendix.children[1].level, Some(1));
    }

    #[test]
    fn adjust_keeps_explicit_levels() {
        let mut root = Block::root();
        let mut h = heading("Intro", 3);
        h.children.push(Block::new(BlockKind::NumberedHeading, "1 a"));
        root.children.push(h);
        adjust(&mut root, 1);
        assert_eq!(root.children[0].level, Some(3));
        assert_eq!(root.children[0].children[0].level, Some(1));
    }

    #[test]
    fn synthesizes_dotted_then_marker_chain() {
        let mut root = Block::root();
        let mut chain = heading("F", 6);
        for (text, level) in [("E", 5), ("D", 4), ("C", 3), ("B", 2)] {
            let mut parent = heading(text, level);
            parent.children.push(chain);
            chain = parent;
        }
        let mut top = heading("A", 1);
        top.children.push(chain);
        root.children.push(top);
        root.children.push(heading("Z", 1));

        calc_heading(&mut root);
        assert_eq!(
            displays(&root),
            vec!["1 A", "1.1 B", "1.1.1 C", "(1) D", "(a) E", "(i) F", "2 Z"]
        );
    }

    #[test]
    fn existing_numbers_are_kept_and_extended() {
        let mut root = Block::root();
        let mut chapter = heading("2.3 Scope", 1);
        chapter.children.push(heading("Details", 2));
        chapter.children.push(Block::new(BlockKind::Paragraph, "body"));
        chapter.children.push(heading("More", 2));
        root.children.push(chapter);
        calc_heading(&mut root);
        assert_eq!(displays(&root), vec!["2.3 Scope", "2.3.1 Details", "2.3.2 More"]);
        assert!(root.children[0].children[1].heading_text.is_none());
    }

    #[test]
    fn top_level_and_toc_keep_text_and_do_not_count() {
        let mut root = Block::root();
        root.children.push(Block::new(BlockKind::Toc, "目录"));
        let mut appendix = Block::new(BlockKind::TopLevel, "Appendix A");
        appendix.children.push(heading("Terms", 2));
        root.children.push(appendix);
        root.children.push(heading("Body", 1));
        calc_heading(&mut root);
        assert_eq!(displays(&root), vec!["目录", "Appendix A", "1 Terms", "1 Body"]);
    }

    #[test]
    fn list_items_without_parent_number_keep_text() {
        let mut root = Block::root();
        root.children.push(Block::new(BlockKind::ListItem, "apples"));
        root.children.push(Block::new(BlockKind::KeywordHeading, "Definitions"));
        calc_heading(&mut root);
        assert_eq!(displays(&root), vec!["apples", "Definitions"]);
    }

    #[test]
    fn heading_text_is_set_once() {
        let mut root = Block::root();
        let mut h = heading("Intro", 1);
        h.heading_text = Some("Custom".into());
        root.children.push(h);
        calc_heading(&mut root);
        calc_heading(&mut root);
        assert_eq!(displays(&root), vec!["Custom"]);
    }
}
