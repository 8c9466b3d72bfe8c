//! Structural properties that must hold for any input: re-parsing is
//! deterministic, and rendered Markdown parses back to the same hierarchy.

use std::path::{Path, PathBuf};

use docstruct::block::{Block, BlockKind};
use docstruct::config::ParserConfig;
use docstruct::convert;

const NOTICE: &str = "\
关于印发管理办法的通知
附件一 说明
1. 概述
本文说明制定背景。
1.1 背景
1.2 目标
2. 结论
完毕。
附件二 表格
(一) 填写要求
(二) 报送时间
";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// `(heading depth, display text)` for every heading, in document order.
fn outline(root: &Block) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut stack: Vec<(&Block, usize)> = vec![(root, 0)];
    while let Some((block, depth)) = stack.pop() {
        let is_heading = block.is_heading()
            && !block.is_sentinel()
            && !matches!(block.kind, BlockKind::ListItem | BlockKind::NumberedItem);
        let depth = if is_heading {
            out.push((depth + 1, block.display_text().to_string()));
            depth + 1
        } else {
            depth
        };
        for child in block.children.iter().rev() {
            stack.push((child, depth));
        }
    }
    out
}

#[test]
fn reparse_is_identical() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write(dir.path(), "notice.txt", NOTICE);
    let config = ParserConfig::default();

    let first = convert::parse_document(&path, &config).unwrap();
    let second = convert::parse_document(&path, &config).unwrap();
    assert_eq!(
        serde_json::to_value(&first.tree).unwrap(),
        serde_json::to_value(&second.tree).unwrap()
    );
    assert_eq!(first.file.file_md5, second.file.file_md5);
}

#[test]
fn markdown_round_trip_keeps_hierarchy() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = write(dir.path(), "notice.txt", NOTICE);
    let rendered = dir.path().join("notice.md");
    let config = ParserConfig::default();

    convert::convert(&source, &rendered, &config).unwrap();
    let original = convert::parse_document(&source, &config).unwrap();
    let reparsed = convert::parse_document(&rendered, &config).unwrap();

    let expected = outline(&original.tree);
    assert!(expected.len() >= 8, "{expected:?}");
    assert_eq!(outline(&reparsed.tree), expected);
}

#[test]
fn sibling_numbers_never_decrease() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write(dir.path(), "notice.txt", NOTICE);
    let doc = convert::parse_document(&path, &ParserConfig::default()).unwrap();

    for (_, block) in doc.tree.walk() {
        let numbered: Vec<&Block> = block
            .children
            .iter()
            .filter(|b| b.kind == BlockKind::NumberedHeading)
            .collect();
        for pair in numbered.windows(2) {
            if pair[0].style != pair[1].style {
                continue;
            }
            let a: u64 = pair[0].idx.as_deref().unwrap().rsplit('.').next().unwrap().parse().unwrap();
            let b: u64 = pair[1].idx.as_deref().unwrap().rsplit('.').next().unwrap().parse().unwrap();
            assert!(a <= b, "{} before {}", pair[0].text, pair[1].text);
        }
    }
}

#[test]
fn new_scheme_resets_level() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = write(dir.path(), "notice.txt", NOTICE);
    let doc = convert::parse_document(&path, &ParserConfig::default()).unwrap();

    let appendix_two = doc
        .tree
        .children
        .iter()
        .find(|b| b.text == "附件二 表格")
        .unwrap();
    assert_eq!(appendix_two.kind, BlockKind::TopLevel);
    let items: Vec<(&str, Option<u32>)> = appendix_two
        .children
        .iter()
        .map(|b| (b.text.as_str(), b.level))
        .collect();
    assert_eq!(items, vec![("(一) 填写要求", Some(1)), ("(二) 报送时间", Some(1))]);
}
