//! Page geometry: spans, lines and blocks, and the rules that turn a block
//! of positioned lines back into paragraphs.
//!
//! Coordinates are in points with the origin at the top-left of the page;
//! `y` grows downwards and a line's `baseline` is its bottom edge.

use crate::text::language;

/// Font size assumed for blocks without any measurable span.
pub const DEFAULT_FONT_SIZE: f64 = 8.0;

/// A gap wider than this many font sizes separates table columns.
pub const COLUMN_GAP: f64 = 3.0;

/// A line ending before this fraction of the block's right edge closes its
/// paragraph.
const FULL_LINE_RATIO: f64 = 0.8;

/// Run of glyphs with the same size and no large horizontal gap.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub size: f64,
    /// Horizontal distance from the end of the previous span on the line.
    pub gap_before: f64,
}

/// Spans sharing a baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub spans: Vec<Span>,
    pub baseline: f64,
}

impl Line {
    pub fn x0(&self) -> f64 {
        self.spans.iter().map(|s| s.x0).fold(f64::INFINITY, f64::min)
    }

    pub fn x1(&self) -> f64 {
        self.spans.iter().map(|s| s.x1).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Largest span size on the line.
    pub fn height(&self) -> f64 {
        let h = self.spans.iter().map(|s| s.size).fold(0.0, f64::max);
        if h > 0.0 { h } else { DEFAULT_FONT_SIZE }
    }

    pub fn y0(&self) -> f64 {
        self.baseline - self.height()
    }

    pub fn y1(&self) -> f64 {
        self.baseline
    }

    /// Cells separated by gaps wider than `min_gap`, as `(x0, text)`.
    pub fn cells(&self, min_gap: f64) -> Vec<(f64, String)> {
        let mut cells: Vec<(f64, String)> = Vec::new();
        for (i, span) in self.spans.iter().enumerate() {
            match cells.last_mut() {
                Some((_, text)) if i > 0 && span.gap_before <= min_gap => {
                    if span.gap_before > 0.0 {
                        text.push(' ');
                    }
                    text.push_str(&span.text);
                }
                _ => cells.push((span.x0, span.text.clone())),
            }
        }
        cells
            .into_iter()
            .map(|(x, t)| (x, t.trim().to_string()))
            .filter(|(_, t)| !t.is_empty())
            .collect()
    }

    /// Whether the line reads as a row of separate columns.
    pub fn is_columnar(&self, size: f64) -> bool {
        self.cells(COLUMN_GAP * size).len() > 1
    }

    /// Line text. CJK text drops the spaces between and inside spans.
    pub fn text(&self, cjk: bool) -> String {
        let mut out = String::new();
        for (i, span) in self.spans.iter().enumerate() {
            if cjk {
                out.extend(span.text.chars().filter(|c| *c != ' '));
            } else {
                if i > 0 && span.gap_before > 0.0 && !out.ends_with(' ') {
                    out.push(' ');
                }
                out.push_str(&span.text);
            }
        }
        out
    }
}

/// Consecutive lines forming one visual block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<Line>,
}

impl TextBlock {
    pub fn y0(&self) -> f64 {
        self.lines.iter().map(Line::y0).fold(f64::INFINITY, f64::min)
    }

    pub fn y1(&self) -> f64 {
        self.lines.iter().map(Line::y1).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Most common span size, rounded to 0.1pt.
    pub fn dominant_size(&self) -> f64 {
        mode(self.lines.iter().flat_map(|l| l.spans.iter().map(|s| s.size)))
            .unwrap_or(DEFAULT_FONT_SIZE)
    }

    /// Most common left and right line edges.
    pub fn base_edges(&self) -> (f64, f64) {
        let left = mode(self.lines.iter().map(Line::x0)).unwrap_or(0.0);
        let right = mode(self.lines.iter().map(Line::x1)).unwrap_or(0.0);
        (left, right)
    }

    /// Raw text of all lines, newline separated.
    pub fn raw_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text(false))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub number: u32,
    pub width: f64,
    pub height: f64,
    pub blocks: Vec<TextBlock>,
}

impl PageLayout {
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }
}

/// Most frequent value at 0.1 resolution; ties go to the first seen.
fn mode(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for v in values {
        let key = (v * 10.0).round() as i64;
        match counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key, 1)),
        }
    }
    let mut best: Option<(i64, usize)> = None;
    for (key, n) in counts {
        if best.is_none_or(|(_, b)| n > b) {
            best = Some((key, n));
        }
    }
    best.map(|(key, _)| key as f64 / 10.0)
}

/// Group lines into blocks. A new block starts when the vertical gap to
/// the previous line reaches 1.5 line heights, when the text moves up the
/// page, or when the font size changes.
pub fn group_blocks(lines: Vec<Line>) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();
    for line in lines {
        let joins = blocks
            .last()
            .and_then(|b| b.lines.last())
            .is_some_and(|prev| continues_block(prev, &line));
        match blocks.last_mut() {
            Some(block) if joins => block.lines.push(line),
            _ => blocks.push(TextBlock { lines: vec![line] }),
        }
    }
    blocks
}

fn continues_block(prev: &Line, next: &Line) -> bool {
    let h = prev.height();
    let gap = next.y0() - prev.y1();
    gap > -h && gap < 1.5 * h && (next.height() - h).abs() <= 0.5
}

/// How a line attaches to the text before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreak {
    NewParagraph,
    NewLine,
    SameLine,
}

/// Decide how each line of a block joins its predecessor.
pub fn classify_lines(block: &TextBlock) -> Vec<LineBreak> {
    let size = block.dominant_size();
    let (_, base_right) = block.base_edges();
    let mut out = Vec::with_capacity(block.lines.len());
    // (right edge, vertical middle, reached full width)
    let mut last: Option<(f64, f64, bool)> = None;
    for line in &block.lines {
        let columnar = line.is_columnar(size);
        let kind = match last {
            None => LineBreak::NewParagraph,
            Some(_) if columnar => LineBreak::NewParagraph,
            Some((right, mid, full)) if line.x0() < right && line.y0() > mid => {
                if full {
                    LineBreak::NewLine
                } else {
                    LineBreak::NewParagraph
                }
            }
            Some(_) => LineBreak::SameLine,
        };
        out.push(kind);
        let full = !columnar && line.x1() >= base_right * FULL_LINE_RATIO;
        last = Some((line.x1(), (line.y0() + line.y1()) / 2.0, full));
    }
    out
}

/// Join classified lines into paragraph text separated by `\n`.
pub fn merge_lines(lines: &[(String, LineBreak)], cjk: bool) -> String {
    let mut out = String::new();
    for (text, kind) in lines {
        match kind {
            LineBreak::NewLine if cjk => out.push_str(text),
            LineBreak::NewLine => {
                if out.ends_with('-') {
                    out.pop();
                } else {
                    out.push(' ');
                }
                out.push_str(text);
            }
            LineBreak::NewParagraph => {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
            LineBreak::SameLine => {
                out.push(' ');
                out.push_str(text);
            }
        }
    }
    out
}

/// Paragraph text of one block.
pub fn block_text(block: &TextBlock, cjk: bool) -> String {
    let kinds = classify_lines(block);
    let lines: Vec<(String, LineBreak)> = block
        .lines
        .iter()
        .map(|l| l.text(cjk))
        .zip(kinds)
        .collect();
    merge_lines(&lines, cjk)
}

/// A bare page number in the header or footer band.
pub fn is_page_number(block: &TextBlock, page_height: f64, ratio: f64) -> bool {
    let in_band = block.y0() < page_height * ratio || block.y1() > page_height * (1.0 - ratio);
    if !in_band {
        return false;
    }
    let text = block.raw_text();
    let text = text.trim();
    !text.is_empty()
        && text.chars().all(|c| c.is_ascii_digit())
        && text.parse::<u64>().is_ok_and(|n| n > 0)
}

/// Texts of a page's blocks with page numbers removed.
pub fn page_texts(page: &PageLayout, header_footer_ratio: f64) -> Vec<String> {
    let raw: String = page
        .blocks
        .iter()
        .map(TextBlock::raw_text)
        .collect::<Vec<_>>()
        .join("\n");
    let cjk = language::detect(&raw).is_cjk();
    page.blocks
        .iter()
        .filter(|b| {
            let drop = is_page_number(b, page.height, header_footer_ratio);
            if drop {
                tracing::debug!(page = page.number, text = %b.raw_text().trim(), "dropped page number");
            }
            !drop
        })
        .map(|b| block_text(b, cjk))
        .filter(|t| !t.trim().is_empty())
        .collect()
}
