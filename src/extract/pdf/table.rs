//! Table detection, normalization and deduplication against page text.

use crate::block::Table;
use crate::text::similarity::calc_similarity;

use super::layout::{COLUMN_GAP, PageLayout};

/// Rows of optional cells as produced by a [`TableExtractor`].
pub type RawTable = Vec<Vec<Option<String>>>;

/// Lines whose similarity exceeds this count as the same row.
const CHANGED_LINE_SIMILARITY: f64 = 0.6;

/// Upper bound on column-merge passes.
const MAX_MERGE_PASSES: usize = 32;

/// Finds tables on a rendered page.
pub trait TableExtractor: Send + Sync {
    fn extract(&self, page: &PageLayout) -> Vec<RawTable>;
}

/// Detects runs of consecutive lines whose cells line up in columns.
#[derive(Debug, Clone, Copy)]
pub struct AlignedColumnTables {
    pub min_rows: usize,
    pub min_columns: usize,
}

impl Default for AlignedColumnTables {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
        }
    }
}

struct Run {
    columns: Vec<f64>,
    tolerance: f64,
    rows: RawTable,
}

impl Run {
    fn start(cells: &[(f64, String)], height: f64) -> Self {
        Self {
            columns: cells.iter().map(|(x, _)| *x).collect(),
            tolerance: 2.0 * height,
            rows: vec![cells.iter().map(|(_, t)| Some(t.clone())).collect()],
        }
    }

    /// Place each cell in the nearest column, or `None` if any cell is out
    /// of alignment or two cells share a column.
    fn align(&self, cells: &[(f64, String)]) -> Option<Vec<Option<String>>> {
        let mut row = vec![None; self.columns.len()];
        for (x, text) in cells {
            let (idx, dist) = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| (i, (c - x).abs()))
                .min_by(|a, b| a.1.total_cmp(&b.1))?;
            if dist > self.tolerance || row[idx].is_some() {
                return None;
            }
            row[idx] = Some(text.clone());
        }
        Some(row)
    }
}

impl TableExtractor for AlignedColumnTables {
    fn extract(&self, page: &PageLayout) -> Vec<RawTable> {
        let mut tables = Vec::new();
        let mut run: Option<Run> = None;
        for line in page.lines() {
            let cells = line.cells(COLUMN_GAP * line.height());
            if cells.len() < self.min_columns {
                self.close(run.take(), &mut tables);
                continue;
            }
            if let Some(row) = run.as_ref().and_then(|r| r.align(&cells)) {
                if let Some(r) = run.as_mut() {
                    r.rows.push(row);
                }
                continue;
            }
            self.close(run.take(), &mut tables);
            run = Some(Run::start(&cells, line.height()));
        }
        self.close(run, &mut tables);
        tables
    }
}

impl AlignedColumnTables {
    fn close(&self, run: Option<Run>, tables: &mut Vec<RawTable>) {
        if let Some(run) = run.filter(|r| r.rows.len() >= self.min_rows) {
            tables.push(run.rows);
        }
    }
}

/// Normalize a raw table: blank cells become empty, empty columns are
/// dropped, and columns that never overlap are merged until stable.
pub fn regular_table(raw: RawTable) -> Table {
    let width = raw.iter().map(Vec::len).max().unwrap_or(0);
    let mut rows: RawTable = raw
        .into_iter()
        .map(|row| {
            let mut row: Vec<Option<String>> = row
                .into_iter()
                .map(|cell| {
                    cell.map(|c| c.replace(['\n', '\t'], " ").trim().to_string())
                        .filter(|c| !c.is_empty())
                })
                .collect();
            row.resize(width, None);
            row
        })
        .collect();

    drop_empty_columns(&mut rows);
    for _ in 0..MAX_MERGE_PASSES {
        if !merge_columns(&mut rows) {
            break;
        }
        drop_empty_columns(&mut rows);
    }

    Table::new(
        rows.into_iter()
            .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
            .collect(),
    )
}

fn drop_empty_columns(rows: &mut RawTable) {
    let width = rows.first().map_or(0, Vec::len);
    let keep: Vec<bool> = (0..width)
        .map(|c| rows.iter().any(|r| r[c].is_some()))
        .collect();
    for row in rows.iter_mut() {
        let mut c = 0;
        row.retain(|_| {
            let k = keep[c];
            c += 1;
            k
        });
    }
}

/// One pass of pairwise merging; returns whether anything merged.
fn merge_columns(rows: &mut RawTable) -> bool {
    let width = rows.first().map_or(0, Vec::len);
    let mut merged = false;
    let mut idx = 0;
    while idx + 1 < width {
        let disjoint = rows
            .iter()
            .all(|r| r[idx].is_none() || r[idx + 1].is_none());
        if disjoint {
            for row in rows.iter_mut() {
                if let Some(cell) = row[idx + 1].take() {
                    row[idx] = Some(cell);
                }
            }
            merged = true;
            idx += 2;
        } else {
            idx += 1;
        }
    }
    merged
}

/// A page element after table reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum PageItem {
    Text(String),
    Table(Table),
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn lines_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a == b || calc_similarity(a, b) > CHANGED_LINE_SIMILARITY
}

/// Indices of `left` lines aligned with some `right` line by a longest
/// common subsequence in which similar lines also match.
pub fn matched_lines(left: &[String], right: &[String]) -> Vec<usize> {
    let (n, m) = (left.len(), right.len());
    let left: Vec<String> = left.iter().map(|s| compact(s)).collect();
    let right: Vec<String> = right.iter().map(|s| compact(s)).collect();
    let eq: Vec<Vec<bool>> = left
        .iter()
        .map(|a| right.iter().map(|b| lines_match(a, b)).collect())
        .collect();

    // lcs[i][j]: length over left[i..] and right[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if eq[i][j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if eq[i][j] && lcs[i][j] == lcs[i + 1][j + 1] + 1 {
            out.push(i);
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Interleave page text with tables. Lines that reappear as table rows
/// are removed and each table is emitted once, where its first row was.
pub fn merge_tables(texts: &[String], tables: Vec<Table>) -> Vec<PageItem> {
    let lines: Vec<String> = texts
        .iter()
        .flat_map(|t| t.split('\n'))
        .map(str::to_string)
        .collect();
    if tables.is_empty() {
        return lines.into_iter().map(PageItem::Text).collect();
    }

    let mut owner: Vec<Option<usize>> = vec![None; lines.len()];
    for (t, table) in tables.iter().enumerate() {
        let rows: Vec<String> = table.to_text().split('\n').map(str::to_string).collect();
        for i in matched_lines(&lines, &rows) {
            owner[i] = Some(t);
        }
    }

    let mut tables: Vec<Option<Table>> = tables.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(lines.len());
    for (line, owner) in lines.into_iter().zip(owner) {
        match owner {
            None => out.push(PageItem::Text(line)),
            Some(t) => {
                if let Some(table) = tables[t].take() {
                    out.push(PageItem::Table(table));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::pdf::layout::{Line, TextBlock};
    use crate::extract::pdf::layout::tests::span;

    fn cells(row: &[&str]) -> Vec<Option<String>> {
        row.iter()
            .map(|c| (!c.is_empty()).then(|| c.to_string()))
            .collect()
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn regular_table_drops_and_merges_columns() {
        let raw = vec![
            cells(&["Name", "", "", "Qty"]),
            cells(&["", "Apple", "", "3"]),
            vec![Some("  ".into()), Some("Pear".into()), None, Some("5".into())],
        ];
        let table = regular_table(raw);
        assert_eq!(
            table.rows,
            vec![
                strings(&["Name", "Qty"]),
                strings(&["Apple", "3"]),
                strings(&["Pear", "5"])
            ]
        );
    }

    #[test]
    fn merge_skips_past_merged_pairs_and_repeats() {
        // columns 0/1 merge in the first pass, then the result merges with 2
        let raw = vec![
            cells(&["a", "", ""]),
            cells(&["", "b", ""]),
            cells(&["", "", "c"]),
            cells(&["x", "", "y"]),
        ];
        let table = regular_table(raw);
        assert_eq!(table.width(), 2);
        assert_eq!(table.rows[1], strings(&["b", ""]));
        assert_eq!(table.rows[2], strings(&["", "c"]));
    }

    #[test]
    fn lcs_counts_similar_lines() {
        let left = strings(&["Intro text", "Name Qty", "Apple 3", "Pear 5", "After"]);
        let right = strings(&["Name Qty", "Apple 3", "Pear  5."]);
        assert_eq!(matched_lines(&left, &right), vec![1, 2, 3]);
    }

    #[test]
    fn tables_replace_their_text_once() {
        let texts = strings(&["Intro text", "Name Qty\nApple 3", "After"]);
        let table = Table::new(vec![strings(&["Name", "Qty"]), strings(&["Apple", "3"])]);
        let items = merge_tables(&texts, vec![table.clone()]);
        assert_eq!(
            items,
            vec![
                PageItem::Text("Intro text".into()),
                PageItem::Table(table),
                PageItem::Text("After".into()),
            ]
        );
    }

    #[test]
    fn aligned_rows_become_tables() {
        let row = |a: &str, b: Option<&str>, y: f64| {
            let mut spans = vec![span(a, 50.0, 80.0, 0.0)];
            if let Some(b) = b {
                spans.push(span(b, 300.0, 320.0, 220.0));
            }
            Line { spans, baseline: y }
        };
        let page = PageLayout {
            number: 1,
            width: 600.0,
            height: 800.0,
            blocks: vec![TextBlock {
                lines: vec![
                    row("Heading", None, 80.0),
                    row("Name", Some("Qty"), 100.0),
                    row("Apple", Some("3"), 112.0),
                    row("Pear", Some("5"), 124.0),
                    row("Closing words", None, 136.0),
                ],
            }],
        };
        let tables = AlignedColumnTables::default().extract(&page);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
        assert_eq!(tables[0][2], cells(&["Pear", "5"]));
    }
}
