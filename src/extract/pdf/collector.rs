//! `pdf_extract::OutputDev` that records positioned glyphs and assembles
//! them into spans and lines.

use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};

use super::layout::{Line, PageLayout, Span, group_blocks};

/// Collects one page of glyphs.
#[derive(Debug, Default)]
pub struct PageCollector {
    number: u32,
    width: f64,
    height: f64,
    left: f64,
    top: f64,
    started: bool,
    lines: Vec<Line>,
    line: Option<Line>,
    /// A space glyph was seen since the last visible glyph.
    pending_space: bool,
}

impl PageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visible glyph at top-left based coordinates.
    ///
    /// `y` is the baseline, `advance` the horizontal advance in points.
    pub fn push_glyph(&mut self, x: f64, y: f64, advance: f64, size: f64, text: &str) {
        if text.is_empty() {
            return;
        }
        if text.chars().all(char::is_whitespace) {
            self.pending_space = self.line.is_some();
            return;
        }
        let pending_space = std::mem::take(&mut self.pending_space);

        let breaks_line = self.line.as_ref().is_some_and(|line| {
            let last_x1 = line.spans.last().map_or(x, |s| s.x1);
            (y - line.baseline).abs() > size * 0.5 || x < last_x1 - size
        });
        if breaks_line {
            self.finish_line();
        }

        let line = self.line.get_or_insert_with(|| Line {
            spans: Vec::new(),
            baseline: y,
        });
        let x1 = x + advance;
        match line.spans.last_mut() {
            Some(span) => {
                let gap = x - span.x1;
                if gap > size || (span.size - size).abs() > 0.5 {
                    line.spans.push(Span {
                        text: text.to_string(),
                        x0: x,
                        x1,
                        size,
                        gap_before: gap.max(0.0),
                    });
                } else {
                    if (pending_space || gap > size * 0.1) && !span.text.ends_with(' ') {
                        span.text.push(' ');
                    }
                    span.text.push_str(text);
                    span.x1 = span.x1.max(x1);
                }
            }
            None => line.spans.push(Span {
                text: text.to_string(),
                x0: x,
                x1,
                size,
                gap_before: 0.0,
            }),
        }
    }

    fn finish_line(&mut self) {
        self.pending_space = false;
        if let Some(mut line) = self.line.take() {
            for span in &mut line.spans {
                let trimmed = span.text.trim_end().len();
                span.text.truncate(trimmed);
            }
            if !line.spans.is_empty() {
                self.lines.push(line);
            }
        }
    }

    /// The collected page, or `None` if no page was started.
    pub fn into_layout(mut self) -> Option<PageLayout> {
        self.finish_line();
        self.started.then(|| PageLayout {
            number: self.number,
            width: self.width,
            height: self.height,
            blocks: group_blocks(self.lines),
        })
    }
}

/// Rendered font size: side of the square with the same area as the
/// transformed `font_size` box.
fn rendered_size(trm: &Transform, font_size: f64) -> f64 {
    let sx = font_size * (trm.m11 + trm.m21);
    let sy = font_size * (trm.m12 + trm.m22);
    (sx * sy).abs().sqrt()
}

impl OutputDev for PageCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.number = page_num;
        self.left = media_box.llx;
        self.top = media_box.ury;
        self.width = media_box.urx - media_box.llx;
        self.height = media_box.ury - media_box.lly;
        self.started = true;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.finish_line();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        let size = rendered_size(trm, font_size);
        let x = trm.m31 - self.left;
        let y = self.top - trm.m32;
        self.push_glyph(x, y, width * size, size, char);
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}
