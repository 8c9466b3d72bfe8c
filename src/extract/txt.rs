//! Plain-text extractor: one paragraph per non-blank line.

use crate::block::{Block, Classifier, Detection};
use crate::error::ParseResult;

use super::encoding::decode_text;
use super::{DocumentFormat, ExtractContext, Extraction, Extractor};

/// Plain-text extractor.
#[derive(Debug, Clone, Copy)]
pub struct TxtExtractor {
    pub detection: Detection,
}

impl Default for TxtExtractor {
    fn default() -> Self {
        Self {
            detection: Detection::Auto,
        }
    }
}

impl Extractor for TxtExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Txt
    }

    fn extract(&self, data: &[u8], ctx: &ExtractContext<'_>) -> ParseResult<Extraction> {
        let (text, encoding) = decode_text(data);
        tracing::debug!(origin = ctx.origin, encoding = encoding.name(), "decoded text");
        Ok(Extraction::new(text_blocks(&text, ctx.classifier, self.detection)))
    }
}

/// Classify every non-blank line of `text` as a paragraph.
pub fn text_blocks(text: &str, classifier: &Classifier, detection: Detection) -> Vec<Block> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| classifier.paragraph(line, detection))
        .collect()
}
