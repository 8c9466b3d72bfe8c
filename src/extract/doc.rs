//! Legacy Word (`.doc`) extractor.
//!
//! The binary format is handed to `antiword`; its plain-text output is
//! classified like a TXT file with the base-title length cutoff applied.

use std::process::Command;

use crate::block::Detection;
use crate::error::{ParseError, ParseResult};

use super::encoding::decode_text;
use super::txt::text_blocks;
use super::{DocumentFormat, ExtractContext, Extraction, Extractor};

/// Extractor that shells out to `antiword`.
#[derive(Debug, Clone)]
pub struct DocExtractor {
    /// Program name or path of the converter.
    pub program: String,
}

impl Default for DocExtractor {
    fn default() -> Self {
        Self {
            program: "antiword".into(),
        }
    }
}

impl DocExtractor {
    /// Run the converter over `data` and return its text output.
    fn convert(&self, data: &[u8]) -> ParseResult<String> {
        let dir = tempfile::TempDir::new().map_err(|e| ParseError::io(std::env::temp_dir(), e))?;
        let input = dir.path().join("input.doc");
        std::fs::write(&input, data).map_err(|e| ParseError::io(&input, e))?;

        let output = Command::new(&self.program)
            // -w 0: no line wrapping, one paragraph per line.
            .args(["-w", "0"])
            .arg(&input)
            .output()
            .map_err(|e| ParseError::ExternalTool {
                tool: self.program.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ParseError::ExternalTool {
                tool: self.program.clone(),
                message: format!("{}: {}", output.status, stderr.trim()),
            });
        }
        let (text, _) = decode_text(&output.stdout);
        Ok(text)
    }
}

impl Extractor for DocExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Doc
    }

    fn extract(&self, data: &[u8], ctx: &ExtractContext<'_>) -> ParseResult<Extraction> {
        let text = self.convert(data)?;
        let blocks = text_blocks(&text, ctx.classifier, Detection::Strict);
        tracing::debug!(origin = ctx.origin, blocks = blocks.len(), "doc extracted");
        Ok(Extraction::new(blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Classifier;
    use crate::config::ParserConfig;

    #[test]
    fn missing_converter_is_an_external_tool_error() {
        let config = ParserConfig::default();
        let classifier = Classifier::default();
        let ctx = ExtractContext {
            config: &config,
            classifier: &classifier,
            origin: "legacy.doc",
        };
        let extractor = DocExtractor {
            program: "docstruct-no-such-converter".into(),
        };
        let err = extractor.extract(b"\xd0\xcf\x11\xe0", &ctx).unwrap_err();
        match err {
            ParseError::ExternalTool { tool, .. } => {
                assert_eq!(tool, "docstruct-no-such-converter")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
