//! Conversion driver: format detection, extraction, assembly and output.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::assemble::assemble;
use crate::block::{Block, Classifier};
use crate::config::ParserConfig;
use crate::error::{ParseError, ParseResult};
use crate::extract::{DocumentFormat, DocumentMeta, ExtractContext, extractor_for};
use crate::render::{FileInfo, render_document};

/// A parsed document: its tree plus what goes into the front matter.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub format: DocumentFormat,
    pub file: FileInfo,
    pub meta: DocumentMeta,
    pub tree: Block,
}

impl Document {
    /// Markdown with front matter.
    pub fn to_markdown(&self) -> ParseResult<String> {
        render_document(&self.tree, &self.file, &self.meta)
    }
}

/// Result of [`parse`]. Failures are reported, never raised.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub success: bool,
    pub message: String,
    pub tree: Option<Block>,
    pub meta: DocumentMeta,
}

/// What [`convert`] did with the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertStatus {
    Written,
    /// The output already existed and `force` was off.
    Skipped,
}

pub fn is_supported(path: impl AsRef<Path>) -> bool {
    DocumentFormat::from_path(path.as_ref()).is_some()
}

/// `input` with its extension replaced by `.md`.
pub fn default_output_path(input: impl AsRef<Path>) -> PathBuf {
    input.as_ref().with_extension("md")
}

/// Parse a file into a [`Document`].
pub fn parse_document(path: impl AsRef<Path>, config: &ParserConfig) -> ParseResult<Document> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path).ok_or_else(|| ParseError::UnsupportedFormat {
        path: path.display().to_string(),
    })?;
    let data = std::fs::read(path).map_err(|e| ParseError::io(path, e))?;

    let origin = path.display().to_string();
    let classifier = Classifier::new(&config.headings);
    let ctx = ExtractContext {
        config,
        classifier: &classifier,
        origin: &origin,
    };
    let extraction = extractor_for(format, config).extract(&data, &ctx)?;
    if extraction.blocks.is_empty() && extraction.toc.is_empty() {
        return Err(ParseError::EmptyDocument { path: origin });
    }
    tracing::debug!(
        path = %origin,
        format = format.label(),
        blocks = extraction.blocks.len(),
        toc = extraction.toc.len(),
        "extracted"
    );

    let (tree, meta) = assemble(extraction, config);
    if config.debug {
        tracing::debug!(path = %origin, "tree:\n{}", tree.outline(false));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| origin.clone());
    Ok(Document {
        format,
        file: FileInfo::new(file_name, &data, format),
        meta,
        tree,
    })
}

/// Parse a file, reporting failure in the outcome instead of an error.
pub fn parse(path: impl AsRef<Path>, config: &ParserConfig) -> ParseOutcome {
    let path = path.as_ref();
    match parse_document(path, config) {
        Ok(doc) => ParseOutcome {
            success: true,
            message: "success".into(),
            tree: Some(doc.tree),
            meta: doc.meta,
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "parse failed");
            ParseOutcome {
                success: false,
                message: e.to_string(),
                tree: None,
                meta: DocumentMeta::default(),
            }
        }
    }
}

/// Convert `input` to Markdown at `output`.
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ParserConfig,
) -> ParseResult<ConvertStatus> {
    let (input, output) = (input.as_ref(), output.as_ref());
    if output.exists() && !config.force {
        tracing::info!(output = %output.display(), "output exists, skipping");
        return Ok(ConvertStatus::Skipped);
    }
    let markdown = parse_document(input, config)?.to_markdown()?;
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ParseError::io(dir, e))?;
    }
    std::fs::write(output, markdown).map_err(|e| ParseError::io(output, e))?;
    tracing::info!(input = %input.display(), output = %output.display(), "converted");
    Ok(ConvertStatus::Written)
}
