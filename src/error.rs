//! Rich diagnostic error types for document parsing.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from parsing and conversion.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unsupported document format: \"{path}\"")]
    #[diagnostic(
        code(docstruct::unsupported_format),
        help(
            "Supported extensions are: docx, doc, pdf, epub, mobi, html, htm, txt and md. \
             Run `docstruct formats` to list them."
        )
    )]
    UnsupportedFormat { path: String },

    #[error("I/O error on \"{path}\": {source}")]
    #[diagnostic(
        code(docstruct::io),
        help("A filesystem operation failed. Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {format} document: {message}")]
    #[diagnostic(
        code(docstruct::malformed),
        help(
            "The document could not be parsed. Verify the file is valid {format} \
             and not corrupted or encrypted."
        )
    )]
    Malformed { format: String, message: String },

    #[error("empty document: no content extracted from \"{path}\"")]
    #[diagnostic(
        code(docstruct::empty_document),
        help(
            "The extractor found no text. Image-only PDFs need OCR: enable it with \
             --ocr and configure OCR credentials."
        )
    )]
    EmptyDocument { path: String },

    #[error("failed to read parser config: {path}")]
    #[diagnostic(
        code(docstruct::config_read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse parser config: {path}")]
    #[diagnostic(
        code(docstruct::config_parse),
        help("Check the TOML syntax in the config file: {message}")
    )]
    ConfigParse { path: String, message: String },

    #[error("failed to write parser config: {path}")]
    #[diagnostic(
        code(docstruct::config_write),
        help("Ensure you have write permissions to the config directory.")
    )]
    ConfigWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("external tool `{tool}` failed: {message}")]
    #[diagnostic(
        code(docstruct::external_tool),
        help("Install `{tool}` and make sure it is on PATH.")
    )]
    ExternalTool { tool: String, message: String },

    #[error("OCR request failed: {message}")]
    #[diagnostic(
        code(docstruct::ocr),
        help(
            "Check the OCR credentials (BAIDU_OCR_API_KEY, BAIDU_OCR_SECRET_KEY) \
             and network access."
        )
    )]
    Ocr { message: String },
}

impl ParseError {
    /// Build an `Io` error tagged with the path it happened on.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ParseError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn malformed(format: &str, message: impl std::fmt::Display) -> Self {
        ParseError::Malformed {
            format: format.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience alias for parser results.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
