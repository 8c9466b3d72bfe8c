//! # docstruct
//!
//! Structural parser that turns DOCX, DOC, PDF, EPUB, MOBI, HTML, plain text
//! and Markdown files into one hierarchical block tree, then serializes that
//! tree as Markdown with YAML front matter.
//!
//! ## Architecture
//!
//! - **Text utilities** (`text`): numbering-pattern recognition, Chinese
//!   numerals, similarity scoring, language detection
//! - **Block tree** (`block`): node type, classification, insertion and
//!   post-passes
//! - **Extractors** (`extract`): one per format, selected by extension
//! - **TOC reconciliation** (`toc`): similarity matching of native TOC entries
//! - **Assembler** (`assemble`) and **serializer** (`render`)
//! - **Driver** (`convert`): `parse` and `convert` entry points
//!
//! ## Library usage
//!
//! ```no_run
//! use docstruct::config::ParserConfig;
//! use docstruct::convert;
//!
//! let config = ParserConfig::default();
//! let outcome = convert::parse("report.docx", &config);
//! if let Some(tree) = outcome.tree {
//!     println!("{}", docstruct::render::render_body(&tree));
//! }
//! ```

pub mod assemble;
pub mod block;
pub mod config;
pub mod convert;
pub mod error;
pub mod extract;
pub mod render;
pub mod text;
pub mod toc;
