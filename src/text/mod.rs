//! Format-independent text heuristics shared by every extractor.
//!
//! All functions here are pure: numbering-pattern recognition, Chinese
//! numeral conversion, similarity scoring, language detection and Markdown
//! cleanup.

pub mod cleanup;
pub mod language;
pub mod numbering;
pub mod similarity;

pub use language::Language;
pub use numbering::{TitleMatch, compare_number_str, get_number_str, is_base_title};
pub use similarity::{SIMILARITY_THRESHOLD, calc_similarity};
