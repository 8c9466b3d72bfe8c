//! Parser configuration, persisted as TOML.
//!
//! Every field has a default so a partial file (or none at all) is valid.
//! OCR credentials fall back to the `BAIDU_OCR_*` environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Top-level construction options for one parse call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Re-parse even if the output file already exists.
    #[serde(default)]
    pub force: bool,
    /// Verbose tracing of extraction and tree building.
    #[serde(default)]
    pub debug: bool,
    /// Run OCR on image-only PDF pages.
    #[serde(default)]
    pub use_ocr: bool,
    /// Synthesize hierarchical numbers ("2.3.1") for headings that lack them.
    #[serde(default = "default_true")]
    pub number_headings: bool,
    #[serde(default)]
    pub headings: HeadingConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

/// Heading-detection tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingConfig {
    /// Substrings that turn a short line into a keyword heading.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Apply the base-title length cutoff to every line, not only to
    /// unformatted sources.
    #[serde(default)]
    pub strict: bool,
    /// Line prefixes that mark a top-level section (appendix, preface...).
    #[serde(default = "default_top_level_prefixes")]
    pub top_level_prefixes: Vec<String>,
    /// Substrings that mark a short line as a top-level section.
    #[serde(default = "default_top_level_markers")]
    pub top_level_markers: Vec<String>,
}

/// PDF layout analyzer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Detect tables and deduplicate their text from the paragraph stream.
    #[serde(default = "default_true")]
    pub parse_tables: bool,
    /// Stop after this many pages (0 = all).
    #[serde(default)]
    pub page_limit: usize,
    /// Fraction of page height treated as header/footer band.
    #[serde(default = "default_header_footer_ratio")]
    pub header_footer_ratio: f64,
}

/// Baidu OCR credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: String,
}

fn default_true() -> bool {
    true
}
fn default_header_footer_ratio() -> f64 {
    0.1
}
fn default_top_level_prefixes() -> Vec<String> {
    [
        "附录", "附件", "前言", "鉴于：", "Appendix", "Annex", "Preface", "Whereas:",
        "Recitals:", "Abstract",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_top_level_markers() -> Vec<String> {
    ["(无正文)", "（无正文）", "签署页", "签字页"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            strict: false,
            top_level_prefixes: default_top_level_prefixes(),
            top_level_markers: default_top_level_markers(),
        }
    }
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            parse_tables: true,
            page_limit: 0,
            header_footer_ratio: default_header_footer_ratio(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            force: false,
            debug: false,
            use_ocr: false,
            number_headings: true,
            headings: HeadingConfig::default(),
            pdf: PdfConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl ParserConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ParseResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ParseError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParseError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ParseResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ParseError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ParseError::ConfigWrite {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ParseError::ConfigWrite {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Fill empty OCR credentials from `BAIDU_OCR_APPID`, `BAIDU_OCR_API_KEY`
    /// and `BAIDU_OCR_SECRET_KEY`.
    pub fn with_env_overrides(mut self) -> Self {
        let fill = |slot: &mut String, var: &str| {
            if slot.trim().is_empty() {
                if let Ok(value) = std::env::var(var) {
                    *slot = value;
                }
            }
        };
        fill(&mut self.ocr.app_id, "BAIDU_OCR_APPID");
        fill(&mut self.ocr.api_key, "BAIDU_OCR_API_KEY");
        fill(&mut self.ocr.secret_key, "BAIDU_OCR_SECRET_KEY");
        self
    }
}

impl OcrConfig {
    /// OCR is usable only with both API key and secret.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.secret_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ParserConfig = toml::from_str(
            r#"
            use_ocr = true

            [headings]
            keywords = ["Scope", "定义"]
            "#,
        )
        .unwrap();
        assert!(config.use_ocr);
        assert!(config.number_headings);
        assert_eq!(config.headings.keywords.len(), 2);
        assert!(config.headings.top_level_prefixes.iter().any(|p| p == "附录"));
        assert!(config.pdf.parse_tables);
        assert!((config.pdf.header_footer_ratio - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/docstruct.toml");
        let mut config = ParserConfig::default();
        config.headings.keywords = vec!["Definitions".into()];
        config.pdf.page_limit = 3;
        config.save(&path).unwrap();

        let loaded = ParserConfig::load(&path).unwrap();
        assert_eq!(loaded.headings.keywords, vec!["Definitions".to_string()]);
        assert_eq!(loaded.pdf.page_limit, 3);
    }

    #[test]
    fn invalid_toml_is_config_parse() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "force = [").unwrap();
        let err = ParserConfig::load(&path).unwrap_err();
        assert!(matches!(err, ParseError::ConfigParse { .. }));
    }

    #[test]
    fn ocr_requires_key_and_secret() {
        let mut ocr = OcrConfig::default();
        assert!(!ocr.is_configured());
        ocr.api_key = "k".into();
        assert!(!ocr.is_configured());
        ocr.secret_key = "s".into();
        assert!(ocr.is_configured());
    }
}
