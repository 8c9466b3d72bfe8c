//! PDF extractor: layout analysis over `pdf-extract` glyph output.
//!
//! Each page is rendered into positioned glyphs by [`collector`], grouped
//! into blocks and paragraphs by [`layout`], reconciled with detected
//! tables by [`table`], and OCRed when it turns out to be image-only. A
//! native bookmark outline, when present, decides the heading structure
//! instead of numbering detection.

pub mod collector;
pub mod layout;
pub mod ocr;
pub mod outline;
pub mod table;

use std::panic::AssertUnwindSafe;

use pdf_extract::Document;

use crate::block::{Block, BlockKind, Detection};
use crate::config::ParserConfig;
use crate::error::{ParseError, ParseResult};
use crate::toc::reconcile_outline;

use self::collector::PageCollector;
use self::layout::{PageLayout, page_texts};
use self::ocr::{BaiduOcr, OcrEngine, ocr_page, page_images};
use self::table::{AlignedColumnTables, PageItem, TableExtractor, merge_tables, regular_table};

use super::txt::text_blocks;
use super::{DocumentFormat, ExtractContext, Extraction, Extractor};

/// Pages with less text than this are candidates for OCR.
const IMAGE_PAGE_TEXT_LEN: usize = 50;

/// Longest first paragraph accepted as a fallback title.
const MAX_TITLE_LEN: usize = 256;

/// PDF extractor with pluggable table detection and OCR.
pub struct PdfExtractor {
    tables: Box<dyn TableExtractor>,
    ocr: Option<Box<dyn OcrEngine>>,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self {
            tables: Box::new(AlignedColumnTables::default()),
            ocr: None,
        }
    }
}

impl PdfExtractor {
    /// Default extractor, with Baidu OCR when enabled and configured.
    pub fn from_config(config: &ParserConfig) -> Self {
        let mut extractor = Self::default();
        if config.use_ocr {
            match BaiduOcr::from_config(&config.ocr) {
                Some(engine) => extractor.ocr = Some(Box::new(engine)),
                None => tracing::info!("OCR requested but no credentials configured, disabled"),
            }
        }
        extractor
    }

    pub fn with_tables(mut self, tables: Box<dyn TableExtractor>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_ocr(mut self, engine: Box<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr.is_some()
    }

    /// Render one page. Renderer errors and panics are logged and the page
    /// is skipped.
    fn render_page(&self, doc: &Document, page: u32) -> Option<PageLayout> {
        let mut collector = PageCollector::new();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::output_doc_page(doc, &mut collector, page)
        }));
        match result {
            Ok(Ok(())) => collector.into_layout(),
            Ok(Err(e)) => {
                tracing::warn!(page, error = ?e, "page could not be rendered");
                None
            }
            Err(_) => {
                tracing::warn!(page, "page renderer panicked");
                None
            }
        }
    }

    /// Paragraph texts and tables of one page, in reading order.
    fn page_items(&self, layout: &PageLayout, config: &ParserConfig) -> (Vec<PageItem>, String) {
        let texts = page_texts(layout, config.pdf.header_footer_ratio);
        let page_text = texts.join("\n");
        let tables = if config.pdf.parse_tables {
            self.tables
                .extract(layout)
                .into_iter()
                .map(regular_table)
                .filter(|t| !t.is_empty())
                .collect()
        } else {
            Vec::new()
        };
        if !tables.is_empty() {
            tracing::debug!(page = layout.number, tables = tables.len(), "tables detected");
        }
        (merge_tables(&texts, tables), page_text)
    }
}

/// A page is image-only when it has images or no text, and little text.
pub fn is_image_page(image_count: usize, page_text: &str) -> bool {
    let text = page_text.trim();
    (image_count > 0 || text.is_empty()) && text.chars().count() < IMAGE_PAGE_TEXT_LEN
}

/// First paragraph, if short enough to serve as a title.
pub fn fallback_title(blocks: &[Block]) -> Option<String> {
    blocks
        .iter()
        .find(|b| b.kind == BlockKind::Paragraph)
        .map(|b| b.text.trim().to_string())
        .filter(|t| !t.is_empty() && t.chars().count() < MAX_TITLE_LEN)
}

impl Extractor for PdfExtractor {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn extract(&self, data: &[u8], ctx: &ExtractContext<'_>) -> ParseResult<Extraction> {
        let doc = Document::load_mem(data).map_err(|e| ParseError::malformed("pdf", e))?;
        let mut meta = outline::read_info(&doc);
        let toc = outline::read_outline(&doc);

        let detection = if !toc.is_empty() || ctx.classifier.has_keywords() {
            Detection::Off
        } else {
            Detection::Auto
        };

        let pages = doc.get_pages();
        let limit = match ctx.config.pdf.page_limit {
            0 => usize::MAX,
            n => n,
        };
        tracing::debug!(
            origin = ctx.origin,
            pages = pages.len(),
            outline = toc.len(),
            ocr = self.has_ocr(),
            "pdf loaded"
        );

        let mut blocks = Vec::new();
        for (&page, &page_id) in pages.iter().take(limit) {
            let (items, page_text) = match self.render_page(&doc, page) {
                Some(layout) => self.page_items(&layout, ctx.config),
                None => (Vec::new(), String::new()),
            };
            for item in items {
                match item {
                    PageItem::Text(line) if line.trim().is_empty() => {}
                    PageItem::Text(line) => {
                        blocks.push(ctx.classifier.paragraph(line.trim(), detection))
                    }
                    PageItem::Table(table) => blocks.push(Block::table(table)),
                }
            }

            let images = page_images(&doc, page_id);
            if is_image_page(images.len(), &page_text) {
                meta.image_count += 1;
                if let Some(engine) = &self.ocr {
                    let text = ocr_page(engine.as_ref(), &images, page);
                    blocks.extend(text_blocks(&text, ctx.classifier, detection));
                }
            }
        }

        if !toc.is_empty() {
            let matched = reconcile_outline(&mut blocks, &toc);
            tracing::debug!(origin = ctx.origin, matched, entries = toc.len(), "outline applied");
        }
        if meta.title.is_none() {
            meta.title = fallback_title(&blocks);
        }

        Ok(Extraction {
            toc,
            meta,
            ..Extraction::new(blocks)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Classifier;
    use pdf_extract::{Dictionary, Object, Stream};

    #[test]
    fn image_page_rule() {
        assert!(is_image_page(1, "short caption"));
        assert!(is_image_page(0, "   "));
        assert!(!is_image_page(0, "short text page"));
        assert!(!is_image_page(2, &"long text ".repeat(10)));
    }

    #[test]
    fn title_falls_back_to_first_paragraph() {
        let blocks = vec![
            Block::new(BlockKind::Heading, "Ignored"),
            Block::new(BlockKind::Paragraph, "Quarterly Report"),
            Block::new(BlockKind::Paragraph, "Body"),
        ];
        assert_eq!(fallback_title(&blocks).as_deref(), Some("Quarterly Report"));
        let long = vec![Block::new(BlockKind::Paragraph, "x".repeat(300))];
        assert_eq!(fallback_title(&long), None);
    }

    #[test]
    fn ocr_follows_config() {
        let mut config = ParserConfig::default();
        assert!(!PdfExtractor::from_config(&config).has_ocr());
        config.use_ocr = true;
        config.ocr.app_id = "id".into();
        config.ocr.api_key = "key".into();
        config.ocr.secret_key = "secret".into();
        assert!(PdfExtractor::from_config(&config).has_ocr());
    }

    #[test]
    fn garbage_is_malformed() {
        let config = ParserConfig::default();
        let classifier = Classifier::default();
        let ctx = ExtractContext {
            config: &config,
            classifier: &classifier,
            origin: "broken.pdf",
        };
        let err = PdfExtractor::default()
            .extract(b"This is not a PDF", &ctx)
            .unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    fn name(n: &str) -> Object {
        Object::Name(n.as_bytes().to_vec())
    }

    /// One-page document with Helvetica text lines at the given baselines.
    fn text_pdf(lines: &[(&str, f64)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", name("Font"));
        font.set("Subtype", name("Type1"));
        font.set("BaseFont", name("Helvetica"));
        let font_id = doc.add_object(Object::Dictionary(font));
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        let resources_id = doc.add_object(Object::Dictionary(resources));

        let mut content = String::new();
        for (text, y) in lines {
            content.push_str(&format!("BT /F1 12 Tf 72 {y} Td ({text}) Tj ET\n"));
        }
        let content_id = doc.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            content.into_bytes(),
        )));

        let mut page = Dictionary::new();
        page.set("Type", name("Page"));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        let page_id = doc.add_object(Object::Dictionary(page));

        let mut pages = Dictionary::new();
        pages.set("Type", name("Pages"));
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        pages.set("Count", Object::Integer(1));
        pages.set("Resources", Object::Reference(resources_id));
        pages.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ]),
        );
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", name("Catalog"));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn extracts_text_lines_from_a_generated_pdf() {
        let data = text_pdf(&[("1 Introduction", 760.0), ("Plain body text.", 700.0)]);
        let config = ParserConfig::default();
        let classifier = Classifier::default();
        let ctx = ExtractContext {
            config: &config,
            classifier: &classifier,
            origin: "generated.pdf",
        };
        let extraction = PdfExtractor::default().extract(&data, &ctx).unwrap();
        let texts: Vec<&str> = extraction.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["1 Introduction", "Plain body text."]);
        assert_eq!(extraction.blocks[0].kind, BlockKind::NumberedHeading);
        assert_eq!(extraction.meta.title.as_deref(), Some("Plain body text."));
        assert_eq!(extraction.meta.image_count, 0);
    }
}
