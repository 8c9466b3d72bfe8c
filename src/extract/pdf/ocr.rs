//! Embedded page images and OCR of image-only pages.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pdf_extract::{Dictionary, Document, Object, ObjectId};

use crate::config::OcrConfig;
use crate::error::{ParseError, ParseResult};

use super::outline::{as_dict, dict_entry, resolve};

const TOKEN_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";
const GENERAL_OCR_URL: &str = "https://aip.baidubce.com/rest/2.0/ocr/v1/general_basic";

/// Image-to-text recognition.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &Path) -> ParseResult<String>;
}

/// Baidu general OCR over its REST API.
pub struct BaiduOcr {
    api_key: String,
    secret_key: String,
    timeout: Duration,
    token: Mutex<Option<String>>,
}

impl BaiduOcr {
    /// `None` unless all credentials are present.
    pub fn from_config(config: &OcrConfig) -> Option<Self> {
        config.is_configured().then(|| Self {
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            timeout: Duration::from_secs(30),
            token: Mutex::new(None),
        })
    }

    fn agent(&self) -> ureq::Agent {
        ureq::AgentBuilder::new().timeout(self.timeout).build()
    }

    fn token_request(&self) -> ureq::Request {
        self.agent()
            .post(TOKEN_URL)
            .query("grant_type", "client_credentials")
            .query("client_id", &self.api_key)
            .query("client_secret", &self.secret_key)
    }

    fn cached_token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The lock is not held during the fetch; concurrent first calls may
    /// each fetch a token, and the last one is kept.
    fn access_token(&self) -> ParseResult<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        let json: serde_json::Value = self
            .token_request()
            .call()
            .map_err(|e: ureq::Error| ParseError::Ocr {
                message: e.to_string(),
            })?
            .into_json()
            .map_err(|e| ParseError::Ocr {
                message: e.to_string(),
            })?;
        let token = json["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ParseError::Ocr {
                message: format!(
                    "no access token: {}",
                    json["error_description"].as_str().unwrap_or("unknown error")
                ),
            })?;
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        Ok(token)
    }
}

impl OcrEngine for BaiduOcr {
    fn recognize(&self, image: &Path) -> ParseResult<String> {
        let bytes = std::fs::read(image).map_err(|e| ParseError::io(image, e))?;
        let encoded = STANDARD.encode(bytes);
        let token = self.access_token()?;
        let json: serde_json::Value = self
            .agent()
            .post(GENERAL_OCR_URL)
            .query("access_token", &token)
            .send_form(&[("image", encoded.as_str())])
            .map_err(|e: ureq::Error| ParseError::Ocr {
                message: e.to_string(),
            })?
            .into_json()
            .map_err(|e| ParseError::Ocr {
                message: e.to_string(),
            })?;
        words_text(&json)
    }
}

/// Recognized lines from a general OCR response.
pub fn words_text(json: &serde_json::Value) -> ParseResult<String> {
    if let Some(message) = json["error_msg"].as_str() {
        return Err(ParseError::Ocr {
            message: message.to_string(),
        });
    }
    let words = json["words_result"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|w| w["words"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();
    Ok(words)
}

/// An image XObject on a page. Only JPEG payloads are kept.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub jpeg: Option<Vec<u8>>,
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Some(resources) = dict_entry(doc, node, b"Resources").and_then(as_dict) {
            return Some(resources);
        }
        node = dict_entry(doc, node, b"Parent").and_then(as_dict)?;
    }
    None
}

fn is_name(obj: &Object, name: &[u8]) -> bool {
    matches!(obj, Object::Name(n) if n.as_slice() == name)
}

/// Image XObjects referenced from the page's resources.
pub fn page_images(doc: &Document, page_id: ObjectId) -> Vec<PageImage> {
    let Some(xobjects) =
        page_resources(doc, page_id).and_then(|r| dict_entry(doc, r, b"XObject").and_then(as_dict))
    else {
        return Vec::new();
    };
    let mut images = Vec::new();
    for (_, obj) in xobjects.iter() {
        let Some(Object::Stream(stream)) = resolve(doc, obj) else {
            continue;
        };
        if !stream.dict.get(b"Subtype").is_ok_and(|s| is_name(s, b"Image")) {
            continue;
        }
        let jpeg = match stream.dict.get(b"Filter") {
            Ok(Object::Array(filters)) => filters.iter().any(|f| is_name(f, b"DCTDecode")),
            Ok(filter) => is_name(filter, b"DCTDecode"),
            Err(_) => false,
        };
        images.push(PageImage {
            jpeg: jpeg.then(|| stream.content.clone()),
        });
    }
    images
}

/// OCR the largest JPEG on a page through a scratch file. Any failure
/// yields empty text.
pub fn ocr_page(engine: &dyn OcrEngine, images: &[PageImage], page: u32) -> String {
    let Some(largest) = images
        .iter()
        .filter_map(|i| i.jpeg.as_deref())
        .max_by_key(|data| data.len())
    else {
        tracing::debug!(page, "no embedded JPEG to recognize");
        return String::new();
    };
    let dir = match tempfile::TempDir::new() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(page, error = %e, "cannot create scratch directory for OCR");
            return String::new();
        }
    };
    let path = dir.path().join(format!("page-{page}.jpg"));
    if let Err(e) = std::fs::write(&path, largest) {
        tracing::warn!(page, error = %e, "cannot write page image");
        return String::new();
    }
    match engine.recognize(&path) {
        Ok(text) => {
            tracing::debug!(page, chars = text.chars().count(), "page recognized");
            text
        }
        Err(e) => {
            tracing::warn!(page, error = %e, "OCR failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_extract::Stream;

    struct EchoOcr;

    impl OcrEngine for EchoOcr {
        fn recognize(&self, image: &Path) -> ParseResult<String> {
            let bytes = std::fs::read(image).map_err(|e| ParseError::io(image, e))?;
            Ok(format!("{} bytes", bytes.len()))
        }
    }

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn recognize(&self, _image: &Path) -> ParseResult<String> {
            Err(ParseError::Ocr {
                message: "quota exceeded".into(),
            })
        }
    }

    #[test]
    fn parses_words_result() {
        let json = serde_json::json!({
            "words_result": [{"words": "第一行"}, {"words": "second"}],
            "words_result_num": 2
        });
        assert_eq!(words_text(&json).unwrap(), "第一行\nsecond");
        let err = serde_json::json!({
            "error_code": 17,
            "error_msg": "Open api daily request limit reached"
        });
        assert!(matches!(words_text(&err), Err(ParseError::Ocr { .. })));
    }

    #[test]
    fn largest_jpeg_is_recognized() {
        let images = vec![
            PageImage { jpeg: Some(vec![0; 10]) },
            PageImage { jpeg: None },
            PageImage { jpeg: Some(vec![0; 25]) },
        ];
        assert_eq!(ocr_page(&EchoOcr, &images, 3), "25 bytes");
        assert_eq!(ocr_page(&EchoOcr, &[PageImage { jpeg: None }], 3), "");
        assert_eq!(ocr_page(&FailingOcr, &images, 3), "");
    }

    #[test]
    fn missing_credentials_disable_ocr() {
        assert!(BaiduOcr::from_config(&OcrConfig::default()).is_none());
    }

    #[test]
    fn credentials_are_query_encoded() {
        let config = OcrConfig {
            api_key: "key&grant_type=x".into(),
            secret_key: "s3cret/+=".into(),
            ..OcrConfig::default()
        };
        let ocr = BaiduOcr::from_config(&config).unwrap();
        let url = ocr.token_request().request_url().unwrap();
        assert_eq!(url.path(), "/oauth/2.0/token");
        let pairs = url.query_pairs();
        assert!(pairs.contains(&("grant_type", "client_credentials")));
        assert!(pairs.contains(&("client_id", "key&grant_type=x")));
        assert!(pairs.contains(&("client_secret", "s3cret/+=")));
        assert!(!url.as_url().as_str().contains("s3cret/+="));
    }

    #[test]
    fn cached_token_skips_the_fetch() {
        let config = OcrConfig {
            api_key: "k".into(),
            secret_key: "s".into(),
            ..OcrConfig::default()
        };
        let ocr = BaiduOcr::from_config(&config).unwrap();
        assert_eq!(ocr.cached_token(), None);
        *ocr.token.lock().unwrap() = Some("t0k".into());
        assert_eq!(ocr.access_token().unwrap(), "t0k");
    }

    #[test]
    fn finds_image_xobjects() {
        let mut doc = Document::with_version("1.5");

        let mut jpeg_dict = Dictionary::new();
        jpeg_dict.set("Subtype", Object::Name(b"Image".to_vec()));
        jpeg_dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        let jpeg = Stream::new(jpeg_dict, vec![0xFF, 0xD8, 0xFF]);
        let jpeg_id = doc.add_object(Object::Stream(jpeg));

        let mut form_dict = Dictionary::new();
        form_dict.set("Subtype", Object::Name(b"Form".to_vec()));
        let form_id = doc.add_object(Object::Stream(Stream::new(form_dict, Vec::new())));

        let mut xobjects = Dictionary::new();
        xobjects.set("Im1", Object::Reference(jpeg_id));
        xobjects.set("Fm1", Object::Reference(form_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));
        let resources_id = doc.add_object(Object::Dictionary(resources));

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Resources", Object::Reference(resources_id));
        let pages_id = doc.add_object(Object::Dictionary(pages));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        let page_id = doc.add_object(Object::Dictionary(page));

        let images = page_images(&doc, page_id);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].jpeg.as_deref(), Some(&[0xFF, 0xD8, 0xFF][..]));
    }
}
