//! Text decoding with charset detection.

use encoding_rs::{Encoding, GB18030, GBK, UTF_8};

/// Decode `bytes` to UTF-8, detecting the charset.
///
/// A byte-order mark wins; otherwise `chardetng` guesses. GBK (which is what
/// GB2312 labels resolve to) is widened to GB18030 so rare characters
/// outside GB2312 survive.
pub fn decode_text(bytes: &[u8]) -> (String, &'static Encoding) {
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None => detect(bytes),
    };
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = used.name(), "decoded with replacement characters");
    }
    (text.into_owned(), used)
}

fn detect(bytes: &[u8]) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);
    if guess == GBK { GB18030 } else { guess }
}
