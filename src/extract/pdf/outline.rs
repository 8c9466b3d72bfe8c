//! Document-level PDF objects: the `/Info` dictionary and the bookmark
//! outline.

use std::collections::HashSet;

use pdf_extract::{Dictionary, Document, Object, ObjectId};

use crate::extract::{DocumentMeta, TocEntry, meta_value};

/// Guard against malformed outlines with cyclic or runaway links.
const MAX_OUTLINE_ITEMS: usize = 10_000;

/// Follow a reference, if `obj` is one.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|o| resolve(doc, o))
}

pub(crate) fn as_dict(obj: &Object) -> Option<&Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE or UTF-8 with a byte-order mark,
/// PDFDocEncoding (read as Latin-1) otherwise.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

fn text_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict_entry(doc, dict, key)? {
        Object::String(bytes, _) => meta_value(Some(decode_pdf_string(bytes))),
        _ => None,
    }
}

/// Title and author from the trailer's `/Info` dictionary.
pub fn read_info(doc: &Document) -> DocumentMeta {
    let Some(info) = dict_entry(doc, &doc.trailer, b"Info").and_then(as_dict) else {
        return DocumentMeta::default();
    };
    DocumentMeta {
        title: text_entry(doc, info, b"Title"),
        author: text_entry(doc, info, b"Author"),
        ..DocumentMeta::default()
    }
}

fn link(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<ObjectId> {
    match dict.get(key).ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok().map(|_| *id),
        _ => None,
    }
}

/// Flatten the bookmark tree in reading order; top-level entries are
/// level 1. Returns an empty list when the document has no outline.
pub fn read_outline(doc: &Document) -> Vec<TocEntry> {
    let Some(root) = doc
        .catalog()
        .ok()
        .and_then(|catalog| dict_entry(doc, catalog, b"Outlines"))
        .and_then(as_dict)
    else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut stack: Vec<(ObjectId, u32)> = link(doc, root, b"First")
        .map(|id| (id, 1))
        .into_iter()
        .collect();
    while let Some((id, level)) = stack.pop() {
        if !seen.insert(id) || seen.len() > MAX_OUTLINE_ITEMS {
            tracing::warn!(object = ?id, "outline loop or overflow, stopping");
            break;
        }
        let Ok(item) = doc.get_dictionary(id) else {
            continue;
        };
        if let Some(title) = text_entry(doc, item, b"Title") {
            entries.push(TocEntry::new(title, level));
        }
        // siblings below children on the stack, so children come out first
        if let Some(next) = link(doc, item, b"Next") {
            stack.push((next, level));
        }
        if let Some(first) = link(doc, item, b"First") {
            stack.push((first, level + 1));
        }
    }
    entries
}
