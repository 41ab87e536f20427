//! Content classification: MIME sniffing, text detection, encoding and lines.
//!
//! Sniffing only looks at the first [`SNIFF_LEN`] bytes. Encoding detection
//! looks at the whole buffer and is best effort: when nothing can be
//! detected the encoding is simply left unset.

use std::borrow::Cow;
use std::collections::BTreeSet;

use encoding_rs::{Encoding, UTF_8};
use serde::Serialize;
use thiserror::Error;

/// Number of leading bytes inspected for MIME detection.
pub const SNIFF_LEN: usize = 512;

const OCTET_STREAM: &str = "application/octet-stream";

/// Structured formats that count as text even without a `text/` prefix.
const DEFAULT_TEXTUAL_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/javascript",
    "application/x-javascript",
    "application/ecmascript",
];

/// Errors from classification helpers.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("could not detect a character encoding for empty content")]
    EmptyContent,
}

/// Result of classifying a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub mime_type: String,
    pub is_text: bool,
    /// Detected encoding name, text only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Line count, text only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,
}

/// Classification plus the decoded text, if any.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub classification: Classification,
    pub text: Option<String>,
}

/// Classifies raw bytes.
///
/// The set of non-`text/` MIME types treated as text is explicit and can be
/// extended with [`FileClassifier::with_textual_type`].
#[derive(Debug, Clone)]
pub struct FileClassifier {
    textual_types: BTreeSet<String>,
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self {
            textual_types: DEFAULT_TEXTUAL_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FileClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat an additional MIME type as text.
    pub fn with_textual_type(mut self, mime_type: impl Into<String>) -> Self {
        self.textual_types.insert(mime_type.into().to_lowercase());
        self
    }

    /// Detect the MIME type and whether it is textual.
    ///
    /// ```
    /// use diffdeck::classify::FileClassifier;
    ///
    /// let classifier = FileClassifier::new();
    /// let (mime, is_text) = classifier.classify(b"fn main() {}\n");
    /// assert!(mime.starts_with("text/plain"));
    /// assert!(is_text);
    /// ```
    pub fn classify(&self, content: &[u8]) -> (String, bool) {
        let mime_type = sniff_mime_type(content);
        let is_text = self.is_textual(&mime_type);
        (mime_type, is_text)
    }

    /// Whether a MIME type counts as text.
    pub fn is_textual(&self, mime_type: &str) -> bool {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        essence.starts_with("text/") || self.textual_types.contains(&essence)
    }

    /// Classify, detect encoding, count lines, and decode text in one pass.
    pub fn inspect(&self, content: &[u8]) -> Inspection {
        let (mime_type, is_text) = self.classify(content);

        if !is_text {
            return Inspection {
                classification: Classification {
                    mime_type,
                    is_text,
                    encoding: None,
                    line_count: None,
                },
                text: None,
            };
        }

        let encoding = detect_encoding(content).ok();
        let text = decode(content, encoding.as_deref()).into_owned();
        let line_count = count_lines(text.as_bytes());

        Inspection {
            classification: Classification {
                mime_type,
                is_text,
                encoding,
                line_count: Some(line_count),
            },
            text: Some(text),
        }
    }
}

/// Sniff a MIME type from the first [`SNIFF_LEN`] bytes.
pub fn sniff_mime_type(content: &[u8]) -> String {
    let head = &content[..content.len().min(SNIFF_LEN)];

    if head.starts_with(&[0xFE, 0xFF]) {
        return "text/plain; charset=utf-16be".to_string();
    }
    if head.starts_with(&[0xFF, 0xFE]) {
        return "text/plain; charset=utf-16le".to_string();
    }
    if head.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return "text/plain; charset=utf-8".to_string();
    }

    if let Some(kind) = infer::get(head) {
        return kind.mime_type().to_string();
    }

    if head.iter().any(|&b| is_binary_byte(b)) {
        return OCTET_STREAM.to_string();
    }

    let trimmed = trim_leading_whitespace(head);
    if trimmed.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8".to_string();
    }
    if looks_like_html(trimmed) {
        return "text/html; charset=utf-8".to_string();
    }

    "text/plain; charset=utf-8".to_string()
}

/// Best-effort character encoding detection over the full content.
///
/// ```
/// use diffdeck::classify::detect_encoding;
///
/// assert_eq!(detect_encoding("héllo".as_bytes()).unwrap(), "UTF-8");
/// assert!(detect_encoding(b"").is_err());
/// ```
pub fn detect_encoding(content: &[u8]) -> Result<String, ClassifyError> {
    if content.is_empty() {
        return Err(ClassifyError::EmptyContent);
    }

    if let Some((encoding, _)) = Encoding::for_bom(content) {
        return Ok(encoding.name().to_string());
    }

    if std::str::from_utf8(content).is_ok() {
        return Ok(UTF_8.name().to_string());
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(content, true);
    Ok(detector.guess(None, true).name().to_string())
}

/// Count lines: newlines, plus one for a trailing partial line.
///
/// ```
/// use diffdeck::classify::count_lines;
///
/// assert_eq!(count_lines(b""), 0);
/// assert_eq!(count_lines(b"a\nb"), 2);
/// assert_eq!(count_lines(b"a\nb\n"), 2);
/// ```
pub fn count_lines(content: &[u8]) -> usize {
    match content.last() {
        None => 0,
        Some(b'\n') => bytecount::count(content, b'\n'),
        Some(_) => bytecount::count(content, b'\n') + 1,
    }
}

/// Decode bytes using a named encoding, falling back to lossy UTF-8.
pub fn decode<'a>(content: &'a [u8], encoding: Option<&str>) -> Cow<'a, str> {
    let encoding = encoding.and_then(|name| Encoding::for_label(name.as_bytes()));

    match encoding {
        Some(encoding) => {
            // BOM sniffing strips the mark and wins over the label
            let (text, _, _) = encoding.decode(content);
            text
        }
        None => String::from_utf8_lossy(content),
    }
}

/// Bytes that never appear in text, per the WHATWG sniffing rules.
fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

fn trim_leading_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn looks_like_html(bytes: &[u8]) -> bool {
    const TAGS: &[&[u8]] = &[
        b"<!doctype html",
        b"<html",
        b"<head",
        b"<body",
        b"<script",
        b"<iframe",
        b"<style",
        b"<title",
        b"<table",
        b"<div",
        b"<!--",
    ];

    TAGS.iter().any(|tag| {
        bytes.len() > tag.len()
            && bytes[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(bytes[tag.len()], b' ' | b'>' | b'\n' | b'\t' | b'\r' | b'-')
    })
}
