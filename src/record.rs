//! The records produced by a scan.

use std::path::Path;

use crate::classify::{Classification, FileClassifier};

/// Content read from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Decoded text.
    Text(String),
    /// Raw bytes of a non-text file, kept only on request.
    Bytes(Vec<u8>),
}

impl Content {
    /// Text content, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Bytes(_) => None,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Content::Text(text) => text.len(),
            Content::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One discovered filesystem entry.
///
/// `content` and `classification` are `None` when the file was not read
/// (directories, files over the size limit). A flat scan never fills
/// `children`; the tree view nests every record under its parent exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Slash-separated path relative to the scan root.
    pub path: String,
    /// Size in bytes, 0 for directories.
    pub size: u64,
    pub is_directory: bool,
    pub content: Option<Content>,
    pub classification: Option<Classification>,
    pub children: Vec<FileRecord>,
}

impl FileRecord {
    /// Create a directory record.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            is_directory: true,
            content: None,
            classification: None,
            children: Vec::new(),
        }
    }

    /// Create a file record carrying only metadata.
    pub fn unread(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            is_directory: false,
            content: None,
            classification: None,
            children: Vec::new(),
        }
    }

    /// Create a file record from read content.
    pub fn file(
        path: impl Into<String>,
        size: u64,
        content: Option<Content>,
        classification: Classification,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            is_directory: false,
            content,
            classification: Some(classification),
            children: Vec::new(),
        }
    }

    /// Classify bytes that were read for `path` and build its record.
    ///
    /// Text is kept decoded; non-text bytes are kept only when `keep_binary`.
    pub fn from_bytes(
        path: impl Into<String>,
        bytes: Vec<u8>,
        classifier: &FileClassifier,
        keep_binary: bool,
    ) -> Self {
        let size = bytes.len() as u64;
        let inspection = classifier.inspect(&bytes);

        let content = match inspection.text {
            Some(text) => Some(Content::Text(text)),
            None if keep_binary => Some(Content::Bytes(bytes)),
            None => None,
        };

        Self::file(path, size, content, inspection.classification)
    }

    /// Last path component.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Lowercase extension, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(self.name())
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Parent path, empty for top-level entries.
    pub fn parent(&self) -> &str {
        parent_path(&self.path)
    }

    /// Whether the file's bytes were read.
    pub fn was_read(&self) -> bool {
        self.classification.is_some()
    }

    pub fn is_text(&self) -> bool {
        self.classification.as_ref().is_some_and(|c| c.is_text)
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.classification.as_ref().map(|c| c.mime_type.as_str())
    }

    pub fn encoding(&self) -> Option<&str> {
        self.classification
            .as_ref()
            .and_then(|c| c.encoding.as_deref())
    }

    pub fn line_count(&self) -> Option<usize> {
        self.classification.as_ref().and_then(|c| c.line_count)
    }

    /// Text content, if present.
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(Content::as_text)
    }

    /// Number of files in this record and its descendants.
    pub fn file_count(&self) -> usize {
        if self.is_directory {
            self.children.iter().map(FileRecord::file_count).sum()
        } else {
            1
        }
    }
}

/// Parent of a slash-separated path, empty at the top level.
pub fn parent_path(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_record() {
        let dir = FileRecord::directory("src/util");
        assert!(dir.is_directory);
        assert_eq!(dir.size, 0);
        assert!(dir.content.is_none());
        assert_eq!(dir.name(), "util");
        assert_eq!(dir.parent(), "src");
    }

    #[test]
    fn test_unread_record() {
        let record = FileRecord::unread("big.bin", 10_000);
        assert!(!record.was_read());
        assert!(!record.is_text());
        assert_eq!(record.mime_type(), None);
        assert_eq!(record.size, 10_000);
    }

    #[test]
    fn test_file_record_accessors() {
        let record = FileRecord::file(
            "src/Main.GO",
            6,
            Some(Content::Text("a\nb\nc\n".into())),
            Classification {
                mime_type: "text/plain; charset=utf-8".into(),
                is_text: true,
                encoding: Some("UTF-8".into()),
                line_count: Some(3),
            },
        );
        assert!(record.is_text());
        assert_eq!(record.extension().as_deref(), Some("go"));
        assert_eq!(record.line_count(), Some(3));
        assert_eq!(record.encoding(), Some("UTF-8"));
        assert_eq!(record.text(), Some("a\nb\nc\n"));
    }

    #[test]
    fn test_from_bytes_text_and_binary() {
        let classifier = FileClassifier::new();

        let text = FileRecord::from_bytes("a.txt", b"hi\n".to_vec(), &classifier, false);
        assert_eq!(text.text(), Some("hi\n"));
        assert_eq!(text.size, 3);

        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let dropped = FileRecord::from_bytes("b.png", png.to_vec(), &classifier, false);
        assert!(dropped.content.is_none());
        assert!(dropped.was_read());
        assert!(!dropped.is_text());

        let kept = FileRecord::from_bytes("b.png", png.to_vec(), &classifier, true);
        assert_eq!(kept.content, Some(Content::Bytes(png.to_vec())));
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("a.go"), "");
        assert_eq!(parent_path("a/b/c.go"), "a/b");
    }

    #[test]
    fn test_content_len() {
        assert_eq!(Content::Bytes(vec![1, 2, 3]).len(), 3);
        assert!(Content::Text(String::new()).is_empty());
        assert_eq!(Content::Bytes(vec![0]).as_text(), None);
    }
}
