//! Document formatting for diffdeck.
//!
//! Renders a scan (or a set of changes) into one plain-text, Markdown or
//! XML-tagged document, and serializes records to JSON for tooling.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::changes::{detect_language, ChangeRecord, ChangeStatus};
use crate::content::Transforms;
use crate::record::{Content, FileRecord};
use crate::security::Issue;
use crate::tree::{build_tree, format_number, format_size, render_tree, RenderOptions};

/// Errors that can occur while producing output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Document style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Plain,
    Markdown,
    Xml,
}

impl fmt::Display for OutputStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputStyle::Plain => "plain",
            OutputStyle::Markdown => "markdown",
            OutputStyle::Xml => "xml",
        };
        f.write_str(name)
    }
}

/// Options controlling the document.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub style: OutputStyle,
    /// Free text placed after the document header.
    pub header_text: Option<String>,
    /// Free text appended as a final section.
    pub instructions: Option<String>,
    pub file_summary: bool,
    pub directory_structure: bool,
    pub transforms: Transforms,
    /// Number of largest files listed in the summary.
    pub top_files_length: usize,
    pub include_empty_directories: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            style: OutputStyle::Plain,
            header_text: None,
            instructions: None,
            file_summary: true,
            directory_structure: true,
            transforms: Transforms::default(),
            top_files_length: 5,
            include_empty_directories: false,
        }
    }
}

const INTRO: &str = "This file is a merged representation of the codebase, combining all repository files into a single document.";
const RULE: &str = "================================================================";
const FILE_RULE: &str = "================";

/// Totals over the files of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total_files: usize,
    pub total_size: u64,
    pub total_lines: usize,
    /// Largest files, biggest first.
    pub top_files: Vec<(String, u64)>,
}

impl Summary {
    pub fn from_records(records: &[FileRecord], top: usize) -> Self {
        let files: Vec<&FileRecord> = records.iter().filter(|r| !r.is_directory).collect();

        let mut by_size: Vec<(String, u64)> =
            files.iter().map(|r| (r.path.clone(), r.size)).collect();
        by_size.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        by_size.truncate(top);

        Self {
            total_files: files.len(),
            total_size: files.iter().map(|r| r.size).sum(),
            total_lines: files.iter().filter_map(|r| r.line_count()).sum(),
            top_files: by_size,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Format a flat, path-sorted record list as one document.
///
/// Security `issues` get their own section when non-empty.
pub fn format_output(records: &[FileRecord], issues: &[Issue], options: &FormatOptions) -> String {
    let summary = options
        .file_summary
        .then(|| Summary::from_records(records, options.top_files_length));

    let tree = options.directory_structure.then(|| {
        let render = RenderOptions {
            show_empty_directories: options.include_empty_directories,
            ..Default::default()
        };
        render_tree(&build_tree(records.to_vec()), &render)
    });

    let doc = Document {
        records,
        issues,
        summary,
        tree,
        options,
    };

    match options.style {
        OutputStyle::Plain => doc.plain(),
        OutputStyle::Markdown => doc.markdown(),
        OutputStyle::Xml => doc.xml(),
    }
}

struct Document<'a> {
    records: &'a [FileRecord],
    issues: &'a [Issue],
    summary: Option<Summary>,
    tree: Option<String>,
    options: &'a FormatOptions,
}

impl Document<'_> {
    fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter().filter(|r| !r.is_directory)
    }

    fn body(&self, record: &FileRecord) -> String {
        match record.text() {
            Some(text) if self.options.transforms.is_noop() => text.to_string(),
            Some(text) => self
                .options
                .transforms
                .apply(text, record.extension().as_deref()),
            None => placeholder(record),
        }
    }

    // ------------------------------------------------------------------------
    // Plain
    // ------------------------------------------------------------------------

    fn plain(&self) -> String {
        let mut out = String::with_capacity(8192);

        out.push_str(INTRO);
        out.push_str("\n\n");

        if let Some(header) = &self.options.header_text {
            out.push_str(header);
            out.push_str("\n\n");
        }

        if let Some(summary) = &self.summary {
            push_plain_heading(&mut out, "File Summary");
            out.push_str(&format!("Total files: {}\n", format_number(summary.total_files)));
            out.push_str(&format!("Total size: {}\n", format_size(summary.total_size)));
            out.push_str(&format!("Total lines: {}\n", format_number(summary.total_lines)));
            if !summary.top_files.is_empty() {
                out.push_str(&format!("\nTop {} files by size:\n", summary.top_files.len()));
                for (i, (path, size)) in summary.top_files.iter().enumerate() {
                    out.push_str(&format!("{}. {} ({})\n", i + 1, path, format_size(*size)));
                }
            }
            out.push('\n');
        }

        if let Some(tree) = &self.tree {
            push_plain_heading(&mut out, "Directory Structure");
            out.push_str(tree);
            out.push('\n');
        }

        if !self.issues.is_empty() {
            push_plain_heading(&mut out, "Security Findings");
            for issue in self.issues {
                out.push_str(&format_issue_line(issue));
                out.push('\n');
            }
            out.push('\n');
        }

        push_plain_heading(&mut out, "Files");
        out.push('\n');
        for record in self.files() {
            out.push_str(FILE_RULE);
            out.push_str(&format!("\nFile: {}\n", record.path));
            out.push_str(FILE_RULE);
            out.push('\n');
            out.push_str(&self.body(record));
            out.push_str("\n\n");
        }

        if let Some(instructions) = &self.options.instructions {
            push_plain_heading(&mut out, "Instructions");
            out.push_str(instructions);
            out.push('\n');
        }

        out
    }

    // ------------------------------------------------------------------------
    // Markdown
    // ------------------------------------------------------------------------

    fn markdown(&self) -> String {
        let mut out = String::with_capacity(8192);

        out.push_str("# Repository Contents\n\n");
        out.push_str(INTRO);
        out.push_str("\n\n");

        if let Some(header) = &self.options.header_text {
            out.push_str(header);
            out.push_str("\n\n");
        }

        if let Some(summary) = &self.summary {
            out.push_str("## File Summary\n\n");
            out.push_str(&format!("- Total files: {}\n", format_number(summary.total_files)));
            out.push_str(&format!("- Total size: {}\n", format_size(summary.total_size)));
            out.push_str(&format!("- Total lines: {}\n", format_number(summary.total_lines)));
            if !summary.top_files.is_empty() {
                out.push_str("\n### Largest files\n\n");
                for (i, (path, size)) in summary.top_files.iter().enumerate() {
                    out.push_str(&format!("{}. `{}` ({})\n", i + 1, path, format_size(*size)));
                }
            }
            out.push('\n');
        }

        if let Some(tree) = &self.tree {
            out.push_str("## Directory Structure\n\n");
            push_fenced(&mut out, "text", tree);
        }

        if !self.issues.is_empty() {
            out.push_str("## Security Findings\n\n");
            for issue in self.issues {
                out.push_str(&format!("- {}\n", format_issue_line(issue)));
            }
            out.push('\n');
        }

        out.push_str("## Files\n\n");
        for record in self.files() {
            out.push_str(&format!("### {}\n\n", record.path));
            let lang = detect_language(&record.path)
                .map(|l| l.to_lowercase())
                .unwrap_or_default();
            push_fenced(&mut out, &lang, &self.body(record));
        }

        if let Some(instructions) = &self.options.instructions {
            out.push_str("## Instructions\n\n");
            out.push_str(instructions);
            out.push('\n');
        }

        out
    }

    // ------------------------------------------------------------------------
    // XML
    // ------------------------------------------------------------------------

    fn xml(&self) -> String {
        let mut out = String::with_capacity(8192);

        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<diffdeck>\n");
        out.push_str(&format!("<intro>{}</intro>\n", escape_xml(INTRO)));

        if let Some(header) = &self.options.header_text {
            out.push_str(&format!("<header>{}</header>\n", escape_xml(header)));
        }

        if let Some(summary) = &self.summary {
            out.push_str("<file_summary>\n");
            out.push_str(&format!("  <total_files>{}</total_files>\n", summary.total_files));
            out.push_str(&format!("  <total_size>{}</total_size>\n", summary.total_size));
            out.push_str(&format!("  <total_lines>{}</total_lines>\n", summary.total_lines));
            if !summary.top_files.is_empty() {
                out.push_str("  <top_files>\n");
                for (path, size) in &summary.top_files {
                    out.push_str(&format!(
                        "    <file path=\"{}\" size=\"{}\"/>\n",
                        escape_xml(path),
                        size
                    ));
                }
                out.push_str("  </top_files>\n");
            }
            out.push_str("</file_summary>\n");
        }

        if let Some(tree) = &self.tree {
            out.push_str("<directory_structure>\n");
            out.push_str(&escape_xml(tree));
            out.push_str("</directory_structure>\n");
        }

        if !self.issues.is_empty() {
            out.push_str("<security_findings>\n");
            for issue in self.issues {
                out.push_str(&format!(
                    "  <issue path=\"{}\" line=\"{}\" column=\"{}\" rule=\"{}\" severity=\"{}\">{}</issue>\n",
                    escape_xml(&issue.file_path),
                    issue.line,
                    issue.column,
                    escape_xml(&issue.rule_id),
                    issue.severity,
                    escape_xml(&issue.message),
                ));
            }
            out.push_str("</security_findings>\n");
        }

        out.push_str("<files>\n");
        for record in self.files() {
            out.push_str(&format!(
                "<file path=\"{}\" size=\"{}\"",
                escape_xml(&record.path),
                record.size
            ));
            if let Some(mime) = record.mime_type() {
                out.push_str(&format!(" mime=\"{}\"", escape_xml(mime)));
            }
            if let Some(lines) = record.line_count() {
                out.push_str(&format!(" lines=\"{}\"", lines));
            }
            out.push_str(">\n");
            out.push_str(&escape_xml(&self.body(record)));
            out.push_str("\n</file>\n");
        }
        out.push_str("</files>\n");

        if let Some(instructions) = &self.options.instructions {
            out.push_str(&format!("<instructions>{}</instructions>\n", escape_xml(instructions)));
        }

        out.push_str("</diffdeck>\n");
        out
    }
}

// ============================================================================
// Changes
// ============================================================================

/// Format classified changes as one document.
pub fn format_changes(changes: &[ChangeRecord], options: &FormatOptions) -> String {
    let body = |change: &ChangeRecord| match change.record.text() {
        Some(text) => options
            .transforms
            .apply(text, change.record.extension().as_deref()),
        None if change.status == ChangeStatus::Deleted => String::new(),
        None => placeholder(&change.record),
    };

    let mut out = String::with_capacity(8192);

    match options.style {
        OutputStyle::Plain => {
            out.push_str("Diffdeck Changes\n================\n\n");
            if let Some(header) = &options.header_text {
                out.push_str(header);
                out.push_str("\n\n");
            }
            out.push_str(&format!("Total changes: {}\n\n", changes.len()));

            for change in changes {
                out.push_str(&format!("File: {}\n", change.record.path));
                out.push_str(&format!("Status: {}\n", change.status));
                if let Some(old) = &change.old_path {
                    out.push_str(&format!("Old path: {}\n", old));
                }
                out.push_str("----------------------------------------\n");
                out.push_str(&body(change));
                out.push_str("\n\n");
            }
        }
        OutputStyle::Markdown => {
            out.push_str("# Diffdeck Changes\n\n");
            if let Some(header) = &options.header_text {
                out.push_str(header);
                out.push_str("\n\n");
            }
            out.push_str(&format!("## Summary\n\n- Total changes: {}\n\n", changes.len()));
            out.push_str("## Changes\n\n");

            for change in changes {
                out.push_str(&format!("### {}\n\n", change.record.path));
                out.push_str(&format!("- Status: `{}`\n", change.status));
                if let Some(language) = change.language {
                    out.push_str(&format!("- Language: `{}`\n", language));
                }
                if let Some(old) = &change.old_path {
                    out.push_str(&format!("- Old path: `{}`\n", old));
                }
                out.push('\n');
                let lang = change.language.map(str::to_lowercase).unwrap_or_default();
                push_fenced(&mut out, &lang, &body(change));
            }
        }
        OutputStyle::Xml => {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<diffdeck_changes>\n");
            if let Some(header) = &options.header_text {
                out.push_str(&format!("<header>{}</header>\n", escape_xml(header)));
            }
            out.push_str(&format!("<summary total=\"{}\"/>\n", changes.len()));

            for change in changes {
                out.push_str(&format!(
                    "<change path=\"{}\" status=\"{}\"",
                    escape_xml(&change.record.path),
                    change.status
                ));
                if let Some(language) = change.language {
                    out.push_str(&format!(" language=\"{}\"", language));
                }
                if let Some(old) = &change.old_path {
                    out.push_str(&format!(" old_path=\"{}\"", escape_xml(old)));
                }
                out.push_str(">\n");
                out.push_str(&escape_xml(&body(change)));
                out.push_str("\n</change>\n");
            }
            out.push_str("</diffdeck_changes>\n");
        }
    }

    if let Some(instructions) = &options.instructions {
        out.push_str(instructions);
        out.push('\n');
    }

    out
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Serialize)]
struct JsonRecord<'a> {
    path: &'a str,
    size: u64,
    is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_text: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonRecord<'a>>,
}

fn record_to_json(record: &FileRecord) -> JsonRecord<'_> {
    JsonRecord {
        path: &record.path,
        size: record.size,
        is_directory: record.is_directory,
        mime_type: record.mime_type(),
        is_text: record.classification.as_ref().map(|c| c.is_text),
        encoding: record.encoding(),
        line_count: record.line_count(),
        children: record.children.iter().map(record_to_json).collect(),
    }
}

/// Serialize records (flat or nested) as pretty JSON metadata, without content.
pub fn records_to_json(records: &[FileRecord]) -> Result<String, OutputError> {
    let json: Vec<JsonRecord<'_>> = records.iter().map(record_to_json).collect();
    Ok(serde_json::to_string_pretty(&json)?)
}

// ============================================================================
// Writing
// ============================================================================

/// Write `text` to `path`, or to stdout when `path` is `-`.
///
/// Missing parent directories are created.
pub fn write_output(text: &str, path: &Path) -> Result<(), OutputError> {
    let write_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    if path == Path::new("-") {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes()).map_err(write_err)?;
        return stdout.flush().map_err(write_err);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, text).map_err(write_err)
}

// ============================================================================
// Helpers
// ============================================================================

fn placeholder(record: &FileRecord) -> String {
    match (&record.content, record.mime_type()) {
        (Some(Content::Bytes(_)), Some(mime)) | (None, Some(mime)) => {
            format!("[binary file: {}, {}]", mime, format_size(record.size))
        }
        (_, None) => format!("[not read: {}, over size limit]", format_size(record.size)),
        (Some(Content::Text(text)), Some(_)) => text.clone(),
    }
}

fn push_plain_heading(out: &mut String, title: &str) {
    out.push_str(RULE);
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
}

/// Fence `body` with more backticks than any run it contains.
fn push_fenced(out: &mut String, lang: &str, body: &str) {
    let longest = body
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);

    out.push_str(&fence);
    out.push_str(lang);
    out.push('\n');
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
    out.push_str("\n\n");
}

fn format_issue_line(issue: &Issue) -> String {
    format!(
        "{}:{}:{} [{}] {} ({})",
        issue.file_path, issue.line, issue.column, issue.severity, issue.message, issue.rule_id
    )
}

/// Escape text for XML content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
