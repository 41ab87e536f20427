//! Secret detection over scanned text.
//!
//! Each rule is a regular expression applied line by line. Only records with
//! text content are checked.

use std::fmt;
use std::path::Path;

use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::record::FileRecord;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("rule {id}: invalid pattern: {source}")]
    InvalidRule {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(name)
    }
}

/// A compiled detection rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pattern: Regex,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        pattern: &str,
    ) -> Result<Self, SecurityError> {
        let id = id.into();
        let pattern = Regex::new(pattern).map_err(|source| SecurityError::InvalidRule {
            id: id.clone(),
            source,
        })?;
        Ok(Self {
            id,
            message: message.into(),
            severity,
            pattern,
        })
    }
}

const BUILTIN_RULES: &[(&str, &str, Severity, &str)] = &[
    (
        "aws-access-key",
        "Potential AWS access key found",
        Severity::High,
        r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b",
    ),
    (
        "private-key",
        "Private key block found",
        Severity::High,
        r"-----BEGIN (?:[A-Z]+ )*PRIVATE KEY-----",
    ),
    (
        "github-token",
        "Potential GitHub token found",
        Severity::High,
        r"\bgh[pousr]_[0-9A-Za-z]{36}\b",
    ),
    (
        "google-api-key",
        "Potential Google API key found",
        Severity::High,
        r"\bAIza[0-9A-Za-z\-_]{35}",
    ),
    (
        "password-assignment",
        "Hardcoded password found",
        Severity::Medium,
        r#"(?i)\b(?:password|passwd|pwd)\s*[:=]\s*['"][^'"]+['"]"#,
    ),
    (
        "api-key-assignment",
        "Hardcoded API key found",
        Severity::Medium,
        r#"(?i)\b(?:api[_-]?key|api[_-]?secret)\s*[:=]\s*['"][^'"]+['"]"#,
    ),
    (
        "internal-url",
        "Internal URL found",
        Severity::Low,
        r"(?i)\b(?:localhost|127\.0\.0\.1|0\.0\.0\.0):\d+",
    ),
];

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub file_path: String,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, in characters.
    pub column: usize,
    pub rule_id: String,
    pub message: String,
    pub severity: Severity,
    pub matched: String,
}

/// Report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    /// JSON for a `.json` path, text otherwise.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Text,
        }
    }
}

/// Runs a rule set over records.
#[derive(Debug, Clone)]
pub struct SecurityChecker {
    rules: Vec<Rule>,
}

impl SecurityChecker {
    /// Checker with the built-in rules.
    pub fn new() -> Result<Self, SecurityError> {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(id, message, severity, pattern)| Rule::new(*id, *message, *severity, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Add a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Check every text record, sorted by path, line and column.
    pub fn check(&self, records: &[FileRecord]) -> Vec<Issue> {
        let mut issues: Vec<Issue> = records
            .par_iter()
            .filter(|record| !record.is_directory)
            .filter_map(|record| record.text().map(|text| (record.path.as_str(), text)))
            .flat_map_iter(|(path, text)| self.check_content(path, text))
            .collect();

        issues.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then(a.line.cmp(&b.line))
                .then(a.column.cmp(&b.column))
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        issues
    }

    /// Check one piece of text attributed to `file_path`.
    pub fn check_content(&self, file_path: &str, content: &str) -> Vec<Issue> {
        let mut issues = Vec::new();

        for (line_idx, line) in content.lines().enumerate() {
            for rule in &self.rules {
                for found in rule.pattern.find_iter(line) {
                    issues.push(Issue {
                        file_path: file_path.to_string(),
                        line: line_idx + 1,
                        column: line[..found.start()].chars().count() + 1,
                        rule_id: rule.id.clone(),
                        message: rule.message.clone(),
                        severity: rule.severity,
                        matched: found.as_str().to_string(),
                    });
                }
            }
        }

        if !issues.is_empty() {
            debug!(path = file_path, issues = issues.len(), "security issues found");
        }
        issues
    }
}

/// Render issues as a report.
pub fn create_report(issues: &[Issue], format: ReportFormat) -> Result<String, SecurityError> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(issues)?),
        ReportFormat::Text => {
            let mut out = String::from("Security Check Report\n=====================\n\n");

            if issues.is_empty() {
                out.push_str("No security issues found.\n");
                return Ok(out);
            }

            for issue in issues {
                out.push_str(&format!("File: {}\n", issue.file_path));
                out.push_str(&format!("Line: {}, Column: {}\n", issue.line, issue.column));
                out.push_str(&format!("Rule: {}\n", issue.rule_id));
                out.push_str(&format!("Severity: {}\n", issue.severity));
                out.push_str(&format!("Message: {}\n", issue.message));
                out.push_str(&format!("Match: {}\n\n", issue.matched));
            }
            Ok(out)
        }
    }
}
