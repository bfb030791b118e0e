// SPDX-License-Identifier: PMPL-1.0-or-later
//! Shared issue and fix vocabulary.
//!
//! Scanners produce [`Issue`]s, the fix generator attaches [`Fix`] proposals,
//! and the orchestrator wraps them per file in a [`ScanResult`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest source excerpt carried by an issue
pub const MAX_SNIPPET_LEN: usize = 100;

/// Closed catalogue of accessibility defects.
///
/// Several variants are reserved for future rules and never produced by the
/// current scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    MissingAltText,
    MissingAriaLabel,
    MissingFormLabel,
    InvalidAriaAttribute,
    MissingHeadingHierarchy,
    MissingFocusIndicator,
    MissingLandmark,
    ColorContrast,
    MissingButtonType,
    DuplicateId,
    MissingLangAttribute,
    MissingSkipLink,
    InvalidRole,
    MissingKeyboardHandler,
}

impl IssueType {
    pub const ALL: [IssueType; 14] = [
        IssueType::MissingAltText,
        IssueType::MissingAriaLabel,
        IssueType::MissingFormLabel,
        IssueType::InvalidAriaAttribute,
        IssueType::MissingHeadingHierarchy,
        IssueType::MissingFocusIndicator,
        IssueType::MissingLandmark,
        IssueType::ColorContrast,
        IssueType::MissingButtonType,
        IssueType::DuplicateId,
        IssueType::MissingLangAttribute,
        IssueType::MissingSkipLink,
        IssueType::InvalidRole,
        IssueType::MissingKeyboardHandler,
    ];

    /// Kebab-case identifier used in config files and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::MissingAltText => "missing-alt-text",
            IssueType::MissingAriaLabel => "missing-aria-label",
            IssueType::MissingFormLabel => "missing-form-label",
            IssueType::InvalidAriaAttribute => "invalid-aria-attribute",
            IssueType::MissingHeadingHierarchy => "missing-heading-hierarchy",
            IssueType::MissingFocusIndicator => "missing-focus-indicator",
            IssueType::MissingLandmark => "missing-landmark",
            IssueType::ColorContrast => "color-contrast",
            IssueType::MissingButtonType => "missing-button-type",
            IssueType::DuplicateId => "duplicate-id",
            IssueType::MissingLangAttribute => "missing-lang-attribute",
            IssueType::MissingSkipLink => "missing-skip-link",
            IssueType::InvalidRole => "invalid-role",
            IssueType::MissingKeyboardHandler => "missing-keyboard-handler",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown issue type: {}", s))
    }
}

/// Severity levels for issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be addressed; fails the run when not fixing
    Error,
    /// Should be addressed
    Warning,
    /// Informational
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// 1-based source position, optionally spanning to an end position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<usize>,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            end_line: None,
            end_column: None,
        }
    }

    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }
}

/// What kind of edit a fix performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixKind {
    AddAttribute,
    Insert,
    Replace,
    Remove,
}

/// A remediation proposal attached to an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub kind: FixKind,
    pub description: String,
    /// Literal text to insert or substitute, e.g. `alt=""`
    pub code: String,
    pub position: Position,
}

impl Fix {
    /// Propose adding `name="value"` to the element at `position`
    pub fn add_attribute(name: &str, value: &str, position: Position, description: &str) -> Self {
        Self {
            kind: FixKind::AddAttribute,
            description: description.to_string(),
            code: format!("{}=\"{}\"", name, value.replace('"', "'")),
            position,
        }
    }

    /// Split an add-attribute fix back into its attribute name and value
    pub fn attribute(&self) -> Option<(&str, &str)> {
        if self.kind != FixKind::AddAttribute {
            return None;
        }
        let (name, rest) = self.code.split_once('=')?;
        let value = rest.strip_prefix('"')?.strip_suffix('"')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name, value))
    }
}

/// One detected accessibility defect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub message: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Opening tag or nearby source excerpt
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Issue {
    /// Create a new issue located at 1:1
    pub fn new(issue_type: IssueType, severity: Severity, message: &str) -> Self {
        Self {
            issue_type,
            severity,
            message: message.to_string(),
            line: 1,
            column: 1,
            code: String::new(),
            fix: None,
        }
    }

    /// Set the source location
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line.max(1);
        self.column = column.max(1);
        self
    }

    /// Set the source excerpt, truncated to [`MAX_SNIPPET_LEN`] characters
    pub fn with_code(mut self, code: &str) -> Self {
        self.code = truncate_snippet(code);
        self
    }

    /// Attach a fix proposal
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    pub fn is_fixable(&self) -> bool {
        self.fix.is_some()
    }

    /// Tag name of the element quoted in the snippet, lower-cased
    pub fn tag_name(&self) -> Option<String> {
        let rest = self.code.trim_start().strip_prefix('<')?;
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
            .collect();
        if name.is_empty() {
            None
        } else {
            Some(name.to_ascii_lowercase())
        }
    }
}

/// Truncate a source excerpt on a character boundary
pub fn truncate_snippet(code: &str) -> String {
    let flat = code.trim();
    if flat.chars().count() <= MAX_SNIPPET_LEN {
        return flat.to_string();
    }
    flat.chars().take(MAX_SNIPPET_LEN).collect()
}

/// Per-file outcome of a scan (and optional fix) pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub file: PathBuf,
    /// Issues in scan order
    pub issues: Vec<Issue>,
    /// Fixes actually written back
    pub fixed: usize,
    /// Issue count before fixing
    pub total: usize,
}

impl ScanResult {
    pub fn new(file: PathBuf, issues: Vec<Issue>) -> Self {
        let total = issues.len();
        Self {
            file,
            issues,
            fixed: 0,
            total,
        }
    }

    /// Empty result for files that cannot be scanned
    pub fn empty(file: PathBuf) -> Self {
        Self::new(file, Vec::new())
    }

    /// Record applied fixes; never exceeds `total`
    pub fn with_fixed(mut self, fixed: usize) -> Self {
        self.fixed = fixed.min(self.total);
        self
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.severity == severity).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn fixable_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_fixable()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_type_round_trips_through_str() {
        for t in IssueType::ALL {
            assert_eq!(t.as_str().parse::<IssueType>().unwrap(), t);
        }
        assert!("not-a-rule".parse::<IssueType>().is_err());
    }

    #[test]
    fn test_issue_serializes_type_field() {
        let issue = Issue::new(IssueType::MissingAltText, Severity::Error, "Missing alt");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "missing-alt-text");
        assert_eq!(json["severity"], "error");
        assert!(json.get("fix").is_none());
    }

    #[test]
    fn test_snippet_truncated() {
        let long = format!("<img src=\"{}\">", "a".repeat(200));
        let issue = Issue::new(IssueType::MissingAltText, Severity::Error, "x").with_code(&long);
        assert_eq!(issue.code.chars().count(), MAX_SNIPPET_LEN);
        assert_eq!(issue.tag_name().as_deref(), Some("img"));
    }

    #[test]
    fn test_fix_attribute_parsing() {
        let fix = Fix::add_attribute("aria-label", "Close \"dialog\"", Position::new(3, 5), "label");
        assert_eq!(fix.code, "aria-label=\"Close 'dialog'\"");
        assert_eq!(fix.attribute(), Some(("aria-label", "Close 'dialog'")));

        let empty = Fix::add_attribute("alt", "", Position::new(1, 1), "alt");
        assert_eq!(empty.attribute(), Some(("alt", "")));
    }

    #[test]
    fn test_fixed_never_exceeds_total() {
        let issues = vec![Issue::new(IssueType::DuplicateId, Severity::Error, "dup")];
        let result = ScanResult::new(PathBuf::from("a.html"), issues).with_fixed(5);
        assert_eq!(result.total, 1);
        assert_eq!(result.fixed, 1);
        assert!(result.has_errors());
    }
}
