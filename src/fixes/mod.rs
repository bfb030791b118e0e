// SPDX-License-Identifier: PMPL-1.0-or-later
//! Fix generation and application.
//!
//! [`generate_fix`] is a pure policy table from an issue to an optional
//! [`Fix`]. Only additions that need no human judgment are proposed; alt
//! text, duplicate ids, roles, headings and landmarks are left to people.
//!
//! Application lives in [`markup`] (tree mutation and re-serialization) and
//! [`script`] (syntax-tree edits with a textual fallback).

pub mod markup;
pub mod script;

use crate::config::Config;
use crate::model::{Fix, Issue, IssueType};
use std::sync::LazyLock;
use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static EXPR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("valid regex"));

/// Map an issue to a remediation proposal, if one is safe to make
pub fn generate_fix(issue: &Issue, config: &Config) -> Option<Fix> {
    let position = issue.position();
    match issue.issue_type {
        IssueType::MissingAltText => Some(Fix::add_attribute(
            "alt",
            "",
            position,
            "Add empty alt attribute (marks the image as decorative; replace with a description if it conveys content)",
        )),
        IssueType::MissingButtonType => Some(Fix::add_attribute(
            "type",
            "button",
            position,
            "Add type=\"button\" to prevent accidental form submission",
        )),
        IssueType::MissingLangAttribute => Some(Fix::add_attribute(
            "lang",
            "en",
            position,
            "Add lang=\"en\" to the document root",
        )),
        IssueType::MissingAriaLabel if config.auto_fix.generate_aria_labels => {
            let label = extract_text(&issue.code)
                .unwrap_or_else(|| default_label(issue.tag_name().as_deref()).to_string());
            Some(Fix::add_attribute(
                "aria-label",
                &label,
                position,
                &format!("Add aria-label=\"{}\"", label),
            ))
        }
        IssueType::MissingFormLabel if config.auto_fix.wrap_inputs_with_labels => {
            let label = default_label(issue.tag_name().as_deref());
            Some(Fix::add_attribute(
                "aria-label",
                label,
                position,
                &format!("Add aria-label=\"{}\" (replace with a descriptive label)", label),
            ))
        }
        _ => None,
    }
}

/// Attach generated fixes to a batch of issues, preserving order
pub fn attach_fixes(issues: Vec<Issue>, config: &Config) -> Vec<Issue> {
    issues
        .into_iter()
        .map(|issue| match generate_fix(&issue, config) {
            Some(fix) => issue.with_fix(fix),
            None => issue,
        })
        .collect()
}

/// Visible literal text inside a snippet such as `<a href="/">Home</a>`
fn extract_text(code: &str) -> Option<String> {
    let without_tags = TAG_RE.replace_all(code, " ");
    let without_exprs = EXPR_RE.replace_all(&without_tags, " ");
    let text = without_exprs.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() || text.contains(&['<', '>', '{', '}'][..]) {
        None
    } else {
        Some(text)
    }
}

/// Fallback accessible name for a tag
fn default_label(tag: Option<&str>) -> &'static str {
    match tag {
        Some("button") => "Button",
        Some("a") => "Link",
        Some("input") => "Input field",
        Some("select") => "Select option",
        Some("textarea") => "Text area",
        Some("img") => "Image",
        _ => "Interactive element",
    }
}
