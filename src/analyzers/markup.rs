// SPDX-License-Identifier: PMPL-1.0-or-later
//! Markup tree scanner for standalone HTML documents.
//!
//! The document is parsed once with `scraper`, flattened into a tree-order
//! list of [`LocatedElement`]s, and then run through a fixed sequence of
//! checks. Each check only reads the list and pushes into the issue buffer:
//!
//! 1. images without `alt`
//! 2. buttons (native or `role="button"`) without an accessible name
//! 3. form controls without a label
//! 4. buttons without `type`
//! 5. duplicate `id` values
//! 6. `<html>` without `lang`
//! 7. skipped heading levels
//! 8. missing `main` / `nav` landmarks
//! 9. unknown `role` values

use crate::analyzers::location::SourceLocator;
use crate::analyzers::{
    heading_level, invalid_role_tokens, ACCESSIBLE_NAME_ATTRS, MAX_HEADING_LEVEL,
    NAV_LINK_THRESHOLD,
};
use crate::model::{Issue, IssueType, Severity};
use scraper::{ElementRef, Html};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Form controls that need a label
const FORM_CONTROLS: &[&str] = &["input", "textarea", "select"];

/// An element paired with its best-effort source location
pub struct LocatedElement<'a> {
    pub element: ElementRef<'a>,
    pub line: usize,
    pub column: usize,
    /// Raw opening tag from the source, or a rendered stand-in
    pub snippet: String,
}

impl<'a> LocatedElement<'a> {
    pub fn tag(&self) -> &'a str {
        self.element.value().name()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Lower-cased, trimmed `role` attribute
    pub fn role(&self) -> Option<String> {
        self.attr("role").map(|r| r.trim().to_ascii_lowercase())
    }

    pub fn has_accessible_name_attr(&self) -> bool {
        ACCESSIBLE_NAME_ATTRS.iter().any(|a| self.has_attr(a))
    }

    pub fn has_text(&self) -> bool {
        self.element.text().any(|t| !t.trim().is_empty())
    }

    fn issue(&self, issue_type: IssueType, severity: Severity, message: &str) -> Issue {
        Issue::new(issue_type, severity, message)
            .at(self.line, self.column)
            .with_code(&self.snippet)
    }
}

/// Flatten a parsed document into tree order, locating each element in `locator`
pub fn index_elements<'a>(document: &'a Html, locator: &SourceLocator<'_>) -> Vec<LocatedElement<'a>> {
    let mut seen: HashMap<&'a str, usize> = HashMap::new();

    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .map(|element| {
            let tag = element.value().name();
            let occurrence = seen.entry(tag).or_insert(0);
            let index = *occurrence;
            *occurrence += 1;

            match locator.tag_offset(tag, index) {
                Some(offset) => {
                    let (line, column) = locator.line_column(offset);
                    let snippet = locator
                        .opening_tag(offset)
                        .map(str::to_string)
                        .unwrap_or_else(|| render_opening_tag(&element));
                    LocatedElement { element, line, column, snippet }
                }
                None => LocatedElement {
                    snippet: render_opening_tag(&element),
                    element,
                    line: 1,
                    column: 1,
                },
            }
        })
        .collect()
}

/// Rebuild an opening tag from the parsed element
pub fn render_opening_tag(element: &ElementRef<'_>) -> String {
    format!(
        "<{}{}>",
        element.value().name(),
        element
            .value()
            .attrs()
            .map(|(k, v)| format!(" {}=\"{}\"", k, v))
            .collect::<String>()
    )
}

/// Scanner for `.html` documents
pub struct MarkupScanner;

impl MarkupScanner {
    pub fn scan(&self, content: &str) -> Vec<Issue> {
        let document = Html::parse_document(content);
        if !document.errors.is_empty() {
            debug!(errors = document.errors.len(), "Recovered from HTML parse errors");
        }

        let locator = SourceLocator::new(content);
        let elements = index_elements(&document, &locator);
        let mut issues = Vec::new();

        check_images(&elements, &mut issues);
        check_interactive_names(&elements, &mut issues);
        check_form_labels(&elements, &mut issues);
        check_button_types(&elements, &mut issues);
        check_duplicate_ids(&elements, &mut issues);
        check_lang(&elements, &mut issues);
        check_heading_hierarchy(&elements, &mut issues);
        check_landmarks(&elements, &mut issues);
        check_roles(&elements, &mut issues);

        issues
    }
}

fn is_button(el: &LocatedElement<'_>) -> bool {
    el.tag() == "button" || el.role().as_deref() == Some("button")
}

/// `<img>` must carry `alt`; `alt=""` marks a decorative image and is fine
fn check_images(elements: &[LocatedElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements.iter().filter(|e| e.tag() == "img") {
        if !el.has_attr("alt") {
            issues.push(el.issue(
                IssueType::MissingAltText,
                Severity::Error,
                "Image is missing an alt attribute. Use alt=\"\" for decorative images or describe the image.",
            ));
        }
    }
}

fn check_interactive_names(elements: &[LocatedElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements.iter().filter(|e| is_button(e)) {
        if !el.has_accessible_name_attr() && !el.has_text() {
            issues.push(el.issue(
                IssueType::MissingAriaLabel,
                Severity::Warning,
                &format!(
                    "<{}> acting as a button has no accessible name. Add text content, aria-label or aria-labelledby.",
                    el.tag()
                ),
            ));
        }
    }
}

fn check_form_labels(elements: &[LocatedElement<'_>], issues: &mut Vec<Issue>) {
    let label_targets: HashSet<&str> = elements
        .iter()
        .filter(|e| e.tag() == "label")
        .filter_map(|e| e.attr("for"))
        .collect();

    for el in elements.iter().filter(|e| FORM_CONTROLS.contains(&e.tag())) {
        let hidden = el.tag() == "input"
            && el
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"));
        if hidden {
            continue;
        }

        let labelled = el.attr("id").is_some_and(|id| label_targets.contains(id));
        if !labelled && !el.has_accessible_name_attr() {
            issues.push(el.issue(
                IssueType::MissingFormLabel,
                Severity::Error,
                &format!(
                    "<{}> has no associated <label> and no aria-label or aria-labelledby.",
                    el.tag()
                ),
            ));
        }
    }
}

fn check_button_types(elements: &[LocatedElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements.iter().filter(|e| e.tag() == "button") {
        if !el.has_attr("type") {
            issues.push(el.issue(
                IssueType::MissingButtonType,
                Severity::Warning,
                "<button> has no type attribute and defaults to type=\"submit\" inside forms.",
            ));
        }
    }
}

/// Every element sharing a duplicated id is reported, not just the repeats
fn check_duplicate_ids(elements: &[LocatedElement<'_>], issues: &mut Vec<Issue>) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in elements.iter().filter_map(|e| e.attr("id")) {
        if !id.is_empty() {
            *counts.entry(id).or_insert(0) += 1;
        }
    }

    for el in elements {
        let Some(id) = el.attr("id") else { continue };
        let count = counts.get(id).copied().unwrap_or(0);
        if count > 1 {
            issues.push(el.issue(
                IssueType::DuplicateId,
                Severity::Error,
                &format!("id \"{}\" is used by {} elements. Ids must be unique.", id, count),
            ));
        }
    }
}

fn check_lang(elements: &[LocatedElement<'_>], issues: &mut Vec<Issue>) {
    if let Some(root) = elements.iter().find(|e| e.tag() == "html") {
        if !root.has_attr("lang") && !root.has_attr("xml:lang") {
            issues.push(root.issue(
                IssueType::MissingLangAttribute,
                Severity::Error,
                "The <html> element is missing a lang attribute.",
            ));
        }
    }
}

/// A heading may go at most one level deeper than the heading before it
fn check_heading_hierarchy(elements: &[LocatedElement<'_>], issues: &mut Vec<Issue>) {
    let mut previous: Option<u8> = None;

    for el in elements {
        let Some(level) = heading_level(el.tag()) else { continue };
        if level == 0 || level > MAX_HEADING_LEVEL {
            continue;
        }

        if let Some(prev) = previous {
            if level > prev + 1 {
                issues.push(el.issue(
                    IssueType::MissingHeadingHierarchy,
                    Severity::Warning,
                    &format!(
                        "Heading level skipped from <h{}> to <h{}>. Use <h{}> or add the missing levels.",
                        prev,
                        level,
                        prev + 1
                    ),
                ));
            }
        }
        previous = Some(level);
    }
}

fn check_landmarks(elements: &[LocatedElement<'_>], issues: &mut Vec<Issue>) {
    let has_landmark = |tag: &str, role: &str| {
        elements
            .iter()
            .any(|e| e.tag() == tag || e.role().as_deref() == Some(role))
    };

    let anchor = elements
        .iter()
        .find(|e| e.tag() == "body")
        .or_else(|| elements.first());
    let Some(anchor) = anchor else { return };

    if !has_landmark("main", "main") {
        issues.push(anchor.issue(
            IssueType::MissingLandmark,
            Severity::Info,
            "Document has no main landmark. Wrap the primary content in <main>.",
        ));
    }

    let links = elements
        .iter()
        .filter(|e| e.tag() == "a" && e.has_attr("href"))
        .count();
    if links > NAV_LINK_THRESHOLD && !has_landmark("nav", "navigation") {
        issues.push(anchor.issue(
            IssueType::MissingLandmark,
            Severity::Info,
            &format!(
                "Document has {} links but no navigation landmark. Group navigation links in <nav>.",
                links
            ),
        ));
    }
}

fn check_roles(elements: &[LocatedElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements {
        let Some(role) = el.attr("role") else { continue };
        let invalid = invalid_role_tokens(role);
        if !invalid.is_empty() {
            issues.push(el.issue(
                IssueType::InvalidRole,
                Severity::Error,
                &format!("role=\"{}\" is not a valid WAI-ARIA role.", role.trim()),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(html: &str) -> Vec<Issue> {
        MarkupScanner.scan(html)
    }

    fn of_type(issues: &[Issue], t: IssueType) -> Vec<&Issue> {
        issues.iter().filter(|i| i.issue_type == t).collect()
    }

    const SHELL_START: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<body>\n<main>\n";
    const SHELL_END: &str = "</main>\n</body>\n</html>\n";

    fn page(body: &str) -> String {
        format!("{}{}{}", SHELL_START, body, SHELL_END)
    }

    #[test]
    fn test_accessible_page_is_clean() {
        let html = page(
            r#"<h1>Title</h1>
<img src="logo.png" alt="Company logo">
<img src="divider.png" alt="">
<label for="email">Email</label>
<input id="email" type="email">
<input type="hidden" name="csrf" value="x">
<button type="submit">Send</button>
"#,
        );
        let issues = scan(&html);
        assert!(issues.is_empty(), "expected no issues, got {:?}", issues);
    }

    #[test]
    fn test_missing_alt_one_per_image() {
        let html = page("<img src=\"a.png\">\n<img src=\"b.png\" alt=\"\">\n<img src=\"c.png\">\n");
        let issues = scan(&html);
        let missing = of_type(&issues, IssueType::MissingAltText);
        assert_eq!(missing.len(), 2);
        assert!(missing.iter().all(|i| i.severity == Severity::Error));
        assert_eq!(missing[0].line, 5);
        assert_eq!(missing[0].column, 1);
        assert_eq!(missing[0].code, "<img src=\"a.png\">");
        assert_eq!(missing[1].line, 7);
    }

    #[test]
    fn test_noscript_body_is_text() {
        let issues = scan(&page("<noscript><img src=\"pixel.gif\" alt=\"\"></noscript>\n<img src=\"real.png\">\n"));
        let missing = of_type(&issues, IssueType::MissingAltText);
        assert_eq!(missing.len(), 1);
        assert_eq!((missing[0].line, missing[0].column), (6, 1));
        assert_eq!(missing[0].code, "<img src=\"real.png\">");
    }

    #[test]
    fn test_bare_button() {
        let issues = scan(&page("<button></button>\n"));
        let types: Vec<IssueType> = issues.iter().map(|i| i.issue_type).collect();
        assert_eq!(
            types,
            vec![IssueType::MissingAriaLabel, IssueType::MissingButtonType]
        );
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn test_role_button_needs_name() {
        let issues = scan(&page("<div role=\"button\"><i class=\"icon\"></i></div>\n<span role=\"button\" aria-label=\"Close\"></span>\n"));
        let unnamed = of_type(&issues, IssueType::MissingAriaLabel);
        assert_eq!(unnamed.len(), 1);
        assert!(unnamed[0].code.starts_with("<div"));
        assert!(of_type(&issues, IssueType::MissingButtonType).is_empty());
    }

    #[test]
    fn test_button_with_text_or_label() {
        let issues = scan(&page(
            "<button type=\"button\">Save</button>\n<button type=\"button\" title=\"Close\"></button>\n",
        ));
        assert!(of_type(&issues, IssueType::MissingAriaLabel).is_empty());
    }

    #[test]
    fn test_form_labels() {
        let html = page(
            r#"<label for="name">Name</label>
<input id="name">
<input id="orphan">
<select></select>
<textarea aria-label="Comments"></textarea>
<input type="HIDDEN">
"#,
        );
        let issues = scan(&html);
        let unlabelled = of_type(&issues, IssueType::MissingFormLabel);
        assert_eq!(unlabelled.len(), 2);
        assert!(unlabelled[0].code.contains("orphan"));
        assert!(unlabelled[1].code.starts_with("<select"));
        assert!(unlabelled.iter().all(|i| i.severity == Severity::Error));
    }

    #[test]
    fn test_duplicate_ids_flag_every_element() {
        let html = page(
            "<div id=\"card\">a</div>\n<p id=\"card\">b</p>\n<span id=\"card\">c</span>\n<div id=\"unique\">d</div>\n",
        );
        let issues = scan(&html);
        let dups = of_type(&issues, IssueType::DuplicateId);
        assert_eq!(dups.len(), 3);
        assert_eq!(dups[0].line, 5);
        assert_eq!(dups[2].line, 7);
    }

    #[test]
    fn test_missing_lang() {
        let issues = scan("<html><head><title>x</title></head><body><main></main></body></html>");
        let lang = of_type(&issues, IssueType::MissingLangAttribute);
        assert_eq!(lang.len(), 1);
        assert_eq!(lang[0].severity, Severity::Error);
        assert_eq!((lang[0].line, lang[0].column), (1, 1));
    }

    #[test]
    fn test_heading_skip_flags_once() {
        let issues = scan(&page("<h1>A</h1>\n<h3>C</h3>\n"));
        let skips = of_type(&issues, IssueType::MissingHeadingHierarchy);
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].line, 6);
        assert!(skips[0].code.starts_with("<h3"));
    }

    #[test]
    fn test_heading_sequence_ok() {
        let issues = scan(&page("<h1>A</h1>\n<h2>B</h2>\n<h3>C</h3>\n<h2>D</h2>\n"));
        assert!(of_type(&issues, IssueType::MissingHeadingHierarchy).is_empty());
    }

    #[test]
    fn test_first_heading_never_flagged() {
        let issues = scan(&page("<h4>Deep start</h4>\n<h5>Next</h5>\n"));
        assert!(of_type(&issues, IssueType::MissingHeadingHierarchy).is_empty());
    }

    #[test]
    fn test_landmarks() {
        let html = r#"<html lang="en"><body>
<a href="/1">1</a><a href="/2">2</a><a href="/3">3</a><a href="/4">4</a>
</body></html>"#;
        let issues = scan(html);
        let landmarks = of_type(&issues, IssueType::MissingLandmark);
        assert_eq!(landmarks.len(), 2);
        assert!(landmarks.iter().all(|i| i.severity == Severity::Info));
    }

    #[test]
    fn test_landmark_roles_count() {
        let html = r#"<html lang="en"><body>
<div role="navigation"><a href="/1">1</a><a href="/2">2</a><a href="/3">3</a><a href="/4">4</a></div>
<div role="main">content</div>
</body></html>"#;
        let issues = scan(html);
        assert!(of_type(&issues, IssueType::MissingLandmark).is_empty());
    }

    #[test]
    fn test_three_links_need_no_nav() {
        let html = page("<a href=\"/1\">1</a><a href=\"/2\">2</a><a href=\"/3\">3</a>\n");
        assert!(of_type(&scan(&html), IssueType::MissingLandmark).is_empty());
    }

    #[test]
    fn test_invalid_roles() {
        let html = page("<div role=\"buton\">x</div>\n<div role=\"tab\">y</div>\n<div role=\"\">z</div>\n");
        let issues = scan(&html);
        let invalid = of_type(&issues, IssueType::InvalidRole);
        assert_eq!(invalid.len(), 2);
        assert!(invalid[0].message.contains("buton"));
    }

    #[test]
    fn test_checks_run_in_fixed_order() {
        let html = "<html><body><h1>a</h1><h3>b</h3><img src=x><div role=\"bogus\"></div></body></html>";
        let types: Vec<IssueType> = scan(html).iter().map(|i| i.issue_type).collect();
        assert_eq!(
            types,
            vec![
                IssueType::MissingAltText,
                IssueType::MissingLangAttribute,
                IssueType::MissingHeadingHierarchy,
                IssueType::MissingLandmark,
                IssueType::InvalidRole,
            ]
        );
    }
}
