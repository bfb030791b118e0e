// SPDX-License-Identifier: PMPL-1.0-or-later
//! Structural fix application for HTML documents.
//!
//! The document is parsed again, each fix is resolved to an element by its
//! position (and the tag quoted in the issue), the attribute is attached to
//! that element, and the tree is serialized back following the HTML5
//! serialization rules. Attributes that already exist are never touched, so
//! a second pass over fixed output is a no-op.

use crate::analyzers::location::{SourceLocator, RAW_TEXT_ELEMENTS};
use crate::analyzers::markup::{index_elements, LocatedElement};
use crate::model::{Issue, Position};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use tracing::debug;

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Attributes to add, keyed by element index in tree order
type AttributePatches = HashMap<usize, Vec<(String, String)>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupFixOutcome {
    pub content: String,
    /// Attributes actually added
    pub applied: usize,
}

impl MarkupFixOutcome {
    fn unchanged(content: &str) -> Self {
        Self {
            content: content.to_string(),
            applied: 0,
        }
    }
}

/// Apply the add-attribute fixes attached to `issues`
pub fn apply_markup_fixes(content: &str, issues: &[Issue]) -> MarkupFixOutcome {
    let requests: Vec<(&Issue, Position, &str, &str)> = issues
        .iter()
        .filter_map(|issue| {
            let fix = issue.fix.as_ref()?;
            let (name, value) = fix.attribute()?;
            Some((issue, fix.position, name, value))
        })
        .collect();

    if requests.is_empty() {
        return MarkupFixOutcome::unchanged(content);
    }

    let document = Html::parse_document(content);
    let locator = SourceLocator::new(content);
    let elements = index_elements(&document, &locator);

    let mut patches = AttributePatches::new();
    let mut applied = 0;

    for (issue, position, name, value) in requests {
        let Some(index) = find_target(&elements, issue, position, name) else {
            debug!(
                line = position.line,
                column = position.column,
                attribute = name,
                "No element needs this fix"
            );
            continue;
        };

        let patch = patches.entry(index).or_default();
        if patch.iter().any(|(existing, _)| existing == name) {
            continue;
        }
        patch.push((name.to_string(), value.to_string()));
        applied += 1;
    }

    if applied == 0 {
        return MarkupFixOutcome::unchanged(content);
    }

    MarkupFixOutcome {
        content: serialize_document(&document, &patches),
        applied,
    }
}

/// Element at `position` that still lacks `attribute`, matching the issue's tag when known
fn find_target(
    elements: &[LocatedElement<'_>],
    issue: &Issue,
    position: Position,
    attribute: &str,
) -> Option<usize> {
    let tag = issue.tag_name();
    elements.iter().position(|el| {
        el.line == position.line
            && el.column == position.column
            && !el.has_attr(attribute)
            && tag.as_deref().map_or(true, |t| t == el.tag())
    })
}

/// Serialize a parsed document, appending patched attributes to their elements
pub fn serialize_document(document: &Html, patches: &AttributePatches) -> String {
    let mut out = String::new();
    let mut element_index = 0;
    for child in document.tree.root().children() {
        match ElementRef::wrap(child) {
            Some(element) => write_element(element, patches, &mut element_index, &mut out),
            None => write_leaf(child.value(), false, &mut out),
        }
    }
    out
}

fn write_element(
    element: ElementRef<'_>,
    patches: &AttributePatches,
    element_index: &mut usize,
    out: &mut String,
) {
    let index = *element_index;
    *element_index += 1;

    let name = element.value().name();
    out.push('<');
    out.push_str(name);
    for (qual, value) in &element.value().attrs {
        out.push(' ');
        if let Some(prefix) = &qual.prefix {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(&qual.local);
        write_attribute_value(value, out);
    }
    if let Some(extra) = patches.get(&index) {
        for (key, value) in extra {
            out.push(' ');
            out.push_str(key);
            write_attribute_value(value, out);
        }
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    if matches!(name, "pre" | "textarea" | "listing") {
        let leading_newline = element
            .first_child()
            .and_then(|c| c.value().as_text().map(|t| t.starts_with('\n')))
            .unwrap_or(false);
        if leading_newline {
            out.push('\n');
        }
    }

    let raw = RAW_TEXT_ELEMENTS.contains(&name);
    for child in element.children() {
        // Template contents live under a fragment node
        if child.value().is_fragment() {
            for content in child.children() {
                match ElementRef::wrap(content) {
                    Some(inner) => write_element(inner, patches, element_index, out),
                    None => write_leaf(content.value(), raw, out),
                }
            }
            continue;
        }
        match ElementRef::wrap(child) {
            Some(child_element) => write_element(child_element, patches, element_index, out),
            None => write_leaf(child.value(), raw, out),
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn write_leaf(node: &Node, raw: bool, out: &mut String) {
    match node {
        Node::Doctype(doctype) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype.name());
            out.push('>');
        }
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::Text(text) if raw => out.push_str(text),
        Node::Text(text) => escape_text(text, out),
        Node::ProcessingInstruction(pi) => {
            out.push_str("<?");
            out.push_str(&pi.target);
            out.push(' ');
            out.push_str(&pi.data);
            out.push('>');
        }
        _ => {}
    }
}

fn write_attribute_value(value: &str, out: &mut String) {
    out.push_str("=\"");
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::markup::MarkupScanner;
    use crate::config::Config;
    use crate::fixes::attach_fixes;
    use crate::model::IssueType;

    fn scan_with_fixes(html: &str) -> Vec<Issue> {
        attach_fixes(MarkupScanner.scan(html), &Config::default())
    }

    fn fix(html: &str) -> MarkupFixOutcome {
        apply_markup_fixes(html, &scan_with_fixes(html))
    }

    fn count(issues: &[Issue], t: IssueType) -> usize {
        issues.iter().filter(|i| i.issue_type == t).count()
    }

    const DOC: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<head><title>T</title></head>\n<body>\n<main>\n<img src=\"a.png\">\n<img src=\"b.png\" alt=\"Chart\">\n<img src=\"c.png\">\n</main>\n</body>\n</html>\n";

    #[test]
    fn test_adds_empty_alt_only_where_missing() {
        let outcome = fix(DOC);
        assert_eq!(outcome.applied, 2);
        assert!(outcome.content.contains("<img src=\"a.png\" alt=\"\">"));
        assert!(outcome.content.contains("<img src=\"b.png\" alt=\"Chart\">"));
        assert!(outcome.content.contains("<img src=\"c.png\" alt=\"\">"));
        assert_eq!(count(&MarkupScanner.scan(&outcome.content), IssueType::MissingAltText), 0);
    }

    #[test]
    fn test_second_pass_is_byte_identical() {
        let first = fix(DOC);
        let second = fix(&first.content);
        assert_eq!(second.applied, 0);
        assert_eq!(second.content, first.content);
    }

    #[test]
    fn test_no_fixes_returns_input() {
        let html = "<html lang=\"en\"><body><main><p>Fine   as   is</p></main></body></html>";
        let outcome = apply_markup_fixes(html, &[]);
        assert_eq!(outcome.content, html);
        assert_eq!(outcome.applied, 0);

        let issues = scan_with_fixes(html);
        assert!(issues.iter().all(|i| i.fix.is_none()));
        assert_eq!(apply_markup_fixes(html, &issues).content, html);
    }

    #[test]
    fn test_bare_button_gets_type_and_label() {
        let html = "<html lang=\"en\"><body><main>\n<button></button>\n</main></body></html>";
        let outcome = fix(html);
        assert_eq!(outcome.applied, 2);
        assert!(outcome
            .content
            .contains("<button aria-label=\"Button\" type=\"button\"></button>"));

        let rescanned = MarkupScanner.scan(&outcome.content);
        assert_eq!(count(&rescanned, IssueType::MissingButtonType), 0);
        assert_eq!(count(&rescanned, IssueType::MissingAriaLabel), 0);

        let again = fix(&outcome.content);
        assert_eq!(again.applied, 0);
        assert_eq!(again.content, outcome.content);
    }

    #[test]
    fn test_lang_inserted_once() {
        let html = "<!DOCTYPE html>\n<html>\n<body><main>Hi</main></body>\n</html>\n";
        let first = fix(html);
        assert_eq!(first.applied, 1);
        assert_eq!(first.content.matches("lang=\"en\"").count(), 1);

        let second = fix(&first.content);
        assert_eq!(second.applied, 0);
        assert_eq!(second.content.matches("lang=\"en\"").count(), 1);
    }

    #[test]
    fn test_lang_on_implied_root() {
        let html = "<p>No explicit root</p>";
        let outcome = fix(html);
        assert!(outcome.content.starts_with("<html lang=\"en\">"));
    }

    #[test]
    fn test_fixes_converge() {
        let html = r#"<html>
<body>
<img src="x.png">
<button></button>
<div role="button"></div>
<input name="q">
<select></select>
<p id="a">1</p><p id="a">2</p>
</body>
</html>"#;
        let fixable = [
            IssueType::MissingAltText,
            IssueType::MissingButtonType,
            IssueType::MissingLangAttribute,
            IssueType::MissingAriaLabel,
            IssueType::MissingFormLabel,
        ];
        let before = MarkupScanner.scan(html);
        let outcome = fix(html);
        let after = MarkupScanner.scan(&outcome.content);

        for t in fixable {
            assert!(count(&before, t) > 0, "{} not detected", t);
            assert_eq!(count(&after, t), 0, "{} not fixed", t);
        }
        assert_eq!(count(&after, IssueType::DuplicateId), 2);
    }

    #[test]
    fn test_serializer_escapes() {
        let html = "<html lang=\"en\"><head><script>if (a < b && c) {}</script></head><body><p title=\"a&quot;b\">x &amp; y &lt; z</p><img src=\"i.png\"></body></html>";
        let outcome = fix(html);
        assert!(outcome.content.contains("<script>if (a < b && c) {}</script>"));
        assert!(outcome.content.contains("<p title=\"a&quot;b\">x &amp; y &lt; z</p>"));
        assert!(outcome.content.contains("<img src=\"i.png\" alt=\"\">"));
    }

    #[test]
    fn test_template_contents_survive() {
        let html = "<html lang=\"en\"><body><main><img src=\"a.png\"><template><p>Row</p><img src=\"t.png\" alt=\"\"></template></main></body></html>";
        let outcome = fix(html);
        assert_eq!(outcome.applied, 1);
        assert_eq!(
            outcome.content,
            "<html lang=\"en\"><head></head><body><main><img src=\"a.png\" alt=\"\"><template><p>Row</p><img src=\"t.png\" alt=\"\"></template></main></body></html>"
        );
    }

    #[test]
    fn test_attribute_order_is_kept() {
        let html = "<html lang=\"en\"><body><main><img src=\"a.png\" class=\"c\" width=\"3\" data-z=\"1\"></main></body></html>";
        for _ in 0..4 {
            let outcome = fix(html);
            assert!(outcome
                .content
                .contains("<img src=\"a.png\" class=\"c\" width=\"3\" data-z=\"1\" alt=\"\">"));
        }
    }

    #[test]
    fn test_namespaced_attributes_keep_prefix() {
        let html = "<html lang=\"en\"><body><main><img src=\"a.png\"><svg viewBox=\"0 0 1 1\"><use xlink:href=\"#icon\"></use></svg></main></body></html>";
        let outcome = fix(html);
        assert_eq!(outcome.applied, 1);
        assert!(outcome.content.contains("<use xlink:href=\"#icon\"></use>"));
        assert!(outcome.content.contains("<svg viewBox=\"0 0 1 1\">"));
    }
}
