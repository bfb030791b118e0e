// SPDX-License-Identifier: PMPL-1.0-or-later
//! Embedded-markup scanner for JavaScript, TypeScript and TSX sources.
//!
//! Script files are parsed with tree-sitter and every intrinsic JSX element
//! (lower-case tag name) is evaluated against the same rules as HTML
//! documents, limited to what one file's syntax tree can decide:
//!
//! - text content counts only literal JSX text, never `{expressions}`
//! - duplicate ids are compared only along the enclosing lexical scope chain
//!   (two components defining the same id are not reported)
//! - headings are only checked for levels above `h6`; sequencing across
//!   components is not tracked
//! - landmark checks are skipped, components are rarely whole pages
//!
//! A file that does not parse cleanly yields no issues.

use crate::analyzers::{
    heading_level, invalid_role_tokens, ScriptDialect, ACCESSIBLE_NAME_ATTRS, MAX_HEADING_LEVEL,
};
use crate::model::{Issue, IssueType, Severity};
use std::collections::HashSet;
use tracing::warn;
use tree_sitter::{Node, Parser, Tree};

/// Node kinds that open a new lexical scope
const SCOPE_KINDS: &[&str] = &[
    "program",
    "function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "generator_function_declaration",
    "arrow_function",
    "method_definition",
];

const FORM_CONTROLS: &[&str] = &["input", "textarea", "select"];

/// Value of a JSX attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// `name="text"`
    Literal(String),
    /// `name={expr}` or any non-string value
    Expression,
    /// bare `name`
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsxAttribute {
    pub name: String,
    pub value: AttrValue,
}

/// An intrinsic JSX element found in a script file
#[derive(Debug)]
pub struct JsxElement<'t> {
    pub name: String,
    pub attributes: Vec<JsxAttribute>,
    /// `jsx_opening_element` or `jsx_self_closing_element`
    pub opening: Node<'t>,
    /// Tag name node inside `opening`
    pub name_node: Node<'t>,
    pub line: usize,
    pub column: usize,
    pub snippet: String,
    pub has_text: bool,
    /// Enclosing scope node ids, innermost first
    pub scopes: Vec<usize>,
    pub inside_label: bool,
}

impl JsxElement<'_> {
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// String value of an attribute written as a literal
    pub fn literal_attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find_map(|a| match &a.value {
            AttrValue::Literal(v) if a.name == name => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn has_accessible_name_attr(&self) -> bool {
        ACCESSIBLE_NAME_ATTRS.iter().any(|a| self.has_attr(a))
    }

    fn role(&self) -> Option<String> {
        self.literal_attr("role").map(|r| r.trim().to_ascii_lowercase())
    }

    fn issue(&self, issue_type: IssueType, severity: Severity, message: &str) -> Issue {
        Issue::new(issue_type, severity, message)
            .at(self.line, self.column)
            .with_code(&self.snippet)
    }
}

/// Parse a script, rejecting trees that contain syntax errors
pub fn parse_script(dialect: ScriptDialect, source: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&dialect.grammar())
        .map_err(|e| format!("failed to load {} grammar: {}", dialect.name(), e))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| format!("{} parser produced no tree", dialect.name()))?;

    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root)
            .map(|n| format!(" near line {}", n.start_position().row + 1))
            .unwrap_or_default();
        return Err(format!("{} syntax error{}", dialect.name(), at));
    }

    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

/// Collect intrinsic JSX elements in source order
pub fn collect_elements<'t>(tree: &'t Tree, source: &str) -> Vec<JsxElement<'t>> {
    let mut elements = Vec::new();
    let mut scopes = Vec::new();
    visit(tree.root_node(), source, &mut scopes, false, &mut elements);
    elements
}

fn visit<'t>(
    node: Node<'t>,
    source: &str,
    scopes: &mut Vec<usize>,
    inside_label: bool,
    out: &mut Vec<JsxElement<'t>>,
) {
    let opens_scope = SCOPE_KINDS.contains(&node.kind());
    if opens_scope {
        scopes.push(node.id());
    }

    let mut child_inside_label = inside_label;
    let opening = match node.kind() {
        "jsx_element" => {
            let mut cursor = node.walk();
            let open = node
                .named_children(&mut cursor)
                .find(|c| c.kind() == "jsx_opening_element");
            open.map(|o| (o, has_literal_text(node, source)))
        }
        "jsx_self_closing_element" => Some((node, false)),
        _ => None,
    };

    if let Some((open, has_text)) = opening {
        if let Some(element) = build_element(open, source, has_text, scopes, inside_label) {
            if element.name == "label" {
                child_inside_label = true;
            }
            out.push(element);
        }
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    for child in children {
        visit(child, source, scopes, child_inside_label, out);
    }

    if opens_scope {
        scopes.pop();
    }
}

fn build_element<'t>(
    opening: Node<'t>,
    source: &str,
    has_text: bool,
    scopes: &[usize],
    inside_label: bool,
) -> Option<JsxElement<'t>> {
    let name_node = opening.child_by_field_name("name")?;
    let name = node_text(name_node, source);

    // Components (`<Button>`, `<ui.Button>`) are opaque
    let intrinsic = name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && !name.contains('.');
    if !intrinsic {
        return None;
    }

    let mut cursor = opening.walk();
    let attributes = opening
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "jsx_attribute")
        .filter_map(|attr| parse_attribute(attr, source))
        .collect();

    let start = opening.start_position();
    let column = char_column(source, opening.start_byte(), start.column);
    let snippet = node_text(opening, source)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    Some(JsxElement {
        name: name.to_string(),
        attributes,
        opening,
        name_node,
        line: start.row + 1,
        column,
        snippet,
        has_text,
        scopes: scopes.iter().rev().copied().collect(),
        inside_label,
    })
}

/// 1-based character column of `byte`, given its byte column within the line
fn char_column(source: &str, byte: usize, byte_column: usize) -> usize {
    source
        .get(byte.saturating_sub(byte_column)..byte)
        .map_or(byte_column, |prefix| prefix.chars().count())
        + 1
}

fn parse_attribute(attr: Node<'_>, source: &str) -> Option<JsxAttribute> {
    let mut cursor = attr.walk();
    let mut parts = attr.named_children(&mut cursor);
    let name = node_text(parts.next()?, source).to_string();
    let value = match parts.next() {
        Some(v) if v.kind() == "string" => AttrValue::Literal(unquote(node_text(v, source))),
        Some(_) => AttrValue::Expression,
        None => AttrValue::Flag,
    };
    Some(JsxAttribute { name, value })
}

fn unquote(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

/// Literal JSX text anywhere below `element`, ignoring `{expressions}`
fn has_literal_text(element: Node<'_>, source: &str) -> bool {
    let mut cursor = element.walk();
    let children: Vec<Node<'_>> = element.named_children(&mut cursor).collect();
    children.into_iter().any(|child| match child.kind() {
        "jsx_text" => !node_text(child, source).trim().is_empty(),
        "jsx_element" => has_literal_text(child, source),
        _ => false,
    })
}

/// Scanner for script files embedding JSX
pub struct ScriptScanner {
    dialect: ScriptDialect,
}

impl ScriptScanner {
    pub fn new(dialect: ScriptDialect) -> Self {
        Self { dialect }
    }

    pub fn scan(&self, content: &str) -> Vec<Issue> {
        let tree = match parse_script(self.dialect, content) {
            Ok(tree) => tree,
            Err(reason) => {
                warn!("Skipping unparseable script: {}", reason);
                return Vec::new();
            }
        };

        let elements = collect_elements(&tree, content);
        let mut issues = Vec::new();

        check_images(&elements, &mut issues);
        check_interactive_names(&elements, &mut issues);
        check_form_labels(&elements, &mut issues);
        check_button_types(&elements, &mut issues);
        check_duplicate_ids(&elements, &mut issues);
        check_lang(&elements, &mut issues);
        check_heading_levels(&elements, &mut issues);
        check_roles(&elements, &mut issues);

        issues
    }
}

fn check_images(elements: &[JsxElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements.iter().filter(|e| e.name == "img") {
        if !el.has_attr("alt") {
            issues.push(el.issue(
                IssueType::MissingAltText,
                Severity::Error,
                "Image is missing an alt attribute. Use alt=\"\" for decorative images or describe the image.",
            ));
        }
    }
}

fn check_interactive_names(elements: &[JsxElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements {
        let is_button = el.name == "button" || el.role().as_deref() == Some("button");
        if is_button && !el.has_accessible_name_attr() && !el.has_text {
            issues.push(el.issue(
                IssueType::MissingAriaLabel,
                Severity::Warning,
                &format!(
                    "<{}> acting as a button has no literal text and no aria-label or aria-labelledby.",
                    el.name
                ),
            ));
        }
    }
}

fn check_form_labels(elements: &[JsxElement<'_>], issues: &mut Vec<Issue>) {
    let label_targets: HashSet<&str> = elements
        .iter()
        .filter(|e| e.name == "label")
        .filter_map(|e| e.literal_attr("htmlFor").or_else(|| e.literal_attr("for")))
        .collect();

    for el in elements.iter().filter(|e| FORM_CONTROLS.contains(&e.name.as_str())) {
        let hidden = el.name == "input"
            && el
                .literal_attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"));
        if hidden {
            continue;
        }

        let referenced = el
            .literal_attr("id")
            .is_some_and(|id| label_targets.contains(id));
        if !referenced && !el.inside_label && !el.has_accessible_name_attr() {
            issues.push(el.issue(
                IssueType::MissingFormLabel,
                Severity::Error,
                &format!(
                    "<{}> has no associated <label> and no aria-label or aria-labelledby.",
                    el.name
                ),
            ));
        }
    }
}

fn check_button_types(elements: &[JsxElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements.iter().filter(|e| e.name == "button") {
        if !el.has_attr("type") {
            issues.push(el.issue(
                IssueType::MissingButtonType,
                Severity::Warning,
                "<button> has no type attribute and defaults to type=\"submit\" inside forms.",
            ));
        }
    }
}

/// Two elements share a scope when one's innermost scope encloses the other
fn shares_scope(a: &JsxElement<'_>, b: &JsxElement<'_>) -> bool {
    match (a.scopes.first(), b.scopes.first()) {
        (Some(a_inner), Some(b_inner)) => a.scopes.contains(b_inner) || b.scopes.contains(a_inner),
        _ => false,
    }
}

fn check_duplicate_ids(elements: &[JsxElement<'_>], issues: &mut Vec<Issue>) {
    let with_ids: Vec<(&JsxElement<'_>, &str)> = elements
        .iter()
        .filter_map(|e| e.literal_attr("id").filter(|id| !id.is_empty()).map(|id| (e, id)))
        .collect();

    for (el, id) in &with_ids {
        let clashes = with_ids
            .iter()
            .filter(|(other, other_id)| other_id == id && shares_scope(el, other))
            .count();
        if clashes > 1 {
            issues.push(el.issue(
                IssueType::DuplicateId,
                Severity::Error,
                &format!("id \"{}\" is used by {} elements in the same scope.", id, clashes),
            ));
        }
    }
}

fn check_lang(elements: &[JsxElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements.iter().filter(|e| e.name == "html") {
        if !el.has_attr("lang") {
            issues.push(el.issue(
                IssueType::MissingLangAttribute,
                Severity::Error,
                "The <html> element is missing a lang attribute.",
            ));
        }
    }
}

fn check_heading_levels(elements: &[JsxElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements {
        let Some(level) = heading_level(&el.name) else { continue };
        if level == 0 || level > MAX_HEADING_LEVEL {
            issues.push(el.issue(
                IssueType::MissingHeadingHierarchy,
                Severity::Warning,
                &format!(
                    "<{}> is not a valid heading level. Use h1 through h{}.",
                    el.name, MAX_HEADING_LEVEL
                ),
            ));
        }
    }
}

fn check_roles(elements: &[JsxElement<'_>], issues: &mut Vec<Issue>) {
    for el in elements {
        let Some(role) = el.literal_attr("role") else { continue };
        if !invalid_role_tokens(role).is_empty() {
            issues.push(el.issue(
                IssueType::InvalidRole,
                Severity::Error,
                &format!("role=\"{}\" is not a valid WAI-ARIA role.", role.trim()),
            ));
        }
    }
}
