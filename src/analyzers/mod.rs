// SPDX-License-Identifier: PMPL-1.0-or-later
//! Accessibility scanners.
//!
//! Two scanners evaluate the same conceptual rule set:
//! - [`markup::MarkupScanner`] walks a parsed HTML document
//! - [`jsx::ScriptScanner`] walks JSX elements in a JavaScript/TypeScript syntax tree
//!
//! [`FileKind`] decides which one a path goes to.

pub mod jsx;
pub mod location;
pub mod markup;

use crate::model::Issue;
use std::path::Path;

/// Script grammars understood by the embedded-markup scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptDialect {
    /// `.js`, `.jsx`, `.mjs`, `.cjs`
    JavaScript,
    /// `.ts`, `.mts`, `.cts` (no JSX)
    TypeScript,
    /// `.tsx`
    Tsx,
}

impl ScriptDialect {
    /// tree-sitter grammar for this dialect
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            ScriptDialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            ScriptDialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            ScriptDialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScriptDialect::JavaScript => "JavaScript",
            ScriptDialect::TypeScript => "TypeScript",
            ScriptDialect::Tsx => "TSX",
        }
    }
}

/// How a file is scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Standalone HTML document
    Markup,
    /// Script file that may embed JSX
    Script(ScriptDialect),
    /// Anything else; always yields no issues
    Unscannable,
}

impl FileKind {
    /// Classify a path by extension
    pub fn classify(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "html" | "htm" | "xhtml" => FileKind::Markup,
            "js" | "jsx" | "mjs" | "cjs" => FileKind::Script(ScriptDialect::JavaScript),
            "ts" | "mts" | "cts" => FileKind::Script(ScriptDialect::TypeScript),
            "tsx" => FileKind::Script(ScriptDialect::Tsx),
            _ => FileKind::Unscannable,
        }
    }

    pub fn is_scannable(&self) -> bool {
        !matches!(self, FileKind::Unscannable)
    }
}

/// Run the scanner matching `kind` over `content`
pub fn scan_source(kind: FileKind, content: &str) -> Vec<Issue> {
    match kind {
        FileKind::Markup => markup::MarkupScanner.scan(content),
        FileKind::Script(dialect) => jsx::ScriptScanner::new(dialect).scan(content),
        FileKind::Unscannable => Vec::new(),
    }
}

/// Attributes that give an element an accessible name
pub const ACCESSIBLE_NAME_ATTRS: &[&str] = &["aria-label", "aria-labelledby", "title"];

/// Highest valid heading level
pub const MAX_HEADING_LEVEL: u8 = 6;

/// Link count above which a navigation landmark is expected
pub const NAV_LINK_THRESHOLD: usize = 3;

/// Concrete WAI-ARIA 1.2 roles (widget, document structure, landmark and
/// live region). Anything outside this list is reported as invalid.
pub const VALID_ROLES: &[&str] = &[
    "alert", "alertdialog", "application", "article", "banner", "blockquote",
    "button", "caption", "cell", "checkbox", "code", "columnheader", "combobox",
    "complementary", "contentinfo", "definition", "deletion", "dialog",
    "directory", "document", "emphasis", "feed", "figure", "form", "generic",
    "grid", "gridcell", "group", "heading", "img", "insertion", "link", "list",
    "listbox", "listitem", "log", "main", "marquee", "math", "menu", "menubar",
    "menuitem", "menuitemcheckbox", "menuitemradio", "meter", "navigation",
    "none", "note", "option", "paragraph", "presentation", "progressbar",
    "radio", "radiogroup", "region", "row", "rowgroup", "rowheader",
    "scrollbar", "search", "searchbox", "separator", "slider", "spinbutton",
    "status", "strong", "subscript", "superscript", "switch", "tab", "table",
    "tablist", "tabpanel", "term", "textbox", "time", "timer", "toolbar",
    "tooltip", "tree", "treegrid", "treeitem",
];

/// Returns the offending tokens of a role attribute value, if any
pub fn invalid_role_tokens(value: &str) -> Vec<String> {
    let tokens: Vec<String> = value
        .split_whitespace()
        .map(|t| t.to_ascii_lowercase())
        .collect();
    if tokens.is_empty() {
        return vec![String::new()];
    }
    tokens
        .into_iter()
        .filter(|t| !VALID_ROLES.contains(&t.as_str()))
        .collect()
}

/// Parse `h1`..`hN` into its level
pub fn heading_level(tag: &str) -> Option<u8> {
    let digits = tag.strip_prefix('h').or_else(|| tag.strip_prefix('H'))?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(FileKind::classify(Path::new("index.html")), FileKind::Markup);
        assert_eq!(FileKind::classify(Path::new("page.HTM")), FileKind::Markup);
        assert_eq!(
            FileKind::classify(Path::new("App.jsx")),
            FileKind::Script(ScriptDialect::JavaScript)
        );
        assert_eq!(
            FileKind::classify(Path::new("util.ts")),
            FileKind::Script(ScriptDialect::TypeScript)
        );
        assert_eq!(
            FileKind::classify(Path::new("Button.tsx")),
            FileKind::Script(ScriptDialect::Tsx)
        );
        assert_eq!(FileKind::classify(Path::new("styles.css")), FileKind::Unscannable);
        assert_eq!(FileKind::classify(Path::new("Makefile")), FileKind::Unscannable);
    }

    #[test]
    fn test_unscannable_yields_nothing() {
        assert!(scan_source(FileKind::Unscannable, "<img src=x>").is_empty());
    }

    #[test]
    fn test_role_tokens() {
        assert!(invalid_role_tokens("button").is_empty());
        assert!(invalid_role_tokens("switch checkbox").is_empty());
        assert_eq!(invalid_role_tokens("buton"), vec!["buton".to_string()]);
        assert_eq!(invalid_role_tokens("  "), vec![String::new()]);
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("h1"), Some(1));
        assert_eq!(heading_level("h7"), Some(7));
        assert_eq!(heading_level("header"), None);
        assert_eq!(heading_level("hr"), None);
        assert_eq!(heading_level("h"), None);
    }
}
