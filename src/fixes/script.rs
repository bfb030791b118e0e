// SPDX-License-Identifier: PMPL-1.0-or-later
//! Fix application for script files embedding JSX.
//!
//! [`apply_structured`] edits through the syntax tree: each fix is matched to
//! the JSX opening element at its position and the attribute is inserted right
//! after the tag name. The result must parse again, otherwise the caller gets
//! [`ScriptFixOutcome::FallbackRequired`] and is expected to run
//! [`apply_textual`], which splices attributes line by line.

use crate::analyzers::jsx::{collect_elements, parse_script};
use crate::analyzers::ScriptDialect;
use crate::model::{Issue, Position};
use regex::Regex;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Result of the syntax-tree strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptFixOutcome {
    /// Edits were applied (possibly none) and the output parses
    Applied { content: String, applied: usize },
    /// The tree could not be edited safely; use [`apply_textual`]
    FallbackRequired { reason: String },
}

/// One add-attribute request taken from an issue
struct AttributeRequest<'i> {
    seq: usize,
    position: Position,
    tag: Option<String>,
    name: &'i str,
    value: &'i str,
}

impl AttributeRequest<'_> {
    fn rendered(&self) -> String {
        format!(" {}=\"{}\"", self.name, self.value)
    }
}

fn attribute_requests(issues: &[Issue]) -> Vec<AttributeRequest<'_>> {
    issues
        .iter()
        .filter_map(|issue| {
            let fix = issue.fix.as_ref()?;
            let (name, value) = fix.attribute()?;
            Some((issue, fix.position, name, value))
        })
        .enumerate()
        .map(|(seq, (issue, position, name, value))| AttributeRequest {
            seq,
            position,
            tag: issue.tag_name(),
            name,
            value,
        })
        .collect()
}

/// Insert attributes through the syntax tree
pub fn apply_structured(dialect: ScriptDialect, content: &str, issues: &[Issue]) -> ScriptFixOutcome {
    let requests = attribute_requests(issues);
    if requests.is_empty() {
        return ScriptFixOutcome::Applied {
            content: content.to_string(),
            applied: 0,
        };
    }

    let tree = match parse_script(dialect, content) {
        Ok(tree) => tree,
        Err(reason) => return ScriptFixOutcome::FallbackRequired { reason },
    };
    let elements = collect_elements(&tree, content);

    let mut by_line: BTreeMap<usize, Vec<&AttributeRequest<'_>>> = BTreeMap::new();
    for request in &requests {
        by_line.entry(request.position.line).or_default().push(request);
    }

    let mut touched: HashSet<(usize, &str)> = HashSet::new();
    let mut edits: Vec<(usize, usize, String)> = Vec::new();

    for (line, line_requests) in &by_line {
        for request in line_requests {
            let target = elements.iter().position(|el| {
                el.line == *line
                    && el.column == request.position.column
                    && request.tag.as_deref().map_or(true, |t| t == el.name)
            });
            let Some(index) = target else {
                debug!(line, column = request.position.column, "No JSX element at fix position");
                continue;
            };

            let element = &elements[index];
            if element.has_attr(request.name) || !touched.insert((index, request.name)) {
                continue;
            }
            edits.push((element.name_node.end_byte(), request.seq, request.rendered()));
        }
    }

    if edits.is_empty() {
        return ScriptFixOutcome::Applied {
            content: content.to_string(),
            applied: 0,
        };
    }

    // Back to front; at a shared offset the last request goes in first so
    // attributes end up in request order.
    edits.sort_by_key(|(offset, seq, _)| (Reverse(*offset), Reverse(*seq)));

    let mut output = content.to_string();
    for (offset, _, text) in &edits {
        if !output.is_char_boundary(*offset) {
            return ScriptFixOutcome::FallbackRequired {
                reason: format!("edit offset {} is not on a character boundary", offset),
            };
        }
        output.insert_str(*offset, text);
    }

    if let Err(reason) = parse_script(dialect, &output) {
        return ScriptFixOutcome::FallbackRequired {
            reason: format!("edited source no longer parses: {}", reason),
        };
    }

    ScriptFixOutcome::Applied {
        content: output,
        applied: edits.len(),
    }
}

/// Splice attributes into opening tags line by line, last line first.
///
/// A request is skipped when its attribute name already appears on the
/// target line. Returns the new content and the number of insertions.
pub fn apply_textual(content: &str, issues: &[Issue]) -> (String, usize) {
    let mut requests = attribute_requests(issues);
    if requests.is_empty() {
        return (content.to_string(), 0);
    }
    requests.sort_by_key(|r| (Reverse(r.position.line), Reverse(r.position.column)));

    let mut lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
    let mut applied = 0;

    for request in &requests {
        let Some(line) = request
            .position
            .line
            .checked_sub(1)
            .and_then(|i| lines.get_mut(i))
        else {
            continue;
        };
        let Some(tag) = request.tag.as_deref() else { continue };

        if attribute_on_line(line, request.name) {
            continue;
        }

        let Some(at) = tag_name_end(line, tag, request.position.column) else {
            debug!(line = request.position.line, tag, "Opening tag not found on line");
            continue;
        };
        line.insert_str(at, &request.rendered());
        applied += 1;
    }

    (lines.concat(), applied)
}

fn attribute_on_line(line: &str, name: &str) -> bool {
    Regex::new(&format!(r"(?:^|[^\w-]){}\s*=", regex::escape(name)))
        .map(|re| re.is_match(line))
        .unwrap_or_else(|_| line.contains(name))
}

/// Byte offset just past `<tag` on the line, preferring the occurrence at or
/// after the 1-based character `column`
fn tag_name_end(line: &str, tag: &str, column: usize) -> Option<usize> {
    let re = Regex::new(&format!(r"<{}\b", regex::escape(tag))).ok()?;
    let from = line
        .char_indices()
        .nth(column.saturating_sub(1))
        .map_or(line.len(), |(i, _)| i);
    let mut first = None;
    for m in re.find_iter(line) {
        if m.start() >= from {
            return Some(m.end());
        }
        first.get_or_insert(m.end());
    }
    first
}
