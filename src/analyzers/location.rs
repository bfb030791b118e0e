// SPDX-License-Identifier: PMPL-1.0-or-later
//! Best-effort mapping from parsed elements back to source positions.
//!
//! The HTML parser does not keep source offsets, so the k-th element named
//! `t` in tree order is mapped to the k-th `<t` opening tag in the raw text.
//! Comments and the bodies of elements the parser reads as text (`script`,
//! `style`, `noscript`, `textarea` and the rest) are skipped while indexing. Elements the parser inserted on its own (an implied `<body>`)
//! have no source tag and fall back to 1:1.

use std::collections::HashMap;

/// Elements whose text content is neither parsed nor escaped (scripting enabled)
pub const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// Elements whose content is text but has entities decoded
pub const ESCAPABLE_RAW_TEXT_ELEMENTS: &[&str] = &["textarea", "title"];

pub struct SourceLocator<'a> {
    content: &'a str,
    line_starts: Vec<usize>,
    tags: HashMap<String, Vec<usize>>,
}

impl<'a> SourceLocator<'a> {
    pub fn new(content: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            content,
            line_starts,
            tags: index_tags(content),
        }
    }

    /// Byte offset of the `occurrence`-th (0-based) opening tag named `tag`
    pub fn tag_offset(&self, tag: &str, occurrence: usize) -> Option<usize> {
        self.tags
            .get(&tag.to_ascii_lowercase())
            .and_then(|offsets| offsets.get(occurrence))
            .copied()
    }

    /// 1-based line and column of a byte offset
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.line_starts[line_idx];
        let column = self
            .content
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        (line_idx + 1, column + 1)
    }

    /// Raw opening tag text starting at `offset`, up to and including `>`
    pub fn opening_tag(&self, offset: usize) -> Option<&'a str> {
        let rest = self.content.get(offset..)?;
        let end = rest
            .find('>')
            .map(|i| i + 1)
            .or_else(|| rest.find('\n'))
            .unwrap_or(rest.len());
        rest.get(..end)
    }
}

/// Index every opening tag by lower-cased name, in source order
fn index_tags(content: &str) -> HashMap<String, Vec<usize>> {
    let lower = content.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut tags: HashMap<String, Vec<usize>> = HashMap::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }

        if lower[i..].starts_with("<!--") {
            i = match lower[i + 4..].find("-->") {
                Some(end) => i + 4 + end + 3,
                None => bytes.len(),
            };
            continue;
        }

        let name_start = i + 1;
        if name_start >= bytes.len() || !bytes[name_start].is_ascii_alphabetic() {
            i += 1;
            continue;
        }

        let mut name_end = name_start;
        while name_end < bytes.len()
            && (bytes[name_end].is_ascii_alphanumeric() || matches!(bytes[name_end], b'-' | b'_' | b':'))
        {
            name_end += 1;
        }

        let name = &lower[name_start..name_end];
        tags.entry(name.to_string()).or_default().push(i);

        let text_body = RAW_TEXT_ELEMENTS.contains(&name) || ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&name);
        i = if name == "plaintext" {
            bytes.len()
        } else if text_body {
            let close = format!("</{}", name);
            match lower[name_end..].find(&close) {
                Some(end) => name_end + end,
                None => bytes.len(),
            }
        } else {
            name_end
        };
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locates_nth_tag() {
        let html = "<div>\n  <img src=\"a.png\">\n  <IMG src=\"b.png\"><img src=\"c.png\">\n</div>";
        let locator = SourceLocator::new(html);

        let first = locator.tag_offset("img", 0).unwrap();
        assert_eq!(locator.line_column(first), (2, 3));

        let third = locator.tag_offset("img", 2).unwrap();
        assert_eq!(locator.line_column(third), (3, 20));
        assert_eq!(locator.opening_tag(third), Some("<img src=\"c.png\">"));

        assert!(locator.tag_offset("img", 3).is_none());
    }

    #[test]
    fn test_skips_comments_and_scripts() {
        let html = "<!-- <img> -->\n<script>if (a <img) {}</script>\n<img alt=\"\">";
        let locator = SourceLocator::new(html);
        let offset = locator.tag_offset("img", 0).unwrap();
        assert_eq!(locator.line_column(offset), (3, 1));
        assert!(locator.tag_offset("img", 1).is_none());
    }

    #[test]
    fn test_skips_text_only_bodies() {
        let html = "<noscript><img src=\"pixel.gif\" alt=\"\"></noscript>\n<img src=\"real.png\">\n<title><img></title><xmp><img></xmp>";
        let locator = SourceLocator::new(html);
        let offset = locator.tag_offset("img", 0).unwrap();
        assert_eq!(locator.line_column(offset), (2, 1));
        assert_eq!(locator.opening_tag(offset), Some("<img src=\"real.png\">"));
        assert!(locator.tag_offset("img", 1).is_none());
        assert_eq!(locator.tag_offset("noscript", 0), Some(0));
    }

    #[test]
    fn test_plaintext_runs_to_end() {
        let locator = SourceLocator::new("<p>a</p><plaintext><p>b</p></plaintext>");
        assert_eq!(locator.tag_offset("p", 0), Some(0));
        assert!(locator.tag_offset("p", 1).is_none());
    }

    #[test]
    fn test_does_not_confuse_prefixes() {
        let html = "<header></header><h1>Title</h1>";
        let locator = SourceLocator::new(html);
        assert_eq!(locator.tag_offset("h1", 0), Some(17));
        assert_eq!(locator.tag_offset("header", 0), Some(0));
    }

    #[test]
    fn test_columns_count_characters() {
        let html = "<p>héllo <b>x</b></p>";
        let locator = SourceLocator::new(html);
        let offset = locator.tag_offset("b", 0).unwrap();
        assert_eq!(locator.line_column(offset), (1, 10));
    }
}
