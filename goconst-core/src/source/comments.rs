//! Comment groups and their association with declarations.
//!
//! Comments are grouped the way the Go parser groups them: a comment that
//! follows code on the same line starts a trailing group that only absorbs
//! further comments on that line; any other comment starts a group that
//! absorbs following comments with no blank line in between. A group is the
//! doc comment of the next declaration when it ends on the line right above
//! it.

use tree_sitter::Node;

/// One `//` or `/* */` comment, markers included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    /// 1-based line of the comment start
    pub line: usize,
}

/// A run of adjacent comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup {
    pub list: Vec<Comment>,
}

impl CommentGroup {
    /// Comment text with markers and directives removed.
    ///
    /// Trailing whitespace is trimmed from every line, leading blank lines
    /// are dropped, runs of blank lines collapse into one, and a non-empty
    /// result always ends in a newline.
    pub fn text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for comment in &self.list {
            let raw = comment.text.as_str();
            let body = if let Some(rest) = raw.strip_prefix("//") {
                if let Some(spaced) = rest.strip_prefix(' ') {
                    spaced
                } else if is_directive(rest) {
                    continue;
                } else {
                    rest
                }
            } else if let Some(rest) = raw.strip_prefix("/*") {
                rest.strip_suffix("*/").unwrap_or(rest)
            } else {
                raw
            };
            lines.extend(body.split('\n').map(|l| l.trim_end().to_string()));
        }

        let mut kept: Vec<String> = Vec::with_capacity(lines.len());
        for line in lines {
            let after_text = kept.last().is_some_and(|prev: &String| !prev.is_empty());
            if !line.is_empty() || after_text {
                kept.push(line);
            }
        }
        if kept.last().is_some_and(|l| !l.is_empty()) {
            kept.push(String::new());
        }
        kept.join("\n")
    }

    /// The lines of [`CommentGroup::text`], without the final newline.
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

/// `//line `, `//extern `, `//export ` and `//[a-z0-9]+:[a-z0-9]` comments.
fn is_directive(body: &str) -> bool {
    if body.starts_with("line ") || body.starts_with("extern ") || body.starts_with("export ") {
        return true;
    }
    let bytes = body.as_bytes();
    let colon = match body.find(':') {
        Some(c) if c > 0 && c + 1 < bytes.len() => c,
        _ => return false,
    };
    (0..=colon + 1)
        .filter(|&i| i != colon)
        .all(|i| bytes[i].is_ascii_lowercase() || bytes[i].is_ascii_digit())
}

#[derive(Debug)]
struct IndexedGroup {
    group: CommentGroup,
    trailing: bool,
    start_row: usize,
    end_row: usize,
    /// Number of code tokens seen before the group
    code_seq: usize,
    /// End of the last code token before the group, ignoring `;`
    prev_code_end: Option<usize>,
    /// Start of the first code token after the group
    next_code_start: Option<usize>,
}

/// Every comment group of one file, positioned relative to the code around it.
#[derive(Debug, Default)]
pub(crate) struct CommentIndex {
    groups: Vec<IndexedGroup>,
}

impl CommentIndex {
    pub(crate) fn build(root: Node<'_>, src: &[u8]) -> Self {
        let mut builder = IndexBuilder::default();
        let mut cursor = root.walk();
        'walk: loop {
            let node = cursor.node();
            if node.kind() == "comment" {
                builder.comment(node, src);
            } else if node.child_count() == 0 {
                builder.leaf(node, src);
            } else if cursor.goto_first_child() {
                continue;
            }
            while !cursor.goto_next_sibling() {
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }
        builder.index
    }

    /// The group ending on the line right above `node` with no code in between.
    pub(crate) fn doc_for(&self, node: Node<'_>) -> Option<CommentGroup> {
        let start = node.start_byte();
        let row = node.start_position().row;
        self.groups
            .iter()
            .rev()
            .find(|g| g.next_code_start == Some(start))
            .filter(|g| !g.trailing && g.end_row + 1 == row)
            .map(|g| g.group.clone())
    }

    /// The trailing group on the line where `node` ends, right after it.
    pub(crate) fn trailing_for(&self, node: Node<'_>) -> Option<CommentGroup> {
        let end = node.end_byte();
        let row = node.end_position().row;
        self.groups
            .iter()
            .find(|g| g.trailing && g.start_row == row && g.prev_code_end == Some(end))
            .map(|g| g.group.clone())
    }
}

#[derive(Default)]
struct IndexBuilder {
    index: CommentIndex,
    code_seq: usize,
    last_code_row: Option<usize>,
    last_code_end: Option<usize>,
}

impl IndexBuilder {
    fn leaf(&mut self, node: Node<'_>, src: &[u8]) {
        let text = node.utf8_text(src).unwrap_or("");
        if text.trim().is_empty() {
            return;
        }
        self.code_seq += 1;
        self.last_code_row = Some(node.end_position().row);
        if text != ";" {
            self.last_code_end = Some(node.end_byte());
        }
        for group in self.index.groups.iter_mut().rev() {
            if group.next_code_start.is_some() {
                break;
            }
            group.next_code_start = Some(node.start_byte());
        }
    }

    fn comment(&mut self, node: Node<'_>, src: &[u8]) {
        let start_row = node.start_position().row;
        let end_row = node.end_position().row;
        let comment = Comment {
            text: node.utf8_text(src).unwrap_or("").to_string(),
            line: start_row + 1,
        };
        let trailing = self.last_code_row == Some(start_row);

        if let Some(last) = self.index.groups.last_mut() {
            let adjacent = last.code_seq == self.code_seq
                && if last.trailing {
                    start_row == last.end_row
                } else {
                    !trailing && start_row <= last.end_row + 1
                };
            if adjacent {
                last.group.list.push(comment);
                last.end_row = end_row;
                return;
            }
        }

        self.index.groups.push(IndexedGroup {
            group: CommentGroup {
                list: vec![comment],
            },
            trailing,
            start_row,
            end_row,
            code_seq: self.code_seq,
            prev_code_end: self.last_code_end,
            next_code_start: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(lines: &[&str]) -> CommentGroup {
        CommentGroup {
            list: lines
                .iter()
                .enumerate()
                .map(|(i, text)| Comment {
                    text: text.to_string(),
                    line: i + 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_line_comment_markers_stripped() {
        let g = group(&["// Timeout in seconds.", "//   indented"]);
        assert_eq!(g.text(), "Timeout in seconds.\n  indented\n");
    }

    #[test]
    fn test_block_comment_lines() {
        let g = group(&["/* first\n   second   */"]);
        assert_eq!(g.text(), " first\n   second\n");
    }

    #[test]
    fn test_directives_dropped() {
        let g = group(&["// Mode flags.", "//go:generate stringer -type=Mode", "//nolint:gosec"]);
        assert_eq!(g.text(), "Mode flags.\n");
        assert!(is_directive("line foo.go:1"));
        assert!(is_directive("export Foo"));
        assert!(!is_directive("TODO: fix"));
        assert!(!is_directive("http://x"));
    }

    #[test]
    fn test_spaced_directive_kept_as_text() {
        let g = group(&["// go:build is not a directive here"]);
        assert_eq!(g.text(), "go:build is not a directive here\n");
    }

    #[test]
    fn test_blank_lines_collapsed() {
        let g = group(&["//", "// a", "//", "//", "// b", "//"]);
        assert_eq!(g.text(), "a\n\nb\n");
        assert_eq!(g.lines(), vec!["a", "", "b"]);
    }

    #[test]
    fn test_only_directives_is_empty() {
        let g = group(&["//go:build linux"]);
        assert_eq!(g.text(), "");
        assert!(g.lines().is_empty());
    }
}
