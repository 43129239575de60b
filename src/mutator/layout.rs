//! Whitespace conventions of an existing file: line endings, indentation,
//! and which bytes belong to a line that is being removed.

use std::ops::Range;

const DEFAULT_INDENT: &str = "    ";

/// `"\r\n"` when the file's first line ends that way, `"\n"` otherwise.
pub fn detect_eol(text: &str) -> &'static str {
    match text.find('\n') {
        Some(pos) if pos > 0 && text.as_bytes()[pos - 1] == b'\r' => "\r\n",
        _ => "\n",
    }
}

/// Offset of the first byte of the line holding `offset`.
pub fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |pos| pos + 1)
}

/// Offset of the terminator (or end of text) of the line holding `offset`.
pub fn line_end(text: &str, offset: usize) -> usize {
    text[offset..]
        .find('\n')
        .map_or(text.len(), |pos| offset + pos)
}

/// Leading whitespace of the line holding `offset`.
pub fn line_indent(text: &str, offset: usize) -> &str {
    let start = line_start(text, offset);
    let line = &text[start..line_end(text, start)];
    &line[..line.len() - line.trim_start().len()]
}

/// Comment delimiters whose lines say nothing about code indentation.
const BLOCK_COMMENTS: &[(&str, &str)] = &[("/*", "*/"), ("<!--", "-->")];

/// One indentation step as used by the file: a tab, or the smallest run of
/// leading spaces among code lines. Comment lines are skipped, so a ` * ...`
/// license header does not shrink the step to one space.
pub fn indent_unit(text: &str) -> String {
    let mut smallest: Option<usize> = None;
    let mut comment_close: Option<&str> = None;
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(close) = comment_close {
            if trimmed.contains(close) {
                comment_close = None;
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        if let Some(&(open, close)) = BLOCK_COMMENTS
            .iter()
            .find(|(open, _)| trimmed.starts_with(*open))
        {
            if !trimmed[open.len()..].contains(close) {
                comment_close = Some(close);
            }
            continue;
        }
        if line.starts_with('\t') {
            return "\t".to_string();
        }
        let spaces = line.len() - line.trim_start_matches(' ').len();
        if spaces > 0 {
            smallest = Some(smallest.map_or(spaces, |s| s.min(spaces)));
        }
    }
    smallest.map_or_else(|| DEFAULT_INDENT.to_string(), |n| " ".repeat(n))
}

/// Length of the line terminator starting at `offset`, zero when there is none.
pub fn terminator_len(text: &str, offset: usize) -> usize {
    let rest = &text.as_bytes()[offset..];
    if rest.starts_with(b"\r\n") {
        2
    } else if rest.starts_with(b"\n") {
        1
    } else {
        0
    }
}

/// Bytes to delete so that `range` disappears without leaving an empty line behind.
///
/// When `range` is alone on its line(s) the leading indentation and one trailing
/// terminator go with it; otherwise only `range` itself is removed.
pub fn removal_range(text: &str, range: Range<usize>) -> Range<usize> {
    let start = line_start(text, range.start);
    let end = line_end(text, range.end);
    let owns_start = text[start..range.start].trim().is_empty();
    let owns_end = text[range.end..end].trim().is_empty();
    if !(owns_start && owns_end) {
        return range;
    }
    // `end` sits on the `\n`; a `\r` before it belongs to the same terminator.
    let content_end = if end > range.end && text.as_bytes()[end - 1] == b'\r' {
        end - 1
    } else {
        end
    };
    start..content_end + terminator_len(text, content_end)
}

/// Replace `range` of `text` with `replacement`.
pub fn splice(text: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() - range.len() + replacement.len());
    out.push_str(&text[..range.start]);
    out.push_str(replacement);
    out.push_str(&text[range.end..]);
    out
}

/// Prefix every line of `block` after the first with `indent`.
pub fn indent_lines(block: &str, indent: &str, eol: &str) -> String {
    block
        .lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join(eol)
}
