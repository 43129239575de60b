//! Lexical helpers for Groovy and Kotlin build scripts.
//!
//! Scripts are never parsed into a syntax tree. Instead the source is copied
//! into a *masked* buffer of the same length where string contents and
//! comments are blanked out, so braces and keywords can be matched on plain
//! bytes while every offset still points into the original text.

use std::ops::Range;

use crate::error::ParseError;

/// A named block such as `dependencies { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Offset of the block name
    pub keyword_start: usize,
    /// Offset of the opening brace
    pub open: usize,
    /// Offset of the matching closing brace, `None` when the file ends first
    pub close: Option<usize>,
}

impl Block {
    /// Byte range between the braces. An unclosed block runs to `len`.
    pub fn body(&self, len: usize) -> Range<usize> {
        self.open + 1..self.close.unwrap_or(len)
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_some()
    }
}

/// Source bytes with string contents and comments replaced by spaces.
#[derive(Debug, Clone)]
pub struct MaskedSource {
    bytes: Vec<u8>,
    error: Option<ParseError>,
}

impl MaskedSource {
    pub fn new(text: &str) -> Self {
        let src = text.as_bytes();
        let mut bytes = src.to_vec();
        let mut error = None;
        let mut i = 0;

        while i < src.len() {
            match src[i] {
                b'/' if src.get(i + 1) == Some(&b'/') => {
                    let end = find_byte(src, i, b'\n').unwrap_or(src.len());
                    blank(&mut bytes, i..end);
                    i = end;
                }
                b'/' if src.get(i + 1) == Some(&b'*') => {
                    let end = match find_seq(src, i + 2, b"*/") {
                        Some(pos) => pos + 2,
                        None => {
                            error.get_or_insert(ParseError::UnterminatedComment { offset: i });
                            src.len()
                        }
                    };
                    blank(&mut bytes, i..end);
                    i = end;
                }
                quote @ (b'"' | b'\'') => {
                    let triple = src.get(i + 1) == Some(&quote) && src.get(i + 2) == Some(&quote);
                    if triple {
                        let delimiter = [quote; 3];
                        match find_seq(src, i + 3, &delimiter) {
                            Some(pos) => {
                                blank(&mut bytes, i + 3..pos);
                                i = pos + 3;
                            }
                            None => {
                                error.get_or_insert(ParseError::UnterminatedString { offset: i });
                                blank(&mut bytes, i + 3..src.len());
                                i = src.len();
                            }
                        }
                    } else {
                        match find_string_end(src, i + 1, quote) {
                            Ok(pos) => {
                                blank(&mut bytes, i + 1..pos);
                                i = pos + 1;
                            }
                            Err(line_end) => {
                                error.get_or_insert(ParseError::UnterminatedString { offset: i });
                                blank(&mut bytes, i + 1..line_end);
                                i = line_end;
                            }
                        }
                    }
                }
                _ => i += 1,
            }
        }

        Self { bytes, error }
    }

    /// First lexical error, if any.
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Offset past which results are untrustworthy.
    pub fn failure_offset(&self) -> Option<usize> {
        self.error.as_ref().and_then(|e| match e {
            ParseError::UnterminatedString { offset }
            | ParseError::UnterminatedComment { offset }
            | ParseError::UnbalancedBrace { offset }
            | ParseError::UnterminatedBlock { offset, .. } => Some(*offset),
            ParseError::Xml(_) | ParseError::Catalog(_) | ParseError::Io(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when `range` holds nothing but whitespace once strings and comments are masked.
    pub fn is_blank(&self, range: Range<usize>) -> bool {
        self.bytes[range].iter().all(u8::is_ascii_whitespace)
    }

    /// End of the code in `range`, ignoring trailing comments and whitespace.
    pub fn code_end(&self, range: Range<usize>) -> usize {
        let start = range.start;
        self.bytes[range]
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(start, |pos| start + pos + 1)
    }

    /// Net brace depth change over `range`.
    pub fn depth_delta(&self, range: Range<usize>) -> (isize, isize) {
        let mut depth = 0isize;
        let mut min = 0isize;
        for &b in &self.bytes[range] {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    min = min.min(depth);
                }
                _ => {}
            }
        }
        (depth, min)
    }

    /// Find every top-level block introduced by `name`.
    ///
    /// Returns the blocks found plus the first structural error. A block left
    /// open at end of file is still returned with `close == None`.
    pub fn find_top_level_blocks(&self, name: &str) -> (Vec<Block>, Option<ParseError>) {
        let mut blocks = Vec::new();
        let mut error = None;
        let mut depth = 0usize;
        let mut pending: Option<(usize, usize)> = None;

        for (i, &b) in self.bytes.iter().enumerate() {
            match b {
                b'{' => {
                    if depth == 0
                        && let Some(keyword_start) = self.keyword_before(i, name)
                    {
                        pending = Some((keyword_start, i));
                    }
                    depth += 1;
                }
                b'}' => {
                    if depth == 0 {
                        error.get_or_insert(ParseError::UnbalancedBrace { offset: i });
                        continue;
                    }
                    depth -= 1;
                    if depth == 0
                        && let Some((keyword_start, open)) = pending.take()
                    {
                        blocks.push(Block {
                            keyword_start,
                            open,
                            close: Some(i),
                        });
                    }
                }
                _ => {}
            }
        }

        if let Some((keyword_start, open)) = pending {
            error.get_or_insert(ParseError::UnterminatedBlock {
                block: name.to_string(),
                offset: keyword_start,
            });
            blocks.push(Block {
                keyword_start,
                open,
                close: None,
            });
        }

        (blocks, error)
    }

    /// Line ranges (terminator excluded) that start at brace depth zero.
    pub fn top_level_lines(&self) -> Vec<Range<usize>> {
        let mut lines = Vec::new();
        let mut depth = 0isize;
        for range in line_ranges(&self.bytes, 0..self.bytes.len()) {
            if depth == 0 {
                lines.push(range.clone());
            }
            depth = (depth + self.depth_delta(range).0).max(0);
        }
        lines
    }

    /// `name` followed only by whitespace up to `brace`, preceded by a non-identifier byte.
    fn keyword_before(&self, brace: usize, name: &str) -> Option<usize> {
        let head = &self.bytes[..brace];
        let end = head.iter().rposition(|b| !b.is_ascii_whitespace())? + 1;
        let start = end.checked_sub(name.len())?;
        if &head[start..end] != name.as_bytes() {
            return None;
        }
        if start > 0 && is_ident_byte(head[start - 1]) || start > 0 && head[start - 1] == b'.' {
            return None;
        }
        Some(start)
    }
}

/// Split `range` of `text` into line ranges, each excluding its `\n` and a trailing `\r`.
pub fn line_ranges(text: &[u8], range: Range<usize>) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut start = range.start;
    while start < range.end {
        let end = find_byte(&text[..range.end], start, b'\n').unwrap_or(range.end);
        let mut content_end = end;
        if content_end > start && text[content_end - 1] == b'\r' {
            content_end -= 1;
        }
        lines.push(start..content_end);
        start = end + 1;
    }
    lines
}

/// True when `offset` is the first byte of a physical line.
pub fn is_line_start(text: &str, offset: usize) -> bool {
    offset == 0 || text.as_bytes().get(offset - 1) == Some(&b'\n')
}

/// True when `offset` sits on a line terminator or at end of text.
pub fn is_line_end(text: &str, offset: usize) -> bool {
    matches!(text.as_bytes().get(offset), None | Some(b'\n') | Some(b'\r'))
}

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn blank(bytes: &mut [u8], range: Range<usize>) {
    for b in &mut bytes[range] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

fn find_byte(src: &[u8], from: usize, needle: u8) -> Option<usize> {
    src.get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|pos| from + pos)
}

fn find_seq(src: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    src.get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| from + pos)
}

/// Offset of the closing quote, or `Err(line_end)` when the line ends first.
fn find_string_end(src: &[u8], from: usize, quote: u8) -> Result<usize, usize> {
    let mut i = from;
    while i < src.len() {
        match src[i] {
            b'\\' => i += 2,
            b'\n' => return Err(i),
            b if b == quote => return Ok(i),
            _ => i += 1,
        }
    }
    Err(src.len())
}
