//! Splits template source into literal text and `<% ... %>` tags.

use crate::error::CompileError;

const OPEN: &str = "<%";
const CLOSE: &str = "%>";

/// What a tag does with its body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    /// `<%= expr %>`
    Escaped,
    /// `<%- expr %>`
    Raw,
    /// `<%# ... %>`
    Comment,
    /// `<% code %>`
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Tag {
        kind: TagKind,
        body: &'a str,
        line: usize,
    },
}

pub(crate) fn split(source: &str) -> Result<Vec<Segment<'_>>, CompileError> {
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while let Some(offset) = source[pos..].find(OPEN) {
        let start = pos + offset;
        if start > pos {
            let text = &source[pos..start];
            line += text.matches('\n').count();
            segments.push(Segment::Text(text));
        }

        let after_open = start + OPEN.len();
        let (kind, body_start) = match source[after_open..].chars().next() {
            Some('=') => (TagKind::Escaped, after_open + 1),
            Some('-') => (TagKind::Raw, after_open + 1),
            Some('#') => (TagKind::Comment, after_open + 1),
            _ => (TagKind::Code, after_open),
        };

        let Some(close) = source[body_start..].find(CLOSE) else {
            return Err(CompileError::new(line, "unclosed tag, expected '%>'"));
        };
        let body_end = body_start + close;
        let body = &source[body_start..body_end];

        segments.push(Segment::Tag {
            kind,
            body: if kind == TagKind::Comment { body } else { body.trim() },
            line,
        });

        line += body.matches('\n').count();
        pos = body_end + CLOSE.len();
    }

    if pos < source.len() {
        segments.push(Segment::Text(&source[pos..]));
    }

    Ok(segments)
}
