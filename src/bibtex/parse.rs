//! BibTeX parsing implementation.
//!
//! This module turns the blocks found by the scanner into raw entries:
//! the body is split on top-level commas, the first segment is the key and
//! the rest are `name = value` pairs.

use crate::bibtex::scan::{Block, BlockSplit, matching_brace};
use crate::bibtex::structure::RawBibEntry;
use crate::error::{Diagnostic, MalformedReason};
use either::{Either, Left, Right};
use itertools::Itertools;
use tracing::debug;

/// Parse a bibliography into raw entries, alongside diagnostics for the
/// blocks that could not be read.
pub(crate) fn bibtex_parse<S: AsRef<str>>(text: S) -> (Vec<Diagnostic>, Vec<RawBibEntry>) {
    BlockSplit::new(text.as_ref())
        .filter_map(parse_block)
        .partition_map(|parsed| parsed)
}

fn parse_block(block: Block<'_>) -> Option<Either<Diagnostic, RawBibEntry>> {
    match block {
        Block::Special { offset, entry_type } => {
            debug!(offset, entry_type, "skipping non-entry block");
            None
        }
        Block::Unbalanced { offset, line } => Some(Left(Diagnostic::MalformedEntry {
            offset,
            line,
            reason: MalformedReason::UnbalancedBraces,
        })),
        Block::Entry {
            offset,
            line,
            entry_type,
            body,
        } => Some(Right(parse_entry_body(entry_type, body, offset, line))),
    }
}

fn parse_entry_body(entry_type: &str, body: &str, offset: usize, line: usize) -> RawBibEntry {
    let mut segments = split_top_level(body, ',').into_iter();
    let first = segments.next().unwrap_or_default().trim();
    let key = if first.contains('=') { "" } else { first };

    let mut raw = RawBibEntry::new(entry_type, key, offset, line);
    for segment in segments {
        match parse_field(segment) {
            FieldSegment::Empty => {}
            FieldSegment::Field(name, value) => raw.add_field(name, value),
            FieldSegment::Invalid => raw.add_ignored_segment(segment.trim()),
        }
    }
    raw
}

#[derive(Debug, PartialEq, Eq)]
enum FieldSegment<'a> {
    /// Nothing but whitespace, e.g. after a trailing comma.
    Empty,
    Field(String, &'a str),
    Invalid,
}

/// Parse a `name = value` segment. Names are case-folded and values are
/// unwrapped from their braces or quotes.
fn parse_field(segment: &str) -> FieldSegment<'_> {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return FieldSegment::Empty;
    }
    let Some((name, value)) = trimmed.split_once('=') else {
        return FieldSegment::Invalid;
    };
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return FieldSegment::Invalid;
    }
    FieldSegment::Field(name.to_lowercase(), unwrap_value(value.trim()))
}

/// Strip one pair of enclosing braces or double quotes.
///
/// `{a} # {b}` is left alone since its first brace does not close at the end.
pub(crate) fn unwrap_value(value: &str) -> &str {
    if value.starts_with('{') && matching_brace(value) == Some(value.len() - 1) {
        &value[1..value.len() - 1]
    } else if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Split on `separator` outside braces and outside double-quoted values.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0;
    let mut previous = '\0';

    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '"' if depth == 0 && previous != '\\' => in_quotes = !in_quotes,
            c if c == separator && depth == 0 && !in_quotes => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
        previous = c;
    }
    parts.push(&text[start..]);
    parts
}

/// Whitespace-separated words, where whitespace inside braces does not separate.
fn top_level_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut depth = 0usize;
    let mut start = None;

    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if c.is_whitespace() && depth == 0 {
            if let Some(s) = start.take() {
                words.push(&text[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        words.push(&text[s..]);
    }
    words
}

/// Split an `author` value on `and` (any case) outside braces.
///
/// Whitespace inside each name is collapsed to single spaces. Empty names,
/// as in `A and and B`, are kept so they can be reported later.
pub(crate) fn split_authors(value: &str) -> Vec<String> {
    let words = top_level_words(value);
    if words.is_empty() {
        return Vec::new();
    }

    let mut authors = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in words {
        if word.eq_ignore_ascii_case("and") {
            authors.push(current.join(" "));
            current.clear();
        } else {
            current.push(word);
        }
    }
    authors.push(current.join(" "));
    authors
}
