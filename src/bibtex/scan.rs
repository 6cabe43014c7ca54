/// Entry types that are not bibliography entries.
const SPECIAL_TYPES: [&str; 3] = ["comment", "preamble", "string"];

/// A brace-delimited `@type{...}` block located in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Block<'a> {
    /// A bibliography entry with the text between its outer braces.
    Entry {
        offset: usize,
        line: usize,
        entry_type: &'a str,
        body: &'a str,
    },
    /// `@comment`, `@preamble` or `@string`.
    Special { offset: usize, entry_type: &'a str },
    /// An entry whose opening brace is never balanced.
    Unbalanced { offset: usize, line: usize },
}

/// An [Iterator] over the `@type{...}` blocks of a bibliography.
///
/// Text between blocks is skipped, as is any `@` not followed by an
/// identifier and an opening brace. After an unbalanced block, scanning
/// resumes at the next `@` that starts a line, so a well-formed entry
/// following a broken one is still found and an `@` inside the broken
/// entry's values is not mistaken for a new entry.
pub(crate) struct BlockSplit<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
    line_pos: usize,
}

impl<'a> BlockSplit<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            line_pos: 0,
        }
    }

    /// 1-based line number of `offset`. Offsets must be non-decreasing.
    fn line_at(&mut self, offset: usize) -> usize {
        self.line += self.text[self.line_pos..offset].matches('\n').count();
        self.line_pos = offset;
        self.line
    }
}

impl<'a> Iterator for BlockSplit<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.text;
        loop {
            let at = self.pos + text[self.pos..].find('@')?;
            self.pos = at + 1;

            let after_at = &text[at + 1..];
            let type_len = after_at
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
                .unwrap_or(after_at.len());
            if type_len == 0 {
                continue;
            }
            let entry_type = &after_at[..type_len];

            let rest = &after_at[type_len..];
            let open = at + 1 + type_len + (rest.len() - rest.trim_start().len());
            if !text[open..].starts_with('{') {
                continue;
            }

            let line = self.line_at(at);
            let Some(close) = matching_brace(&text[open..]).map(|i| open + i) else {
                self.pos = next_line_start_at(text, open);
                return Some(Block::Unbalanced { offset: at, line });
            };
            self.pos = close + 1;

            if SPECIAL_TYPES
                .iter()
                .any(|t| t.eq_ignore_ascii_case(entry_type))
            {
                return Some(Block::Special {
                    offset: at,
                    entry_type,
                });
            }

            return Some(Block::Entry {
                offset: at,
                line,
                entry_type,
                body: &text[open + 1..close],
            });
        }
    }
}

/// Offset of the first `@` after `from` that begins a line, ignoring
/// leading spaces and tabs, or the end of `text`.
fn next_line_start_at(text: &str, from: usize) -> usize {
    text[from..]
        .match_indices('\n')
        .map(|(i, _)| from + i + 1)
        .find_map(|start| {
            let line = &text[start..];
            let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
            line[indent..].starts_with('@').then_some(start + indent)
        })
        .unwrap_or(text.len())
}

/// Index of the brace closing the `{` at the start of `text`.
pub(crate) fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
