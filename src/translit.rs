//! ASCII transliteration shared by key and author normalization.
//!
//! Characters are mapped to their closest ASCII form: accented letters lose
//! their accents, a handful of ligatures and special letters are spelled out
//! (`ß` → `ss`, `æ` → `ae`), and LaTeX accent commands such as `{\'e}` are
//! decoded to their base letter first.

use crate::regex::{Captures, Regex};
use itertools::Itertools;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// `\'{e}`, `\"{o}`, `\c c`, `\'\i` and friends. Braced and bare arguments
/// are captured separately so an enclosing `{...}` group stays balanced.
/// Letter-named accents (`\c`, `\u`, ...) take a bare argument only after
/// whitespace, so `\url` or `\bf` are left alone.
static LATEX_ACCENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"\\(?:[`'^"~=.](?:\{\s*\\?([A-Za-z])\s*\}|\s*\\?([A-Za-z]))"#,
        r"|[uvHcdkrb](?:\{\s*\\?([A-Za-z])\s*\}|\s+\\?([A-Za-z])))",
    ))
    .unwrap()
});

/// Letter macros without an argument: `\ss`, `\o`, `\ae`, ...
static LATEX_LETTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(ss|ae|AE|oe|OE|aa|AA|o|O|l|L|i|j)\b").unwrap());

/// Letters that do not decompose into an ASCII base letter plus marks.
const SPECIAL_LETTERS: [(char, &str); 22] = [
    ('ß', "ss"),
    ('ẞ', "SS"),
    ('æ', "ae"),
    ('Æ', "AE"),
    ('œ', "oe"),
    ('Œ', "OE"),
    ('ø', "o"),
    ('Ø', "O"),
    ('đ', "d"),
    ('Đ', "D"),
    ('ð', "d"),
    ('Ð', "D"),
    ('ł', "l"),
    ('Ł', "L"),
    ('þ', "th"),
    ('Þ', "Th"),
    ('ı', "i"),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{00A0}', " "),
];

/// Characters in a citation key that become `_` instead of being removed.
const KEY_SEPARATORS: [char; 7] = ['.', ':', '/', '+', ',', ';', '='];

/// Fallback base used when a key has no ASCII representation at all.
pub const EMPTY_KEY_FALLBACK: &str = "entry";

/// Map every character of `text` to its closest ASCII equivalent.
///
/// Characters without any ASCII equivalent are dropped. Braces, punctuation
/// and whitespace are left in place.
pub fn transliterate(text: &str) -> String {
    let decoded = decode_latex_accents(text);
    let mut result = String::with_capacity(decoded.len());

    for c in decoded.chars() {
        if c.is_ascii() {
            result.push(c);
        } else if let Some((_, replacement)) = SPECIAL_LETTERS.iter().find(|(s, _)| *s == c) {
            result.push_str(replacement);
        } else {
            result.extend(std::iter::once(c).nfkd().filter(char::is_ascii));
        }
    }

    result
}

/// Transliterate a citation key and restrict it to `[A-Za-z0-9_-]`.
///
/// Whitespace and separator punctuation become `_`, everything else outside
/// the key alphabet is removed. A key that is already in the key alphabet is
/// returned unchanged.
pub fn ascii_key(key: &str) -> String {
    transliterate(key)
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                Some(c)
            } else if c.is_ascii_whitespace() || KEY_SEPARATORS.contains(&c) {
                Some('_')
            } else {
                None
            }
        })
        .collect()
}

/// Fold a name for equality checks: transliterated, lower-cased, braces
/// removed, whitespace collapsed.
pub fn fold_for_comparison(text: &str) -> String {
    let unbraced: String = transliterate(text)
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect();
    unbraced.to_lowercase().split_whitespace().join(" ")
}

fn decode_latex_accents(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let accents = LATEX_ACCENT_REGEX.replace_all(text, |caps: &Captures| {
        (1..=4)
            .find_map(|i| caps.get(i))
            .map_or_else(String::new, |m| m.as_str().to_string())
    });
    LATEX_LETTER_REGEX
        .replace_all(&accents, |caps: &Captures| {
            match &caps[1] {
                "i" => "i",
                "j" => "j",
                "ss" => "ss",
                "ae" => "ae",
                "AE" => "AE",
                "oe" => "oe",
                "OE" => "OE",
                "aa" => "a",
                "AA" => "A",
                "o" => "o",
                "O" => "O",
                "l" => "l",
                "L" => "L",
                _ => "",
            }
            .to_string()
        })
        .into_owned()
}
