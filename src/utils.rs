/// Formats a DOI string by removing URL prefixes and [doi] suffixes
///
/// # Arguments
///
/// * `doi_str` - The DOI string to format
pub(crate) fn format_doi(doi_str: &str) -> Option<String> {
    if doi_str.trim().is_empty() {
        return None;
    }
    let doi = doi_str
        .trim()
        .trim_end_matches("[doi]")
        .trim()
        .replace(|c: char| c.is_whitespace(), "")
        .to_lowercase();

    // DOIs start at the directory indicator "10.", so any URL or "doi:"
    // prefix is cut off here.
    let pos = doi.find("10.")?;
    Some(doi[pos..].to_string())
}

/// Splits an author name into `(surname, given_names)`.
///
/// Accepts "Surname, Given" (split at the first comma outside braces) and
/// "Given Surname" (the last word outside braces is the surname). Returns
/// `None` when no surname remains after trimming.
pub(crate) fn split_author_name(name: &str) -> Option<(&str, &str)> {
    let name = name.trim();

    let (surname, given) = match top_level_position(name, |c| c == ',') {
        Some(comma) => (name[..comma].trim(), name[comma + 1..].trim()),
        None => match top_level_rposition(name, char::is_whitespace) {
            Some(space) => (name[space..].trim(), name[..space].trim()),
            None => (name, ""),
        },
    };

    if surname.is_empty() {
        None
    } else {
        Some((surname, given))
    }
}

fn top_level_position(text: &str, pred: impl Fn(char) -> bool) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if depth == 0 && pred(c) => return Some(i),
            _ => {}
        }
    }
    None
}

fn top_level_rposition(text: &str, pred: impl Fn(char) -> bool) -> Option<usize> {
    let mut depth = 0usize;
    let mut found = None;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if depth == 0 && pred(c) => found = Some(i),
            _ => {}
        }
    }
    found
}
