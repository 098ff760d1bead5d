//! Character-level text helpers.
//!
//! Lengths here are counted in `char`s, not bytes: Greek text is two bytes
//! per letter in UTF-8 and every limit in the pipeline is a character limit.

/// Collapse every whitespace run into one space and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// In-place variant of [`truncate_chars`]. Returns whether anything was dropped.
pub fn truncate_in_place(s: &mut String, max: usize) -> bool {
    match s.char_indices().nth(max) {
        Some((idx, _)) => {
            s.truncate(idx);
            true
        }
        None => false,
    }
}
