//! Text helpers for bounded, human-facing output.

/// Truncate `s` to at most `max_chars` characters.
///
/// Counts `char`s, never splits a UTF-8 sequence.
#[must_use]
pub fn truncate_to_boundary(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate `s` to `max_chars` characters, appending `"..."` when cut.
#[must_use]
pub fn truncate_with_marker(s: &str, max_chars: usize) -> String {
    let cut = truncate_to_boundary(s, max_chars);
    if cut.len() == s.len() {
        s.to_owned()
    } else {
        format!("{cut}...")
    }
}
