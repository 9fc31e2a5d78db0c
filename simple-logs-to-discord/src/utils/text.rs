/// Truncate `text` to at most `max_chars` characters, replacing the tail with
/// `marker` when it had to be cut. The result never exceeds `max_chars`.
///
/// Lengths are counted in `char`s, not bytes.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(marker.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(marker);
    out
}

/// First `max_chars` characters of `text`, for log previews.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
