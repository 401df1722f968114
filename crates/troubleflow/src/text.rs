//! Small string helpers shared by the parser and the refiner.

/// Number of characters (not bytes) in `text`.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Short label for a body: its first non-empty line, cut to `max_chars`
/// characters with a `...` suffix when longer.
pub(crate) fn derive_title(body: &str, max_chars: usize) -> String {
    let line = body
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    if char_len(line) > max_chars {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

/// Trims whitespace and Markdown emphasis around a marker remainder.
pub(crate) fn clean_fragment(text: &str) -> &str {
    text.trim().trim_matches('*').trim()
}

/// Appends a line to an accumulated body, newline-separated.
pub(crate) fn append_line(body: &mut String, line: &str) {
    if line.is_empty() {
        return;
    }
    if !body.is_empty() {
        body.push('\n');
    }
    body.push_str(line);
}
