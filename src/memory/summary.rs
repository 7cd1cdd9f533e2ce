pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 500;
const ELLIPSIS: &str = "...";

/// Cuts `context` to its first `max_chars` characters plus `"..."`.
/// Shorter text is returned unchanged.
pub fn truncate_context(context: &str, max_chars: usize) -> String {
    match context.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &context[..cut], ELLIPSIS),
        None => context.to_string(),
    }
}
