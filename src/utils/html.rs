// src/utils/html.rs

/// Sanitises user-supplied note text with ammonia's whitelist.
///
/// Safe formatting tags (`<b>`, `<p>`) survive, `<script>` is dropped together
/// with its content, and event-handler attributes are stripped. Blank input
/// becomes `None` so an emptied note clears the field.
pub fn clean_notes(input: &str) -> Option<String> {
    let cleaned = ammonia::clean(input.trim());
    if cleaned.trim().is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
