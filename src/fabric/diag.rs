//! Bounded, sanitized diagnostic strings.
//!
//! Messages coming from transports and runners are untrusted: they may be huge
//! or contain terminal control sequences. Everything that ends up in a log line
//! or in a [`TaskError`](crate::TaskError) goes through [`sanitize`].

/// Lower bound applied to any configured limit.
pub const MIN_DIAGNOSTIC_LEN: usize = 16;

/// Replaces control characters with spaces and truncates to `max_chars` characters.
///
/// Truncated strings end with a `...[truncated N chars]` marker, where `N` is
/// the number of characters dropped.
///
/// ```
/// use taskpilot::fabric::diag::sanitize;
///
/// assert_eq!(sanitize("a\u{1b}[31mb\nc", 100), "a [31mb c");
/// assert_eq!(sanitize(&"y".repeat(40), 20), format!("{}...[truncated 20 chars]", "y".repeat(20)));
/// ```
pub fn sanitize(msg: &str, max_chars: usize) -> String {
    let max_chars = max_chars.max(MIN_DIAGNOSTIC_LEN);
    let total = msg.chars().count();

    let mut out: String = msg
        .chars()
        .take(max_chars)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    if total > max_chars {
        out.push_str(&format!("...[truncated {} chars]", total - max_chars));
    }
    out
}
