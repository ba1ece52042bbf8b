//! DOT format utilities for graph visualization.
//!
//! Interference graphs are dumped in Graphviz DOT format when debugging an
//! allocation. Node labels contain location names such as `[r5-16]` or
//! `stack0:8`, so they have to be escaped before being embedded.

/// Escapes a string for safe use in DOT format labels and identifiers.
///
/// Handles quotes, backslashes, newlines, and angle and square brackets,
/// which record-shaped nodes would otherwise interpret as field syntax.
///
/// # Examples
///
/// ```rust
/// use regcolor::utils::escape_dot;
///
/// assert_eq!(escape_dot("[r5+8]"), "\\[r5+8\\]");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '<' | '>' | '[' | ']' | '{' | '}' | '|' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
