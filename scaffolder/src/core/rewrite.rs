//! Pure text rewrites backing the anchor-insert and substitute primitives.

use std::borrow::Cow;

use regex::{NoExpand, Regex};

/// Insert `content` immediately after the first occurrence of `anchor`.
///
/// Returns `None` when the anchor does not occur. Later occurrences are never
/// touched, even when the anchor text repeats in the file.
pub fn insert_after_first(text: &str, anchor: &str, content: &str) -> Option<String> {
    let start = text.find(anchor)?;
    let split = start + anchor.len();
    let mut out = String::with_capacity(text.len() + content.len());
    out.push_str(&text[..split]);
    out.push_str(content);
    out.push_str(&text[split..]);
    Some(out)
}

/// Replace every non-overlapping match of `pattern` with `replacement`.
///
/// The replacement is literal (`$1` is not expanded). Zero matches return the
/// input borrowed and unchanged.
pub fn substitute_all<'a>(text: &'a str, pattern: &Regex, replacement: &str) -> Cow<'a, str> {
    pattern.replace_all(text, NoExpand(replacement))
}
