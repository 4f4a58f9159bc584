//! Caption tokenization and canonical re-composition.
//!
//! A caption is free text where commas separate tags. Tokens are the trimmed,
//! non-empty pieces between commas, in caption order. Tokenization keeps
//! single-character tokens; only the tag index filters by length.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Separator used to rebuild a caption from tokens
pub const TAG_SEPARATOR: &str = ", ";

/// Split a caption on `,`, trim every piece and drop empty pieces
pub fn tokenize(caption: &str) -> Vec<&str> {
    caption
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Unique tokens in order of first occurrence
pub fn dedup_tokens<'a>(tokens: &[&'a str]) -> Vec<&'a str> {
    let mut seen = HashSet::with_capacity(tokens.len());
    tokens
        .iter()
        .copied()
        .filter(|token| seen.insert(*token))
        .collect()
}

/// Unique display tags of a single caption
pub fn item_tags(caption: &str) -> Vec<&str> {
    dedup_tokens(&tokenize(caption))
}

/// Join tokens with the canonical `", "` separator
pub fn join<S: AsRef<str>>(tokens: &[S]) -> String {
    join_with(tokens, TAG_SEPARATOR)
}

/// Join tokens with an explicit separator
pub fn join_with<S: AsRef<str>>(tokens: &[S], separator: &str) -> String {
    let mut out = String::new();
    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 {
            out.push_str(separator);
        }
        out.push_str(token.as_ref());
    }
    out
}

static REPEATED_COMMAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*,").expect("separator regex"));
static EDGE_COMMAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^,\s*|\s*,$").expect("separator regex"));

/// Repair separators after a free-text edit.
///
/// Collapses `,\s*,` into `,` until none is left, then drops a leading or
/// trailing comma and surrounding whitespace.
pub fn repair_separators(text: &str) -> String {
    let mut out = text.trim().to_string();
    while REPEATED_COMMAS.is_match(&out) {
        out = REPEATED_COMMAS.replace_all(&out, ",").into_owned();
    }
    EDGE_COMMAS.replace_all(out.trim(), "").trim().to_string()
}

/// Append a segment to a caption, adding a separator only where one is missing
pub fn append_segment(existing: &str, addition: &str) -> String {
    append_segment_with(existing, addition, TAG_SEPARATOR)
}

/// Append a segment using an explicit separator
pub fn append_segment_with(existing: &str, addition: &str, separator: &str) -> String {
    let existing = existing.trim();
    if existing.is_empty() {
        addition.to_string()
    } else if existing.ends_with(',') {
        format!("{existing} {addition}")
    } else {
        format!("{existing}{separator}{addition}")
    }
}
