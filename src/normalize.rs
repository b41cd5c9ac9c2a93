//! Name normalization for wanted songs and scraped rows.
//!
//! `canonicalize` and `split_variant_suffix` decide what gets searched, so
//! changes here change which candidates a run can find. Run tests after changes.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Leading run of a title up to the first `(`, `,`, `-`, `[` or `.`.
pub static CANONICAL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^(,\-\[.]*)").unwrap());

/// Trailing variant ordinal: "Song Name -2" → ("2", "Song Name").
/// The dash must follow whitespace so names like "Blink-182" stay intact.
pub static VARIANT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s+-(\d+)\s*$").unwrap());

/// Whitespace runs that contain at least one line break.
pub static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\n\s*").unwrap());

/// Characters that cannot appear in a file name on common filesystems.
const UNSAFE_FILE_CHARS: [char; 3] = ['/', '\\', '\0'];

// ============================================================================
// WANTED SONG NAMES
// ============================================================================

/// Extract the canonical search term from a noisy title.
///
/// Examples: "Believer (feat. X)" → "Believer"
///           "Song - Remastered 2011" → "Song"
///           "Plain Title" → "Plain Title"
pub fn canonicalize(raw_title: &str) -> String {
    CANONICAL_PREFIX
        .captures(raw_title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw_title)
        .trim()
        .to_string()
}

/// Split a trailing ` -<digits>` variant ordinal off a song list line.
///
/// Returns `(Some(ordinal), base)` when the suffix is present, otherwise
/// `(None, line.trim())`. An ordinal too large to be an index is treated as
/// part of the name.
pub fn split_variant_suffix(line: &str) -> (Option<usize>, String) {
    if let Some(caps) = VARIANT_SUFFIX.captures(line) {
        if let Ok(ordinal) = caps[2].parse::<usize>() {
            return (Some(ordinal), caps[1].trim().to_string());
        }
    }
    (None, line.trim().to_string())
}

// ============================================================================
// SCRAPED TEXT
// ============================================================================

/// Collapse embedded line breaks into single spaces and trim.
pub fn sanitize_text(text: &str) -> String {
    LINE_BREAKS.replace_all(text, " ").trim().to_string()
}

/// Encode free text into search terms: every whitespace run becomes `+`,
/// each word is percent-encoded.
///
/// "Never Gonna  Give" → "Never+Gonna+Give"
pub fn query_terms(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

/// File name stem for a candidate title with path separators neutralized.
pub fn archive_stem(title: &str) -> String {
    title.replace(UNSAFE_FILE_CHARS, "_")
}

// ============================================================================
// TESTS
// ============================================================================
