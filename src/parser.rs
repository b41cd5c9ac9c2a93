//! Conversion of one search result row into a [`SongCandidate`].
//!
//! Selectors follow the catalog's result page markup. Rows that belong to
//! sidebar/footer widgets are not songs and parse to `Ok(None)`.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RowError;
use crate::models::SongCandidate;
use crate::normalize::sanitize_text;
use crate::rows::Row;

// ============================================================================
// Page markup
// ============================================================================

/// Container of every result row (and of some template chrome).
pub const ROW_SELECTOR: &str = "div.row";

/// Any of these inside a row marks it as a widget container.
const WIDGET_SELECTOR: &str = "div.widget, div.small-2, div.subfooter-menu-holder";
const TITLE_SELECTOR: &str = "header";
const DIFFICULTY_SELECTOR: &str = "a.post-difficulty";
const STAT_SELECTOR: &str = "span.post-stat";
const MAPPER_SELECTOR: &str = "div.post-bottom-meta.post-mapper-id-meta";
const DATE_SELECTOR: &str = "time";
const DATE_ATTR: &str = "content";
const DOWNLOAD_SELECTOR: &str = "a.-download-zip";

/// First word after one or more line breaks (and indentation) in the mapper block.
static MAPPER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+\s*(\w+)").unwrap());

/// Abbreviations for difficulty and characteristic labels.
const DIFFICULTY_ABBREVIATIONS: [(&str, &str); 7] = [
    ("Easy", "Ea"),
    ("Normal", "No"),
    ("Hard", "Ha"),
    ("Expert", "Ex"),
    ("Expert+", "Ex+"),
    ("Standard", "St"),
    ("Advanced", "Ad"),
];

// ============================================================================
// Parsing
// ============================================================================

/// Parse one result row.
///
/// Returns `Ok(None)` for widget rows and `Err` for song rows that are
/// missing a title or carry unreadable dates/stats.
pub fn parse_row(row: &dyn Row) -> Result<Option<SongCandidate>, RowError> {
    if row.contains(WIDGET_SELECTOR) {
        return Ok(None);
    }

    let title = row
        .find_text(TITLE_SELECTOR)
        .map(|t| sanitize_text(&t))
        .filter(|t| !t.is_empty())
        .ok_or(RowError::MissingTitle)?;

    let difficulties = row
        .find_all_text(DIFFICULTY_SELECTOR)
        .iter()
        .map(|d| abbreviate_difficulty(&sanitize_text(d)))
        .collect();

    let (upvotes, downvotes) = parse_votes(&row.find_all_text(STAT_SELECTOR))?;

    let mapper = row
        .find_text(MAPPER_SELECTOR)
        .as_deref()
        .and_then(extract_mapper)
        .unwrap_or_default();

    let date = row
        .find_attr(DATE_SELECTOR, DATE_ATTR)
        .ok_or(RowError::MissingDate)?;
    let published_at = parse_published_at(&date)?;

    let download_link = row
        .find_attr(DOWNLOAD_SELECTOR, "href")
        .filter(|href| !href.trim().is_empty());

    Ok(Some(SongCandidate {
        title,
        difficulties,
        upvotes,
        downvotes,
        mapper,
        published_at,
        download_link,
    }))
}

/// Map a difficulty label to its short form; unknown labels pass through.
pub fn abbreviate_difficulty(label: &str) -> String {
    DIFFICULTY_ABBREVIATIONS
        .iter()
        .find(|(full, _)| *full == label)
        .map(|(_, short)| short.to_string())
        .unwrap_or_else(|| label.to_string())
}

/// Votes from the stat spans. The first span is a play count and is ignored;
/// the next two are upvotes and downvotes. No stats at all means `(0, 0)`.
fn parse_votes(stats: &[String]) -> Result<(u64, u64), RowError> {
    let votes: Vec<&String> = stats.iter().skip(1).collect();
    match votes.as_slice() {
        [] => Ok((0, 0)),
        [up, down] => match (parse_count(up), parse_count(down)) {
            (Some(up), Some(down)) => Ok((up, down)),
            _ => Err(RowError::BadStats(stats.to_vec())),
        },
        _ => Err(RowError::BadStats(stats.to_vec())),
    }
}

/// "1,203" → 1203
fn parse_count(text: &str) -> Option<u64> {
    sanitize_text(text).replace(',', "").parse().ok()
}

fn extract_mapper(meta: &str) -> Option<String> {
    MAPPER_NAME
        .captures(meta)
        .map(|caps| caps[1].to_string())
}

/// Accepts RFC 3339 timestamps, offset-less ISO date-times (taken as UTC)
/// and bare dates (midnight UTC).
fn parse_published_at(raw: &str) -> Result<DateTime<FixedOffset>, RowError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt);
    }
    let utc = FixedOffset::east_opt(0).ok_or_else(|| RowError::BadDate(raw.to_string()))?;
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().with_timezone(&utc));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().with_timezone(&utc))
        .ok_or_else(|| RowError::BadDate(raw.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================
