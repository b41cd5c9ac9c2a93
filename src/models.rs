//! Core data models for song resolution.
//!
//! This module contains the structs and enums that flow through the
//! resolve → rank → select → acquire pipeline.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

// ============================================================================
// Input Models
// ============================================================================

/// One song the operator wants to locate and download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WantedSong {
    /// Primary search text (full noisy title, or title + artist)
    pub display_query: String,
    /// Alternate search text, usually the canonicalized title
    pub fallback_query: Option<String>,
    /// 1-based ranked index to pick in Auto/DryRun mode
    pub preselected_index: Option<usize>,
}

impl WantedSong {
    pub fn new(display_query: impl Into<String>) -> Self {
        Self {
            display_query: display_query.into(),
            fallback_query: None,
            preselected_index: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback_query = Some(fallback.into());
        self
    }

    pub fn with_preselected(mut self, index: usize) -> Self {
        self.preselected_index = Some(index);
        self
    }
}

// ============================================================================
// Catalog Models
// ============================================================================

/// One parsed search result row.
///
/// Equality and hashing cover every field, so two rows are only the same
/// candidate when all of their data matches. Deduplication relies on this.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SongCandidate {
    pub title: String,
    /// Abbreviated difficulty tiers in page order
    pub difficulties: Vec<String>,
    pub upvotes: u64,
    pub downvotes: u64,
    pub mapper: String,
    pub published_at: DateTime<FixedOffset>,
    pub download_link: Option<String>,
}

// ============================================================================
// Pipeline Outcomes
// ============================================================================

/// Result of the selection step for one wanted song.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// 1-based index into the ranked list
    Chosen(usize),
    Skipped,
    NotFound,
}

/// Result of the acquisition step for a selected candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Downloaded,
    AlreadyPresent,
    MatchedOnly,
    NoLink,
}

impl Outcome {
    /// Accepted outcomes are written to the session log.
    pub fn is_accepted(self) -> bool {
        !matches!(self, Outcome::NoLink)
    }
}

/// Final per-song report, one per wanted song.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SongReport {
    Acquired { title: String, outcome: Outcome },
    Skipped,
    NotFound,
    Failed { reason: String },
}

// ============================================================================
// Statistics
// ============================================================================

/// Run-level counters, printed at the end and optionally written as JSON.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RunStats {
    pub wanted: usize,
    pub downloaded: usize,
    pub already_present: usize,
    pub matched_only: usize,
    pub no_link: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub failed: usize,
    pub elapsed_seconds: f64,
}

impl RunStats {
    pub fn record(&mut self, report: &SongReport) {
        self.wanted += 1;
        match report {
            SongReport::Acquired { outcome, .. } => match outcome {
                Outcome::Downloaded => self.downloaded += 1,
                Outcome::AlreadyPresent => self.already_present += 1,
                Outcome::MatchedOnly => self.matched_only += 1,
                Outcome::NoLink => self.no_link += 1,
            },
            SongReport::Skipped => self.skipped += 1,
            SongReport::NotFound => self.not_found += 1,
            SongReport::Failed { .. } => self.failed += 1,
        }
    }

    /// Songs whose title ended up in the session log
    pub fn accepted(&self) -> usize {
        self.downloaded + self.already_present + self.matched_only
    }

    /// Log stats to stderr in JSON format
    pub fn log_summary(&self) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS]\n{}", json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
