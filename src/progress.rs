//! Spinner-based status reporting and logging utilities.
//!
//! Provides a [`StatusReporter`] that shows one spinner per wanted song, with
//! support for log-only mode where spinners are hidden for tail-friendly output.

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::models::{Outcome, SongCandidate, WantedSong};
use crate::pipeline::StatusReporter;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Set log-only mode globally
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

/// Check if log-only mode is enabled
pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

/// Create a spinner for indeterminate progress.
/// In log-only mode, the spinner is hidden.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        // Template is a constant; a parse failure only loses the elapsed column.
        let style = ProgressStyle::default_spinner()
            .template("{spinner} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

// ============================================================================
// Status reporter
// ============================================================================

/// One spinner per song. Success lines get a check mark, failures a cross.
#[derive(Default)]
pub struct SpinnerReporter {
    current: Option<ProgressBar>,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn spinner(&mut self) -> &ProgressBar {
        self.current.get_or_insert_with(|| create_spinner(""))
    }

    fn succeed(&mut self, msg: String) {
        self.finish(format!("{} {}", "✔".green(), msg));
    }

    fn fail(&mut self, msg: String) {
        self.finish(format!("{} {}", "✖".red(), msg));
    }

    fn finish(&mut self, msg: String) {
        if is_log_only() {
            eprintln!("[STATUS] {}", msg);
        }
        if let Some(pb) = self.current.take() {
            pb.finish_with_message(msg);
        }
    }
}

impl StatusReporter for SpinnerReporter {
    fn on_search_start(&mut self, song: &WantedSong) {
        self.current = Some(create_spinner(&format!(
            "Searching for {}",
            song.display_query.as_str().blue()
        )));
    }

    fn on_searched(&mut self, song: &WantedSong, found: usize) {
        self.succeed(format!(
            "Searched for {} ({} found)",
            song.display_query.as_str().blue(),
            found
        ));
    }

    fn on_not_found(&mut self, song: &WantedSong) {
        self.spinner();
        self.fail(format!("No song found for {}", song.display_query.as_str().blue()));
    }

    fn on_skipped(&mut self, song: &WantedSong) {
        self.spinner();
        self.fail(format!("Skipped {}", song.display_query.as_str().blue()));
    }

    fn on_acquire_start(&mut self, candidate: &SongCandidate) {
        self.current = Some(create_spinner(&format!(
            "Downloading {}",
            candidate.title.as_str().blue()
        )));
    }

    fn on_acquired(&mut self, candidate: &SongCandidate, outcome: Outcome) {
        let title = candidate.title.as_str().blue();
        match outcome {
            Outcome::Downloaded => self.succeed(format!("Downloaded {}", title)),
            Outcome::AlreadyPresent => self.succeed(format!("Already downloaded {}", title)),
            Outcome::MatchedOnly => self.succeed(format!("Matched with {}", title)),
            Outcome::NoLink => self.fail(format!("No download link for {}", title)),
        }
    }

    fn on_failed(&mut self, song: &WantedSong, reason: &str) {
        self.spinner();
        self.fail(format!(
            "Failed {}: {}",
            song.display_query.as_str().blue(),
            reason
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_reporter_clears_spinner_on_finish() {
        set_log_only(true);
        let mut reporter = SpinnerReporter::new();
        let song = WantedSong::new("Crab Rave");
        reporter.on_search_start(&song);
        assert!(reporter.current.is_some());
        reporter.on_searched(&song, 3);
        assert!(reporter.current.is_none());

        reporter.on_skipped(&song);
        assert!(reporter.current.is_none());
    }
}
