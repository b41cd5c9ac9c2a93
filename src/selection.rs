//! Per-song choice of one ranked candidate.
//!
//! The mode is fixed for the whole run. Auto and DryRun pick without
//! interaction; Interactive asks a [`Prompter`] until it gets an index in
//! `[0, N]`, where `0` skips the song.

use std::fmt;
use std::str::FromStr;

use crate::models::{Selection, SongCandidate, WantedSong};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionMode {
    /// Pick the preselected ranked index, else the top match
    Auto,
    /// Ask the operator for every song
    Interactive,
    /// Pick like Auto but never transfer archives
    DryRun,
}

impl SelectionMode {
    pub fn is_dry_run(self) -> bool {
        self == SelectionMode::DryRun
    }
}

impl FromStr for SelectionMode {
    type Err = String;

    /// Accepts the prompt answers `auto`, `list` and `test`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(SelectionMode::Auto),
            "list" => Ok(SelectionMode::Interactive),
            "test" => Ok(SelectionMode::DryRun),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionMode::Auto => "auto",
            SelectionMode::Interactive => "list",
            SelectionMode::DryRun => "test",
        };
        f.write_str(name)
    }
}

/// Source of the operator's answer in Interactive mode.
pub trait Prompter {
    /// Present `ranked` and read one raw answer. `retry` is set after an
    /// invalid answer. `None` means input is exhausted.
    fn ask(&mut self, ranked: &[SongCandidate], retry: bool) -> Option<String>;
}

/// Choose a candidate for `song` from its ranked list.
pub fn select(
    mode: SelectionMode,
    song: &WantedSong,
    ranked: &[SongCandidate],
    prompter: &mut dyn Prompter,
) -> Selection {
    if ranked.is_empty() {
        return Selection::NotFound;
    }

    match mode {
        SelectionMode::Auto | SelectionMode::DryRun => {
            let index = song.preselected_index.unwrap_or(1);
            if index == 0 {
                Selection::Skipped
            } else if index > ranked.len() {
                log::warn!(
                    "'{}' asks for match {} but only {} were found",
                    song.display_query,
                    index,
                    ranked.len()
                );
                Selection::Skipped
            } else {
                Selection::Chosen(index)
            }
        }
        SelectionMode::Interactive => {
            let mut retry = false;
            loop {
                let Some(answer) = prompter.ask(ranked, retry) else {
                    return Selection::Skipped;
                };
                match parse_choice(&answer, ranked.len()) {
                    Some(0) => return Selection::Skipped,
                    Some(index) => return Selection::Chosen(index),
                    None => retry = true,
                }
            }
        }
    }
}

/// A whole-number answer in `[0, count]`.
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let answer = answer.trim();
    if answer.is_empty() || !answer.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    answer.parse().ok().filter(|n| *n <= count)
}
