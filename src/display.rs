//! Terminal presentation: ranked candidate table and interactive prompts.

use crossterm::style::{Color, Stylize};
use std::io::{self, BufRead, Write};
use unicode_width::UnicodeWidthStr;

use crate::models::SongCandidate;
use crate::selection::{Prompter, SelectionMode};
use crate::spotify::PLAYLIST_LINK_PREFIX;

/// Song titles longer than this wrap onto continuation lines.
pub const SONG_COLUMN_WIDTH: usize = 45;

const HEADERS: [&str; 7] = ["", "Song", "Mapper", "Up", "Down", "Difficulty", "Date"];
const COLUMN_COLORS: [Color; 7] = [
    Color::Reset,
    Color::White,
    Color::Blue,
    Color::Green,
    Color::Red,
    Color::Yellow,
    Color::Grey,
];

// ============================================================================
// Table
// ============================================================================

/// Split `name` into chunks of at most `width` characters.
pub fn wrap_chunks(name: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    if chars.is_empty() || width == 0 {
        return vec![name.to_string()];
    }
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Plain-text cells for one table row; a cell may span several lines.
fn row_cells(index: usize, candidate: &SongCandidate) -> [Vec<String>; 7] {
    [
        vec![index.to_string()],
        wrap_chunks(&candidate.title, SONG_COLUMN_WIDTH),
        vec![candidate.mapper.clone()],
        vec![candidate.upvotes.to_string()],
        vec![candidate.downvotes.to_string()],
        vec![candidate.difficulties.join(", ")],
        vec![candidate.published_at.format("%d.%m.%Y").to_string()],
    ]
}

fn border(widths: &[usize], left: &str, join: &str, right: &str) -> String {
    let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{}{}{}\n", left, inner.join(join), right)
}

fn pad(cell: &str, width: usize) -> String {
    format!("{}{}", cell, " ".repeat(width.saturating_sub(cell.width())))
}

/// Render `ranked` as a boxed table, numbered from 1.
pub fn render_table(ranked: &[SongCandidate]) -> String {
    let rows: Vec<[Vec<String>; 7]> = ranked
        .iter()
        .enumerate()
        .map(|(i, candidate)| row_cells(i + 1, candidate))
        .collect();

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.width()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            for line in cell {
                *width = (*width).max(line.width());
            }
        }
    }

    let mut out = border(&widths, "┌", "┬", "┐");
    out.push('│');
    for (header, width) in HEADERS.iter().zip(&widths) {
        out.push_str(&format!(" {} │", pad(header, *width).bold()));
    }
    out.push('\n');

    for row in &rows {
        out.push_str(&border(&widths, "├", "┼", "┤"));
        let height = row.iter().map(Vec::len).max().unwrap_or(1);
        for line in 0..height {
            out.push('│');
            for ((cell, width), color) in row.iter().zip(&widths).zip(COLUMN_COLORS) {
                let text = cell.get(line).map(String::as_str).unwrap_or("");
                out.push_str(&format!(" {} │", pad(text, *width).with(color)));
            }
            out.push('\n');
        }
    }
    out.push_str(&border(&widths, "└", "┴", "┘"));
    out
}

// ============================================================================
// Prompts
// ============================================================================

/// Line-oriented prompts over any reader/writer pair; stdin/stdout in the
/// binaries.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `prompt` and read one trimmed line. `None` on end of input.
    fn read_answer(&mut self, prompt: &str) -> Option<String> {
        write!(self.output, "{}", prompt).ok()?;
        self.output.flush().ok()?;
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    /// Ask for a Spotify playlist link until one is given.
    pub fn ask_playlist_link(&mut self) -> Option<String> {
        let mut prompt = format!("> {} playlist link: ", "Spotify".green());
        loop {
            let link = self.read_answer(&prompt)?;
            if link.contains(PLAYLIST_LINK_PREFIX) {
                return Some(link);
            }
            prompt = format!("{} Retry: ", "Bad link!".red());
        }
    }

    pub fn ask_playlist_name(&mut self) -> Option<String> {
        self.read_answer("> Choose a name for the playlist: ")
    }

    /// Ask for `auto`, `list` or `test` until one is given.
    pub fn ask_mode(&mut self) -> Option<SelectionMode> {
        let prompt = format!("> Choose mode: {} ", "[auto|list|test]".bold());
        loop {
            if let Ok(mode) = self.read_answer(&prompt)?.parse() {
                return Some(mode);
            }
        }
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn ask(&mut self, ranked: &[SongCandidate], retry: bool) -> Option<String> {
        if retry {
            let prompt = format!("{}  > Retry: [0:skip] ", "Wrong!".red());
            return self.read_answer(&prompt);
        }
        write!(self.output, "{}", render_table(ranked)).ok()?;
        self.read_answer("> Choose a song: [0:skip] ")
    }
}
