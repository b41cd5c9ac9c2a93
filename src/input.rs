//! Construction of [`WantedSong`]s from the three input sources.

use std::fs;
use std::path::Path;

use crate::error::InputError;
use crate::models::WantedSong;
use crate::normalize::{canonicalize, split_variant_suffix};

/// One song list line or single query. A trailing ` -N` preselects ranked
/// match N and adds the canonical name as fallback query.
pub fn song_from_line(line: &str) -> WantedSong {
    let (ordinal, base) = split_variant_suffix(line);
    let Some(ordinal) = ordinal else {
        return WantedSong::new(base);
    };

    let canonical = canonicalize(&base);
    let song = WantedSong::new(base.clone()).with_preselected(ordinal);
    if canonical.is_empty() || canonical == base {
        song
    } else {
        song.with_fallback(canonical)
    }
}

/// Every non-blank line of a song list file.
pub fn songs_from_file(path: &Path) -> Result<Vec<WantedSong>, InputError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::SongList {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(songs_from_lines(&content))
}

pub fn songs_from_lines(content: &str) -> Vec<WantedSong> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(song_from_line)
        .collect()
}

/// A playlist track: searched as "title artist", with the title alone as
/// fallback.
pub fn song_from_track(title: &str, artist: &str) -> WantedSong {
    let title = match canonicalize(title) {
        canonical if canonical.is_empty() => title.trim().to_string(),
        canonical => canonical,
    };
    let display = format!("{} {}", title, artist.trim());
    WantedSong::new(display.trim()).with_fallback(title)
}
