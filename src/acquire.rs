//! Archive download and the append-only session log.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rustc_hash::FxHashSet;
use tempfile::NamedTempFile;

use crate::error::AcquireError;
use crate::models::{Outcome, SongCandidate};
use crate::normalize::archive_stem;
use crate::transport::Transport;

pub const ARCHIVE_EXTENSION: &str = "zip";

const DOWNLOAD_HEADERS: [(&str, &str); 1] =
    [("Accept", "application/zip, application/octet-stream, */*")];

// ============================================================================
// Paths
// ============================================================================

/// Where a candidate's archive goes. An empty playlist name means the bare
/// title directly under `root`, without extension.
pub fn archive_path(root: &Path, playlist: &str, title: &str) -> PathBuf {
    let stem = archive_stem(title);
    if playlist.is_empty() {
        root.join(stem)
    } else {
        root.join(playlist).join(format!("{}.{}", stem, ARCHIVE_EXTENSION))
    }
}

/// `<root>/<playlist>.log`
pub fn log_path(root: &Path, playlist: &str) -> PathBuf {
    root.join(format!("{}.log", playlist))
}

// ============================================================================
// Session log
// ============================================================================

/// Append-only list of accepted titles, one per line. Each append opens,
/// writes and closes the file under a lock.
///
/// A title already in the log is not written again, so re-running a list
/// against the same destination leaves one line per accepted song.
pub struct AcceptLog {
    path: PathBuf,
    logged: Mutex<FxHashSet<String>>,
}

impl AcceptLog {
    /// Open the log at `path`, remembering titles from earlier sessions.
    /// The file itself is only created on the first append.
    pub fn open(path: PathBuf) -> io::Result<Self> {
        let logged = read_entries(&path)?.into_iter().collect();
        Ok(Self {
            path,
            logged: Mutex::new(logged),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `title`. Returns whether a line was written.
    pub fn append(&self, title: &str) -> Result<bool, AcquireError> {
        let mut logged = self.logged.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if logged.contains(title) {
            return Ok(false);
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", title))
            .map_err(|source| AcquireError::Log {
                path: self.path.clone(),
                source,
            })?;
        logged.insert(title.to_string());
        Ok(true)
    }

    /// Lines currently in the log file.
    pub fn entries(&self) -> io::Result<Vec<String>> {
        read_entries(&self.path)
    }
}

fn read_entries(path: &Path) -> io::Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content.lines().map(str::to_string).collect()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(err),
    }
}

// ============================================================================
// Acquisition
// ============================================================================

pub struct AcquisitionManager<'a> {
    transport: &'a dyn Transport,
    log: &'a AcceptLog,
    dry_run: bool,
}

impl<'a> AcquisitionManager<'a> {
    pub fn new(transport: &'a dyn Transport, log: &'a AcceptLog, dry_run: bool) -> Self {
        Self {
            transport,
            log,
            dry_run,
        }
    }

    /// Fetch `candidate`'s archive into `destination` unless it is already
    /// there. Every outcome except [`Outcome::NoLink`] appends the title to
    /// the session log.
    pub fn acquire(
        &self,
        candidate: &SongCandidate,
        destination: &Path,
    ) -> Result<Outcome, AcquireError> {
        let Some(link) = candidate.download_link.as_deref() else {
            return Ok(Outcome::NoLink);
        };

        let outcome = if self.dry_run {
            Outcome::MatchedOnly
        } else if destination.exists() {
            Outcome::AlreadyPresent
        } else {
            let bytes = self.transport.fetch_bytes(link, &DOWNLOAD_HEADERS)?;
            write_new(destination, &bytes)?
        };

        if outcome.is_accepted() {
            self.log.append(&candidate.title)?;
        }
        Ok(outcome)
    }
}

/// Write through a temporary sibling file and rename without clobbering, so
/// a destination created concurrently is never overwritten.
fn write_new(destination: &Path, bytes: &[u8]) -> Result<Outcome, AcquireError> {
    let write_error = |source: io::Error| AcquireError::Write {
        path: destination.to_path_buf(),
        source,
    };
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(bytes).map_err(write_error)?;
    match temp.persist_noclobber(destination) {
        Ok(_) => Ok(Outcome::Downloaded),
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(Outcome::AlreadyPresent),
        Err(err) => Err(write_error(err.error)),
    }
}
