//! Error taxonomy for the resolution pipeline.
//!
//! Only [`InputError`] aborts a run. Everything else is absorbed at the
//! song boundary and surfaced as a status message.

use std::path::PathBuf;
use thiserror::Error;

/// Network-side failure while talking to the catalog or a download host.
/// Aborts the current wanted song only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Status failures in the 4xx range and bodies rejected as invalid (for
    /// example oversized archives) are not worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Body { source, .. } => source.kind() != std::io::ErrorKind::InvalidData,
            _ => true,
        }
    }
}

/// A search result row that looked like a song but could not be read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row has no title")]
    MissingTitle,

    #[error("row has no publish date")]
    MissingDate,

    #[error("unparsable publish date '{0}'")]
    BadDate(String),

    #[error("unparsable vote stats {0:?}")]
    BadStats(Vec<String>),
}

/// Failure while writing an archive or appending to the session log.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append to log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Problems with the run's inputs. These end the process before any song
/// is processed.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("song list {path} could not be read: {source}")]
    SongList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path {0} doesn't exist")]
    MissingRoot(PathBuf),

    #[error("could not create destination {path}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' is not a Spotify playlist link")]
    BadPlaylistLink(String),

    #[error(
        "Spotify credentials missing (set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET \
         or the [spotify] config table)"
    )]
    MissingCredentials,

    #[error("playlist could not be fetched: {0}")]
    Playlist(#[from] FetchError),

    #[error("unexpected playlist payload: {0}")]
    PlaylistPayload(String),

    #[error("config file {path} is invalid: {message}")]
    Config { path: PathBuf, message: String },
}
