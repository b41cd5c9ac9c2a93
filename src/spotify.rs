//! Spotify playlist source (client-credentials flow).
//!
//! Only used when a run is driven by a playlist link. Returns raw
//! (title, artist) pairs; normalization happens in [`crate::input`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;

use crate::config::SpotifyCredentials;
use crate::error::InputError;
use crate::transport::classify;

pub const PLAYLIST_LINK_PREFIX: &str = "https://open.spotify.com/playlist/";

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";

/// Anything that can list a playlist's tracks as (title, first artist).
pub trait PlaylistSource {
    fn fetch_tracks(&self, playlist_link: &str) -> Result<Vec<(String, String)>, InputError>;
}

/// Playlist id from a share link, e.g.
/// "https://open.spotify.com/playlist/37i9dQZF1DX?si=abc" → "37i9dQZF1DX".
pub fn playlist_id(link: &str) -> Result<String, InputError> {
    let bad_link = || InputError::BadPlaylistLink(link.to_string());
    let start = link.find(PLAYLIST_LINK_PREFIX).ok_or_else(bad_link)? + PLAYLIST_LINK_PREFIX.len();
    let id: String = link[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if id.is_empty() {
        Err(bad_link())
    } else {
        Ok(id)
    }
}

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TracksPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

impl TracksPage {
    /// Removed/local entries come back with a null track and are dropped.
    fn into_tracks(self) -> (Vec<(String, String)>, Option<String>) {
        let tracks = self
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .map(|track| {
                let artist = track
                    .artists
                    .into_iter()
                    .next()
                    .map(|a| a.name)
                    .unwrap_or_default();
                (track.name, artist)
            })
            .collect();
        (tracks, self.next)
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct SpotifyClient {
    agent: ureq::Agent,
    client_id: String,
    client_secret: String,
}

impl SpotifyClient {
    pub fn new(credentials: &SpotifyCredentials, timeout: Duration) -> Result<Self, InputError> {
        match (&credentials.client_id, &credentials.client_secret) {
            (Some(id), Some(secret)) => Ok(Self {
                agent: ureq::AgentBuilder::new().timeout(timeout).build(),
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => Err(InputError::MissingCredentials),
        }
    }

    fn access_token(&self) -> Result<String, InputError> {
        let basic = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        let response = self
            .agent
            .post(TOKEN_URL)
            .set("Authorization", &format!("Basic {}", basic))
            .send_form(&[("grant_type", "client_credentials")])
            .map_err(|err| request_error(TOKEN_URL, err))?;
        let token: TokenResponse = response
            .into_json()
            .map_err(|err| InputError::PlaylistPayload(err.to_string()))?;
        Ok(token.access_token)
    }

    fn tracks_page(&self, url: &str, token: &str) -> Result<TracksPage, InputError> {
        log::debug!("GET {}", url);
        self.agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", token))
            .call()
            .map_err(|err| request_error(url, err))?
            .into_json()
            .map_err(|err| InputError::PlaylistPayload(err.to_string()))
    }
}

impl PlaylistSource for SpotifyClient {
    fn fetch_tracks(&self, playlist_link: &str) -> Result<Vec<(String, String)>, InputError> {
        let id = playlist_id(playlist_link)?;
        let token = self.access_token()?;

        let mut tracks = Vec::new();
        let mut next = Some(format!(
            "{}/playlists/{}/tracks?limit=100&fields=next,items(track(name,artists(name)))",
            API_URL, id
        ));
        while let Some(url) = next {
            let (page, following) = self.tracks_page(&url, &token)?.into_tracks();
            tracks.extend(page);
            next = following;
        }
        log::info!("playlist {} has {} tracks", id, tracks.len());
        Ok(tracks)
    }
}

fn request_error(url: &str, err: ureq::Error) -> InputError {
    InputError::Playlist(classify(url, err))
}
