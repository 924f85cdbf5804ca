//! Response bodies, JSONP wrapping and error mapping

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::error::SponosError;
use crate::model::{
    AlbumSummary, ArtistSummary, Availability, Link, PlaylistSummary, QueueSnapshot, SearchResults,
    Track,
};

/// Track as the web remote sees it
#[derive(Debug, Serialize)]
pub struct TrackView {
    pub name: String,
    pub duration: String,
    pub album: String,
    /// Zero-based position on the disc
    pub index: u32,
    pub disc: u32,
    pub artists: String,
    pub availability: Availability,
}

impl From<&Track> for TrackView {
    fn from(track: &Track) -> Self {
        Self {
            name: track.name.clone(),
            duration: format_duration(track.duration_ms),
            album: track.album.name.clone(),
            index: track.index.saturating_sub(1),
            disc: track.disc,
            artists: track.artist_line(),
            availability: track.availability,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub play_idx: usize,
    pub queue: Vec<TrackView>,
    pub volume: u8,
    pub play_status: bool,
    /// Link the queue was built from
    pub link: Option<Link>,
    pub has_next: bool,
    pub has_prev: bool,
}

impl NowPlaying {
    pub fn new(snapshot: &QueueSnapshot, volume: u8, has_next: bool, has_prev: bool) -> Self {
        Self {
            play_idx: snapshot.play_idx,
            queue: snapshot.tracks.iter().map(|t| TrackView::from(t.as_ref())).collect(),
            volume,
            play_status: snapshot.play_status,
            link: snapshot.link.clone(),
            has_next,
            has_prev,
        }
    }
}

/// Search hit for a track; carries its link so the remote can queue it
#[derive(Debug, Serialize)]
pub struct SearchTrackView {
    #[serde(flatten)]
    pub track: TrackView,
    pub link: Link,
}

#[derive(Debug, Serialize)]
pub struct AlbumView {
    pub name: String,
    pub artist: String,
    pub year: String,
    pub link: Link,
}

impl From<&AlbumSummary> for AlbumView {
    fn from(album: &AlbumSummary) -> Self {
        Self {
            name: album.name.clone(),
            artist: album.artists.join(", "),
            year: album.year.clone(),
            link: album.link.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArtistView {
    pub name: String,
    pub link: Link,
}

impl From<&ArtistSummary> for ArtistView {
    fn from(artist: &ArtistSummary) -> Self {
        Self {
            name: artist.name.clone(),
            link: artist.link.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlaylistView {
    pub name: String,
    pub link: Link,
    pub owner: String,
}

impl From<&PlaylistSummary> for PlaylistView {
    fn from(playlist: &PlaylistSummary) -> Self {
        Self {
            name: playlist.name.clone(),
            link: playlist.link.clone(),
            owner: playlist.owner.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchView {
    pub artists: Vec<ArtistView>,
    pub tracks: Vec<SearchTrackView>,
    pub albums: Vec<AlbumView>,
    pub playlists: Vec<PlaylistView>,
}

impl From<&SearchResults> for SearchView {
    fn from(results: &SearchResults) -> Self {
        Self {
            artists: results.artists.iter().map(ArtistView::from).collect(),
            tracks: results
                .tracks
                .iter()
                .map(|track| SearchTrackView {
                    track: TrackView::from(track),
                    link: track.link.clone(),
                })
                .collect(),
            albums: results.albums.iter().map(AlbumView::from).collect(),
            playlists: results.playlists.iter().map(PlaylistView::from).collect(),
        }
    }
}

/// `mm:ss`; hours roll over into minutes modulo 60
pub fn format_duration(duration_ms: u32) -> String {
    let seconds = (duration_ms / 1000) % 60;
    let minutes = (duration_ms / 60_000) % 60;
    format!("{minutes:02}:{seconds:02}")
}

/// JSON body, wrapped as `callback(json)` when the client asked for JSONP
pub fn reply(value: impl Serialize, callback: Option<&str>) -> Result<Response, ApiError> {
    let Some(callback) = callback else {
        return Ok(Json(value).into_response());
    };
    if !is_valid_callback(callback) {
        return Err(ApiError::BadRequest(format!("invalid callback `{callback}`")));
    }
    let body = serde_json::to_string(&value).map_err(|e| ApiError::Core(anyhow::Error::from(e).into()))?;
    Ok((
        [(header::CONTENT_TYPE, "application/javascript")],
        format!("{callback}({body})"),
    )
        .into_response())
}

fn is_valid_callback(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
}

#[derive(Debug)]
pub enum ApiError {
    /// Missing or stale session cookie
    Unauthed,
    BadRequest(String),
    Core(SponosError),
}

impl From<SponosError> for ApiError {
    fn from(err: SponosError) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Unauthed => return (StatusCode::FORBIDDEN, "unauthed!").into_response(),
            ApiError::BadRequest(message) => {
                return (StatusCode::BAD_REQUEST, message).into_response();
            }
            ApiError::Core(err) => err,
        };

        let status = match &err {
            SponosError::AuthenticationFailure(_) => StatusCode::OK,
            SponosError::LinkResolution { .. } | SponosError::IndexOutOfRange { .. } => {
                StatusCode::BAD_REQUEST
            }
            SponosError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            SponosError::EmptyQueue | SponosError::NoPlayableTrack => StatusCode::CONFLICT,
            SponosError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        } else {
            tracing::debug!(error = %err, %status, "Request rejected");
        }
        (status, Json(json!({ "message": err.to_string() }))).into_response()
    }
}
