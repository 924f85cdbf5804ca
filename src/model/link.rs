//! Catalog links (`spotify:track:...`, open.spotify.com URLs)
//!
//! URLs and legacy URIs are rewritten to plain URIs; the catalog id types
//! decide what a URI points at.

use std::fmt;
use std::str::FromStr;

use librespot::core::spotify_id::SpotifyId;
use rspotify::model::{AlbumId, ArtistId, PlaylistId, TrackId};
use rspotify::prelude::Id;
use serde::{Serialize, Serializer};

use crate::error::SponosError;

const URI_SCHEME: &str = "spotify";
const WEB_PREFIXES: [&str; 2] = ["https://open.spotify.com/", "http://open.spotify.com/"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Track,
    Album,
    Playlist,
    Artist,
}

impl LinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::Track => "track",
            LinkKind::Album => "album",
            LinkKind::Playlist => "playlist",
            LinkKind::Artist => "artist",
        }
    }
}

/// A URI identifying a track, album, playlist or artist in the catalog
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Link {
    kind: LinkKind,
    id: String,
}

impl Link {
    pub fn new(kind: LinkKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical `spotify:<kind>:<id>` form
    pub fn uri(&self) -> String {
        format!("{}:{}:{}", URI_SCHEME, self.kind.as_str(), self.id)
    }

    /// Classify a `spotify:<kind>:<id>` URI by the catalog id types
    fn classify(uri: &str) -> Option<Self> {
        let (kind, id) = if let Ok(id) = TrackId::from_uri(uri) {
            (LinkKind::Track, id.id().to_string())
        } else if let Ok(id) = AlbumId::from_uri(uri) {
            (LinkKind::Album, id.id().to_string())
        } else if let Ok(id) = PlaylistId::from_uri(uri) {
            (LinkKind::Playlist, id.id().to_string())
        } else if let Ok(id) = ArtistId::from_uri(uri) {
            (LinkKind::Artist, id.id().to_string())
        } else {
            return None;
        };
        // Catalog ids are 22 base62 characters
        SpotifyId::from_base62(&id).ok()?;
        Some(Self::new(kind, id))
    }
}

/// Rewrite web URLs and legacy user-playlist URIs to `spotify:<kind>:<id>`
fn normalize(s: &str) -> Option<String> {
    if let Some(rest) = WEB_PREFIXES.iter().find_map(|p| s.strip_prefix(p)) {
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let mut kind = segments.next()?;
        // Localised URLs carry an `intl-xx` segment first
        if kind.starts_with("intl-") {
            kind = segments.next()?;
        }
        let id = segments.next()?;
        if segments.next().is_some() {
            return None;
        }
        return Some(format!("{URI_SCHEME}:{kind}:{id}"));
    }
    if let Some((_, id)) = s
        .strip_prefix("spotify:user:")
        .and_then(|rest| rest.split_once(":playlist:"))
    {
        return Some(format!("{URI_SCHEME}:playlist:{id}"));
    }
    Some(s.to_string())
}

impl FromStr for Link {
    type Err = SponosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        normalize(trimmed)
            .and_then(|uri| Self::classify(&uri))
            .ok_or_else(|| SponosError::LinkResolution {
                link: trimmed.to_string(),
                reason: "not a track, album, playlist or artist link".to_string(),
            })
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", URI_SCHEME, self.kind.as_str(), self.id)
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
