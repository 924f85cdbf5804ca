//! Core type definitions shared by the queue, the session client and the API

use serde::Serialize;

use super::link::Link;

/// Per-track streamability as reported by the catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable,
    Banned,
    NotStreamable,
}

impl Availability {
    pub fn is_available(self) -> bool {
        self == Availability::Available
    }
}

/// Connection state of the streaming session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    LoggingIn,
    LoggedIn,
    Offline,
}

impl ConnectionState {
    /// States in which the session can serve playback
    pub fn is_usable(self) -> bool {
        matches!(self, ConnectionState::LoggedIn | ConnectionState::Offline)
    }
}

/// Album a track belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumRef {
    pub link: Option<Link>,
    pub name: String,
}

/// A fully loaded catalog track.
///
/// Only session clients build these, so a `Track` in hand is always resolved.
/// The queue holds them behind `Arc` and never mutates them.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub link: Link,
    pub name: String,
    pub duration_ms: u32,
    pub artists: Vec<String>,
    pub album: AlbumRef,
    pub disc: u32,
    /// One-based position on the disc
    pub index: u32,
    pub availability: Availability,
}

impl Track {
    pub fn is_available(&self) -> bool {
        self.availability.is_available()
    }

    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    /// Text shown on the display when the track starts
    pub fn display_line(&self) -> String {
        format!("{} - {}", self.name, self.artist_line())
    }
}

/// Read-only view of the queue at one point in time
#[derive(Clone, Debug, Default)]
pub struct QueueSnapshot {
    pub tracks: Vec<std::sync::Arc<Track>>,
    pub play_idx: usize,
    pub play_status: bool,
    pub link: Option<Link>,
}

/// Artist hit in a catalog search
#[derive(Clone, Debug, PartialEq)]
pub struct ArtistSummary {
    pub link: Link,
    pub name: String,
}

/// Album hit in a catalog search
#[derive(Clone, Debug, PartialEq)]
pub struct AlbumSummary {
    pub link: Link,
    pub name: String,
    pub artists: Vec<String>,
    /// Release year, empty when the catalog has no date
    pub year: String,
}

/// Playlist from a search or from the account's own list
#[derive(Clone, Debug, PartialEq)]
pub struct PlaylistSummary {
    pub link: Link,
    pub name: String,
    pub owner: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResults {
    pub artists: Vec<ArtistSummary>,
    pub tracks: Vec<Track>,
    pub albums: Vec<AlbumSummary>,
    pub playlists: Vec<PlaylistSummary>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::model::LinkKind;

    pub fn track(id: &str, availability: Availability) -> Track {
        Track {
            link: Link::new(LinkKind::Track, id),
            name: format!("Song {id}"),
            duration_ms: 180_000,
            artists: vec![format!("Artist {id}")],
            album: AlbumRef {
                link: None,
                name: "Album".to_string(),
            },
            disc: 1,
            index: 1,
            availability,
        }
    }

    pub fn available(id: &str) -> Track {
        track(id, Availability::Available)
    }

    pub fn unavailable(id: &str) -> Track {
        track(id, Availability::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_line_joins_all_artists() {
        let mut track = fixtures::available("a");
        track.name = "Heroes".to_string();
        track.artists = vec!["David Bowie".to_string(), "Brian Eno".to_string()];
        assert_eq!(track.display_line(), "Heroes - David Bowie, Brian Eno");
    }

    #[test]
    fn offline_counts_as_usable() {
        assert!(ConnectionState::Offline.is_usable());
        assert!(ConnectionState::LoggedIn.is_usable());
        assert!(!ConnectionState::LoggingIn.is_usable());
        assert!(!ConnectionState::Disconnected.is_usable());
    }
}
