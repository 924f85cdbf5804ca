//! Streaming session boundary
//!
//! The playback core only talks to the streaming service through
//! [`SessionClient`]. Completions and notifications come back as
//! [`SessionEvent`]s on a channel handed to the client at construction.
//!
//! - `librespot_client`: the production client (librespot player + Web API catalog)
//! - `web_api`: rspotify catalog lookups used by the librespot client
//! - `playlist_diff`: turns playlist snapshots into add/remove events

mod librespot_client;
mod playlist_diff;
mod web_api;

#[cfg(test)]
pub(crate) mod fake;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::model::{ConnectionState, Link, PlaylistSummary, SearchResults, Track};

pub use librespot_client::{LibrespotSession, SessionSettings};

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Notifications delivered by the session, in the order it observed them
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Login finished; `error` is set when it failed
    LoggedIn { error: Option<String> },
    LoggedOut,
    EndOfTrack,
    ConnectionStateChanged(ConnectionState),
    PlaylistTracksAdded {
        playlist: Link,
        tracks: Vec<Link>,
        position: usize,
    },
    PlaylistTracksRemoved {
        playlist: Link,
        indexes: Vec<usize>,
    },
}

/// Keeps a playlist subscription alive; dropping it unsubscribes
#[derive(Debug)]
pub struct PlaylistWatch {
    playlist: Link,
    _cancel: oneshot::Sender<()>,
}

impl PlaylistWatch {
    /// The returned receiver resolves once the watch is dropped
    pub fn new(playlist: Link) -> (Self, oneshot::Receiver<()>) {
        let (cancel, cancelled) = oneshot::channel();
        (Self { playlist, _cancel: cancel }, cancelled)
    }

    pub fn playlist(&self) -> &Link {
        &self.playlist
    }
}

/// Capabilities the playback core needs from the streaming service
#[async_trait]
pub trait SessionClient: Send + Sync {
    fn connection_state(&self) -> ConnectionState;

    /// Start logging in. Completion arrives as `SessionEvent::LoggedIn`.
    async fn login(&self, username: &str, password: &str) -> Result<()>;

    /// Start logging out. Completion arrives as `SessionEvent::LoggedOut`.
    async fn logout(&self) -> Result<()>;

    async fn display_name(&self) -> Result<String>;

    async fn load_track(&self, link: &Link) -> Result<Track>;

    /// Album tracks in catalog order
    async fn load_album(&self, link: &Link) -> Result<Vec<Track>>;

    /// Current playlist contents, fetched fresh
    async fn load_playlist(&self, link: &Link) -> Result<Vec<Track>>;

    /// Emit add/remove events for `link` until the watch is dropped
    async fn watch_playlist(&self, link: &Link) -> Result<PlaylistWatch>;

    /// Catalog search over artists, tracks, albums and playlists
    async fn search(&self, query: &str) -> Result<SearchResults>;

    /// Playlists in the logged-in account's library
    async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>>;

    async fn player_load(&self, track: &Track) -> Result<()>;

    async fn player_unload(&self);

    async fn player_play(&self);

    async fn player_pause(&self);

    /// Output volume in percent
    async fn volume(&self) -> u8;

    async fn set_volume(&self, percent: u8);
}
