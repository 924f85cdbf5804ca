//! In-memory session client for tests

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::model::{ConnectionState, Link, PlaylistSummary, SearchResults, Track};

use super::{EventSender, PlaylistWatch, SessionClient, SessionEvent};

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerCall {
    Load(String),
    Unload,
    Play,
    Pause,
}

#[derive(Default)]
struct Catalog {
    tracks: HashMap<Link, Track>,
    albums: HashMap<Link, Vec<Track>>,
    playlists: HashMap<Link, Vec<Track>>,
    searches: HashMap<String, SearchResults>,
    library: Vec<PlaylistSummary>,
}

pub struct FakeSession {
    events: Option<EventSender>,
    credentials: (String, String),
    display_name: String,
    /// Never answer login/logout, to exercise timeouts
    silent: bool,
    state: Mutex<ConnectionState>,
    catalog: Mutex<Catalog>,
    calls: Mutex<Vec<PlayerCall>>,
    watches: Mutex<Vec<(Link, oneshot::Receiver<()>)>>,
    volume: Mutex<u8>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            events: None,
            credentials: ("richard".to_string(), "secret".to_string()),
            display_name: "Richard".to_string(),
            silent: false,
            state: Mutex::new(ConnectionState::Disconnected),
            catalog: Mutex::new(Catalog::default()),
            calls: Mutex::new(Vec::new()),
            watches: Mutex::new(Vec::new()),
            volume: Mutex::new(50),
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn add_track(&self, track: Track) {
        self.catalog
            .lock()
            .unwrap()
            .tracks
            .insert(track.link.clone(), track);
    }

    pub fn add_album(&self, link: &Link, tracks: Vec<Track>) {
        self.catalog.lock().unwrap().albums.insert(link.clone(), tracks);
    }

    /// Also used to change a playlist's contents mid-test
    pub fn set_playlist(&self, link: &Link, tracks: Vec<Track>) {
        self.catalog
            .lock()
            .unwrap()
            .playlists
            .insert(link.clone(), tracks);
    }

    /// Results for `query`; other queries find nothing
    pub fn set_search_results(&self, query: &str, results: SearchResults) {
        self.catalog
            .lock()
            .unwrap()
            .searches
            .insert(query.to_string(), results);
    }

    pub fn set_user_playlists(&self, playlists: Vec<PlaylistSummary>) {
        self.catalog.lock().unwrap().library = playlists;
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Loads issued so far, as track ids
    pub fn loaded(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlayerCall::Load(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Playlists whose watch guard is still alive
    pub fn active_watches(&self) -> Vec<Link> {
        let mut watches = self.watches.lock().unwrap();
        watches.retain_mut(|(_, cancelled)| {
            matches!(cancelled.try_recv(), Err(oneshot::error::TryRecvError::Empty))
        });
        watches.iter().map(|(link, _)| link.clone()).collect()
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    fn record(&self, call: PlayerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SessionClient for FakeSession {
    fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        if self.silent {
            return Ok(());
        }
        let valid = (username, password) == (self.credentials.0.as_str(), self.credentials.1.as_str());
        let (state, error) = if valid {
            (ConnectionState::LoggedIn, None)
        } else {
            (ConnectionState::Disconnected, Some("bad credentials".to_string()))
        };
        self.set_state(state);
        self.emit(SessionEvent::ConnectionStateChanged(state));
        self.emit(SessionEvent::LoggedIn { error });
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        if self.silent {
            return Ok(());
        }
        self.set_state(ConnectionState::Disconnected);
        self.emit(SessionEvent::ConnectionStateChanged(ConnectionState::Disconnected));
        self.emit(SessionEvent::LoggedOut);
        Ok(())
    }

    async fn display_name(&self) -> Result<String> {
        Ok(self.display_name.clone())
    }

    async fn load_track(&self, link: &Link) -> Result<Track> {
        self.catalog
            .lock()
            .unwrap()
            .tracks
            .get(link)
            .cloned()
            .ok_or_else(|| anyhow!("unknown track {}", link))
    }

    async fn load_album(&self, link: &Link) -> Result<Vec<Track>> {
        self.catalog
            .lock()
            .unwrap()
            .albums
            .get(link)
            .cloned()
            .ok_or_else(|| anyhow!("unknown album {}", link))
    }

    async fn load_playlist(&self, link: &Link) -> Result<Vec<Track>> {
        self.catalog
            .lock()
            .unwrap()
            .playlists
            .get(link)
            .cloned()
            .ok_or_else(|| anyhow!("unknown playlist {}", link))
    }

    async fn search(&self, query: &str) -> Result<SearchResults> {
        let catalog = self.catalog.lock().unwrap();
        Ok(catalog.searches.get(query).cloned().unwrap_or_default())
    }

    async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        Ok(self.catalog.lock().unwrap().library.clone())
    }

    async fn watch_playlist(&self, link: &Link) -> Result<PlaylistWatch> {
        let (watch, cancelled) = PlaylistWatch::new(link.clone());
        self.watches.lock().unwrap().push((link.clone(), cancelled));
        Ok(watch)
    }

    async fn player_load(&self, track: &Track) -> Result<()> {
        self.record(PlayerCall::Load(track.link.id().to_string()));
        Ok(())
    }

    async fn player_unload(&self) {
        self.record(PlayerCall::Unload);
    }

    async fn player_play(&self) {
        self.record(PlayerCall::Play);
    }

    async fn player_pause(&self) {
        self.record(PlayerCall::Pause);
    }

    async fn volume(&self) -> u8 {
        *self.volume.lock().unwrap()
    }

    async fn set_volume(&self, percent: u8) {
        *self.volume.lock().unwrap() = percent.min(100);
    }
}
