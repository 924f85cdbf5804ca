//! librespot-backed session client
//!
//! A fresh librespot `Session` and `Player` are built on every login. Audio
//! goes to the default librespot sink through a soft mixer; catalog lookups
//! go through the Web API with a token from the session's token provider.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use librespot::core::authentication::Credentials;
use librespot::core::cache::Cache;
use librespot::core::config::SessionConfig;
use librespot::core::session::Session;
use librespot::core::spotify_uri::SpotifyUri;
use librespot::playback::config::{AudioFormat, Bitrate, PlayerConfig};
use librespot::playback::mixer::{self, Mixer, MixerConfig};
use librespot::playback::player::{Player, PlayerEvent};
use librespot::playback::audio_backend;
use tokio::sync::{Mutex, oneshot};

use crate::model::{ConnectionState, Link, PlaylistSummary, SearchResults, Track};

use super::playlist_diff::{self, PlaylistChange};
use super::web_api::{self, WebApi};
use super::{EventSender, PlaylistWatch, SessionClient, SessionEvent};

pub const DEFAULT_VOLUME_PERCENT: u8 = 70;

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub device_name: String,
    pub bitrate_kbps: u16,
    pub cache_dir: PathBuf,
    pub playlist_poll: Duration,
}

impl SessionSettings {
    fn bitrate(&self) -> Result<Bitrate> {
        match self.bitrate_kbps {
            96 => Ok(Bitrate::Bitrate96),
            160 => Ok(Bitrate::Bitrate160),
            320 => Ok(Bitrate::Bitrate320),
            other => bail!("unsupported bitrate {} kbps (use 96, 160 or 320)", other),
        }
    }

    fn device_id(&self) -> String {
        // Stable per machine so the account sees the same device every run
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        format!("{}-{}", self.device_name, hostname)
    }
}

struct Connection {
    session: Session,
    player: Arc<Player>,
    mixer: Arc<dyn Mixer>,
    web: WebApi,
}

/// Something holding live service resources that must be released explicitly
trait Shutdown {
    fn shutdown(self);
}

impl Shutdown for Connection {
    fn shutdown(self) {
        self.player.stop();
        self.session.shutdown();
    }
}

/// Store `next` in `slot`, shutting down whatever it held.
/// Overlapping logins both finish here.
fn install<C: Shutdown>(slot: &mut Option<C>, next: C) {
    if let Some(previous) = slot.replace(next) {
        tracing::info!("Replacing a session that finished logging in earlier");
        previous.shutdown();
    }
}

struct Inner {
    settings: SessionSettings,
    events: EventSender,
    state: RwLock<ConnectionState>,
    volume: AtomicU8,
    connection: Mutex<Option<Connection>>,
}

#[derive(Clone)]
pub struct LibrespotSession {
    inner: Arc<Inner>,
}

impl LibrespotSession {
    pub fn new(settings: SessionSettings, events: EventSender) -> Result<Self> {
        settings.bitrate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                events,
                state: RwLock::new(ConnectionState::Disconnected),
                volume: AtomicU8::new(DEFAULT_VOLUME_PERCENT),
                connection: Mutex::new(None),
            }),
        })
    }
}

fn percent_to_mixer(percent: u8) -> u16 {
    (u32::from(percent.min(100)) * u32::from(u16::MAX) / 100) as u16
}

impl Inner {
    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!("Session event listener is gone");
        }
    }

    fn state(&self) -> ConnectionState {
        self.state
            .read()
            .map(|s| *s)
            .unwrap_or(ConnectionState::Disconnected)
    }

    fn set_state(&self, state: ConnectionState) {
        if let Ok(mut current) = self.state.write() {
            if *current == state {
                return;
            }
            *current = state;
        }
        tracing::info!(state = ?state, "Connection state changed");
        self.emit(SessionEvent::ConnectionStateChanged(state));
    }

    async fn connect(self: &Arc<Self>, credentials: Credentials) -> Result<Connection> {
        let cache_dir = self.settings.cache_dir.clone();
        let cache = Cache::new(
            Some(cache_dir.clone()),
            Some(cache_dir.clone()),
            Some(cache_dir.join("files")),
            None,
        )?;

        let session_config = SessionConfig {
            device_id: self.settings.device_id(),
            ..Default::default()
        };
        let session = Session::new(session_config, Some(cache));
        session
            .connect(credentials, true)
            .await
            .context("librespot login failed")?;
        tracing::info!(username = %session.username(), "librespot session connected");

        let mixer_builder = mixer::find(None).ok_or_else(|| anyhow!("no mixer available"))?;
        let mixer = mixer_builder(MixerConfig::default())?;
        mixer.set_volume(percent_to_mixer(self.volume.load(Ordering::Relaxed)));

        let sink_builder =
            audio_backend::find(None).ok_or_else(|| anyhow!("no audio backend available"))?;
        let player_config = PlayerConfig {
            bitrate: self.settings.bitrate()?,
            ..Default::default()
        };
        let audio_format = AudioFormat::default();
        let player = Player::new(
            player_config,
            session.clone(),
            mixer.get_soft_volume(),
            move || sink_builder(None, audio_format),
        );
        self.forward_player_events(&player);

        let token = session
            .token_provider()
            .get_token(web_api::SCOPES)
            .await
            .context("cannot obtain Web API token")?;
        let web = WebApi::new(token.access_token, token.expires_in).await?;

        Ok(Connection {
            session,
            player,
            mixer,
            web,
        })
    }

    fn forward_player_events(self: &Arc<Self>, player: &Arc<Player>) {
        let mut channel = player.get_player_event_channel();
        let inner = self.clone();
        tokio::spawn(async move {
            while let Some(event) = channel.recv().await {
                match event {
                    PlayerEvent::EndOfTrack { .. } => {
                        tracing::debug!("PlayerEvent::EndOfTrack");
                        inner.emit(SessionEvent::EndOfTrack);
                    }
                    PlayerEvent::Unavailable { .. } => {
                        tracing::warn!("PlayerEvent::Unavailable");
                    }
                    _ => {
                        tracing::trace!("PlayerEvent: other event received");
                    }
                }
            }
            tracing::debug!("Player event channel closed");
        });
    }

    async fn player(&self) -> Result<Arc<Player>> {
        self.connection
            .lock()
            .await
            .as_ref()
            .map(|c| c.player.clone())
            .ok_or_else(|| anyhow!("not logged in"))
    }

    /// Web API client with a token that is good for at least a minute
    async fn web(&self) -> Result<WebApi> {
        let mut connection = self.connection.lock().await;
        let connection = connection.as_mut().ok_or_else(|| anyhow!("not logged in"))?;
        if connection.web.needs_refresh() {
            tracing::info!("Web API token expiring soon, refreshing...");
            let token = connection
                .session
                .token_provider()
                .get_token(web_api::SCOPES)
                .await?;
            connection.web = WebApi::new(token.access_token, token.expires_in).await?;
        }
        Ok(connection.web.clone())
    }

    async fn poll_playlist(
        self: Arc<Self>,
        playlist: Link,
        mut snapshot: String,
        mut links: Vec<Link>,
        mut cancelled: oneshot::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(self.settings.playlist_poll);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = &mut cancelled => break,
                _ = ticker.tick() => {}
            }
            if self.state() == ConnectionState::Disconnected {
                break;
            }

            let web = match self.web().await {
                Ok(web) => web,
                Err(e) => {
                    tracing::debug!(error = %e, "Playlist watch has no catalog access");
                    continue;
                }
            };
            let latest = match web.playlist_snapshot(&playlist).await {
                Ok(latest) if latest == snapshot => continue,
                Ok(latest) => latest,
                Err(e) => {
                    tracing::warn!(playlist = %playlist, error = %e, "Playlist snapshot check failed");
                    continue;
                }
            };
            let tracks = match web.playlist_tracks(&playlist).await {
                Ok(tracks) => tracks,
                Err(e) => {
                    tracing::warn!(playlist = %playlist, error = %e, "Playlist reload failed");
                    continue;
                }
            };

            let current: Vec<Link> = tracks.into_iter().map(|t| t.link).collect();
            for change in playlist_diff::diff(&links, &current) {
                let event = match change {
                    PlaylistChange::Removed { indexes } => SessionEvent::PlaylistTracksRemoved {
                        playlist: playlist.clone(),
                        indexes,
                    },
                    PlaylistChange::Added { position, items } => SessionEvent::PlaylistTracksAdded {
                        playlist: playlist.clone(),
                        tracks: items,
                        position,
                    },
                };
                tracing::info!(playlist = %playlist, ?event, "Playlist changed");
                self.emit(event);
            }
            links = current;
            snapshot = latest;
        }
        tracing::debug!(playlist = %playlist, "Playlist watch ended");
    }
}

#[async_trait]
impl SessionClient for LibrespotSession {
    fn connection_state(&self) -> ConnectionState {
        self.inner.state()
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        if let Some(previous) = self.inner.connection.lock().await.take() {
            tracing::info!("Dropping previous session before logging in again");
            previous.shutdown();
        }

        let credentials = Credentials::with_password(username, password);
        self.inner.set_state(ConnectionState::LoggingIn);

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let error = match inner.connect(credentials).await {
                Ok(connection) => {
                    install(&mut *inner.connection.lock().await, connection);
                    inner.set_state(ConnectionState::LoggedIn);
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "Login failed");
                    inner.set_state(ConnectionState::Disconnected);
                    Some(format!("{e:#}"))
                }
            };
            inner.emit(SessionEvent::LoggedIn { error });
        });
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            if let Some(connection) = inner.connection.lock().await.take() {
                connection.shutdown();
            }
            inner.set_state(ConnectionState::Disconnected);
            inner.emit(SessionEvent::LoggedOut);
        });
        Ok(())
    }

    async fn display_name(&self) -> Result<String> {
        let username = {
            let connection = self.inner.connection.lock().await;
            connection
                .as_ref()
                .map(|c| c.session.username())
                .ok_or_else(|| anyhow!("not logged in"))?
        };
        match self.inner.web().await?.display_name().await {
            Ok(Some(name)) => Ok(name),
            Ok(None) => Ok(username),
            Err(e) => {
                tracing::debug!(error = %e, "Display name lookup failed, using username");
                Ok(username)
            }
        }
    }

    async fn load_track(&self, link: &Link) -> Result<Track> {
        self.inner.web().await?.track(link).await
    }

    async fn load_album(&self, link: &Link) -> Result<Vec<Track>> {
        self.inner.web().await?.album_tracks(link).await
    }

    async fn load_playlist(&self, link: &Link) -> Result<Vec<Track>> {
        self.inner.web().await?.playlist_tracks(link).await
    }

    async fn search(&self, query: &str) -> Result<SearchResults> {
        self.inner.web().await?.search(query).await
    }

    async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        self.inner.web().await?.user_playlists().await
    }

    async fn watch_playlist(&self, link: &Link) -> Result<PlaylistWatch> {
        let web = self.inner.web().await?;
        let snapshot = web.playlist_snapshot(link).await?;
        let links = web
            .playlist_tracks(link)
            .await?
            .into_iter()
            .map(|t| t.link)
            .collect();

        let (watch, cancelled) = PlaylistWatch::new(link.clone());
        tokio::spawn(
            self.inner
                .clone()
                .poll_playlist(link.clone(), snapshot, links, cancelled),
        );
        tracing::debug!(playlist = %link, "Watching playlist");
        Ok(watch)
    }

    async fn player_load(&self, track: &Track) -> Result<()> {
        let player = self.inner.player().await?;
        let uri = SpotifyUri::from_uri(&track.link.uri())?;
        player.load(uri, false, 0);
        Ok(())
    }

    async fn player_unload(&self) {
        if let Ok(player) = self.inner.player().await {
            player.stop();
        }
    }

    async fn player_play(&self) {
        if let Ok(player) = self.inner.player().await {
            player.play();
        }
    }

    async fn player_pause(&self) {
        if let Ok(player) = self.inner.player().await {
            player.pause();
        }
    }

    async fn volume(&self) -> u8 {
        self.inner.volume.load(Ordering::Relaxed)
    }

    async fn set_volume(&self, percent: u8) {
        let percent = percent.min(100);
        self.inner.volume.store(percent, Ordering::Relaxed);
        if let Some(connection) = self.inner.connection.lock().await.as_ref() {
            connection.mixer.set_volume(percent_to_mixer(percent));
        }
    }
}
