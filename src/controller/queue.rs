//! Play queue control
//!
//! Every operation takes the queue lock once and holds it until the player
//! has been driven, so web requests, end-of-track and playlist callbacks
//! never interleave on the queue, index or play flag.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::display::DisplayHandle;
use crate::error::{Result, SponosError};
use crate::model::{Link, LinkKind, QueueSnapshot, QueueState, Track};
use crate::session::{PlaylistWatch, SessionClient};

struct Queue {
    state: QueueState,
    /// Playlists the queue was built from; dropping a watch unsubscribes
    watches: Vec<PlaylistWatch>,
}

impl Queue {
    fn is_watching(&self, playlist: &Link) -> bool {
        self.watches.iter().any(|w| w.playlist() == playlist)
    }
}

pub struct QueueController {
    queue: Mutex<Queue>,
    session: Arc<dyn SessionClient>,
    display: DisplayHandle,
}

impl QueueController {
    pub fn new(session: Arc<dyn SessionClient>, display: DisplayHandle) -> Self {
        Self {
            queue: Mutex::new(Queue {
                state: QueueState::new(),
                watches: Vec::new(),
            }),
            session,
            display,
        }
    }

    /// Replace the queue with the contents of `link` and start playing it.
    /// The rebuild and the first play happen under one lock.
    pub async fn set_queue_and_play(&self, link: &Link) -> Result<usize> {
        let mut queue = self.queue.lock().await;
        self.set_queue_locked(&mut queue, link).await?;
        self.play_queue_locked(&mut queue.state).await
    }

    async fn set_queue_locked(&self, queue: &mut Queue, link: &Link) -> Result<()> {
        queue.state.clear();
        queue.watches.clear();
        self.load_locked(queue, link).await
    }

    /// Append the contents of `link` to the queue
    pub async fn load_into_queue(&self, link: &Link) -> Result<()> {
        let mut queue = self.queue.lock().await;
        self.load_locked(&mut queue, link).await
    }

    async fn load_locked(&self, queue: &mut Queue, link: &Link) -> Result<()> {
        let tracks = match link.kind() {
            LinkKind::Track => vec![self.resolve_track(link).await?],
            LinkKind::Album => self
                .session
                .load_album(link)
                .await
                .map_err(|e| SponosError::link_resolution(link, &e))?,
            LinkKind::Playlist => {
                let tracks = self
                    .session
                    .load_playlist(link)
                    .await
                    .map_err(|e| SponosError::link_resolution(link, &e))?;
                if !queue.is_watching(link) {
                    let watch = self
                        .session
                        .watch_playlist(link)
                        .await
                        .map_err(|e| SponosError::link_resolution(link, &e))?;
                    queue.watches.push(watch);
                }
                tracks
            }
            LinkKind::Artist => {
                return Err(SponosError::LinkResolution {
                    link: link.to_string(),
                    reason: "an artist cannot be queued".to_string(),
                });
            }
        };

        tracing::info!(link = %link, count = tracks.len(), "Loaded into queue");
        for track in tracks {
            queue.state.push(Arc::new(track));
        }
        queue.state.set_link(link.clone());
        Ok(())
    }

    async fn resolve_track(&self, link: &Link) -> Result<Track> {
        if link.kind() != LinkKind::Track {
            return Err(SponosError::LinkResolution {
                link: link.to_string(),
                reason: "not a track".to_string(),
            });
        }
        self.session
            .load_track(link)
            .await
            .map_err(|e| SponosError::link_resolution(link, &e))
    }

    /// Resolve a single track and append it; duplicates are allowed
    pub async fn add_to_queue(&self, link: &Link) -> Result<()> {
        let track = self.resolve_track(link).await?;
        let mut queue = self.queue.lock().await;
        tracing::debug!(track = %track.link, "Track added to queue");
        queue.state.push(Arc::new(track));
        Ok(())
    }

    /// Jump to `index` and play from there
    pub async fn play_index(&self, index: usize) -> Result<usize> {
        let mut queue = self.queue.lock().await;
        queue.state.set_play_idx(index)?;
        self.play_queue_locked(&mut queue.state).await
    }

    /// Play the track at the current index, or the first playable one after it
    async fn play_queue_locked(&self, state: &mut QueueState) -> Result<usize> {
        if state.is_empty() {
            return Err(SponosError::EmptyQueue);
        }
        let Some(index) = state.next_playable(state.play_idx()) else {
            tracing::warn!(from = state.play_idx(), "No playable track left, stopping");
            self.stop_locked(state).await;
            return Err(SponosError::NoPlayableTrack);
        };
        if index != state.play_idx() {
            tracing::info!(from = state.play_idx(), to = index, "Skipped unavailable tracks");
        }
        self.play_at_locked(state, index).await?;
        Ok(index)
    }

    async fn play_at_locked(&self, state: &mut QueueState, index: usize) -> Result<()> {
        state.set_play_idx(index)?;
        let Some(track) = state.current().cloned() else {
            return Err(SponosError::EmptyQueue);
        };

        self.session.player_unload().await;
        state.set_loaded(false);
        self.session.player_load(&track).await?;
        state.set_loaded(true);
        self.display.enqueue(track.display_line());
        self.session.player_play().await;
        state.set_play_status(true);

        tracing::info!(index, track = %track.name, artists = %track.artist_line(), "Playing");
        Ok(())
    }

    async fn stop_locked(&self, state: &mut QueueState) {
        self.session.player_unload().await;
        state.set_loaded(false);
        state.set_play_status(false);
    }

    /// Advance to the next playable track. At the last track this does nothing.
    pub async fn next(&self) -> Result<usize> {
        let mut queue = self.queue.lock().await;
        self.next_locked(&mut queue.state).await
    }

    async fn next_locked(&self, state: &mut QueueState) -> Result<usize> {
        if !state.is_next() {
            return Ok(state.play_idx());
        }
        let index = state
            .next_playable(state.play_idx() + 1)
            .ok_or(SponosError::NoPlayableTrack)?;
        self.play_at_locked(state, index).await?;
        Ok(index)
    }

    /// Go back to the previous playable track. At the first track this does nothing.
    pub async fn prev(&self) -> Result<usize> {
        let mut queue = self.queue.lock().await;
        let state = &mut queue.state;
        if !state.is_prev() {
            return Ok(state.play_idx());
        }
        let index = state
            .prev_playable(state.play_idx() - 1)
            .ok_or(SponosError::NoPlayableTrack)?;
        self.play_at_locked(state, index).await?;
        Ok(index)
    }

    pub async fn is_next(&self) -> bool {
        self.queue.lock().await.state.is_next()
    }

    pub async fn is_prev(&self) -> bool {
        self.queue.lock().await.state.is_prev()
    }

    /// Move on after the player finished a track; stop at the end of the queue
    pub async fn on_end_of_track(&self) {
        let mut queue = self.queue.lock().await;
        let state = &mut queue.state;
        if state.is_next() {
            match self.next_locked(state).await {
                Ok(index) => tracing::debug!(index, "Advanced after end of track"),
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot advance after end of track, stopping");
                    self.stop_locked(state).await;
                }
            }
        } else {
            tracing::info!("End of queue reached");
            self.stop_locked(state).await;
        }
    }

    /// Resume the loaded track. With nothing loaded, play the queue from
    /// the current index.
    pub async fn resume(&self) -> Result<usize> {
        let mut queue = self.queue.lock().await;
        let state = &mut queue.state;
        if !state.is_loaded() && !state.is_empty() {
            return self.play_queue_locked(state).await;
        }
        if state.is_loaded() {
            self.session.player_play().await;
        }
        state.set_play_status(true);
        Ok(state.play_idx())
    }

    pub async fn pause(&self) {
        let mut queue = self.queue.lock().await;
        self.session.player_pause().await;
        queue.state.set_play_status(false);
    }

    pub async fn on_tracks_added(&self, playlist: &Link, tracks: &[Link], insert_index: usize) {
        let mut queue = self.queue.lock().await;
        if !queue.is_watching(playlist) {
            tracing::debug!(playlist = %playlist, "Ignoring additions to an unwatched playlist");
            return;
        }
        let Some(current) = self.reload_playlist(playlist).await else {
            return;
        };
        tracing::info!(playlist = %playlist, added = tracks.len(), insert_index, "Playlist tracks added");
        queue
            .state
            .replace_after_insert(current, insert_index, tracks.len());
    }

    pub async fn on_tracks_removed(&self, playlist: &Link, removed: &[usize]) {
        let mut queue = self.queue.lock().await;
        if !queue.is_watching(playlist) {
            tracing::debug!(playlist = %playlist, "Ignoring removals from an unwatched playlist");
            return;
        }
        let Some(current) = self.reload_playlist(playlist).await else {
            return;
        };
        tracing::info!(playlist = %playlist, removed = removed.len(), "Playlist tracks removed");
        queue.state.replace_after_remove(current, removed);
    }

    async fn reload_playlist(&self, playlist: &Link) -> Option<Vec<Arc<Track>>> {
        match self.session.load_playlist(playlist).await {
            Ok(tracks) => Some(tracks.into_iter().map(Arc::new).collect()),
            Err(e) => {
                tracing::warn!(playlist = %playlist, error = %e, "Playlist reload failed, keeping queue");
                None
            }
        }
    }

    /// Flip between playing and paused, driving the player to match
    pub async fn toggle_play_status(&self) -> bool {
        let mut queue = self.queue.lock().await;
        let state = &mut queue.state;
        if !state.toggle_play_status() {
            self.session.player_pause().await;
        } else if state.is_loaded() {
            self.session.player_play().await;
        } else if !state.is_empty() {
            if let Err(e) = self.play_queue_locked(state).await {
                tracing::warn!(error = %e, "Nothing to play");
            }
        }
        tracing::debug!(playing = state.play_status(), "Play status toggled");
        state.play_status()
    }

    /// Empty the queue, clear the play flag and drop playlist subscriptions
    pub async fn reset_queue(&self) {
        let mut queue = self.queue.lock().await;
        queue.state.reset_queue();
        queue.watches.clear();
    }

    pub async fn reset_play_idx(&self) {
        self.queue.lock().await.state.reset_play_idx();
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        self.queue.lock().await.state.snapshot()
    }
}
