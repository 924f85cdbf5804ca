//! Session event listener

use tokio::task::JoinHandle;

use crate::session::{EventReceiver, SessionEvent};

use super::SessionCoordinator;

impl SessionCoordinator {
    /// Dispatch session events to the coordinator until the session goes away
    pub fn start_event_listener(&self, mut events: EventReceiver) -> JoinHandle<()> {
        let coordinator = self.clone();
        tracing::info!("Starting session event listener");

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    SessionEvent::LoggedIn { error } => {
                        tracing::debug!(error = ?error, "SessionEvent::LoggedIn");
                        coordinator.on_logged_in(error.as_deref());
                    }
                    SessionEvent::LoggedOut => {
                        tracing::debug!("SessionEvent::LoggedOut");
                        coordinator.on_logged_out().await;
                    }
                    SessionEvent::EndOfTrack => {
                        tracing::debug!("SessionEvent::EndOfTrack");
                        coordinator.on_end_of_track().await;
                    }
                    SessionEvent::ConnectionStateChanged(state) => {
                        tracing::debug!(?state, "SessionEvent::ConnectionStateChanged");
                        if let Err(e) = coordinator.on_connection_state_changed(state).await {
                            tracing::warn!(error = %e, "Failed to handle connection state change");
                        }
                    }
                    SessionEvent::PlaylistTracksAdded {
                        playlist,
                        tracks,
                        position,
                    } => {
                        tracing::debug!(%playlist, count = tracks.len(), position, "SessionEvent::PlaylistTracksAdded");
                        coordinator
                            .queue
                            .on_tracks_added(&playlist, &tracks, position)
                            .await;
                    }
                    SessionEvent::PlaylistTracksRemoved { playlist, indexes } => {
                        tracing::debug!(%playlist, count = indexes.len(), "SessionEvent::PlaylistTracksRemoved");
                        coordinator
                            .queue
                            .on_tracks_removed(&playlist, &indexes)
                            .await;
                    }
                }
            }
            tracing::debug!("Session event listener stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::controller::QueueController;
    use crate::display::spawn_dispatcher;
    use crate::model::fixtures::available;
    use crate::model::{Link, LinkKind};
    use crate::session::SessionEvent;
    use crate::session::fake::FakeSession;

    use super::*;

    #[tokio::test]
    async fn playlist_events_reach_the_queue() {
        let (events, receiver) = tokio::sync::mpsc::unbounded_channel();
        let session = Arc::new(FakeSession::new());
        let playlist = Link::new(LinkKind::Playlist, "mix");
        session.set_playlist(&playlist, vec![available("a"), available("b")]);
        let display = spawn_dispatcher(std::io::sink(), "").unwrap();
        let queue = Arc::new(QueueController::new(session.clone(), display.clone()));
        let coordinator =
            SessionCoordinator::new(session.clone(), queue.clone(), display, Duration::from_secs(1));
        let listener = coordinator.start_event_listener(receiver);

        queue.load_into_queue(&playlist).await.unwrap();
        queue.play_index(1).await.unwrap();
        session.set_playlist(&playlist, vec![available("z"), available("a"), available("b")]);
        events
            .send(SessionEvent::PlaylistTracksAdded {
                playlist: playlist.clone(),
                tracks: vec![Link::new(LinkKind::Track, "z")],
                position: 0,
            })
            .unwrap();
        drop(events);
        listener.await.unwrap();

        let snapshot = queue.snapshot().await;
        assert_eq!(snapshot.tracks.len(), 3);
        assert_eq!(snapshot.play_idx, 2);
    }

    #[tokio::test]
    async fn end_of_track_advances_the_queue() {
        let (events, receiver) = tokio::sync::mpsc::unbounded_channel();
        let session = Arc::new(FakeSession::new());
        let album = Link::new(LinkKind::Album, "album1");
        session.add_album(&album, vec![available("a"), available("b")]);
        let display = spawn_dispatcher(std::io::sink(), "").unwrap();
        let queue = Arc::new(QueueController::new(session.clone(), display.clone()));
        let coordinator =
            SessionCoordinator::new(session.clone(), queue.clone(), display, Duration::from_secs(1));
        let listener = coordinator.start_event_listener(receiver);

        queue.set_queue_and_play(&album).await.unwrap();
        events.send(SessionEvent::EndOfTrack).unwrap();
        drop(events);
        listener.await.unwrap();

        assert_eq!(session.loaded(), vec!["a", "b"]);
        assert_eq!(queue.snapshot().await.play_idx, 1);
    }
}
