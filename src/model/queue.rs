//! Queue state and index arithmetic
//!
//! `QueueState` is plain data: it never talks to the session. The
//! controller holds it behind a mutex and drives the player around it.
//! Invariant: a non-empty queue has `play_idx < len`, an empty one has
//! `play_idx == 0`.

use std::sync::Arc;

use crate::error::{Result, SponosError};

use super::link::Link;
use super::types::{QueueSnapshot, Track};

#[derive(Debug, Default)]
pub struct QueueState {
    tracks: Vec<Arc<Track>>,
    play_idx: usize,
    play_status: bool,
    /// The player holds the current track
    loaded: bool,
    link: Option<Link>,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn play_idx(&self) -> usize {
        self.play_idx
    }

    pub fn play_status(&self) -> bool {
        self.play_status
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    pub fn current(&self) -> Option<&Arc<Track>> {
        self.tracks.get(self.play_idx)
    }

    pub fn push(&mut self, track: Arc<Track>) {
        self.tracks.push(track);
    }

    pub fn set_link(&mut self, link: Link) {
        self.link = Some(link);
    }

    /// Empty the queue and rewind; used before a wholesale rebuild
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.play_idx = 0;
        self.loaded = false;
        self.link = None;
    }

    /// Logout reset: nothing queued and nothing playing
    pub fn reset_queue(&mut self) {
        self.clear();
        self.play_status = false;
    }

    pub fn reset_play_idx(&mut self) {
        self.play_idx = 0;
    }

    pub fn set_play_idx(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(SponosError::IndexOutOfRange {
                index,
                len: self.tracks.len(),
            });
        }
        self.play_idx = index;
        Ok(())
    }

    pub fn set_play_status(&mut self, playing: bool) {
        self.play_status = playing;
    }

    pub fn toggle_play_status(&mut self) -> bool {
        self.play_status = !self.play_status;
        self.play_status
    }

    pub fn is_next(&self) -> bool {
        self.play_idx + 1 < self.tracks.len()
    }

    pub fn is_prev(&self) -> bool {
        self.play_idx > 0
    }

    /// First available track at or after `from`
    pub fn next_playable(&self, from: usize) -> Option<usize> {
        self.tracks
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, track)| track.is_available())
            .map(|(i, _)| i)
    }

    /// Last available track at or before `from`
    pub fn prev_playable(&self, from: usize) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        let from = from.min(self.tracks.len() - 1);
        (0..=from).rev().find(|&i| self.tracks[i].is_available())
    }

    /// Replace the tracks after `inserted` tracks went in at `insert_index`.
    ///
    /// Insertions at or before the current position push the index forward
    /// so it keeps pointing at the same track.
    pub fn replace_after_insert(
        &mut self,
        tracks: Vec<Arc<Track>>,
        insert_index: usize,
        inserted: usize,
    ) {
        if !self.tracks.is_empty() && insert_index <= self.play_idx {
            tracing::debug!(
                insert_index,
                inserted,
                play_idx = self.play_idx,
                "Tracks inserted before the current one"
            );
            self.play_idx += inserted;
        }
        self.tracks = tracks;
        self.clamp_index();
    }

    /// Replace the tracks after the entries at `removed` went away.
    ///
    /// Every removed entry before the current one shifts the index back. If
    /// the current entry itself was removed the index keeps its position,
    /// which now holds the track that followed it.
    pub fn replace_after_remove(&mut self, tracks: Vec<Arc<Track>>, removed: &[usize]) {
        let mut removed = removed.to_vec();
        removed.sort_unstable();
        removed.dedup();
        let before = removed.iter().filter(|&&i| i < self.play_idx).count();
        self.play_idx -= before;
        self.tracks = tracks;
        self.clamp_index();
    }

    fn clamp_index(&mut self) {
        if self.tracks.is_empty() {
            self.play_idx = 0;
        } else if self.play_idx >= self.tracks.len() {
            self.play_idx = self.tracks.len() - 1;
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tracks: self.tracks.clone(),
            play_idx: self.play_idx,
            play_status: self.play_status,
            link: self.link.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::fixtures::{available, unavailable};

    fn queue_of(tracks: Vec<Track>) -> QueueState {
        let mut queue = QueueState::new();
        for track in tracks {
            queue.push(Arc::new(track));
        }
        queue
    }

    fn ids(tracks: &[&str]) -> Vec<Arc<Track>> {
        tracks.iter().map(|id| Arc::new(available(id))).collect()
    }

    #[test]
    fn boundary_predicates() {
        let mut queue = queue_of(vec![available("a"), available("b"), available("c")]);
        assert!(queue.is_next());
        assert!(!queue.is_prev());

        queue.set_play_idx(2).unwrap();
        assert!(!queue.is_next());
        assert!(queue.is_prev());

        let empty = QueueState::new();
        assert!(!empty.is_next());
        assert!(!empty.is_prev());
    }

    #[test]
    fn set_play_idx_rejects_out_of_range() {
        let mut queue = queue_of(vec![available("a")]);
        let err = queue.set_play_idx(1).unwrap_err();
        assert!(matches!(err, SponosError::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(queue.play_idx(), 0);
    }

    #[test]
    fn playable_scans_skip_unavailable_tracks() {
        let queue = queue_of(vec![
            unavailable("a"),
            available("b"),
            unavailable("c"),
            available("d"),
        ]);
        assert_eq!(queue.next_playable(0), Some(1));
        assert_eq!(queue.next_playable(2), Some(3));
        assert_eq!(queue.next_playable(4), None);
        assert_eq!(queue.prev_playable(2), Some(1));
        assert_eq!(queue.prev_playable(0), None);
    }

    #[test]
    fn playable_scans_terminate_when_nothing_is_available() {
        let queue = queue_of(vec![unavailable("a"), unavailable("b"), unavailable("c")]);
        assert_eq!(queue.next_playable(0), None);
        assert_eq!(queue.prev_playable(2), None);
    }

    #[test]
    fn insert_before_current_keeps_track_identity() {
        let mut queue = queue_of(vec![
            available("a"),
            available("b"),
            available("c"),
            available("d"),
        ]);
        queue.set_play_idx(3).unwrap();

        queue.replace_after_insert(ids(&["x", "y", "a", "b", "c", "d"]), 0, 2);

        assert_eq!(queue.play_idx(), 5);
        assert_eq!(queue.current().unwrap().link.id(), "d");
    }

    #[test]
    fn insert_after_current_keeps_index() {
        let mut queue = queue_of(vec![available("a"), available("b")]);
        queue.set_play_idx(1).unwrap();

        queue.replace_after_insert(ids(&["a", "b", "x"]), 2, 1);

        assert_eq!(queue.play_idx(), 1);
        assert_eq!(queue.current().unwrap().link.id(), "b");
    }

    #[test]
    fn remove_before_current_keeps_track_identity() {
        let mut queue = queue_of(vec![
            available("a"),
            available("b"),
            available("c"),
            available("d"),
        ]);
        queue.set_play_idx(3).unwrap();

        queue.replace_after_remove(ids(&["b", "d"]), &[2, 0]);

        assert_eq!(queue.play_idx(), 1);
        assert_eq!(queue.current().unwrap().link.id(), "d");
    }

    #[test]
    fn removing_current_moves_to_its_successor() {
        let mut queue = queue_of(vec![available("a"), available("b"), available("c")]);
        queue.set_play_idx(1).unwrap();

        queue.replace_after_remove(ids(&["a", "c"]), &[1]);

        assert_eq!(queue.current().unwrap().link.id(), "c");
    }

    #[test]
    fn removing_the_tail_clamps_the_index() {
        let mut queue = queue_of(vec![available("a"), available("b"), available("c")]);
        queue.set_play_idx(2).unwrap();

        queue.replace_after_remove(ids(&["a"]), &[1, 2]);
        assert_eq!(queue.play_idx(), 0);

        queue.replace_after_remove(Vec::new(), &[0]);
        assert_eq!(queue.play_idx(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn reset_queue_rewinds() {
        let mut queue = queue_of(vec![available("a"), available("b")]);
        queue.set_play_idx(1).unwrap();
        queue.set_play_status(true);
        queue.set_link(Link::new(crate::model::LinkKind::Album, "x"));

        queue.reset_queue();

        let snapshot = queue.snapshot();
        assert!(snapshot.tracks.is_empty());
        assert_eq!(snapshot.play_idx, 0);
        assert!(!snapshot.play_status);
        assert!(snapshot.link.is_none());
    }

    #[test]
    fn clear_keeps_the_play_flag() {
        let mut queue = queue_of(vec![available("a")]);
        queue.set_play_status(true);
        queue.set_link(Link::new(crate::model::LinkKind::Album, "x"));

        queue.clear();

        let snapshot = queue.snapshot();
        assert!(snapshot.tracks.is_empty());
        assert!(snapshot.link.is_none());
        assert!(snapshot.play_status);
    }

    #[test]
    fn toggle_flips_play_status() {
        let mut queue = QueueState::new();
        assert!(queue.toggle_play_status());
        assert!(!queue.toggle_play_status());
    }
}
