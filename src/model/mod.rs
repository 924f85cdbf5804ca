//! Model module - playback data types
//!
//! - `types`: tracks, availability, connection state, queue snapshots, search hits
//! - `link`: catalog link parsing
//! - `queue`: the queue state and its index arithmetic

mod types;
mod link;
mod queue;

pub use types::{
    AlbumRef, AlbumSummary, ArtistSummary, Availability, ConnectionState, PlaylistSummary,
    QueueSnapshot, SearchResults, Track,
};

#[cfg(test)]
pub(crate) use types::fixtures;

pub use link::{Link, LinkKind};

pub use queue::QueueState;
