//! Error kinds of the playback core

use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = SponosError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SponosError {
    /// Bad credentials or a session that did not come up usable
    #[error("{0}")]
    AuthenticationFailure(String),

    /// Every remaining track in the scan direction is unavailable
    #[error("no playable track left in the queue")]
    NoPlayableTrack,

    #[error("the queue is empty")]
    EmptyQueue,

    #[error("cannot resolve {link}: {reason}")]
    LinkResolution { link: String, reason: String },

    #[error("index {index} is outside the queue (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{operation} did not complete within {waited:?}")]
    Timeout {
        operation: &'static str,
        waited: Duration,
    },

    #[error(transparent)]
    Session(#[from] anyhow::Error),
}

impl SponosError {
    pub fn link_resolution(link: impl ToString, err: &anyhow::Error) -> Self {
        SponosError::LinkResolution {
            link: link.to_string(),
            reason: format!("{err:#}"),
        }
    }

    /// Errors the queue absorbs instead of reporting to the caller
    pub fn is_playback_condition(&self) -> bool {
        matches!(self, SponosError::NoPlayableTrack | SponosError::EmptyQueue)
    }
}
