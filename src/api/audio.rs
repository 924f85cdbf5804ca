//! Playback control endpoints

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;

use super::AppState;
use super::auth::LoggedIn;
use super::reply::{ApiError, NowPlaying, PlaylistView, reply};
use crate::error::Result;
use crate::model::{Link, LinkKind};

#[derive(Debug, Default, Deserialize)]
pub struct AudioParams {
    uri: Option<String>,
    idx: Option<usize>,
    set: Option<u8>,
    callback: Option<String>,
}

pub async fn audio(
    _user: LoggedIn,
    State(state): State<AppState>,
    Path(action): Path<String>,
    Query(params): Query<AudioParams>,
) -> std::result::Result<Response, ApiError> {
    tracing::debug!(action = %action, ?params, "Audio request");
    let callback = params.callback.as_deref();
    let coordinator = &state.coordinator;
    let queue = coordinator.queue();

    match action.as_str() {
        "play" => {
            if let Some(uri) = &params.uri {
                let link: Link = uri.parse()?;
                settle(&state, queue.set_queue_and_play(&link).await).await?;
            } else if let Some(idx) = params.idx {
                settle(&state, queue.play_index(idx).await).await?;
            } else {
                settle(&state, queue.resume().await).await?;
            }
            reply(true, callback)
        }
        "pause" => {
            queue.pause().await;
            reply(true, callback)
        }
        "toggle" => reply(queue.toggle_play_status().await, callback),
        "volume" => {
            if let Some(percent) = params.set {
                coordinator.set_volume(percent).await;
            }
            reply(coordinator.volume().await, callback)
        }
        "next" => {
            let index = settle(&state, coordinator.next_track().await).await?;
            reply(index, callback)
        }
        "prev" => {
            let index = settle(&state, coordinator.prev_track().await).await?;
            reply(index, callback)
        }
        "nowplaying" => {
            let snapshot = queue.snapshot().await;
            let (has_next, has_prev) = (queue.is_next().await, queue.is_prev().await);
            let volume = coordinator.volume().await;
            reply(NowPlaying::new(&snapshot, volume, has_next, has_prev), callback)
        }
        "queue" => {
            let uri = params
                .uri
                .as_deref()
                .ok_or_else(|| ApiError::BadRequest("missing `uri`".to_string()))?;
            let link: Link = uri.parse()?;
            match link.kind() {
                LinkKind::Track => queue.add_to_queue(&link).await?,
                _ => queue.load_into_queue(&link).await?,
            }
            reply(true, callback)
        }
        "playlists" => {
            let playlists = coordinator.user_playlists().await?;
            let views: Vec<PlaylistView> = playlists.iter().map(PlaylistView::from).collect();
            reply(views, callback)
        }
        other => Err(ApiError::BadRequest(format!("Action `{other}` not supported"))),
    }
}

/// Absorb queue conditions the remote cannot act on and answer with the
/// current index instead
async fn settle(state: &AppState, result: Result<usize>) -> std::result::Result<usize, ApiError> {
    match result {
        Ok(index) => Ok(index),
        Err(e) if e.is_playback_condition() => {
            tracing::warn!(error = %e, "Playback request had no effect");
            Ok(state.coordinator.queue().snapshot().await.play_idx)
        }
        Err(e) => Err(e.into()),
    }
}
