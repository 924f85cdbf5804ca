//! Spotify Web API catalog lookups

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use rspotify::{
    AuthCodeSpotify, Config, Token,
    model::{
        AlbumId, FullTrack, Market, PlayableItem, PlaylistId, SearchResult, SearchType,
        SimplifiedAlbum, SimplifiedPlaylist, SimplifiedTrack, TrackId,
    },
    prelude::*,
};

use crate::model::{
    AlbumRef, AlbumSummary, ArtistSummary, Availability, Link, LinkKind, PlaylistSummary,
    SearchResults, Track,
};

/// Hits requested per category in a search
const SEARCH_LIMIT: u32 = 20;

/// Scopes requested from the session token provider
pub const SCOPES: &str = "user-read-private,playlist-read-private,playlist-read-collaborative";

/// Catalog client authorized with a token borrowed from the librespot session
#[derive(Clone)]
pub struct WebApi {
    client: Arc<AuthCodeSpotify>,
    expires_at: DateTime<Utc>,
}

impl WebApi {
    pub async fn new(access_token: String, expires_in: std::time::Duration) -> Result<Self> {
        let client = AuthCodeSpotify::with_config(
            Default::default(),
            Default::default(),
            Config {
                token_cached: false,
                token_refreshing: false,
                ..Default::default()
            },
        );

        let expires_in = chrono::Duration::from_std(expires_in)?;
        let expires_at = Utc::now() + expires_in;
        let token = Token {
            access_token,
            expires_in,
            expires_at: Some(expires_at),
            scopes: SCOPES
                .split(',')
                .map(|s| s.to_string())
                .collect::<HashSet<String>>(),
            refresh_token: None,
        };

        *client
            .token
            .lock()
            .await
            .map_err(|_| anyhow!("rspotify token lock poisoned"))? = Some(token);
        tracing::debug!(%expires_at, "Web API token set");

        Ok(Self {
            client: Arc::new(client),
            expires_at,
        })
    }

    /// True when the token has less than a minute left
    pub fn needs_refresh(&self) -> bool {
        (self.expires_at - Utc::now()).num_seconds() < 60
    }

    pub async fn display_name(&self) -> Result<Option<String>> {
        let user = self.client.me().await?;
        Ok(user.display_name)
    }

    pub async fn track(&self, link: &Link) -> Result<Track> {
        let id = TrackId::from_id(link.id())?;
        let track = self.client.track(id, Some(Market::FromToken)).await?;
        full_track(track).ok_or_else(|| anyhow!("{} is a local file", link))
    }

    pub async fn album_tracks(&self, link: &Link) -> Result<Vec<Track>> {
        let id = AlbumId::from_id(link.id())?;
        let album = self.client.album(id.clone(), Some(Market::FromToken)).await?;
        let album_ref = AlbumRef {
            link: Some(link.clone()),
            name: album.name,
        };

        let items: Vec<SimplifiedTrack> = self
            .client
            .album_track(id, Some(Market::FromToken))
            .try_collect()
            .await?;

        tracing::debug!(album = %link, count = items.len(), "Album tracks fetched");
        Ok(items
            .into_iter()
            .filter_map(|track| simplified_track(track, &album_ref))
            .collect())
    }

    pub async fn playlist_tracks(&self, link: &Link) -> Result<Vec<Track>> {
        let id = PlaylistId::from_id(link.id())?;
        let items: Vec<_> = self
            .client
            .playlist_items(id, None, Some(Market::FromToken))
            .try_collect()
            .await?;

        tracing::debug!(playlist = %link, count = items.len(), "Playlist items fetched");
        Ok(items
            .into_iter()
            .filter_map(|item| match item.track {
                Some(PlayableItem::Track(track)) => full_track(track),
                _ => None,
            })
            .collect())
    }

    /// Search every category at once; a category that fails comes back empty
    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        let market = Some(Market::FromToken);
        let (tracks, albums, artists, playlists) = futures::join!(
            self.client.search(query, SearchType::Track, market, None, Some(SEARCH_LIMIT), None),
            self.client.search(query, SearchType::Album, market, None, Some(SEARCH_LIMIT), None),
            self.client.search(query, SearchType::Artist, market, None, Some(SEARCH_LIMIT), None),
            self.client.search(query, SearchType::Playlist, market, None, Some(SEARCH_LIMIT), None)
        );

        let mut results = SearchResults::default();
        match tracks {
            Ok(SearchResult::Tracks(page)) => {
                results.tracks = page.items.into_iter().filter_map(full_track).collect();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(query, error = %e, "Track search failed"),
        }
        match albums {
            Ok(SearchResult::Albums(page)) => {
                results.albums = page.items.into_iter().filter_map(album_summary).collect();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(query, error = %e, "Album search failed"),
        }
        match artists {
            Ok(SearchResult::Artists(page)) => {
                results.artists = page
                    .items
                    .into_iter()
                    .map(|artist| ArtistSummary {
                        link: Link::new(LinkKind::Artist, artist.id.id()),
                        name: artist.name,
                    })
                    .collect();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(query, error = %e, "Artist search failed"),
        }
        match playlists {
            Ok(SearchResult::Playlists(page)) => {
                results.playlists = page.items.into_iter().map(playlist_summary).collect();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(query, error = %e, "Playlist search failed"),
        }

        tracing::debug!(
            query,
            tracks = results.tracks.len(),
            albums = results.albums.len(),
            artists = results.artists.len(),
            playlists = results.playlists.len(),
            "Search finished"
        );
        Ok(results)
    }

    pub async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let playlists: Vec<SimplifiedPlaylist> =
            self.client.current_user_playlists().try_collect().await?;
        tracing::debug!(count = playlists.len(), "User playlists fetched");
        Ok(playlists.into_iter().map(playlist_summary).collect())
    }

    pub async fn playlist_snapshot(&self, link: &Link) -> Result<String> {
        let id = PlaylistId::from_id(link.id())?;
        let playlist = self.client.playlist(id, None, Some(Market::FromToken)).await?;
        Ok(playlist.snapshot_id)
    }
}

fn availability(is_local: bool, is_playable: Option<bool>) -> Availability {
    if is_local {
        Availability::NotStreamable
    } else if is_playable == Some(false) {
        Availability::Unavailable
    } else {
        Availability::Available
    }
}

fn full_track(track: FullTrack) -> Option<Track> {
    let link = Link::new(LinkKind::Track, track.id.as_ref()?.id());
    Some(Track {
        link,
        name: track.name,
        duration_ms: track.duration.num_milliseconds() as u32,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: AlbumRef {
            link: track
                .album
                .id
                .as_ref()
                .map(|id| Link::new(LinkKind::Album, id.id())),
            name: track.album.name,
        },
        disc: track.disc_number.max(0) as u32,
        index: track.track_number,
        availability: availability(track.is_local, track.is_playable),
    })
}

fn simplified_track(track: SimplifiedTrack, album: &AlbumRef) -> Option<Track> {
    let link = Link::new(LinkKind::Track, track.id.as_ref()?.id());
    Some(Track {
        link,
        name: track.name,
        duration_ms: track.duration.num_milliseconds() as u32,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        album: album.clone(),
        disc: track.disc_number.max(0) as u32,
        index: track.track_number,
        availability: availability(track.is_local, track.is_playable),
    })
}

fn album_summary(album: SimplifiedAlbum) -> Option<AlbumSummary> {
    let link = Link::new(LinkKind::Album, album.id.as_ref()?.id());
    Some(AlbumSummary {
        link,
        name: album.name,
        artists: album.artists.into_iter().map(|a| a.name).collect(),
        year: release_year(album.release_date.as_deref()),
    })
}

fn playlist_summary(playlist: SimplifiedPlaylist) -> PlaylistSummary {
    PlaylistSummary {
        link: Link::new(LinkKind::Playlist, playlist.id.id()),
        name: playlist.name,
        owner: playlist
            .owner
            .display_name
            .unwrap_or_else(|| playlist.owner.id.id().to_string()),
    }
}

/// `1977-10-14`, `1977-10` and `1977` all give `1977`
fn release_year(date: Option<&str>) -> String {
    date.unwrap_or_default().chars().take(4).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_files_are_not_streamable() {
        assert_eq!(availability(true, Some(true)), Availability::NotStreamable);
    }

    #[test]
    fn market_restrictions_make_tracks_unavailable() {
        assert_eq!(availability(false, Some(false)), Availability::Unavailable);
        assert_eq!(availability(false, Some(true)), Availability::Available);
        assert_eq!(availability(false, None), Availability::Available);
    }

    #[test]
    fn release_year_takes_the_leading_year() {
        assert_eq!(release_year(Some("1977-10-14")), "1977");
        assert_eq!(release_year(Some("1977")), "1977");
        assert_eq!(release_year(None), "");
    }
}
