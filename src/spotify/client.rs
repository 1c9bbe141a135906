use std::future::Future;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;

use crate::spotify::types::{PlaylistTracksPage, SpotifyPlaylist, SpotifyUser};

pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Page size for the playlist track listing (the API maximum).
pub const TRACKS_PAGE_SIZE: usize = 100;

/// The API caps a single add-tracks request at 100 URIs.
const ADD_TRACKS_CHUNK_SIZE: usize = 100;

/// OAuth capability for one account, passed to each call. There is no client
/// object holding state between calls.
#[derive(Debug, Clone)]
pub struct SpotifyTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SpotifyApiError {
    #[error("Playlist not found: {playlist_id}")]
    PlaylistNotFound { playlist_id: String },
    #[error("Token refresh rejected: {reason}")]
    RefreshRejected { reason: String },
    #[error("Spotify API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Failed to send http request: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Map a playlist-endpoint response status to our error taxonomy. A 404 on a
/// playlist endpoint is surfaced distinctly so callers can skip the record
/// instead of treating it as a transport fault.
async fn check_playlist_response(
    response: reqwest::Response,
    playlist_id: &str,
) -> Result<reqwest::Response, SpotifyApiError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(SpotifyApiError::PlaylistNotFound {
            playlist_id: playlist_id.to_string(),
        });
    }
    check_response(response).await
}

async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, SpotifyApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SpotifyApiError::Api {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    Ok(response)
}

/// Get the profile of the user the tokens belong to
pub async fn get_current_user(
    http: &reqwest::Client,
    api_url: &str,
    tokens: &SpotifyTokens,
) -> Result<SpotifyUser, SpotifyApiError> {
    let response = http
        .get(format!("{}/me", api_url))
        .bearer_auth(&tokens.access_token)
        .timeout(Duration::from_secs(10))
        .send()
        .await?;

    let user = check_response(response).await?.json().await?;
    Ok(user)
}

/// Look up a playlist by its bare id
pub async fn get_playlist(
    http: &reqwest::Client,
    api_url: &str,
    tokens: &SpotifyTokens,
    playlist_id: &str,
) -> Result<SpotifyPlaylist, SpotifyApiError> {
    let response = http
        .get(format!("{}/playlists/{}", api_url, playlist_id))
        .bearer_auth(&tokens.access_token)
        .timeout(Duration::from_secs(10))
        .send()
        .await?;

    let playlist = check_playlist_response(response, playlist_id)
        .await?
        .json()
        .await?;
    Ok(playlist)
}

/// Create a public playlist owned by `user_id`
pub async fn create_playlist(
    http: &reqwest::Client,
    api_url: &str,
    tokens: &SpotifyTokens,
    user_id: &str,
    name: &str,
    description: &str,
) -> Result<SpotifyPlaylist, SpotifyApiError> {
    let response = http
        .post(format!("{}/users/{}/playlists", api_url, user_id))
        .bearer_auth(&tokens.access_token)
        .json(&serde_json::json!({
            "name": name,
            "description": description,
            "public": true,
        }))
        .timeout(Duration::from_secs(10))
        .send()
        .await?;

    let playlist = check_response(response).await?.json().await?;
    Ok(playlist)
}

/// Upload a playlist cover image, fetched from `cover_url` and re-encoded as
/// the base64 jpeg body the API expects.
pub async fn upload_playlist_cover(
    http: &reqwest::Client,
    api_url: &str,
    tokens: &SpotifyTokens,
    playlist_id: &str,
    cover_url: &str,
) -> Result<(), SpotifyApiError> {
    let image = http
        .get(cover_url)
        .timeout(Duration::from_secs(10))
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    let response = http
        .put(format!("{}/playlists/{}/images", api_url, playlist_id))
        .bearer_auth(&tokens.access_token)
        .header("Content-Type", "image/jpeg")
        .body(STANDARD.encode(&image))
        .timeout(Duration::from_secs(30))
        .send()
        .await?;

    check_playlist_response(response, playlist_id).await?;
    Ok(())
}

/// Fetch one page of a playlist's track listing
pub async fn get_playlist_tracks_page(
    http: &reqwest::Client,
    api_url: &str,
    tokens: &SpotifyTokens,
    playlist_id: &str,
    limit: usize,
    offset: usize,
) -> Result<PlaylistTracksPage, SpotifyApiError> {
    let response = http
        .get(format!("{}/playlists/{}/tracks", api_url, playlist_id))
        .query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
        .bearer_auth(&tokens.access_token)
        .timeout(Duration::from_secs(10))
        .send()
        .await?;

    let page = check_playlist_response(response, playlist_id)
        .await?
        .json()
        .await?;
    Ok(page)
}

/// Fetch the complete track listing of a playlist, in listing order.
///
/// One page is in flight at a time; the walk advances `offset` by the number
/// of items each page returned and stops when the cursor is exhausted.
pub async fn get_all_playlist_tracks(
    http: &reqwest::Client,
    api_url: &str,
    tokens: &SpotifyTokens,
    playlist_id: &str,
) -> Result<Vec<String>, SpotifyApiError> {
    collect_track_pages(|offset| {
        get_playlist_tracks_page(http, api_url, tokens, playlist_id, TRACKS_PAGE_SIZE, offset)
    })
    .await
}

/// Drive a page fetcher to exhaustion and collect the track ids.
///
/// Stops when the response carries no `next` cursor, or when a page comes back
/// empty. The empty-page stop keeps the walk finite even if the backend keeps
/// advertising further pages. Entries without a track id (local files, removed
/// tracks) are skipped but still advance the offset.
async fn collect_track_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<String>, SpotifyApiError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<PlaylistTracksPage, SpotifyApiError>>,
{
    let mut track_ids = Vec::new();
    let mut offset = 0usize;

    loop {
        let page = fetch_page(offset).await?;
        let fetched = page.items.len();

        for item in page.items {
            if let Some(track) = item.track
                && let Some(id) = track.id
            {
                track_ids.push(id);
            }
        }

        if page.next.is_none() || fetched == 0 {
            break;
        }
        offset += fetched;
    }

    Ok(track_ids)
}

/// Append tracks to a playlist, preserving order, chunked at the API limit
pub async fn add_tracks_to_playlist(
    http: &reqwest::Client,
    api_url: &str,
    tokens: &SpotifyTokens,
    playlist_id: &str,
    track_ids: &[String],
) -> Result<(), SpotifyApiError> {
    for chunk in track_ids.chunks(ADD_TRACKS_CHUNK_SIZE) {
        let uris: Vec<String> = chunk
            .iter()
            .map(|id| format!("spotify:track:{}", id))
            .collect();

        let response = http
            .post(format!("{}/playlists/{}/tracks", api_url, playlist_id))
            .bearer_auth(&tokens.access_token)
            .json(&serde_json::json!({ "uris": uris }))
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        check_playlist_response(response, playlist_id).await?;
    }

    Ok(())
}

/// Unfollow (effectively delete from the user's library) a playlist
pub async fn unfollow_playlist(
    http: &reqwest::Client,
    api_url: &str,
    tokens: &SpotifyTokens,
    playlist_id: &str,
) -> Result<(), SpotifyApiError> {
    let response = http
        .delete(format!("{}/playlists/{}/followers", api_url, playlist_id))
        .bearer_auth(&tokens.access_token)
        .timeout(Duration::from_secs(10))
        .send()
        .await?;

    check_playlist_response(response, playlist_id).await?;
    Ok(())
}
