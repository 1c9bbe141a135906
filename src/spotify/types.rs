use serde::Deserialize;

/// Response from the token endpoint, for both the authorization-code exchange
/// and the refresh grant. Spotify only returns `refresh_token` when it rotates
/// the token, so it is optional here.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistOwner {
    pub id: String,
}

/// A playlist object as returned by `GET /playlists/{id}` or playlist create.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    pub owner: SpotifyPlaylistOwner,
}

/// One page of a playlist's track listing.
///
/// `next` is the provider's cursor: present while further pages exist, null on
/// the final page.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksPage {
    #[serde(default)]
    pub items: Vec<PlaylistTrackItem>,
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
}

/// `track` is null for entries Spotify cannot resolve (e.g. removed tracks);
/// `track.id` is null for local files.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTrackItem {
    pub track: Option<PlaylistTrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTrackObject {
    pub id: Option<String>,
}
