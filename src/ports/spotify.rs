use crate::spotify::{SpotifyApiError, SpotifyTokens};

/// Decoupled representation of a playlist from the API.
#[derive(Debug, Clone)]
pub struct RemotePlaylist {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub cover_url: Option<String>,
}

/// Decoupled representation of the token endpoint's reply.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Only present when the provider rotated the refresh token
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct RemoteUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Port trait wrapping the Spotify API capabilities used by business logic.
///
/// Implementations live in `spotify::web` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SpotifyApi: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<RefreshedTokens, SpotifyApiError>;
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshedTokens, SpotifyApiError>;
    async fn current_user(&self, tokens: &SpotifyTokens) -> Result<RemoteUser, SpotifyApiError>;
    async fn get_playlist(
        &self,
        tokens: &SpotifyTokens,
        playlist_id: &str,
    ) -> Result<RemotePlaylist, SpotifyApiError>;
    /// Create the rescue playlist and return its id, carrying over the source
    /// cover when one is available.
    async fn create_rescue_playlist(
        &self,
        tokens: &SpotifyTokens,
        user_id: &str,
        name: &str,
        description: &str,
        cover_url: Option<String>,
    ) -> Result<String, SpotifyApiError>;
    /// Fetch the complete track listing of a playlist, in listing order
    async fn playlist_tracks(
        &self,
        tokens: &SpotifyTokens,
        playlist_id: &str,
    ) -> Result<Vec<String>, SpotifyApiError>;
    async fn add_tracks(
        &self,
        tokens: &SpotifyTokens,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyApiError>;
    async fn unfollow_playlist(
        &self,
        tokens: &SpotifyTokens,
        playlist_id: &str,
    ) -> Result<(), SpotifyApiError>;
}
