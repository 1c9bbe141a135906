use async_trait::async_trait;

use crate::config::SpotifyConfig;
use crate::ports::spotify::{RefreshedTokens, RemotePlaylist, RemoteUser, SpotifyApi};
use crate::spotify::auth::{
    self, ExchangeCodeForTokenError, RefreshTokenError, SPOTIFY_ACCOUNTS_URL,
};
use crate::spotify::client::{self, SPOTIFY_API_URL, SpotifyApiError, SpotifyTokens};
use crate::spotify::types::SpotifyTokenResponse;

/// Production [`SpotifyApi`] implementation backed by the Web API.
///
/// Holds only the application credentials and an HTTP connection pool; account
/// tokens are passed into each call.
#[derive(Clone)]
pub struct SpotifyWebApi {
    http: reqwest::Client,
    config: SpotifyConfig,
    api_url: String,
    accounts_url: String,
}

impl SpotifyWebApi {
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_url: SPOTIFY_API_URL.to_string(),
            accounts_url: SPOTIFY_ACCOUNTS_URL.to_string(),
        }
    }

    /// Point the adapter at alternative endpoints (tests)
    #[cfg(test)]
    pub fn with_urls(config: SpotifyConfig, api_url: String, accounts_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_url,
            accounts_url,
        }
    }

    /// The URL a user must visit to authorize this application
    pub fn authorize_url(&self) -> String {
        auth::authorize_url(
            &self.accounts_url,
            &self.config.client_id,
            &self.config.redirect_uri,
        )
    }
}

impl From<SpotifyTokenResponse> for RefreshedTokens {
    fn from(response: SpotifyTokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
        }
    }
}

fn map_refresh_error(err: RefreshTokenError) -> SpotifyApiError {
    match err {
        RefreshTokenError::InvalidRefreshToken { reason } => {
            SpotifyApiError::RefreshRejected { reason }
        }
        RefreshTokenError::FailedToSendRequest(err)
        | RefreshTokenError::FailedToParseResponse(err) => SpotifyApiError::Transport(err),
    }
}

fn map_exchange_error(err: ExchangeCodeForTokenError) -> SpotifyApiError {
    match err {
        ExchangeCodeForTokenError::InvalidCode { reason } => {
            SpotifyApiError::RefreshRejected { reason }
        }
        ExchangeCodeForTokenError::FailedToSendRequest(err)
        | ExchangeCodeForTokenError::FailedToParseResponse(err) => SpotifyApiError::Transport(err),
    }
}

#[async_trait]
impl SpotifyApi for SpotifyWebApi {
    async fn exchange_code(&self, code: &str) -> Result<RefreshedTokens, SpotifyApiError> {
        let response = auth::exchange_code_for_token(
            &self.http,
            &self.accounts_url,
            &self.config.client_id,
            &self.config.client_secret,
            code,
            &self.config.redirect_uri,
        )
        .await
        .map_err(map_exchange_error)?;
        Ok(response.into())
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshedTokens, SpotifyApiError> {
        let response = auth::refresh_access_token(
            &self.http,
            &self.accounts_url,
            &self.config.client_id,
            &self.config.client_secret,
            refresh_token,
        )
        .await
        .map_err(map_refresh_error)?;
        Ok(response.into())
    }

    async fn current_user(&self, tokens: &SpotifyTokens) -> Result<RemoteUser, SpotifyApiError> {
        let user = client::get_current_user(&self.http, &self.api_url, tokens).await?;
        Ok(RemoteUser {
            id: user.id,
            display_name: user.display_name,
        })
    }

    async fn get_playlist(
        &self,
        tokens: &SpotifyTokens,
        playlist_id: &str,
    ) -> Result<RemotePlaylist, SpotifyApiError> {
        let playlist = client::get_playlist(&self.http, &self.api_url, tokens, playlist_id).await?;
        Ok(RemotePlaylist {
            id: playlist.id,
            name: playlist.name,
            owner_id: playlist.owner.id,
            cover_url: playlist.images.first().map(|image| image.url.clone()),
        })
    }

    async fn create_rescue_playlist(
        &self,
        tokens: &SpotifyTokens,
        user_id: &str,
        name: &str,
        description: &str,
        cover_url: Option<String>,
    ) -> Result<String, SpotifyApiError> {
        let playlist =
            client::create_playlist(&self.http, &self.api_url, tokens, user_id, name, description)
                .await?;

        if let Some(cover_url) = cover_url {
            // A missing cover should not fail the rescue; the playlist exists.
            if let Err(err) = client::upload_playlist_cover(
                &self.http,
                &self.api_url,
                tokens,
                &playlist.id,
                &cover_url,
            )
            .await
            {
                log::warn!(
                    "Failed to upload cover for playlist {}: {}",
                    playlist.id,
                    err
                );
            }
        }

        Ok(playlist.id)
    }

    async fn playlist_tracks(
        &self,
        tokens: &SpotifyTokens,
        playlist_id: &str,
    ) -> Result<Vec<String>, SpotifyApiError> {
        client::get_all_playlist_tracks(&self.http, &self.api_url, tokens, playlist_id).await
    }

    async fn add_tracks(
        &self,
        tokens: &SpotifyTokens,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), SpotifyApiError> {
        client::add_tracks_to_playlist(&self.http, &self.api_url, tokens, playlist_id, track_ids)
            .await
    }

    async fn unfollow_playlist(
        &self,
        tokens: &SpotifyTokens,
        playlist_id: &str,
    ) -> Result<(), SpotifyApiError> {
        client::unfollow_playlist(&self.http, &self.api_url, tokens, playlist_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> SpotifyConfig {
        SpotifyConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost:3000/callback".into(),
        }
    }

    #[test]
    fn test_authorize_url_contains_redirect() {
        let api = SpotifyWebApi::new(test_config());
        let url = api.authorize_url();
        assert!(url.contains("client_id=id"));
        assert!(url.contains(&urlencoding::encode("http://localhost:3000/callback").to_string()));
    }

    #[tokio::test]
    async fn test_refresh_rejected_maps_to_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let api = SpotifyWebApi::with_urls(test_config(), server.uri(), server.uri());
        let result = api.refresh_access_token("revoked").await;

        assert!(matches!(
            result,
            Err(SpotifyApiError::RefreshRejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_sends_redirect_uri() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "expires_in": 3600,
                "refresh_token": "rt",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = SpotifyWebApi::with_urls(test_config(), server.uri(), server.uri());
        let tokens = api.exchange_code("abc").await.unwrap();

        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
    }
}
