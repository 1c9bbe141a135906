use sea_orm::{ActiveModelTrait, Set};

use crate::database::Database;
use crate::entities::account;
use crate::ports::spotify::SpotifyApi;
use crate::services::rescue::RescueError;
use crate::spotify::SpotifyTokens;

/// Return a still-valid token set for the account, refreshing and persisting
/// it first if the stored one has expired.
///
/// When the stored token is still valid this makes no network or store call,
/// which is what lets the rescue run refresh once per owner instead of once
/// per collection. Expiry is compared in whole seconds with no skew margin.
///
/// The refreshed triple (access token, refresh token, expiry) is persisted as
/// a single row update before it is returned; the provider only sends a new
/// refresh token when it rotates one, so the old value is kept otherwise.
pub async fn ensure_valid_access<C: SpotifyApi>(
    db: &Database,
    api: &C,
    account: &account::Model,
) -> Result<SpotifyTokens, RescueError> {
    let now = chrono::Utc::now().timestamp();

    if now < account.token_expiry {
        return Ok(SpotifyTokens {
            access_token: account.access_token.clone(),
            refresh_token: account.refresh_token.clone(),
        });
    }

    log::info!("Access token for account {} expired, refreshing", account.user_id);

    let refreshed = api
        .refresh_access_token(&account.refresh_token)
        .await
        .map_err(RescueError::CredentialRefreshFailed)?;

    let refresh_token = refreshed
        .refresh_token
        .unwrap_or_else(|| account.refresh_token.clone());

    let mut model: account::ActiveModel = account.clone().into();
    model.access_token = Set(refreshed.access_token.clone());
    model.refresh_token = Set(refresh_token.clone());
    model.token_expiry = Set(now + refreshed.expires_in);
    model.update(&db.conn).await?;

    log::debug!("Persisted refreshed credentials for account {}", account.user_id);

    Ok(SpotifyTokens {
        access_token: refreshed.access_token,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::spotify::{MockSpotifyApi, RefreshedTokens};
    use crate::spotify::SpotifyApiError;
    use crate::test_utils::test_db;
    use sea_orm::{ActiveModelBehavior, EntityTrait};

    async fn insert_account(db: &Database, token_expiry: i64) -> account::Model {
        let account = account::ActiveModel {
            user_id: Set("user_a".into()),
            display_name: Set(Some("User A".into())),
            access_token: Set("old_at".into()),
            refresh_token: Set("old_rt".into()),
            token_expiry: Set(token_expiry),
            ..account::ActiveModel::new()
        };
        account.insert(&db.conn).await.unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_is_returned_without_refresh() {
        let db = test_db().await;
        let account = insert_account(&db, chrono::Utc::now().timestamp() + 3600).await;

        let mut api = MockSpotifyApi::new();
        api.expect_refresh_access_token().times(0);

        let tokens = ensure_valid_access(&db, &api, &account).await.unwrap();

        assert_eq!(tokens.access_token, "old_at");
        assert_eq!(tokens.refresh_token, "old_rt");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let db = test_db().await;
        let now = chrono::Utc::now().timestamp();
        let account = insert_account(&db, now - 100).await;

        let mut api = MockSpotifyApi::new();
        api.expect_refresh_access_token()
            .withf(|refresh_token| refresh_token == "old_rt")
            .times(1)
            .returning(|_| {
                Ok(RefreshedTokens {
                    access_token: "new_at".into(),
                    refresh_token: Some("new_rt".into()),
                    expires_in: 3600,
                })
            });

        let tokens = ensure_valid_access(&db, &api, &account).await.unwrap();

        assert_eq!(tokens.access_token, "new_at");
        assert_eq!(tokens.refresh_token, "new_rt");

        // The whole triple must have been written back as one unit
        let stored = account::Entity::find_by_id(account.id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token, "new_at");
        assert_eq!(stored.refresh_token, "new_rt");
        assert!(stored.token_expiry >= now + 3600);
    }

    #[tokio::test]
    async fn test_refresh_token_kept_when_not_rotated() {
        let db = test_db().await;
        let account = insert_account(&db, 0).await;

        let mut api = MockSpotifyApi::new();
        api.expect_refresh_access_token().returning(|_| {
            Ok(RefreshedTokens {
                access_token: "new_at".into(),
                refresh_token: None,
                expires_in: 3600,
            })
        });

        let tokens = ensure_valid_access(&db, &api, &account).await.unwrap();

        assert_eq!(tokens.refresh_token, "old_rt");
        let stored = account::Entity::find_by_id(account.id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.refresh_token, "old_rt");
    }

    #[tokio::test]
    async fn test_expiry_boundary_triggers_refresh() {
        let db = test_db().await;
        // now >= expires_at counts as expired, with no skew margin
        let account = insert_account(&db, chrono::Utc::now().timestamp()).await;

        let mut api = MockSpotifyApi::new();
        api.expect_refresh_access_token().times(1).returning(|_| {
            Ok(RefreshedTokens {
                access_token: "new_at".into(),
                refresh_token: None,
                expires_in: 3600,
            })
        });

        let tokens = ensure_valid_access(&db, &api, &account).await.unwrap();
        assert_eq!(tokens.access_token, "new_at");
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_fatal_for_owner() {
        let db = test_db().await;
        let account = insert_account(&db, 0).await;

        let mut api = MockSpotifyApi::new();
        api.expect_refresh_access_token().returning(|_| {
            Err(SpotifyApiError::RefreshRejected {
                reason: "invalid_grant".into(),
            })
        });

        let result = ensure_valid_access(&db, &api, &account).await;

        assert!(matches!(
            result,
            Err(RescueError::CredentialRefreshFailed(_))
        ));

        // Stored credentials are untouched on failure
        let stored = account::Entity::find_by_id(account.id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token, "old_at");
    }
}
