use std::sync::Arc;

use color_eyre::eyre::{OptionExt, Result, WrapErr};
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::database::Database;
use crate::entities::account;
use crate::ports::spotify::SpotifyApi;
use crate::spotify::SpotifyTokens;

pub struct AccountService<C: SpotifyApi> {
    db: Arc<Database>,
    api: C,
}

impl<C: SpotifyApi> AccountService<C> {
    pub fn new(db: Arc<Database>, api: C) -> Self {
        Self { db, api }
    }

    pub async fn list_accounts(&self) -> Result<Vec<account::Model>> {
        account::Entity::find()
            .all(&self.db.conn)
            .await
            .wrap_err("Failed to fetch accounts")
    }

    /// Complete the OAuth flow: exchange the authorization code, fetch the
    /// profile, upsert the account row with the fresh credential set.
    pub async fn link_account(&self, code: &str) -> Result<account::Model> {
        let exchanged = self
            .api
            .exchange_code(code)
            .await
            .wrap_err("Failed to exchange authorization code")?;

        let refresh_token = exchanged
            .refresh_token
            .ok_or_eyre("Token response carried no refresh token")?;
        let token_expiry = chrono::Utc::now().timestamp() + exchanged.expires_in;

        let tokens = SpotifyTokens {
            access_token: exchanged.access_token.clone(),
            refresh_token: refresh_token.clone(),
        };
        let user = self
            .api
            .current_user(&tokens)
            .await
            .wrap_err("Failed to get user info")?;

        // Check if the account already exists
        let existing_account = account::Entity::find()
            .filter(account::Column::UserId.eq(&user.id))
            .one(&self.db.conn)
            .await
            .wrap_err("Failed to check for existing account")?;

        let account_model = if let Some(existing) = existing_account {
            // Update existing account with new tokens
            let mut model: account::ActiveModel = existing.into();
            model.display_name = Set(user.display_name);
            model.access_token = Set(exchanged.access_token);
            model.refresh_token = Set(refresh_token);
            model.token_expiry = Set(token_expiry);

            model
                .update(&self.db.conn)
                .await
                .wrap_err("Failed to update account")?
        } else {
            let model = account::ActiveModel {
                user_id: Set(user.id),
                display_name: Set(user.display_name),
                access_token: Set(exchanged.access_token),
                refresh_token: Set(refresh_token),
                token_expiry: Set(token_expiry),
                ..account::ActiveModel::new()
            };

            model
                .insert(&self.db.conn)
                .await
                .wrap_err("Failed to create account")?
        };

        Ok(account_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::spotify::{MockSpotifyApi, RefreshedTokens, RemoteUser};
    use crate::test_utils::test_db;

    fn mock_exchange(api: &mut MockSpotifyApi, access_token: &str) {
        let access_token = access_token.to_string();
        api.expect_exchange_code().returning(move |_| {
            Ok(RefreshedTokens {
                access_token: access_token.clone(),
                refresh_token: Some("rt1".into()),
                expires_in: 3600,
            })
        });
        api.expect_current_user().returning(|_| {
            Ok(RemoteUser {
                id: "user_a".into(),
                display_name: Some("User A".into()),
            })
        });
    }

    #[tokio::test]
    async fn test_link_account_creates_row() {
        let db = test_db().await;
        let mut api = MockSpotifyApi::new();
        mock_exchange(&mut api, "at1");

        let service = AccountService::new(db.clone(), api);
        let account = service.link_account("code").await.unwrap();

        assert_eq!(account.user_id, "user_a");
        assert_eq!(account.access_token, "at1");
        assert_eq!(account.refresh_token, "rt1");
        assert!(account.token_expiry > chrono::Utc::now().timestamp());
    }

    #[tokio::test]
    async fn test_link_account_twice_updates_existing_row() {
        let db = test_db().await;

        let mut api = MockSpotifyApi::new();
        mock_exchange(&mut api, "at1");
        let service = AccountService::new(db.clone(), api);
        service.link_account("code1").await.unwrap();

        let mut api = MockSpotifyApi::new();
        mock_exchange(&mut api, "at2");
        let service = AccountService::new(db.clone(), api);
        let account = service.link_account("code2").await.unwrap();

        assert_eq!(account.access_token, "at2");
        assert_eq!(service.list_accounts().await.unwrap().len(), 1);
    }
}
