use std::sync::Arc;

use color_eyre::eyre::{OptionExt, Result, WrapErr, eyre};
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::database::Database;
use crate::entities::{account, collection, playlist};
use crate::ports::spotify::SpotifyApi;
use crate::services::rescue::{RescueMode, ensure_valid_access};
use crate::spotify::identifier::parse_playlist_identifier;

pub struct CollectionService<C: SpotifyApi> {
    db: Arc<Database>,
    api: C,
}

impl<C: SpotifyApi> CollectionService<C> {
    pub fn new(db: Arc<Database>, api: C) -> Self {
        Self { db, api }
    }

    /// Start collecting a playlist for an account.
    ///
    /// The identifier may be a bare id, a provider URI, or a share URL. The
    /// source playlist is looked up remotely so a dangling reference fails
    /// here rather than on the first scheduled run.
    pub async fn add_collection(
        &self,
        account_id: i64,
        identifier: &str,
        mode: RescueMode,
    ) -> Result<collection::Model> {
        let account = account::Entity::find_by_id(account_id)
            .one(&self.db.conn)
            .await
            .wrap_err("Failed to fetch account")?
            .ok_or_eyre(format!("Account {} not found", account_id))?;

        let tokens = ensure_valid_access(&self.db, &self.api, &account)
            .await
            .wrap_err("Failed to refresh credentials")?;

        let playlist_id = parse_playlist_identifier(identifier);
        let remote = self
            .api
            .get_playlist(&tokens, &playlist_id)
            .await
            .wrap_err("Failed to look up playlist")?;

        let playlist = match playlist::Entity::find()
            .filter(playlist::Column::SpotifyId.eq(&remote.id))
            .one(&self.db.conn)
            .await
            .wrap_err("Failed to fetch playlist")?
        {
            Some(existing) => existing,
            None => {
                let model = playlist::ActiveModel {
                    spotify_id: Set(remote.id.clone()),
                    name: Set(remote.name.clone()),
                    cover_url: Set(remote.cover_url.clone()),
                    ..playlist::ActiveModel::new()
                };
                model
                    .insert(&self.db.conn)
                    .await
                    .wrap_err("Failed to save playlist")?
            }
        };

        let existing_collection = collection::Entity::find()
            .filter(collection::Column::AccountId.eq(account.id))
            .filter(collection::Column::PlaylistId.eq(playlist.id))
            .one(&self.db.conn)
            .await
            .wrap_err("Failed to check for existing collection")?;
        if existing_collection.is_some() {
            return Err(eyre!(
                "Already collecting playlist '{}' for this account",
                playlist.name
            ));
        }

        let model = collection::ActiveModel {
            account_id: Set(account.id),
            playlist_id: Set(playlist.id),
            rescue_playlist_id: Set(None),
            mode: Set(mode.as_str().to_string()),
            collecting: Set(true),
            ..collection::ActiveModel::new()
        };

        let saved = model
            .insert(&self.db.conn)
            .await
            .wrap_err("Failed to save collection")?;

        log::info!(
            "Now collecting playlist '{}' ({}) for account {}",
            playlist.name,
            playlist.spotify_id,
            account.user_id
        );

        Ok(saved)
    }

    /// Stop collecting and delete the collection record. Optionally unfollow
    /// the rescue playlist so it disappears from the user's library too; the
    /// ledger rows go with the collection.
    pub async fn remove_collection(&self, collection_id: i64, unfollow: bool) -> Result<()> {
        let collection = collection::Entity::find_by_id(collection_id)
            .one(&self.db.conn)
            .await
            .wrap_err("Failed to fetch collection")?
            .ok_or_eyre(format!("Collection {} not found", collection_id))?;

        if unfollow {
            if let Some(ref rescue_playlist_id) = collection.rescue_playlist_id {
                let account = account::Entity::find_by_id(collection.account_id)
                    .one(&self.db.conn)
                    .await
                    .wrap_err("Failed to fetch account")?
                    .ok_or_eyre("Owning account not found")?;
                let tokens = ensure_valid_access(&self.db, &self.api, &account)
                    .await
                    .wrap_err("Failed to refresh credentials")?;

                self.api
                    .unfollow_playlist(&tokens, rescue_playlist_id)
                    .await
                    .wrap_err("Failed to unfollow rescue playlist")?;
            }
        }

        collection::Entity::delete_by_id(collection_id)
            .exec(&self.db.conn)
            .await
            .wrap_err("Failed to delete collection")?;

        log::info!("Removed collection {}", collection_id);
        Ok(())
    }

    pub async fn list_collections(&self) -> Result<Vec<(collection::Model, playlist::Model)>> {
        let collections = collection::Entity::find()
            .all(&self.db.conn)
            .await
            .wrap_err("Failed to fetch collections")?;

        let mut result = Vec::with_capacity(collections.len());
        for collection in collections {
            let playlist = playlist::Entity::find_by_id(collection.playlist_id)
                .one(&self.db.conn)
                .await
                .wrap_err("Failed to fetch playlist")?
                .ok_or_eyre(format!(
                    "Collection {} references missing playlist",
                    collection.id
                ))?;
            result.push((collection, playlist));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::spotify::{MockSpotifyApi, RemotePlaylist};
    use crate::spotify::SpotifyApiError;
    use crate::test_utils::test_db;

    async fn insert_account(db: &Database) -> account::Model {
        let account = account::ActiveModel {
            user_id: Set("user_a".into()),
            display_name: Set(None),
            access_token: Set("at".into()),
            refresh_token: Set("rt".into()),
            token_expiry: Set(chrono::Utc::now().timestamp() + 3600),
            ..account::ActiveModel::new()
        };
        account.insert(&db.conn).await.unwrap()
    }

    fn mock_get_playlist(api: &mut MockSpotifyApi) {
        api.expect_get_playlist()
            .withf(|_, playlist_id| playlist_id == "ABC123")
            .returning(|_, _| {
                Ok(RemotePlaylist {
                    id: "ABC123".into(),
                    name: "Release Radar".into(),
                    owner_id: "spotify".into(),
                    cover_url: Some("https://img.example/cover.jpg".into()),
                })
            });
    }

    #[tokio::test]
    async fn test_add_collection_from_share_url() {
        let db = test_db().await;
        let account = insert_account(&db).await;

        let mut api = MockSpotifyApi::new();
        mock_get_playlist(&mut api);

        let service = CollectionService::new(db.clone(), api);
        let collection = service
            .add_collection(
                account.id,
                "https://open.spotify.com/playlist/ABC123?si=xyz",
                RescueMode::Weekly,
            )
            .await
            .unwrap();

        assert_eq!(collection.mode, "WEEKLY");
        assert!(collection.collecting);
        assert!(collection.rescue_playlist_id.is_none());

        let playlist = playlist::Entity::find_by_id(collection.playlist_id)
            .one(&db.conn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(playlist.spotify_id, "ABC123");
        assert_eq!(playlist.name, "Release Radar");
    }

    #[tokio::test]
    async fn test_add_collection_rejects_duplicate() {
        let db = test_db().await;
        let account = insert_account(&db).await;

        let mut api = MockSpotifyApi::new();
        mock_get_playlist(&mut api);
        let service = CollectionService::new(db.clone(), api);
        service
            .add_collection(account.id, "ABC123", RescueMode::Weekly)
            .await
            .unwrap();

        let mut api = MockSpotifyApi::new();
        mock_get_playlist(&mut api);
        let service = CollectionService::new(db.clone(), api);
        let result = service
            .add_collection(account.id, "ABC123", RescueMode::Daily)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_add_collection_surfaces_not_found() {
        let db = test_db().await;
        let account = insert_account(&db).await;

        let mut api = MockSpotifyApi::new();
        api.expect_get_playlist().returning(|_, playlist_id| {
            Err(SpotifyApiError::PlaylistNotFound {
                playlist_id: playlist_id.to_string(),
            })
        });

        let service = CollectionService::new(db.clone(), api);
        let result = service
            .add_collection(account.id, "missing", RescueMode::Weekly)
            .await;

        assert!(result.is_err());
        assert!(collection::Entity::find()
            .all(&db.conn)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_remove_collection_with_unfollow() {
        let db = test_db().await;
        let account = insert_account(&db).await;

        let mut api = MockSpotifyApi::new();
        mock_get_playlist(&mut api);
        let service = CollectionService::new(db.clone(), api);
        let collection = service
            .add_collection(account.id, "ABC123", RescueMode::Weekly)
            .await
            .unwrap();

        // Simulate a completed first run having set the destination
        let mut model: collection::ActiveModel = collection.clone().into();
        model.rescue_playlist_id = Set(Some("dst1".into()));
        model.update(&db.conn).await.unwrap();

        let mut api = MockSpotifyApi::new();
        api.expect_unfollow_playlist()
            .withf(|_, playlist_id| playlist_id == "dst1")
            .times(1)
            .returning(|_, _| Ok(()));

        let service = CollectionService::new(db.clone(), api);
        service.remove_collection(collection.id, true).await.unwrap();

        assert!(collection::Entity::find_by_id(collection.id)
            .one(&db.conn)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_remove_collection_without_unfollow_makes_no_remote_call() {
        let db = test_db().await;
        let account = insert_account(&db).await;

        let mut api = MockSpotifyApi::new();
        mock_get_playlist(&mut api);
        let service = CollectionService::new(db.clone(), api);
        let collection = service
            .add_collection(account.id, "ABC123", RescueMode::Weekly)
            .await
            .unwrap();

        let mut api = MockSpotifyApi::new();
        api.expect_unfollow_playlist().times(0);

        let service = CollectionService::new(db.clone(), api);
        service
            .remove_collection(collection.id, false)
            .await
            .unwrap();
    }
}
