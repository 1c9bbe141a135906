use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create accounts table
        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Account::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Account::UserId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Account::DisplayName).string())
                    .col(ColumnDef::new(Account::AccessToken).string().not_null())
                    .col(ColumnDef::new(Account::RefreshToken).string().not_null())
                    .col(ColumnDef::new(Account::TokenExpiry).big_integer().not_null())
                    .col(ColumnDef::new(Account::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Account::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Create playlists table (source playlist snapshots)
        manager
            .create_table(
                Table::create()
                    .table(Playlist::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Playlist::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Playlist::SpotifyId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Playlist::Name).string().not_null())
                    .col(ColumnDef::new(Playlist::CoverUrl).string())
                    .col(ColumnDef::new(Playlist::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Playlist::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // Create collections table
        manager
            .create_table(
                Table::create()
                    .table(Collection::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Collection::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Collection::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(Collection::PlaylistId).big_integer().not_null())
                    .col(ColumnDef::new(Collection::RescuePlaylistId).string())
                    .col(ColumnDef::new(Collection::Mode).string().not_null())
                    .col(
                        ColumnDef::new(Collection::Collecting)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Collection::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Collection::UpdatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collections_account_id")
                            .from(Collection::Table, Collection::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collections_playlist_id")
                            .from(Collection::Table, Collection::PlaylistId)
                            .to(Playlist::Table, Playlist::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create collected_tracks ledger table
        manager
            .create_table(
                Table::create()
                    .table(CollectedTrack::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CollectedTrack::CollectionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CollectedTrack::TrackId).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(CollectedTrack::CollectionId)
                            .col(CollectedTrack::TrackId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_collected_tracks_collection_id")
                            .from(CollectedTrack::Table, CollectedTrack::CollectionId)
                            .to(Collection::Table, Collection::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_collections_account_id")
                    .table(Collection::Table)
                    .col(Collection::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_collections_account_playlist")
                    .table(Collection::Table)
                    .col(Collection::AccountId)
                    .col(Collection::PlaylistId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_collected_tracks_collection_id")
                    .table(CollectedTrack::Table)
                    .col(CollectedTrack::CollectionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CollectedTrack::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Collection::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Playlist::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Account::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
    UserId,
    DisplayName,
    AccessToken,
    RefreshToken,
    TokenExpiry,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Playlist {
    Table,
    Id,
    SpotifyId,
    Name,
    CoverUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Collection {
    Table,
    Id,
    AccountId,
    PlaylistId,
    RescuePlaylistId,
    Mode,
    Collecting,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CollectedTrack {
    Table,
    CollectionId,
    TrackId,
}
