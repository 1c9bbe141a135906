use async_trait::async_trait;
use sea_orm::entity::prelude::*;

/// Ledger row recording that a track has already been delivered to a
/// collection's rescue playlist. Append-only on the sync path.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "collected_track")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub collection_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub track_id: String,
    #[sea_orm(belongs_to, from = "collection_id", to = "id")]
    pub collection: BelongsTo<super::collection::Entity>,
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {}
