use std::collections::HashSet;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use crate::database::Database;
use crate::entities::{account, collected_track, collection, playlist};
use crate::ports::spotify::SpotifyApi;
use crate::services::rescue::{RescueError, RescueMode, RescueReport, ensure_valid_access};
use crate::spotify::SpotifyTokens;

const RESCUE_PLAYLIST_DESCRIPTION: &str =
    "Rescued copy of a followed playlist, kept up to date by playlist-rescuer.";

/// One collection due for processing, with its source playlist snapshot.
struct CollectionJob {
    collection: collection::Model,
    playlist: playlist::Model,
}

/// All collections of one account, processed together so the account's
/// credentials are refreshed at most once per run.
struct OwnerBatch {
    account_id: i64,
    jobs: Vec<CollectionJob>,
}

/// Partition jobs (already sorted by account id) into per-owner batches.
fn group_by_owner(jobs: Vec<CollectionJob>) -> Vec<OwnerBatch> {
    let mut batches: Vec<OwnerBatch> = Vec::new();
    for job in jobs {
        match batches.last_mut() {
            Some(batch) if batch.account_id == job.collection.account_id => {
                batch.jobs.push(job);
            }
            _ => batches.push(OwnerBatch {
                account_id: job.collection.account_id,
                jobs: vec![job],
            }),
        }
    }
    batches
}

/// The scheduled rescue run: walks every active collection of the given
/// cadence, owner by owner, and appends the source tracks that have not been
/// delivered yet to each collection's rescue playlist.
pub struct RescueService<C: SpotifyApi> {
    db: Arc<Database>,
    api: C,
}

impl<C: SpotifyApi> RescueService<C> {
    pub fn new(db: Arc<Database>, api: C) -> Self {
        Self { db, api }
    }

    /// Process every active collection with the given cadence.
    ///
    /// Failures are classified and counted at the per-collection boundary (a
    /// failed credential refresh skips the rest of that owner's batch); the
    /// run itself always completes.
    pub async fn run(&self, mode: RescueMode) -> Result<RescueReport> {
        log::info!("Starting {} rescue run", mode);

        let mut report = RescueReport::default();
        let jobs = self.load_jobs(mode, &mut report).await?;
        let batches = group_by_owner(jobs);

        log::info!(
            "Processing {} collections across {} owners",
            batches.iter().map(|batch| batch.jobs.len()).sum::<usize>(),
            batches.len()
        );

        for batch in batches {
            let account = account::Entity::find_by_id(batch.account_id)
                .one(&self.db.conn)
                .await
                .wrap_err("Failed to fetch account")?;

            let Some(account) = account else {
                log::warn!(
                    "No credentials stored for account {}, skipping {} collections",
                    batch.account_id,
                    batch.jobs.len()
                );
                report.owners_skipped += 1;
                continue;
            };

            // Refreshing with stale tokens would fail for every collection of
            // this owner; give up on the whole batch for this run instead.
            let tokens = match ensure_valid_access(&self.db, &self.api, &account).await {
                Ok(tokens) => tokens,
                Err(err) => {
                    log::error!(
                        "Skipping account {} for this run: {}",
                        account.user_id,
                        err
                    );
                    report.owners_skipped += 1;
                    continue;
                }
            };

            for job in batch.jobs {
                let collection_id = job.collection.id;
                match self.rescue_collection(&account, &tokens, job).await {
                    Ok(delivered) => {
                        report.collections_processed += 1;
                        report.tracks_delivered += delivered as u64;
                    }
                    Err(RescueError::LedgerWriteFailed(err)) => {
                        // The tracks reached the destination playlist but were
                        // not recorded, so the next run may add them again.
                        // Retrying here could double-add them right away.
                        log::error!(
                            "Ledger write failed for collection {} after remote append: {}",
                            collection_id,
                            err
                        );
                        report.ledger_write_failures += 1;
                    }
                    Err(err) => {
                        log::error!("Rescue failed for collection {}: {}", collection_id, err);
                        report.collections_failed += 1;
                    }
                }
            }
        }

        log::info!(
            "Rescue run complete: {} collections processed, {} failed, {} owners skipped, {} tracks delivered",
            report.collections_processed,
            report.collections_failed,
            report.owners_skipped,
            report.tracks_delivered
        );

        Ok(report)
    }

    /// Load the active collections for the cadence, sorted by owning account
    /// so batches come out contiguous.
    async fn load_jobs(
        &self,
        mode: RescueMode,
        report: &mut RescueReport,
    ) -> Result<Vec<CollectionJob>> {
        let collections = collection::Entity::find()
            .filter(collection::Column::Collecting.eq(true))
            .filter(collection::Column::Mode.eq(mode.as_str()))
            .order_by_asc(collection::Column::AccountId)
            .all(&self.db.conn)
            .await
            .wrap_err("Failed to fetch active collections")?;

        let mut jobs = Vec::with_capacity(collections.len());
        for collection in collections {
            let playlist = playlist::Entity::find_by_id(collection.playlist_id)
                .one(&self.db.conn)
                .await
                .wrap_err("Failed to fetch playlist")?;

            match playlist {
                Some(playlist) => jobs.push(CollectionJob {
                    collection,
                    playlist,
                }),
                None => {
                    log::error!(
                        "Collection {} references missing playlist {}, skipping",
                        collection.id,
                        collection.playlist_id
                    );
                    report.collections_failed += 1;
                }
            }
        }

        Ok(jobs)
    }

    /// Sync one collection: resolve the destination playlist, fetch the full
    /// source listing, and deliver the tracks the ledger has not seen.
    ///
    /// Returns the number of tracks delivered.
    async fn rescue_collection(
        &self,
        account: &account::Model,
        tokens: &SpotifyTokens,
        job: CollectionJob,
    ) -> Result<usize, RescueError> {
        let CollectionJob {
            collection,
            playlist,
        } = job;

        let destination = match collection.rescue_playlist_id.clone() {
            Some(id) => id,
            None => {
                let name = format!("{} (rescued)", playlist.name);
                let id = self
                    .api
                    .create_rescue_playlist(
                        tokens,
                        &account.user_id,
                        &name,
                        RESCUE_PLAYLIST_DESCRIPTION,
                        playlist.cover_url.clone(),
                    )
                    .await?;

                log::info!(
                    "Created rescue playlist {} for collection {}",
                    id,
                    collection.id
                );

                // Persist before any tracks move so a later failure cannot
                // orphan the playlist and create a second one next run.
                let mut model: collection::ActiveModel = collection.clone().into();
                model.rescue_playlist_id = Set(Some(id.clone()));
                model.update(&self.db.conn).await?;
                id
            }
        };

        // The complete listing; a partial one must never be filtered against
        // the ledger, or the missing tail would be skipped forever.
        let source_tracks = self
            .api
            .playlist_tracks(tokens, &playlist.spotify_id)
            .await?;

        let mut seen: HashSet<String> = collected_track::Entity::find()
            .filter(collected_track::Column::CollectionId.eq(collection.id))
            .all(&self.db.conn)
            .await?
            .into_iter()
            .map(|row| row.track_id)
            .collect();

        // Source order is preserved; a track repeated in the source is
        // delivered once, on its first occurrence.
        let mut new_tracks = Vec::new();
        for track_id in source_tracks {
            if seen.insert(track_id.clone()) {
                new_tracks.push(track_id);
            }
        }

        if new_tracks.is_empty() {
            log::debug!("Collection {} is up to date", collection.id);
            return Ok(0);
        }

        log::info!(
            "Delivering {} new tracks to playlist {} for collection {}",
            new_tracks.len(),
            destination,
            collection.id
        );

        // Remote append first: if it fails, nothing is recorded and the run
        // retries cleanly next time. A ledger failure after the append is the
        // one accepted inconsistency (possible duplicate add next run).
        self.api.add_tracks(tokens, &destination, &new_tracks).await?;

        let rows = new_tracks.iter().map(|track_id| collected_track::ActiveModel {
            collection_id: Set(collection.id),
            track_id: Set(track_id.clone()),
        });
        collected_track::Entity::insert_many(rows)
            .exec(&self.db.conn)
            .await
            .map_err(RescueError::LedgerWriteFailed)?;

        Ok(new_tracks.len())
    }
}
