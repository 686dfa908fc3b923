//! One-time extract-load of building records into an empty store.

use crate::error::FootprintError;
use crate::metrics::BOOTSTRAPPED_BUILDINGS;
use crate::source::BuildingSource;
use crate::store::BuildingStore;

use tracing::{event, Level};

/// Result of a bootstrap attempt
#[derive(Debug, PartialEq)]
pub enum BootstrapOutcome {
    /// The store already held documents so the source was not contacted
    Skipped { existing: usize },
    /// The store was empty and has been populated from the source
    Loaded { inserted: usize },
}

/// Populate `store` from `source` if, and only if, the store is empty.
///
/// The emptiness check and the insert happen under the store's load lock, and the insert is a
/// single atomic batch. A load therefore happens at most once per store: an interrupted load
/// leaves the store empty for the next attempt, and a completed one makes every later attempt a
/// no-op.
///
/// # Arguments
///
/// * `store`: Store to populate
/// * `source`: Source of building records
pub async fn bootstrap<S>(
    store: &BuildingStore,
    source: &S,
) -> Result<BootstrapOutcome, FootprintError>
where
    S: BuildingSource + Sync,
{
    let _guard = store.lock_for_load().await;

    let existing = store.count();
    if existing > 0 {
        event!(
            Level::INFO,
            existing,
            "building store already populated, skipping bootstrap load"
        );
        return Ok(BootstrapOutcome::Skipped { existing });
    }

    event!(Level::INFO, "building store is empty, loading from source");
    let buildings = source.fetch().await?;
    let inserted = store.insert_many(&buildings).await?;
    BOOTSTRAPPED_BUILDINGS.inc_by(inserted as u64);
    event!(Level::INFO, inserted, "bootstrap load complete");
    Ok(BootstrapOutcome::Loaded { inserted })
}
