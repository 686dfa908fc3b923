use crate::error::FootprintError;
use crate::models::Building;
use crate::store::BuildingStore;

use std::path::Path;
use std::time::Duration;

/// Attempts made to open a store directory still held by a dropped handle.
pub(crate) const STORE_OPEN_ATTEMPTS: usize = 50;

/// Create a Building with feature code 2100.
pub(crate) fn building(
    id: &str,
    construct_year: Option<i32>,
    height: Option<f64>,
    area: Option<f64>,
) -> Building {
    Building::from_values(id, construct_year, height, area, Some("2100".to_string()))
}

/// Five buildings covering shared years, a missing height and area, and a missing year.
pub(crate) fn sample_buildings() -> Vec<Building> {
    vec![
        building("1001", Some(1931), Some(381.0), Some(1000.0)),
        building("1002", Some(1900), Some(25.5), Some(250.0)),
        building("1003", Some(1931), Some(102.0), Some(400.0)),
        building("1004", Some(1985), None, None),
        building("1005", None, Some(12.5), Some(50.0)),
    ]
}

/// Open the store at `path`, retrying while sled's background threads still hold a handle
/// that was just dropped.
pub(crate) async fn open_store_retrying(path: &Path) -> BuildingStore {
    let mut attempts = 0;
    loop {
        match BuildingStore::open(path) {
            Ok(store) => return store,
            Err(FootprintError::Store(_)) if attempts < STORE_OPEN_ATTEMPTS => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Err(error) => panic!("failed to open store at {}: {}", path.display(), error),
        }
    }
}
