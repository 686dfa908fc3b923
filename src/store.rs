//! Persistent building collection backed by sled.

use crate::error::FootprintError;
use crate::models::Building;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Name of the sled tree holding building documents.
const BUILDINGS_TREE: &str = "buildings";

/// A collection of building documents.
///
/// Documents are JSON-encoded [Building]s keyed by a big-endian ID from
/// [sled::Db::generate_id], so iteration yields documents in insertion order. Clones share the
/// same underlying database.
#[derive(Clone, Debug)]
pub struct BuildingStore {
    db: sled::Db,
    buildings: sled::Tree,
    /// Serialises loads into the collection.
    load_lock: Arc<Mutex<()>>,
}

impl BuildingStore {
    /// Open (or create) a store in the directory at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FootprintError> {
        Self::from_db(sled::open(path)?)
    }

    /// Create a store that is deleted when dropped.
    pub fn temporary() -> Result<Self, FootprintError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, FootprintError> {
        let buildings = db.open_tree(BUILDINGS_TREE)?;
        Ok(Self {
            db,
            buildings,
            load_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Acquire exclusive permission to load documents.
    ///
    /// Held by the bootstrap load across its emptiness check and insert.
    pub async fn lock_for_load(&self) -> MutexGuard<'_, ()> {
        self.load_lock.lock().await
    }

    /// Number of documents in the collection.
    pub fn count(&self) -> usize {
        self.buildings.len()
    }

    /// Whether the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Insert every building in a single atomic batch and flush it to disk.
    ///
    /// Either all buildings are written or none are.
    ///
    /// Returns the number of buildings inserted.
    pub async fn insert_many(&self, buildings: &[Building]) -> Result<usize, FootprintError> {
        let mut batch = sled::Batch::default();
        for building in buildings {
            let key = self.db.generate_id()?;
            let value = serde_json::to_vec(building).map_err(FootprintError::StoreEncode)?;
            batch.insert(key.to_be_bytes().to_vec(), value);
        }
        self.buildings.apply_batch(batch)?;
        self.buildings.flush_async().await?;
        Ok(buildings.len())
    }

    /// Iterate over every document in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Building, FootprintError>> {
        self.buildings.iter().values().map(|value| {
            let value = value?;
            serde_json::from_slice(&value).map_err(FootprintError::StoreDecode)
        })
    }

    /// Every document in insertion order.
    pub fn all(&self) -> Result<Vec<Building>, FootprintError> {
        self.iter().collect()
    }

    /// Every document matching `predicate`, in insertion order.
    pub fn find<P>(&self, predicate: P) -> Result<Vec<Building>, FootprintError>
    where
        P: Fn(&Building) -> bool,
    {
        let mut matches = Vec::new();
        for building in self.iter() {
            let building = building?;
            if predicate(&building) {
                matches.push(building);
            }
        }
        Ok(matches)
    }

    /// The first document matching `predicate`.
    pub fn find_one<P>(&self, predicate: P) -> Result<Option<Building>, FootprintError>
    where
        P: Fn(&Building) -> bool,
    {
        for building in self.iter() {
            let building = building?;
            if predicate(&building) {
                return Ok(Some(building));
            }
        }
        Ok(None)
    }
}
