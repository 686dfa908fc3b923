//! Strategies for answering read requests.

use crate::error::FootprintError;
use crate::models::{Building, Stats, YearGroup};
use crate::query;
use crate::store::BuildingStore;

use async_trait::async_trait;
use std::sync::Arc;

/// Read access to the building collection.
///
/// This forms the contract between the API layer and the chosen caching strategy. Every
/// implementation shares the semantics defined in [crate::query].
#[async_trait]
pub trait BuildingRepository: Send + Sync {
    /// Every building.
    async fn all(&self) -> Result<Vec<Building>, FootprintError>;

    /// The first building with this ID, if any.
    async fn by_id(&self, id: &str) -> Result<Option<Building>, FootprintError>;

    /// Buildings completed in `year`.
    async fn by_year(&self, year: i32) -> Result<Vec<Building>, FootprintError>;

    /// Buildings at most `height` tall, tallest first.
    async fn no_taller_than(&self, height: f64) -> Result<Vec<Building>, FootprintError>;

    /// Building IDs grouped by construction year.
    async fn group_by_year(&self) -> Result<Vec<YearGroup>, FootprintError>;

    /// Aggregate statistics over every building.
    async fn stats(&self) -> Result<Stats, FootprintError>;
}

/// Repository that scans the store on every request.
#[derive(Clone, Debug)]
pub struct StoreRepository {
    store: BuildingStore,
}

impl StoreRepository {
    pub fn new(store: BuildingStore) -> Self {
        Self { store }
    }

    /// Run a store scan on the blocking thread pool.
    async fn scan<T, F>(&self, scan: F) -> Result<T, FootprintError>
    where
        T: Send + 'static,
        F: FnOnce(&BuildingStore) -> Result<T, FootprintError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || scan(&store)).await?
    }
}

#[async_trait]
impl BuildingRepository for StoreRepository {
    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn all(&self) -> Result<Vec<Building>, FootprintError> {
        self.scan(|store| store.all()).await
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn by_id(&self, id: &str) -> Result<Option<Building>, FootprintError> {
        let id = id.to_owned();
        self.scan(move |store| store.find_one(query::has_id(&id)))
            .await
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn by_year(&self, year: i32) -> Result<Vec<Building>, FootprintError> {
        self.scan(move |store| store.find(query::built_in(year)))
            .await
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn no_taller_than(&self, height: f64) -> Result<Vec<Building>, FootprintError> {
        self.scan(move |store| {
            let mut buildings = store.find(query::no_taller_than(height))?;
            query::sort_by_height_desc(&mut buildings);
            Ok(buildings)
        })
        .await
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn group_by_year(&self) -> Result<Vec<YearGroup>, FootprintError> {
        self.scan(|store| Ok(query::group_by_year(store.all()?)))
            .await
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn stats(&self) -> Result<Stats, FootprintError> {
        self.scan(|store| Ok(query::stats(store.all()?))).await
    }
}

/// Repository that loads every building once and answers from memory.
///
/// The cached buildings are immutable; requests never modify or accumulate into them.
#[derive(Clone, Debug)]
pub struct MemoryRepository {
    buildings: Arc<[Building]>,
}

impl MemoryRepository {
    /// Load every building currently in `store`.
    pub fn load(store: &BuildingStore) -> Result<Self, FootprintError> {
        Ok(Self::from(store.all()?))
    }

    /// Number of cached buildings.
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// Whether no buildings are cached.
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

impl From<Vec<Building>> for MemoryRepository {
    fn from(buildings: Vec<Building>) -> Self {
        Self {
            buildings: buildings.into(),
        }
    }
}

#[async_trait]
impl BuildingRepository for MemoryRepository {
    async fn all(&self) -> Result<Vec<Building>, FootprintError> {
        Ok(self.buildings.to_vec())
    }

    async fn by_id(&self, id: &str) -> Result<Option<Building>, FootprintError> {
        Ok(self.buildings.iter().find(|b| query::has_id(id)(*b)).cloned())
    }

    async fn by_year(&self, year: i32) -> Result<Vec<Building>, FootprintError> {
        let built_in = query::built_in(year);
        Ok(self
            .buildings
            .iter()
            .filter(|b| built_in(*b))
            .cloned()
            .collect())
    }

    async fn no_taller_than(&self, height: f64) -> Result<Vec<Building>, FootprintError> {
        let fits = query::no_taller_than(height);
        let mut buildings: Vec<&Building> = self.buildings.iter().filter(|b| fits(*b)).collect();
        query::sort_by_height_desc(&mut buildings);
        Ok(buildings.into_iter().cloned().collect())
    }

    async fn group_by_year(&self) -> Result<Vec<YearGroup>, FootprintError> {
        Ok(query::group_by_year(self.buildings.iter()))
    }

    async fn stats(&self) -> Result<Stats, FootprintError> {
        Ok(query::stats(self.buildings.iter()))
    }
}
