use crate::bootstrap;
use crate::cli::{CommandLineArgs, QueryMode};
use crate::error::FootprintError;
use crate::models::FieldSchema;
use crate::repository::{BuildingRepository, MemoryRepository, StoreRepository};
use crate::source::HttpSource;
use crate::store::BuildingStore;

use std::sync::Arc;
use std::time::Duration;

use expanduser::expanduser;
use tracing::{event, Level};

/// Shared application state passed to each request handler.
pub struct AppState {
    /// How numeric building fields are rendered.
    pub schema: FieldSchema,

    /// Repository answering read requests.
    pub repository: Box<dyn BuildingRepository>,
}

impl AppState {
    /// Create an [AppState] around an existing repository.
    pub fn new(schema: FieldSchema, repository: Box<dyn BuildingRepository>) -> Self {
        Self { schema, repository }
    }

    /// Open the building store, bootstrap it from the source if empty, and create the
    /// repository selected on the command line.
    pub async fn init(args: &CommandLineArgs) -> Result<Self, FootprintError> {
        let store_path =
            expanduser(&args.store_path).map_err(|source| FootprintError::StorePath {
                path: args.store_path.clone(),
                source,
            })?;
        event!(Level::INFO, path = %store_path.display(), "opening building store");
        let store = BuildingStore::open(&store_path)?;

        let source = HttpSource::new(
            args.source_url.clone(),
            args.source_limit,
            Duration::from_secs(args.source_timeout),
        )?;
        bootstrap::bootstrap(&store, &source).await?;

        let repository: Box<dyn BuildingRepository> = match args.query_mode {
            QueryMode::Store => Box::new(StoreRepository::new(store)),
            QueryMode::Memory => {
                let repository = MemoryRepository::load(&store)?;
                event!(
                    Level::INFO,
                    buildings = repository.len(),
                    "cached buildings in memory"
                );
                Box::new(repository)
            }
        };
        event!(
            Level::INFO,
            query_mode = %args.query_mode,
            field_schema = %args.field_schema,
            "building repository ready"
        );

        Ok(Self::new(args.field_schema, repository))
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::STORE_OPEN_ATTEMPTS;

    use axum::{routing::get, Router};
    use clap::Parser;
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAYLOAD: &str = r#"[
        {"bin": "1001", "cnstrct_yr": "1931", "heightroof": "381", "shape_area": "1000"},
        {"bin": "1002", "cnstrct_yr": "1900", "heightroof": "25.5", "shape_area": "250"}
    ]"#;

    static FETCHES: AtomicUsize = AtomicUsize::new(0);

    // Serve the payload on an ephemeral port, counting requests.
    fn serve_source() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route(
            "/buildings.json",
            get(|| async {
                FETCHES.fetch_add(1, Ordering::SeqCst);
                PAYLOAD
            }),
        );
        tokio::spawn(
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(router.into_make_service()),
        );
        format!("http://{addr}/buildings.json")
    }

    // Initialise, retrying while a store handle dropped by an earlier init is released.
    async fn init_retrying(args: &CommandLineArgs) -> AppState {
        let mut attempts = 0;
        loop {
            match AppState::init(args).await {
                Ok(state) => return state,
                Err(FootprintError::Store(_)) if attempts < STORE_OPEN_ATTEMPTS => {
                    attempts += 1;
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(error) => panic!("failed to initialise app state: {}", error),
            }
        }
    }

    #[tokio::test]
    async fn init_bootstraps_once() {
        let source_url = serve_source();
        let store_path = std::env::temp_dir().join(format!(
            "footprints-app-state-test-{}",
            std::process::id()
        ));
        let args = CommandLineArgs::try_parse_from([
            "footprints",
            "--store-path",
            store_path.to_str().unwrap(),
            "--source-url",
            source_url.as_str(),
            "--query-mode",
            "memory",
        ])
        .unwrap();

        let state = init_retrying(&args).await;
        assert_eq!(state.schema, FieldSchema::Numeric);
        assert_eq!(state.repository.all().await.unwrap().len(), 2);
        drop(state);

        // Reopening a populated store does not contact the source again.
        let state = init_retrying(&args).await;
        let stats = state.repository.stats().await.unwrap();
        assert_eq!(stats.building_count, 2);
        assert_eq!(stats.total_area, 1250.0);
        drop(state);
        assert_eq!(FETCHES.load(Ordering::SeqCst), 1);

        let _ = std::fs::remove_dir_all(&store_path);
    }

    #[tokio::test]
    async fn init_fails_when_source_unreachable() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let source_url = format!("http://{addr}/buildings.json");
        let store_path = std::env::temp_dir().join(format!(
            "footprints-app-state-unreachable-{}",
            std::process::id()
        ));
        let args = CommandLineArgs::try_parse_from([
            "footprints",
            "--store-path",
            store_path.to_str().unwrap(),
            "--source-url",
            source_url.as_str(),
        ])
        .unwrap();

        let result = AppState::init(&args).await;
        assert!(matches!(result, Err(FootprintError::SourceRequest(_))));

        let _ = std::fs::remove_dir_all(&store_path);
    }
}
