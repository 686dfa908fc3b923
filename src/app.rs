use crate::app_state::SharedAppState;
use crate::error::FootprintError;
use crate::metrics::{metrics_handler, record_response_metrics, request_counter};
use crate::models::{self, Building, FieldSchema, YearGroup};
use crate::validated_query::ValidatedQuery;

use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};

use tower::Layer;
use tower::ServiceBuilder;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Plain text served at the root of the API.
const LANDING_PAGE: &str = "\
Building footprints API

GET /all                    every building
GET /building?id=<bin>      one building by BIN
GET /byyear?year=<year>     buildings completed in a year
GET /smallerthan?height=<h> buildings at most h tall, tallest first
GET /groupyear              building IDs grouped by construction year
GET /data                   total area, average height and building count
GET /metrics                prometheus metrics
";

/// A list of buildings rendered in the configured schema
struct Buildings {
    buildings: Vec<Building>,
    schema: FieldSchema,
}

impl IntoResponse for Buildings {
    fn into_response(self) -> Response {
        let views: Vec<_> = self
            .buildings
            .iter()
            .map(|building| building.view(self.schema))
            .collect();
        Json(views).into_response()
    }
}

/// A single building rendered in the configured schema
struct SingleBuilding {
    building: Building,
    schema: FieldSchema,
}

impl IntoResponse for SingleBuilding {
    fn into_response(self) -> Response {
        Json(self.building.view(self.schema)).into_response()
    }
}

/// Year groups rendered in the configured schema
struct YearGroups {
    groups: Vec<YearGroup>,
    schema: FieldSchema,
}

impl IntoResponse for YearGroups {
    fn into_response(self) -> Response {
        let views: Vec<_> = self
            .groups
            .iter()
            .map(|group| group.view(self.schema))
            .collect();
        Json(views).into_response()
    }
}

/// Returns a [axum::Router] with all API routes, tracing and metrics.
///
/// # Arguments
///
/// * `state`: Shared application state
fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/all", get(all))
        .route("/building", get(building))
        .route("/byyear", get(by_year))
        .route("/smallerthan", get(smaller_than))
        .route("/groupyear", get(group_year))
        .route("/data", get(data))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(request_counter)
                    .on_response(record_response_metrics),
            ),
        )
        .with_state(state)
}

/// The Footprints Service type
pub type Service = NormalizePath<Router>;

/// Returns a [crate::app::Service] with all routes and appropriate middleware.
///
/// Trailing slashes are trimmed before routing.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn service(state: SharedAppState) -> Service {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// Landing page
async fn home() -> &'static str {
    LANDING_PAGE
}

/// Every building
async fn all(State(state): State<SharedAppState>) -> Result<Buildings, FootprintError> {
    let buildings = state.repository.all().await?;
    Ok(Buildings {
        buildings,
        schema: state.schema,
    })
}

/// One building by BIN
async fn building(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<models::IdQuery>,
) -> Result<SingleBuilding, FootprintError> {
    match state.repository.by_id(&query.id).await? {
        Some(building) => Ok(SingleBuilding {
            building,
            schema: state.schema,
        }),
        None => Err(FootprintError::BuildingNotFound { id: query.id }),
    }
}

/// Buildings completed in a given year
async fn by_year(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<models::YearQuery>,
) -> Result<Buildings, FootprintError> {
    let buildings = state.repository.by_year(query.year).await?;
    Ok(Buildings {
        buildings,
        schema: state.schema,
    })
}

/// Buildings no taller than a given height, tallest first
async fn smaller_than(
    State(state): State<SharedAppState>,
    ValidatedQuery(query): ValidatedQuery<models::HeightQuery>,
) -> Result<Buildings, FootprintError> {
    let buildings = state.repository.no_taller_than(query.height).await?;
    Ok(Buildings {
        buildings,
        schema: state.schema,
    })
}

/// Building IDs grouped by construction year
async fn group_year(State(state): State<SharedAppState>) -> Result<YearGroups, FootprintError> {
    let groups = state.repository.group_by_year().await?;
    Ok(YearGroups {
        groups,
        schema: state.schema,
    })
}

/// Aggregate statistics
async fn data(State(state): State<SharedAppState>) -> Result<Json<models::Stats>, FootprintError> {
    Ok(Json(state.repository.stats().await?))
}
