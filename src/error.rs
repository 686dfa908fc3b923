//! Error handling.

use axum::{
    extract::rejection::QueryRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};

/// Footprints error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum FootprintError {
    /// No building has the requested ID
    #[error("building {id} not found")]
    BuildingNotFound { id: String },

    /// Error deserialising request query parameters
    #[error("request query is not valid")]
    QueryRejection(#[from] QueryRejection),

    /// Error validating request query parameters
    #[error("request query is not valid")]
    QueryValidation(#[from] validator::ValidationErrors),

    /// Error decoding the source payload
    #[error("failed to decode building records from source")]
    SourceDecode(#[source] serde_json::Error),

    /// Error sending a request to the source or receiving its response
    #[error("error retrieving building records from source")]
    SourceRequest(#[from] reqwest::Error),

    /// Source responded with an unexpected status
    #[error("source responded with status {status}")]
    SourceStatus { status: u16 },

    /// Error reading from or writing to the building store
    #[error("error accessing building store")]
    Store(#[from] sled::Error),

    /// The building store path could not be resolved
    #[error("invalid building store path {path}")]
    StorePath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored document could not be decoded
    #[error("failed to decode stored building document")]
    StoreDecode(#[source] serde_json::Error),

    /// A building could not be encoded for storage
    #[error("failed to encode building document")]
    StoreEncode(#[source] serde_json::Error),

    /// A blocking store task failed to complete
    #[error("store task failed")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl IntoResponse for FootprintError {
    /// Convert from a `FootprintError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        causes.dedup();
        let caused_by = if causes.is_empty() {
            None
        } else {
            Some(causes)
        };
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    /// Return a 502 bad gateway ErrorResponse
    fn bad_gateway<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_GATEWAY, error)
    }
}

impl From<FootprintError> for ErrorResponse {
    /// Convert from a `FootprintError` into an `ErrorResponse`.
    fn from(error: FootprintError) -> Self {
        let response = match &error {
            // Bad request
            FootprintError::QueryRejection(_) | FootprintError::QueryValidation(_) => {
                Self::bad_request(&error)
            }

            // Not found
            FootprintError::BuildingNotFound { id: _ } => Self::not_found(&error),

            // Bad gateway
            FootprintError::SourceDecode(_)
            | FootprintError::SourceRequest(_)
            | FootprintError::SourceStatus { status: _ } => Self::bad_gateway(&error),

            // Internal server error
            FootprintError::Store(_)
            | FootprintError::StoreDecode(_)
            | FootprintError::StoreEncode(_)
            | FootprintError::StorePath { path: _, source: _ }
            | FootprintError::TaskJoin(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            log_error_chain(&error);
        }

        response
    }
}

/// Log an error along with each of its causes.
pub fn log_error_chain(error: &FootprintError) {
    event!(Level::ERROR, "{}", error.to_string());
    let mut current = error.source();
    while let Some(source) = current {
        event!(Level::ERROR, "Caused by: {}", source.to_string());
        current = source.source();
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
