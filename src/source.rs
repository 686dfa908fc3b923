//! External source of building records.

use crate::error::FootprintError;
use crate::models::Building;

use std::time::Duration;

use url::Url;

/// Query parameter limiting the number of rows returned by a Socrata open data endpoint.
const LIMIT_PARAMETER: &str = "$limit";

/// Building source trait.
///
/// Defines the interface for extracting every building record from an external system.
pub trait BuildingSource {
    /// Fetch every building record.
    fn fetch(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Building>, FootprintError>> + Send;
}

/// HTTP building source.
///
/// Implements [BuildingSource] for an endpoint returning a JSON array of flat records.
#[derive(Debug)]
pub struct HttpSource {
    reqwest_client: reqwest::Client,
    url: Url,
}

impl HttpSource {
    /// Create a new HTTP building source.
    ///
    /// # Arguments
    ///
    /// * `url`: URL of the JSON endpoint
    /// * `limit`: Optional maximum number of records to request
    /// * `timeout`: Timeout for the whole request
    pub fn new(
        mut url: Url,
        limit: Option<usize>,
        timeout: Duration,
    ) -> Result<Self, FootprintError> {
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair(LIMIT_PARAMETER, &limit.to_string());
        }
        let reqwest_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            reqwest_client,
            url,
        })
    }

    /// URL requested by [BuildingSource::fetch].
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl BuildingSource for HttpSource {
    #[tracing::instrument(level = "DEBUG", skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<Building>, FootprintError> {
        let response = self.reqwest_client.get(self.url.as_str()).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(FootprintError::SourceStatus {
                status: response.status().as_u16(),
            });
        }
        let body = response.bytes().await?;
        tracing::debug!(bytes = body.len(), "received source payload");
        serde_json::from_slice(&body).map_err(FootprintError::SourceDecode)
    }
}
