#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geo query gateway backed by the Overpass API.
//!
//! Builds an Overpass QL filter query for a class of features within a
//! radius or bounding box, POSTs it to the interpreter endpoint, and
//! returns the matched elements as [`RawFeature`] records.
//!
//! Each call issues exactly one request. There is no retry and no cache,
//! so callers can fan out independent queries concurrently. Network and
//! decode failures are returned as errors and never collapse into an empty
//! result.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

pub mod query;

use std::time::Duration;

use async_trait::async_trait;
use safety_map_overpass_models::{OverpassResponse, RawFeature};
use serde::Deserialize;
use thiserror::Error;

pub use query::{BoundingBox, FeatureFilter, QueryArea, build_query};

/// Public Overpass interpreter.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Server-side timeout written into every query, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;

/// Errors from gateway operations.
#[derive(Debug, Error)]
pub enum OverpassError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The interpreter answered with a non-success status.
    #[error("Overpass returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body was not a valid Overpass JSON document.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The query area was rejected before sending.
    #[error("Invalid query area: {message}")]
    InvalidArea {
        /// Why the area was rejected.
        message: String,
    },
}

impl OverpassError {
    /// Whether this is a transport-level failure (unreachable host or a
    /// non-200 answer) as opposed to a malformed response.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. })
    }
}

/// Gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverpassConfig {
    /// Interpreter URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Timeout applied both in the query header and to the HTTP request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Anything that can answer a feature query.
///
/// The analysis pipelines only talk to this trait, so they can run
/// against the live [`OverpassClient`] or a canned source in tests.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Returns every feature matching `filter` inside `area`.
    ///
    /// An empty vector means the query succeeded and nothing matched.
    ///
    /// # Errors
    ///
    /// Returns [`OverpassError`] if the area is invalid, the request fails,
    /// or the response cannot be decoded.
    async fn query_features(
        &self,
        area: &QueryArea,
        filter: &FeatureFilter,
    ) -> Result<Vec<RawFeature>, OverpassError>;
}

/// HTTP client for an Overpass interpreter.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    config: OverpassConfig,
}

impl OverpassClient {
    /// Creates a client for the configured endpoint.
    #[must_use]
    pub fn new(config: OverpassConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Creates a client reusing an existing `reqwest` connection pool.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, config: OverpassConfig) -> Self {
        Self { client, config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &OverpassConfig {
        &self.config
    }
}

#[async_trait]
impl FeatureSource for OverpassClient {
    async fn query_features(
        &self,
        area: &QueryArea,
        filter: &FeatureFilter,
    ) -> Result<Vec<RawFeature>, OverpassError> {
        area.validate()
            .map_err(|message| OverpassError::InvalidArea { message })?;

        let query = build_query(area, filter, self.config.timeout_secs);
        log::debug!("Overpass query: {query}");

        let resp = self
            .client
            .post(&self.config.endpoint)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(OverpassError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body = resp.text().await?;
        let features = parse_response(&body)?;
        log::debug!("Overpass returned {} features for {filter:?}", features.len());
        Ok(features)
    }
}

/// Decodes an Overpass JSON body into raw features.
///
/// # Errors
///
/// Returns [`OverpassError::Parse`] if the body is not valid Overpass JSON.
pub fn parse_response(body: &str) -> Result<Vec<RawFeature>, OverpassError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| OverpassError::Parse {
            message: e.to_string(),
        })?;
    Ok(response
        .elements
        .into_iter()
        .map(RawFeature::from)
        .collect())
}
