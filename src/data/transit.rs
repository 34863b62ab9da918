//! MÁV EMMA GraphQL client
//!
//! Posts the fixed vehicle positions query to the OpenTripPlanner GraphQL
//! endpoint and hands back the parsed response body as opaque JSON.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::SnapshotSource;

/// GraphQL endpoint of the upstream trip planner
pub const UPSTREAM_URL: &str = "https://emma.mav.hu/otp2-backend/otp/routers/default/index/graphql";

/// Default bound on a single upstream exchange
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// The upstream rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0";

/// Rail and tram-train vehicle positions over Hungary, with trip details
const TIMETABLES_QUERY: &str = r#"
{
  vehiclePositions(
    swLat: 45.74573822516341,
    swLon: 16.21031899279769,
    neLat: 48.56368661139524,
    neLon: 22.906741803509043,
    modes: [RAIL, TRAMTRAIN]
  ) {
    vehicleId
    lat
    lon
    heading
    speed
    lastUpdated
    nextStop {
      arrivalDelay
    }
    trip {
      alerts(types: [ROUTE, TRIP]) {
        alertDescriptionText
      }
      tripShortName
      tripHeadsign
      wheelchairAccessible
      bikesAllowed
      route { longName }
      stoptimes {
        stop {
          name
          lat
          lon
          platformCode
        }
        scheduledArrival
        arrivalDelay
        scheduledDeparture
        departureDelay
      }
      tripGeometry { points }
    }
  }
}
"#;

/// Request document sent on every fetch
#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Map<String, Value>,
}

/// Errors that can occur when fetching the upstream payload
#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream could not be reached or the connection broke mid-response
    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The exchange did not finish within the configured timeout
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// The upstream answered with a non-success status
    #[error("upstream returned HTTP {0}")]
    Status(StatusCode),

    /// The upstream answered, but the body is not JSON
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Coarse classification of a [`FetchError`], used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Never reached the server, including timeouts
    Transport,
    /// Reached the server, got a non-success status
    Status,
    /// Reached the server, got garbage
    Parse,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Status => "status",
            FailureKind::Parse => "parse",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) | FetchError::Timeout(_) => FailureKind::Transport,
            FetchError::Status(_) => FailureKind::Status,
            FetchError::Parse(_) => FailureKind::Parse,
        }
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Transport(err)
        }
    }
}

/// Client for the upstream vehicle positions query
#[derive(Debug, Clone)]
pub struct TransitClient {
    /// HTTP client, built with the request timeout
    http_client: Client,
    /// GraphQL endpoint (overridable for testing)
    endpoint: String,
    timeout: Duration,
}

impl TransitClient {
    /// Creates a client that posts to a custom endpoint
    ///
    /// Fails only if the underlying TLS backend cannot be initialised.
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Performs one POST of the timetables query
    ///
    /// The status is checked before the body is read, so an error page served
    /// with a 5xx is reported as [`FetchError::Status`] rather than a parse
    /// failure.
    pub async fn fetch_timetables(&self) -> Result<Value, FetchError> {
        let request = GraphQlRequest {
            query: TIMETABLES_QUERY,
            variables: Map::new(),
        };

        // `.json()` sets `Content-Type: application/json`
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl SnapshotSource for TransitClient {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        self.fetch_timetables().await
    }
}
