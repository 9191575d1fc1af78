//! Event delivery to the dashboard
//!
//! Finished records are encoded with an explicit wire schema and POSTed as JSON.
//! The HTTP status is handed back to the caller as-is; nothing is retried here.
//!
//! ## Wire format (version 1)
//!
//! ```json
//! {
//!   "eventId": "0b6c…",
//!   "name": "checkout",
//!   "startTime": 1718000000000,
//!   "endTime": 1718000000812,
//!   "metrics": { "durationMs": 812.0, "riskScore": 0.2 },
//!   "trace": [ { "name": "db.query", "value": 40.0 } ],
//!   "tags": { "tailFirstMode": "stable" }
//! }
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::event::{EventRecord, TraceStep};

/// Bumped whenever the wire layout changes
pub const SCHEMA_VERSION: u32 = 1;

/// Header carrying [`SCHEMA_VERSION`]
pub const SCHEMA_VERSION_HEADER: &str = "x-apm-schema-version";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error raised while encoding or delivering an event
#[derive(Debug)]
pub enum TransportError {
    Encode(serde_json::Error),
    Client(reqwest::Error),
    Request { endpoint: String, source: reqwest::Error },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Encode(err) => write!(f, "Failed to encode event: {}", err),
            TransportError::Client(err) => write!(f, "Failed to build HTTP client: {}", err),
            TransportError::Request { endpoint, source } => {
                write!(f, "Failed to deliver event to {}: {}", endpoint, source)
            }
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Encode(err) => Some(err),
            TransportError::Client(err) => Some(err),
            TransportError::Request { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Encode(err)
    }
}

/// Wire representation of a finished record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent<'a> {
    pub event_id: &'a str,
    pub name: &'a str,
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub metrics: &'a BTreeMap<String, f64>,
    pub trace: &'a [TraceStep],
    pub tags: &'a BTreeMap<String, String>,
}

impl<'a> From<&'a EventRecord> for WireEvent<'a> {
    fn from(record: &'a EventRecord) -> Self {
        Self {
            event_id: record.event_id(),
            name: record.name(),
            start_time: record.start_time(),
            end_time: record.end_time(),
            metrics: record.metrics(),
            trace: record.trace(),
            tags: record.tags(),
        }
    }
}

/// Encode a record as a JSON body
pub fn encode(record: &EventRecord) -> Result<Vec<u8>, TransportError> {
    Ok(serde_json::to_vec(&WireEvent::from(record))?)
}

/// Delivers finished records and reports the HTTP status
pub trait EventTransport: Send + Sync {
    fn deliver(&self, record: EventRecord) -> impl Future<Output = Result<u16, TransportError>> + Send;
}

/// HTTP POST to the dashboard ingest endpoint
#[derive(Debug, Clone)]
pub struct DashboardTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl DashboardTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl EventTransport for DashboardTransport {
    async fn deliver(&self, record: EventRecord) -> Result<u16, TransportError> {
        let body = encode(&record)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SCHEMA_VERSION_HEADER, SCHEMA_VERSION.to_string())
            .body(body)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            log::warn!(
                "dashboard rejected event {}: status {}",
                record.event_id(),
                status
            );
        }

        Ok(status)
    }
}
