//! Unit-of-work records
//!
//! An [`EventRecord`] is created open, collects metrics and trace steps while the
//! work runs, gets its end time when the work finishes, and is then consumed
//! exactly once by the transport.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Reserved metric key holding the composite risk score
pub const RISK_SCORE_KEY: &str = "riskScore";

/// One instrumented waypoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    name: String,
    value: f64,
}

impl TraceStep {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Mutable record of one unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    event_id: String,
    name: String,
    start_time: u64,
    end_time: Option<u64>,
    pub(crate) metrics: BTreeMap<String, f64>,
    pub(crate) trace: Vec<TraceStep>,
    pub(crate) tags: BTreeMap<String, String>,
}

impl EventRecord {
    /// Open a record with a fresh id, starting now
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_start(uuid::Uuid::new_v4().to_string(), name, now_millis())
    }

    /// Open a record with an explicit id and start time (ms since epoch)
    pub fn with_start(event_id: impl Into<String>, name: impl Into<String>, start_time: u64) -> Self {
        Self {
            event_id: event_id.into(),
            name: name.into(),
            start_time,
            end_time: None,
            metrics: BTreeMap::new(),
            trace: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn end_time(&self) -> Option<u64> {
        self.end_time
    }

    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn trace(&self) -> &[TraceStep] {
        &self.trace
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Insert or overwrite a metric
    pub fn add_metric(&mut self, key: impl Into<String>, value: f64) {
        self.metrics.insert(key.into(), value);
    }

    /// Append a trace step, keeping chronological order
    pub fn add_trace_step(&mut self, name: impl Into<String>, value: f64) {
        self.trace.push(TraceStep::new(name, value));
    }

    /// Insert or overwrite a tag
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Close the record. The first end time wins and is never earlier than the
    /// start time. Returns `false` if the record was already closed.
    pub fn finish(&mut self, end_time: u64) -> bool {
        if self.end_time.is_some() {
            return false;
        }

        self.end_time = Some(end_time.max(self.start_time));
        true
    }

    /// Close the record at the current time
    pub fn finish_now(&mut self) -> bool {
        self.finish(now_millis())
    }

    /// Immutable copy of the metrics taken at evaluation time
    pub fn metrics_snapshot(&self) -> BTreeMap<String, f64> {
        self.metrics.clone()
    }

    /// Elapsed time, once closed
    pub fn duration_ms(&self) -> Option<u64> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
