//! APM module facade
//!
//! Constructed once at startup from a validated [`ApmConfig`] and passed to the
//! code that instruments units of work:
//!
//! ```ignore
//! let apm = ApmModule::new(ApmConfig::from_env()?)?;
//!
//! let mut event = apm.start_event("checkout", [("route", "/cart")]);
//! event.add_metric("durationMs", 812.0);
//! event.add_trace_step("db.query", 40.0);
//!
//! let record = apm.end_event(event, EventStatus::Ok);
//! let status = apm.send_event(record).await?;
//!
//! apm.shutdown();
//! ```

use std::sync::Arc;

use crate::config::ApmConfig;
use crate::controller::{TailFirstController, TailFirstDecision};
use crate::event::EventRecord;
use crate::metrics::StatsSnapshot;
use crate::reducer::SampleSource;
use crate::transport::{DashboardTransport, EventTransport, TransportError};

/// Final status of a unit of work, recorded on its span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventStatus {
    #[default]
    Unset,
    Ok,
    Error,
}

impl EventStatus {
    fn otel_code(&self) -> Option<&'static str> {
        match self {
            EventStatus::Unset => None,
            EventStatus::Ok => Some("OK"),
            EventStatus::Error => Some("ERROR"),
        }
    }
}

/// An open unit of work and its span
#[derive(Debug)]
pub struct ApmEvent {
    record: EventRecord,
    span: tracing::Span,
}

impl ApmEvent {
    pub fn event_id(&self) -> &str {
        self.record.event_id()
    }

    pub fn record(&self) -> &EventRecord {
        &self.record
    }

    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn add_metric(&mut self, key: impl Into<String>, value: f64) {
        self.record.add_metric(key, value);
    }

    /// Append a trace step and mirror it as a span event
    pub fn add_trace_step(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        tracing::info!(parent: &self.span, step = %name, value, "trace step");
        self.record.add_trace_step(name, value);
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.record.set_tag(key, value);
    }
}

pub struct ApmModule<T: EventTransport = DashboardTransport> {
    config: Arc<ApmConfig>,
    controller: TailFirstController,
    transport: T,
}

impl ApmModule<DashboardTransport> {
    /// Module delivering to the configured dashboard endpoint
    pub fn new(config: ApmConfig) -> Result<Self, TransportError> {
        let transport = DashboardTransport::new(config.dashboard_endpoint.clone())?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: EventTransport> ApmModule<T> {
    pub fn with_transport(config: ApmConfig, transport: T) -> Self {
        let controller = TailFirstController::new(&config);

        log::debug!(
            "apm module ready: service={} env={} tail_first={}",
            config.service_name,
            config.environment,
            config.tail_first_enabled
        );

        Self {
            config: Arc::new(config),
            controller,
            transport,
        }
    }

    /// Replace the random source used for stable-tier draws
    pub fn with_sample_source(mut self, source: Arc<dyn SampleSource>) -> Self {
        self.controller = TailFirstController::with_source(&self.config, source);
        self
    }

    pub fn config(&self) -> &ApmConfig {
        &self.config
    }

    pub fn controller(&self) -> &TailFirstController {
        &self.controller
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open a unit of work. Attributes become tags and are attached to the span.
    pub fn start_event<I, K, V>(&self, name: &str, attrs: I) -> ApmEvent
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = EventRecord::new(name);
        for (key, value) in attrs {
            record.set_tag(key, value);
        }

        let span = tracing::info_span!(
            "apm.event",
            otel.name = %name,
            event.id = %record.event_id(),
            service.name = %self.config.service_name,
            deployment.environment = %self.config.environment,
            otel.status_code = tracing::field::Empty,
        );

        if !record.tags().is_empty() {
            tracing::debug!(parent: &span, attributes = ?record.tags(), "event attributes");
        }

        ApmEvent { record, span }
    }

    /// Close a unit of work: set its end time, record the status and end the span
    pub fn end_event(&self, event: ApmEvent, status: EventStatus) -> EventRecord {
        let ApmEvent { mut record, span } = event;

        record.finish_now();

        if let Some(code) = status.otel_code() {
            span.record("otel.status_code", code);
        }
        drop(span);

        record
    }

    /// Run the tail-first controller if enabled
    pub fn apply_tail_first(&self, record: &mut EventRecord) -> Option<TailFirstDecision> {
        if !self.config.tail_first_enabled {
            return None;
        }

        Some(self.controller.apply(record))
    }

    /// Apply the controller and hand the record to the transport.
    ///
    /// Records that were never closed are closed now. Returns the HTTP status.
    pub async fn send_event(&self, mut record: EventRecord) -> Result<u16, TransportError> {
        if record.finish_now() {
            log::debug!("event {} sent without end_event, closing now", record.event_id());
        }

        self.apply_tail_first(&mut record);
        self.transport.deliver(record).await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.controller.stats()
    }

    /// Tear the module down, logging the final decision counts
    pub fn shutdown(self) {
        let stats = self.controller.stats();
        log::info!(
            "apm module shutdown: {} decisions ({} stable, {} warning, {} critical), {:.2}% detailed",
            stats.total,
            stats.stable,
            stats.warning,
            stats.critical,
            stats.detailed_capture_ratio * 100.0
        );
    }
}

impl<T: EventTransport> std::fmt::Debug for ApmModule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApmModule")
            .field("config", &self.config)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        delivered: Mutex<Vec<EventRecord>>,
    }

    impl EventTransport for Capture {
        async fn deliver(&self, record: EventRecord) -> Result<u16, TransportError> {
            self.delivered.lock().unwrap().push(record);
            Ok(202)
        }
    }

    #[test]
    fn test_start_event_copies_attributes() {
        let apm = ApmModule::with_transport(ApmConfig::default(), Capture::default());
        let event = apm.start_event("login", [("user.tier", "gold"), ("region", "eu")]);

        assert_eq!(event.record().name(), "login");
        assert_eq!(event.record().tags()["region"], "eu");
        assert!(!event.record().is_closed());
    }

    #[test]
    fn test_end_event_closes_record() {
        let apm = ApmModule::with_transport(ApmConfig::default(), Capture::default());
        let mut event = apm.start_event("login", Vec::<(String, String)>::new());
        event.add_metric("durationMs", 3.0);
        event.add_trace_step("auth", 1.0);

        let record = apm.end_event(event, EventStatus::Ok);

        assert!(record.is_closed());
        assert!(record.end_time().unwrap() >= record.start_time());
        assert_eq!(record.trace().len(), 1);
    }

    #[test]
    fn test_disabled_controller_leaves_record_alone() {
        let config = ApmConfig::builder().tail_first_enabled(false).build().unwrap();
        let apm = ApmModule::with_transport(config, Capture::default());

        let mut record = EventRecord::with_start("e", "raw", 0);
        record.add_metric("heapMb", 100.0);

        assert!(apm.apply_tail_first(&mut record).is_none());
        assert!(!record.metrics().contains_key("riskScore"));
        assert!(record.tags().is_empty());
    }

    #[tokio::test]
    async fn test_send_event_closes_open_record() {
        let apm = ApmModule::with_transport(ApmConfig::default(), Capture::default());

        let record = EventRecord::with_start("e", "open", 0);
        let status = apm.send_event(record).await.unwrap();

        assert_eq!(status, 202);
        let delivered = apm.transport().delivered.lock().unwrap();
        assert!(delivered[0].is_closed());
        assert!(delivered[0].tags().contains_key("tailFirstMode"));
    }
}
