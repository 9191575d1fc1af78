pub mod config;
pub mod controller;
pub mod event;
pub mod metrics;
pub mod module;
pub mod normalize;
pub mod reducer;
pub mod risk;
pub mod telemetry;
pub mod tier;
pub mod transport;

pub use config::{ApmConfig, ConfigError};
pub use controller::{TailFirstController, TailFirstDecision};
pub use event::{EventRecord, TraceStep};
pub use module::{ApmEvent, ApmModule, EventStatus};
pub use reducer::{DetailLevel, FixedDraw, SampleSource, SeededSource, ThreadRngSource};
pub use risk::{RiskAssessment, RiskScorer};
pub use tier::{Tier, TierClassifier, TierDecision};
pub use transport::{DashboardTransport, EventTransport, TransportError};
