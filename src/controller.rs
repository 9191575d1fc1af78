//! Tail-first adaptive sampling controller
//!
//! Runs once per finished unit of work: score the event's own metrics, pick a
//! stability tier, then keep or collapse the record. Nothing here blocks or
//! performs I/O, and no state carries over from one event to the next apart
//! from the decision counters.

use std::sync::Arc;

use crate::config::ApmConfig;
use crate::event::EventRecord;
use crate::metrics::{DecisionStats, StatsSnapshot};
use crate::reducer::{DetailLevel, DetailReducer, SampleSource, ThreadRngSource};
use crate::risk::{RiskAssessment, RiskScorer};
use crate::tier::{TierClassifier, TierDecision};

pub const TAG_REASONS: &str = "tailFirstReasons";

/// Outcome of running the controller on one record
#[derive(Debug, Clone, PartialEq)]
pub struct TailFirstDecision {
    pub risk: RiskAssessment,
    pub tier: TierDecision,
    pub capture_detailed: bool,
    pub detail: DetailLevel,
}

pub struct TailFirstController {
    scorer: RiskScorer,
    classifier: TierClassifier,
    reducer: DetailReducer,
    source: Arc<dyn SampleSource>,
    stats: DecisionStats,
    #[cfg(feature = "telemetry")]
    metrics: crate::metrics::DecisionMetrics,
}

impl TailFirstController {
    pub fn new(config: &ApmConfig) -> Self {
        Self::with_source(config, Arc::new(ThreadRngSource))
    }

    /// Controller drawing from an injected sample source
    pub fn with_source(config: &ApmConfig, source: Arc<dyn SampleSource>) -> Self {
        Self {
            scorer: RiskScorer::new(),
            classifier: TierClassifier::from_config(config),
            reducer: DetailReducer::new(),
            source,
            stats: DecisionStats::new(),
            #[cfg(feature = "telemetry")]
            metrics: crate::metrics::DecisionMetrics::from_global(),
        }
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    pub fn classifier(&self) -> &TierClassifier {
        &self.classifier
    }

    /// Score, classify and keep-or-reduce `record` in place
    pub fn apply(&self, record: &mut EventRecord) -> TailFirstDecision {
        let snapshot = record.metrics_snapshot();
        let risk = self.scorer.assess(&snapshot);
        let tier = self.classifier.classify(risk.score);
        let capture_detailed = self
            .reducer
            .decide(tier.tier, tier.sample_rate, self.source.as_ref());

        let detail = self
            .reducer
            .reduce(record, risk.score, tier, capture_detailed);

        if !risk.reasons.is_empty() {
            record.set_tag(TAG_REASONS, risk.reasons.join(","));
        }

        self.stats.record(tier.tier, risk.score, capture_detailed);
        #[cfg(feature = "telemetry")]
        self.metrics.record(tier.tier, risk.score, capture_detailed);

        log::debug!(
            "tail-first: event={} risk={} tier={} rate={} detail={:?} reasons={:?}",
            record.event_id(),
            risk.score,
            tier.tier,
            tier.sample_rate,
            detail,
            risk.reasons
        );

        TailFirstDecision {
            risk,
            tier,
            capture_detailed,
            detail,
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl std::fmt::Debug for TailFirstController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailFirstController")
            .field("classifier", &self.classifier)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::FixedDraw;
    use crate::tier::Tier;

    fn controller(draw: f64) -> TailFirstController {
        TailFirstController::with_source(&ApmConfig::default(), Arc::new(FixedDraw(draw)))
    }

    #[test]
    fn test_empty_metrics_kept_when_draw_within_rate() {
        let mut record = EventRecord::with_start("e1", "idle", 0);
        record.add_trace_step("tick", 1.0);

        let decision = controller(0.005).apply(&mut record);

        assert_eq!(decision.risk.score, 0.0);
        assert_eq!(decision.tier.tier, Tier::Stable);
        assert!(decision.capture_detailed);
        assert_eq!(record.trace().len(), 1);
        assert_eq!(record.metrics()["riskScore"], 0.0);
    }

    #[test]
    fn test_empty_metrics_reduced_when_draw_above_rate() {
        let mut record = EventRecord::with_start("e1", "idle", 0);
        record.add_trace_step("tick", 1.0);
        record.add_metric("durationMs", 4.0);
        record.add_metric("threads", 12.0);

        let decision = controller(0.5).apply(&mut record);

        assert_eq!(decision.detail, DetailLevel::Reduced);
        assert!(record.trace().is_empty());
        assert_eq!(record.metrics().len(), 2);
        assert_eq!(record.tags()["tailFirstDetailed"], "false");
    }

    #[test]
    fn test_saturated_event_always_kept() {
        let mut record = EventRecord::with_start("e2", "overload", 0);
        for key in ["queuePressure", "dbWaitRatio", "lockWait", "retryRate", "gcRatio", "cpuUtil"] {
            record.add_metric(key, 100.0);
        }
        record.add_trace_step("db.query", 900.0);

        let decision = controller(0.999).apply(&mut record);

        assert_eq!(decision.risk.score, 1.0);
        assert_eq!(decision.tier.tier, Tier::Critical);
        assert_eq!(decision.detail, DetailLevel::Full);
        assert_eq!(record.metrics().len(), 7);
        assert_eq!(record.tags()["tailFirstMode"], "critical");
        assert_eq!(
            record.tags()["tailFirstReasons"],
            "queue_pressure,db_wait_ratio,lock_wait,retry_spike,gc_ratio,cpu_util"
        );
    }

    #[test]
    fn test_no_reasons_tag_when_calm() {
        let mut record = EventRecord::with_start("e3", "calm", 0);
        record.add_metric("cpuUtil", 20.0);

        controller(0.0).apply(&mut record);

        assert!(!record.tags().contains_key("tailFirstReasons"));
    }

    #[test]
    fn test_stats_follow_decisions() {
        let controller = controller(0.9);

        let mut calm = EventRecord::with_start("a", "calm", 0);
        controller.apply(&mut calm);

        let mut busy = EventRecord::with_start("b", "busy", 0);
        busy.add_metric("queueDepth", 300.0);
        controller.apply(&mut busy);

        let stats = controller.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.stable, 1);
        assert_eq!(stats.warning, 1);
        assert_eq!(stats.detailed_captured, 1);
        assert_eq!(stats.max_risk, Some(0.35));

        controller.reset_stats();
        assert_eq!(controller.stats().total, 0);
    }
}
