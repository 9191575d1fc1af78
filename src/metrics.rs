//! Metrics for the tail-first controller
//!
//! Keeps running counts of sampling decisions:
//! - decisions per tier
//! - detailed captures vs reductions
//! - risk score sum, min and max
//!
//! With the `telemetry` feature the same decisions are also recorded as
//! OpenTelemetry instruments.

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "telemetry")]
use opentelemetry::metrics::{Counter, Histogram, Meter};
#[cfg(feature = "telemetry")]
use opentelemetry::{KeyValue, global};

use crate::tier::Tier;

/// Risk scores carry 4 decimals, so they accumulate exactly as basis points
const BASIS_POINTS: f64 = 10_000.0;

/// Lock-free decision counters, shared by every finalizing thread
#[derive(Debug)]
pub struct DecisionStats {
    total: AtomicU64,
    stable: AtomicU64,
    warning: AtomicU64,
    critical: AtomicU64,
    detailed: AtomicU64,
    risk_sum_bp: AtomicU64,
    risk_min_bp: AtomicU64,
    risk_max_bp: AtomicU64,
}

/// Point-in-time view of [`DecisionStats`]
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total: u64,
    pub stable: u64,
    pub warning: u64,
    pub critical: u64,
    pub detailed_captured: u64,
    pub detailed_capture_ratio: f64,
    pub avg_risk: f64,
    pub min_risk: Option<f64>,
    pub max_risk: Option<f64>,
}

impl StatsSnapshot {
    /// Share of decisions that landed in `tier`
    pub fn tier_ratio(&self, tier: Tier) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        let count = match tier {
            Tier::Stable => self.stable,
            Tier::Warning => self.warning,
            Tier::Critical => self.critical,
        };

        count as f64 / self.total as f64
    }
}

impl DecisionStats {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            stable: AtomicU64::new(0),
            warning: AtomicU64::new(0),
            critical: AtomicU64::new(0),
            detailed: AtomicU64::new(0),
            risk_sum_bp: AtomicU64::new(0),
            risk_min_bp: AtomicU64::new(u64::MAX),
            risk_max_bp: AtomicU64::new(0),
        }
    }

    pub fn record(&self, tier: Tier, risk_score: f64, detailed: bool) {
        let bp = (risk_score.clamp(0.0, 1.0) * BASIS_POINTS).round() as u64;

        self.total.fetch_add(1, Ordering::Relaxed);
        match tier {
            Tier::Stable => self.stable.fetch_add(1, Ordering::Relaxed),
            Tier::Warning => self.warning.fetch_add(1, Ordering::Relaxed),
            Tier::Critical => self.critical.fetch_add(1, Ordering::Relaxed),
        };
        if detailed {
            self.detailed.fetch_add(1, Ordering::Relaxed);
        }

        self.risk_sum_bp.fetch_add(bp, Ordering::Relaxed);
        self.risk_min_bp.fetch_min(bp, Ordering::Relaxed);
        self.risk_max_bp.fetch_max(bp, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let detailed = self.detailed.load(Ordering::Relaxed);
        let sum_bp = self.risk_sum_bp.load(Ordering::Relaxed);
        let min_bp = self.risk_min_bp.load(Ordering::Relaxed);
        let max_bp = self.risk_max_bp.load(Ordering::Relaxed);

        let (detailed_capture_ratio, avg_risk, min_risk, max_risk) = if total > 0 {
            (
                detailed as f64 / total as f64,
                sum_bp as f64 / BASIS_POINTS / total as f64,
                Some(min_bp as f64 / BASIS_POINTS),
                Some(max_bp as f64 / BASIS_POINTS),
            )
        } else {
            (0.0, 0.0, None, None)
        };

        StatsSnapshot {
            total,
            stable: self.stable.load(Ordering::Relaxed),
            warning: self.warning.load(Ordering::Relaxed),
            critical: self.critical.load(Ordering::Relaxed),
            detailed_captured: detailed,
            detailed_capture_ratio,
            avg_risk,
            min_risk,
            max_risk,
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.total,
            &self.stable,
            &self.warning,
            &self.critical,
            &self.detailed,
            &self.risk_sum_bp,
            &self.risk_max_bp,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.risk_min_bp.store(u64::MAX, Ordering::Relaxed);
    }
}

impl Default for DecisionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// OpenTelemetry instruments for sampling decisions
#[cfg(feature = "telemetry")]
pub struct DecisionMetrics {
    pub decisions_total: Counter<u64>,
    pub reduced_total: Counter<u64>,
    pub risk_score: Histogram<f64>,
}

#[cfg(feature = "telemetry")]
impl DecisionMetrics {
    pub fn new(meter: Meter) -> Self {
        Self {
            decisions_total: meter
                .u64_counter("tail_first.decisions.total")
                .with_description("Total number of tail-first sampling decisions")
                .build(),
            reduced_total: meter
                .u64_counter("tail_first.reduced.total")
                .with_description("Events collapsed to summary metrics")
                .build(),
            risk_score: meter
                .f64_histogram("tail_first.risk_score")
                .with_description("Composite risk score per event")
                .build(),
        }
    }

    /// Instruments on the global meter provider
    pub fn from_global() -> Self {
        Self::new(global::meter("tailfirst-apm"))
    }

    pub fn record(&self, tier: Tier, risk_score: f64, detailed: bool) {
        let labels = [
            KeyValue::new("tier", tier.as_str()),
            KeyValue::new("detailed", detailed),
        ];

        self.decisions_total.add(1, &labels);
        self.risk_score.record(risk_score, &labels[..1]);

        if !detailed {
            self.reduced_total.add(1, &labels[..1]);
        }
    }
}
