//! Composite risk scoring
//!
//! Six system-health signals are resolved through their aliases, brought onto
//! the unit interval and combined with fixed weights into a single score in
//! `[0, 1]`, rounded to 4 decimals. A signal that is missing contributes
//! nothing: absence is never treated as high risk.

use std::collections::BTreeMap;

use crate::normalize::{percent_to_unit, resolve, to_percent_scale, to_unit_interval};

/// Queue depth at which derived queue pressure starts rising
const QUEUE_DEPTH_MIN: f64 = 10.0;

/// Queue depth at which derived queue pressure saturates
const QUEUE_DEPTH_MAX: f64 = 300.0;

/// Normalized component level at which a signal is reported as a reason
pub const DEFAULT_REASON_THRESHOLD: f64 = 0.8;

/// Decimal digits kept in the final score
const SCORE_SCALE: f64 = 10_000.0;

/// How a signal's raw value is brought onto the unit interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Fraction-or-percentage heuristic, then `0..=100` → `0..=1`
    Percent,
    /// Direct percentage first, else a depth rescaled over `[min, max]` and
    /// treated as a percentage. The depth form is strictly a fallback.
    QueuePressure {
        depth_aliases: &'static [&'static str],
        min: f64,
        max: f64,
    },
}

/// One weighted input of the composite score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    /// Logical name, also used as the reason label
    pub name: &'static str,
    /// Accepted metric names, first usable one wins
    pub aliases: &'static [&'static str],
    pub normalization: Normalization,
    pub weight: f64,
}

impl Signal {
    /// Normalized `[0, 1]` level of this signal in `metrics`
    pub fn level(&self, metrics: &BTreeMap<String, f64>) -> f64 {
        match self.normalization {
            Normalization::Percent => percent_to_unit(to_percent_scale(resolve(metrics, self.aliases))),
            Normalization::QueuePressure {
                depth_aliases,
                min,
                max,
            } => match resolve(metrics, self.aliases) {
                Some(pressure) => percent_to_unit(to_percent_scale(Some(pressure))),
                None => match resolve(metrics, depth_aliases) {
                    Some(depth) => percent_to_unit(Some(to_unit_interval(min, max, Some(depth)) * 100.0)),
                    None => 0.0,
                },
            },
        }
    }
}

pub const QUEUE_PRESSURE: Signal = Signal {
    name: "queue_pressure",
    aliases: &["queuePressure", "queue_pressure"],
    normalization: Normalization::QueuePressure {
        depth_aliases: &["queueDepth", "queueLen"],
        min: QUEUE_DEPTH_MIN,
        max: QUEUE_DEPTH_MAX,
    },
    weight: 0.35,
};

pub const DB_WAIT_RATIO: Signal = Signal {
    name: "db_wait_ratio",
    aliases: &["dbWaitRatio", "db_wait_ratio", "dbPoolUsagePct", "dbConnPoolPct"],
    normalization: Normalization::Percent,
    weight: 0.25,
};

pub const LOCK_WAIT: Signal = Signal {
    name: "lock_wait",
    aliases: &["lockWait", "lock_wait", "lockWaitRatio", "lock_wait_ratio"],
    normalization: Normalization::Percent,
    weight: 0.15,
};

pub const RETRY_RATE: Signal = Signal {
    name: "retry_spike",
    aliases: &["retryRate", "retry_rate", "retryPct"],
    normalization: Normalization::Percent,
    weight: 0.10,
};

pub const GC_RATIO: Signal = Signal {
    name: "gc_ratio",
    aliases: &["gcRatio", "gc_ratio", "gcPauseRatio", "gc_pause_ratio"],
    normalization: Normalization::Percent,
    weight: 0.10,
};

pub const CPU_UTIL: Signal = Signal {
    name: "cpu_util",
    aliases: &["cpuUtil", "cpu_util", "cpuPct"],
    normalization: Normalization::Percent,
    weight: 0.05,
};

/// All signals, in weight order
pub const SIGNALS: [Signal; 6] = [QUEUE_PRESSURE, DB_WAIT_RATIO, LOCK_WAIT, RETRY_RATE, GC_RATIO, CPU_UTIL];

/// Normalized level of one signal for one event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    pub signal: &'static str,
    pub level: f64,
    pub weight: f64,
}

/// Result of scoring one metrics snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    /// Composite score in `[0, 1]`, rounded to 4 decimals
    pub score: f64,
    pub components: Vec<Component>,
    /// Signals whose level reached the reason threshold
    pub reasons: Vec<&'static str>,
}

/// Weighted aggregation of the signal table
#[derive(Debug, Clone)]
pub struct RiskScorer {
    signals: Vec<Signal>,
    reason_threshold: f64,
}

impl RiskScorer {
    pub fn new() -> Self {
        Self {
            signals: SIGNALS.to_vec(),
            reason_threshold: DEFAULT_REASON_THRESHOLD,
        }
    }

    pub fn with_reason_threshold(mut self, threshold: f64) -> Self {
        self.reason_threshold = threshold;
        self
    }

    /// Composite score only
    pub fn score(&self, metrics: &BTreeMap<String, f64>) -> f64 {
        self.assess(metrics).score
    }

    /// Composite score with per-signal breakdown and reasons
    pub fn assess(&self, metrics: &BTreeMap<String, f64>) -> RiskAssessment {
        let components: Vec<Component> = self
            .signals
            .iter()
            .map(|signal| Component {
                signal: signal.name,
                level: signal.level(metrics),
                weight: signal.weight,
            })
            .collect();

        let weighted: f64 = components.iter().map(|c| c.level * c.weight).sum();

        let reasons = components
            .iter()
            .filter(|c| c.level >= self.reason_threshold)
            .map(|c| c.signal)
            .collect();

        RiskAssessment {
            score: round_score(weighted),
            components,
            reasons,
        }
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn round_score(weighted: f64) -> f64 {
    (weighted.clamp(0.0, 1.0) * SCORE_SCALE).round() / SCORE_SCALE
}
