//! Detail retention and reduction
//!
//! Elevated tiers always keep full detail. Stable events keep it only when a
//! single draw from the sample source lands at or below the tier's sample rate;
//! otherwise the record collapses to a handful of summary metrics and its trace
//! is dropped.

use std::collections::BTreeMap;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::event::{EventRecord, RISK_SCORE_KEY};
use crate::tier::{Tier, TierDecision};

pub const TAG_MODE: &str = "tailFirstMode";
pub const TAG_DETAILED: &str = "tailFirstDetailed";
pub const TAG_SAMPLE_RATE: &str = "tailFirstSampleRate";

/// Metrics that survive reduction (besides the risk score)
pub const ESSENTIAL_METRICS: [&str; 4] = ["durationMs", "requestCount", "errorCount", "apdex"];

/// Source of uniform draws in `[0, 1)`
///
/// Shared by every thread that finalizes events, hence `Send + Sync`.
pub trait SampleSource: Send + Sync {
    fn draw(&self) -> f64;
}

/// Thread-local RNG, independent per thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSource;

impl SampleSource for ThreadRngSource {
    fn draw(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Reproducible draws from a fixed seed
#[derive(Debug)]
pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SampleSource for SeededSource {
    fn draw(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen::<f64>(),
            Err(poisoned) => poisoned.into_inner().gen::<f64>(),
        }
    }
}

/// Always returns the same draw
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub f64);

impl SampleSource for FixedDraw {
    fn draw(&self) -> f64 {
        self.0
    }
}

/// Detail level of a record after the controller ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    Full,
    Reduced,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DetailReducer;

impl DetailReducer {
    pub fn new() -> Self {
        Self
    }

    /// Whether to keep full detail. Only the stable tier consumes a draw.
    pub fn decide(&self, tier: Tier, sample_rate: f64, source: &dyn SampleSource) -> bool {
        if tier.is_elevated() {
            return true;
        }

        source.draw() <= sample_rate
    }

    /// Annotate the record with the decision and, when not detailed, collapse it
    /// to its essential metrics.
    pub fn reduce(
        &self,
        record: &mut EventRecord,
        risk_score: f64,
        decision: TierDecision,
        capture_detailed: bool,
    ) -> DetailLevel {
        record.metrics.insert(RISK_SCORE_KEY.to_string(), risk_score);
        record.set_tag(TAG_MODE, decision.tier.as_str());
        record.set_tag(TAG_DETAILED, capture_detailed.to_string());
        record.set_tag(TAG_SAMPLE_RATE, format!("{:?}", decision.sample_rate));

        if capture_detailed {
            return DetailLevel::Full;
        }

        record.trace.clear();

        let mut light: BTreeMap<String, f64> = ESSENTIAL_METRICS
            .iter()
            .filter_map(|key| record.metrics.get(*key).map(|v| (key.to_string(), *v)))
            .collect();
        light.insert(RISK_SCORE_KEY.to_string(), risk_score);
        record.metrics = light;

        DetailLevel::Reduced
    }
}
