use serde::{Deserialize, Serialize};

use crate::config::ApmConfig;

/// Stability tier derived from the risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Stable,
    Warning,
    Critical,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Stable => "stable",
            Tier::Warning => "warning",
            Tier::Critical => "critical",
        }
    }

    /// Elevated tiers always keep full detail
    pub fn is_elevated(&self) -> bool {
        !matches!(self, Tier::Stable)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier plus the sample rate that applies to it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierDecision {
    pub tier: Tier,
    pub sample_rate: f64,
}

/// Threshold-based tiering
///
/// Lower bounds are inclusive: a score equal to a threshold belongs to the
/// higher tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierClassifier {
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub stable_sample_ratio: f64,
    pub warning_sample_ratio: f64,
    pub critical_sample_ratio: f64,
}

impl TierClassifier {
    pub fn from_config(config: &ApmConfig) -> Self {
        Self {
            warning_threshold: config.risk_warning_threshold,
            critical_threshold: config.risk_critical_threshold,
            stable_sample_ratio: config.stable_sample_ratio,
            warning_sample_ratio: config.warning_sample_ratio,
            critical_sample_ratio: config.critical_sample_ratio,
        }
    }

    pub fn classify(&self, score: f64) -> TierDecision {
        if score >= self.critical_threshold {
            TierDecision {
                tier: Tier::Critical,
                sample_rate: self.critical_sample_ratio,
            }
        } else if score >= self.warning_threshold {
            TierDecision {
                tier: Tier::Warning,
                sample_rate: self.warning_sample_ratio,
            }
        } else {
            TierDecision {
                tier: Tier::Stable,
                sample_rate: self.stable_sample_ratio,
            }
        }
    }
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self::from_config(&ApmConfig::default())
    }
}
