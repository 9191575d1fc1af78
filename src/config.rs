//! APM module configuration
//!
//! Built once at startup, validated, then shared read-only by every caller.
//!
//! ## Environment
//!
//! ```ignore
//! // APM_SERVICE_NAME=checkout
//! // APM_ENVIRONMENT=prod
//! // APM_OTLP_ENDPOINT=http://collector:4317
//! // APM_DASHBOARD_ENDPOINT=http://dashboard:3000/ingest
//! // APM_SAMPLE_RATIO=1.0
//! // APM_TAIL_FIRST_ENABLED=true
//! // APM_STABLE_SAMPLE_RATIO=0.01
//! // APM_WARNING_SAMPLE_RATIO=0.1
//! // APM_CRITICAL_SAMPLE_RATIO=1.0
//! // APM_RISK_WARNING_THRESHOLD=0.3
//! // APM_RISK_CRITICAL_THRESHOLD=0.6
//! let config = ApmConfig::from_env()?;
//! ```

const DEFAULT_SERVICE_NAME: &str = "apm-service";
const DEFAULT_ENVIRONMENT: &str = "dev";
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
const DEFAULT_DASHBOARD_ENDPOINT: &str = "http://localhost:3000/ingest";

/// Error when a configuration value is unusable
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Ratio or threshold outside `[0, 1]` (or not finite)
    OutOfRange { field: &'static str, value: f64 },
    /// Warning threshold above critical threshold
    ThresholdOrder { warning: f64, critical: f64 },
    /// Required string setting is empty
    Empty { field: &'static str },
    /// Environment variable could not be parsed
    InvalidValue { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::OutOfRange { field, value } => {
                write!(f, "Invalid {}: {} (expected a value in [0, 1])", field, value)
            }
            ConfigError::ThresholdOrder { warning, critical } => {
                write!(
                    f,
                    "Warning threshold {} is above critical threshold {}",
                    warning, critical
                )
            }
            ConfigError::Empty { field } => write!(f, "Missing {}", field),
            ConfigError::InvalidValue { var, value } => {
                write!(f, "Failed to parse {}: {:?}", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validated configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ApmConfig {
    /// Pass-through resource attribute, no effect on scoring
    pub service_name: String,
    /// Pass-through resource attribute, no effect on scoring
    pub environment: String,
    pub otlp_endpoint: String,
    pub dashboard_endpoint: String,
    /// Ratio for the trace-id based span sampler
    pub sample_ratio: f64,
    /// Gates whether the tail-first controller runs at all
    pub tail_first_enabled: bool,
    pub stable_sample_ratio: f64,
    pub warning_sample_ratio: f64,
    pub critical_sample_ratio: f64,
    pub risk_warning_threshold: f64,
    pub risk_critical_threshold: f64,
}

impl Default for ApmConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            otlp_endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            dashboard_endpoint: DEFAULT_DASHBOARD_ENDPOINT.to_string(),
            sample_ratio: 1.0,
            tail_first_enabled: true,
            stable_sample_ratio: 0.01,
            warning_sample_ratio: 0.1,
            critical_sample_ratio: 1.0,
            risk_warning_threshold: 0.3,
            risk_critical_threshold: 0.6,
        }
    }
}

impl ApmConfig {
    pub fn builder() -> ApmConfigBuilder {
        ApmConfigBuilder::default()
    }

    /// Read `APM_*` environment variables on top of the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Some(v) = env_string("APM_SERVICE_NAME") {
            builder = builder.service_name(v);
        }
        if let Some(v) = env_string("APM_ENVIRONMENT") {
            builder = builder.environment(v);
        }
        if let Some(v) = env_string("APM_OTLP_ENDPOINT") {
            builder = builder.otlp_endpoint(v);
        }
        if let Some(v) = env_string("APM_DASHBOARD_ENDPOINT") {
            builder = builder.dashboard_endpoint(v);
        }
        if let Some(v) = env_parse::<f64>("APM_SAMPLE_RATIO")? {
            builder = builder.sample_ratio(v);
        }
        if let Some(v) = env_parse::<bool>("APM_TAIL_FIRST_ENABLED")? {
            builder = builder.tail_first_enabled(v);
        }
        if let Some(v) = env_parse::<f64>("APM_STABLE_SAMPLE_RATIO")? {
            builder = builder.stable_sample_ratio(v);
        }
        if let Some(v) = env_parse::<f64>("APM_WARNING_SAMPLE_RATIO")? {
            builder = builder.warning_sample_ratio(v);
        }
        if let Some(v) = env_parse::<f64>("APM_CRITICAL_SAMPLE_RATIO")? {
            builder = builder.critical_sample_ratio(v);
        }
        if let Some(v) = env_parse::<f64>("APM_RISK_WARNING_THRESHOLD")? {
            builder = builder.risk_warning_threshold(v);
        }
        if let Some(v) = env_parse::<f64>("APM_RISK_CRITICAL_THRESHOLD")? {
            builder = builder.risk_critical_threshold(v);
        }

        builder.build()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dashboard_endpoint.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "dashboard_endpoint",
            });
        }

        for (field, value) in [
            ("sample_ratio", self.sample_ratio),
            ("stable_sample_ratio", self.stable_sample_ratio),
            ("warning_sample_ratio", self.warning_sample_ratio),
            ("critical_sample_ratio", self.critical_sample_ratio),
            ("risk_warning_threshold", self.risk_warning_threshold),
            ("risk_critical_threshold", self.risk_critical_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        if self.risk_warning_threshold > self.risk_critical_threshold {
            return Err(ConfigError::ThresholdOrder {
                warning: self.risk_warning_threshold,
                critical: self.risk_critical_threshold,
            });
        }

        Ok(())
    }
}

fn env_string(var: &'static str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env_string(var) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(None),
    }
}

/// Fluent builder, starts from the defaults
#[derive(Debug, Clone, Default)]
pub struct ApmConfigBuilder {
    config: ApmConfig,
}

impl ApmConfigBuilder {
    pub fn service_name(mut self, service_name: impl Into<String>) -> Self {
        self.config.service_name = service_name.into();
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.config.environment = environment.into();
        self
    }

    pub fn otlp_endpoint(mut self, otlp_endpoint: impl Into<String>) -> Self {
        self.config.otlp_endpoint = otlp_endpoint.into();
        self
    }

    pub fn dashboard_endpoint(mut self, dashboard_endpoint: impl Into<String>) -> Self {
        self.config.dashboard_endpoint = dashboard_endpoint.into();
        self
    }

    pub fn sample_ratio(mut self, sample_ratio: f64) -> Self {
        self.config.sample_ratio = sample_ratio;
        self
    }

    pub fn tail_first_enabled(mut self, enabled: bool) -> Self {
        self.config.tail_first_enabled = enabled;
        self
    }

    pub fn stable_sample_ratio(mut self, ratio: f64) -> Self {
        self.config.stable_sample_ratio = ratio;
        self
    }

    pub fn warning_sample_ratio(mut self, ratio: f64) -> Self {
        self.config.warning_sample_ratio = ratio;
        self
    }

    pub fn critical_sample_ratio(mut self, ratio: f64) -> Self {
        self.config.critical_sample_ratio = ratio;
        self
    }

    pub fn risk_warning_threshold(mut self, threshold: f64) -> Self {
        self.config.risk_warning_threshold = threshold;
        self
    }

    pub fn risk_critical_threshold(mut self, threshold: f64) -> Self {
        self.config.risk_critical_threshold = threshold;
        self
    }

    pub fn build(self) -> Result<ApmConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApmConfig::builder().build().unwrap();

        assert_eq!(config, ApmConfig::default());
        assert_eq!(config.service_name, "apm-service");
        assert_eq!(config.dashboard_endpoint, "http://localhost:3000/ingest");
        assert!(config.tail_first_enabled);
        assert_eq!(config.stable_sample_ratio, 0.01);
        assert_eq!(config.warning_sample_ratio, 0.1);
        assert_eq!(config.critical_sample_ratio, 1.0);
        assert_eq!(config.risk_warning_threshold, 0.3);
        assert_eq!(config.risk_critical_threshold, 0.6);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ApmConfig::builder()
            .service_name("checkout")
            .environment("prod")
            .tail_first_enabled(false)
            .stable_sample_ratio(0.05)
            .build()
            .unwrap();

        assert_eq!(config.service_name, "checkout");
        assert_eq!(config.environment, "prod");
        assert!(!config.tail_first_enabled);
        assert_eq!(config.stable_sample_ratio, 0.05);
    }

    #[test]
    fn test_rejects_out_of_range_ratio() {
        let result = ApmConfig::builder().warning_sample_ratio(1.5).build();
        assert_eq!(
            result,
            Err(ConfigError::OutOfRange {
                field: "warning_sample_ratio",
                value: 1.5
            })
        );

        let result = ApmConfig::builder().stable_sample_ratio(f64::NAN).build();
        assert!(matches!(result, Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let result = ApmConfig::builder()
            .risk_warning_threshold(0.7)
            .risk_critical_threshold(0.4)
            .build();

        assert!(matches!(result, Err(ConfigError::ThresholdOrder { .. })));
    }

    #[test]
    fn test_rejects_empty_endpoint() {
        let result = ApmConfig::builder().dashboard_endpoint("  ").build();
        assert_eq!(
            result,
            Err(ConfigError::Empty {
                field: "dashboard_endpoint"
            })
        );
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidValue {
            var: "APM_SAMPLE_RATIO",
            value: "lots".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to parse APM_SAMPLE_RATIO: \"lots\"");
    }
}
