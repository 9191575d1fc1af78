//! Environment-driven configuration
//!
//! Kept as a single test: environment variables are process-global, so
//! splitting the cases would let them race each other.

use tailfirst_apm::{ApmConfig, ConfigError};

#[test]
fn test_from_env() {
    std::env::set_var("APM_SERVICE_NAME", "billing");
    std::env::set_var("APM_ENVIRONMENT", "staging");
    std::env::set_var("APM_TAIL_FIRST_ENABLED", "false");
    std::env::set_var("APM_STABLE_SAMPLE_RATIO", "0.05");
    std::env::set_var("APM_RISK_CRITICAL_THRESHOLD", " 0.75 ");

    let config = ApmConfig::from_env().unwrap();
    assert_eq!(config.service_name, "billing");
    assert_eq!(config.environment, "staging");
    assert!(!config.tail_first_enabled);
    assert_eq!(config.stable_sample_ratio, 0.05);
    assert_eq!(config.risk_critical_threshold, 0.75);
    assert_eq!(config.risk_warning_threshold, 0.3);
    assert_eq!(config.dashboard_endpoint, "http://localhost:3000/ingest");

    std::env::set_var("APM_WARNING_SAMPLE_RATIO", "often");
    assert_eq!(
        ApmConfig::from_env(),
        Err(ConfigError::InvalidValue {
            var: "APM_WARNING_SAMPLE_RATIO",
            value: "often".to_string()
        })
    );

    std::env::set_var("APM_WARNING_SAMPLE_RATIO", "2.0");
    assert!(matches!(
        ApmConfig::from_env(),
        Err(ConfigError::OutOfRange {
            field: "warning_sample_ratio",
            ..
        })
    ));

    for var in [
        "APM_SERVICE_NAME",
        "APM_ENVIRONMENT",
        "APM_TAIL_FIRST_ENABLED",
        "APM_STABLE_SAMPLE_RATIO",
        "APM_RISK_CRITICAL_THRESHOLD",
        "APM_WARNING_SAMPLE_RATIO",
    ] {
        std::env::remove_var(var);
    }

    assert_eq!(ApmConfig::from_env().unwrap(), ApmConfig::default());
}
