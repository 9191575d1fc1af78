use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tailfirst_apm::{ApmConfig, ApmModule, EventStatus, SeededSource};

const DEFAULT_EVENT_COUNT: usize = 50;
const DEFAULT_INTERVAL_MS: u64 = 100;

/// Probability that a synthetic event runs under heavy load
const HEAVY_LOAD_PROBABILITY: f64 = 0.15;

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

/// Fill an event with plausible system metrics, occasionally under pressure
fn synthetic_metrics(rng: &mut StdRng) -> Vec<(&'static str, f64)> {
    let heavy = rng.gen_bool(HEAVY_LOAD_PROBABILITY);

    let (queue_depth, db_pool, lock_wait, cpu) = if heavy {
        (
            rng.gen_range(120.0..320.0),
            rng.gen_range(0.6..1.0),
            rng.gen_range(20.0..80.0),
            rng.gen_range(70.0..100.0),
        )
    } else {
        (
            rng.gen_range(0.0..40.0),
            rng.gen_range(0.05..0.4),
            rng.gen_range(0.0..5.0),
            rng.gen_range(5.0..50.0),
        )
    };

    let duration = if heavy {
        rng.gen_range(800.0..3000.0)
    } else {
        rng.gen_range(20.0..250.0)
    };

    vec![
        ("queueDepth", queue_depth),
        ("dbPoolUsagePct", db_pool),
        ("lock_wait", lock_wait),
        ("retryRate", rng.gen_range(0.0..0.05)),
        ("gc_pause_ratio", rng.gen_range(0.0..0.1)),
        ("cpuPct", cpu),
        ("durationMs", duration),
        ("requestCount", 1.0),
        ("errorCount", if heavy && rng.gen_bool(0.3) { 1.0 } else { 0.0 }),
        ("apdex", if duration < 500.0 { 1.0 } else { 0.5 }),
    ]
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config = match ApmConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let telemetry = tailfirst_apm::telemetry::init(&config);

    let event_count = env_or("APM_DEMO_EVENTS", DEFAULT_EVENT_COUNT);
    let interval = Duration::from_millis(env_or("APM_DEMO_INTERVAL_MS", DEFAULT_INTERVAL_MS));
    let seed = std::env::var("APM_DEMO_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok());

    let apm = match ApmModule::new(config) {
        Ok(apm) => apm,
        Err(err) => {
            log::error!("Failed to create APM module: {}", err);
            std::process::exit(1);
        }
    };

    let (apm, mut rng) = match seed {
        Some(seed) => (
            apm.with_sample_source(Arc::new(SeededSource::new(seed))),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        ),
        None => (apm, StdRng::from_entropy()),
    };

    log::info!(
        "sending {} synthetic events to {} every {:?}",
        event_count,
        apm.config().dashboard_endpoint,
        interval
    );

    for i in 0..event_count {
        let route = if i % 3 == 0 { "/cart" } else { "/search" };
        let mut event = apm.start_event("synthetic.request", [("route", route), ("source", "demo")]);

        for (key, value) in synthetic_metrics(&mut rng) {
            event.add_metric(key, value);
        }
        event.add_trace_step("handler.start", 0.0);
        event.add_trace_step("db.query", rng.gen_range(1.0..120.0));
        event.add_trace_step("render", rng.gen_range(0.5..15.0));

        let status = if event.record().metrics().get("errorCount") == Some(&1.0) {
            EventStatus::Error
        } else {
            EventStatus::Ok
        };

        let record = apm.end_event(event, status);
        let event_id = record.event_id().to_string();

        match apm.send_event(record).await {
            Ok(code) => log::debug!("event {} delivered: {}", event_id, code),
            Err(err) => log::warn!("event {} not delivered: {}", event_id, err),
        }

        tokio::time::sleep(interval).await;
    }

    let stats = apm.stats();
    match serde_json::to_string(&stats) {
        Ok(json) => log::info!("tail-first stats: {}", json),
        Err(err) => log::warn!("failed to encode stats: {}", err),
    }

    apm.shutdown();
    telemetry.shutdown();
}
