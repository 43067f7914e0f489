//! SafetyCarGenerator Monitor
//!
//! Thin demonstration loop over the detection core: polls a synthetic
//! grid, runs the detectors, feeds the threshold checker and logs every
//! caution decision. It sends nothing to any simulator and persists
//! nothing; its job is to show one full cycle wired together.

use anyhow::Result;
use scg_adapters::DemoGridSource;
use scg_core::clock::{Clock, SystemClock};
use scg_core::registry::DriverRegistry;
use scg_core::session::Session;
use scg_core::source::TelemetrySource;
use scg_detection::{
    build_detectors, DetectorSettings, DetectorState, ThresholdChecker, ThresholdCheckerSettings,
};
use std::time::Duration;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(1000);
const DEMO_CARS: usize = 12;
const DEMO_CYCLES: u32 = 600;

/// Seconds to hold off after a caution before detecting again.
const MIN_TIME_BETWEEN_CAUTIONS: f64 = 120.0;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting SafetyCarGenerator Monitor");

    let threshold_settings = ThresholdCheckerSettings::default();
    let detector_settings = DetectorSettings::default();
    let settings_json = serde_json::to_string(&threshold_settings)?;
    info!(settings = %settings_json, "threshold configuration");

    let mut source = DemoGridSource::new(DEMO_CARS);
    let mut registry = DriverRegistry::new();
    let mut session = Session::new();
    let mut detectors = build_detectors(&detector_settings)?;
    let mut checker = ThresholdChecker::new(threshold_settings.clone())?;

    let clock = SystemClock;
    let mut race_start: Option<f64> = None;
    let mut state = DetectorState::new(0.0);
    let mut cautions = 0u32;
    let mut cooldown_until = f64::NEG_INFINITY;

    for cycle in 0..DEMO_CYCLES {
        registry.update(&mut source);
        session.update(&mut source);

        let now = clock.now();

        // Anchor the dynamic threshold window on the first green flag
        if race_start.is_none() && session.is_race_session() && session.is_green_flag() {
            info!(cycle, "green flag, race underway");
            race_start = Some(now);
            checker.race_started(now);
        }

        state.session_elapsed = race_start.map(|start| now - start).unwrap_or(0.0);

        if race_start.is_some() && now >= cooldown_until {
            // A random occurrence is a caution cause of its own; it never
            // enters the event window
            let mut random_caution = false;

            for detector in detectors.iter_mut() {
                if !detector.should_run(&state) {
                    continue;
                }
                let result = detector.detect(&registry);
                if result.occurred() {
                    debug!(kind = %result.kind(), implicated = result.drivers().len(), "detection");
                }
                if result.has_drivers() {
                    checker.register_detection_result(&result);
                } else if result.occurred() {
                    random_caution = true;
                    state.record_trigger(result.kind());
                }
            }

            checker.clean_up_events();
            let decision = checker.threshold_met();
            if random_caution || decision.met {
                cautions += 1;
                let reason = if decision.met {
                    decision.message
                } else {
                    "random caution".to_string()
                };
                info!(cycle, cautions, reason = %reason, "CAUTION");

                // A fresh checker over the same settings keeps the spent
                // window from immediately re-triggering
                checker = ThresholdChecker::new(threshold_settings.clone())?;
                if let Some(start) = race_start {
                    checker.race_started(start);
                }
                cooldown_until = now + MIN_TIME_BETWEEN_CAUTIONS;
            }
        }

        if !source.connected() {
            info!("telemetry source disconnected, shutting down");
            break;
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    info!(cautions, "monitor run complete");
    Ok(())
}
