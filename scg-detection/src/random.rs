//! Random caution detector
//!
//! Draws one value per cycle from an injected probability source and
//! signals an occurrence when it falls below the configured probability.
//! Unlike the other detectors this one gates in `should_run`: it is only
//! live inside its configured session window and while its prior trigger
//! count is under the cap.

use crate::result::{DetectionResult, Detector, DetectorState, IncidentKind};
use crate::settings::RandomSettings;
use scg_core::registry::DriverRegistry;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// A source of values uniform-ish in `[0, 1)`.
pub trait ProbabilitySource: Send {
    fn roll(&mut self) -> f64;
}

/// Deterministic sine-hash sequence.
///
/// The same cheap construction the demo grid generator uses for jitter;
/// plenty for "roughly one caution per N polls" and fully reproducible
/// from its seed.
#[derive(Debug)]
pub struct SineHashRoll {
    seed: f64,
    counter: u64,
}

impl SineHashRoll {
    /// Seeded from the wall clock, so sessions differ from one another.
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64)
            .unwrap_or(0);
        Self::with_seed(nanos)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: (seed % 100_000) as f64,
            counter: 0,
        }
    }
}

impl Default for SineHashRoll {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbabilitySource for SineHashRoll {
    fn roll(&mut self) -> f64 {
        self.counter += 1;
        let x = ((self.seed + self.counter as f64) * 12.9898 + 78.233).sin() * 43_758.547;
        x - x.floor()
    }
}

pub struct RandomDetector {
    settings: RandomSettings,
    source: Box<dyn ProbabilitySource>,
}

impl RandomDetector {
    pub fn new(settings: RandomSettings) -> Self {
        Self::with_probability_source(settings, Box::new(SineHashRoll::new()))
    }

    /// Inject a probability source, for deterministic tests and replay.
    pub fn with_probability_source(
        settings: RandomSettings,
        source: Box<dyn ProbabilitySource>,
    ) -> Self {
        Self { settings, source }
    }
}

impl Detector for RandomDetector {
    fn kind(&self) -> IncidentKind {
        IncidentKind::Random
    }

    fn should_run(&self, state: &DetectorState) -> bool {
        let max = self.settings.max_events;
        if max != 0 && state.trigger_count(IncidentKind::Random) >= max {
            return false;
        }

        let elapsed = state.session_elapsed;
        elapsed >= self.settings.start_minute * 60.0 && elapsed <= self.settings.end_minute * 60.0
    }

    fn detect(&mut self, _registry: &DriverRegistry) -> DetectionResult {
        let sample = self.source.roll();
        let occurred = sample < self.settings.probability;

        if occurred {
            info!(sample, probability = self.settings.probability, "random caution roll hit");
        } else {
            debug!(sample, probability = self.settings.probability, "random caution roll missed");
        }

        DetectionResult::occurrence(IncidentKind::Random, occurred)
    }
}
