//! Stopped-car detector
//!
//! There is no speed channel in the grid arrays, so "stopped" is a proxy:
//! a car whose circular lap-position delta between two consecutive cycles
//! stays below a configured minimum, without having crossed the line. Cars
//! anywhere in the pit lane are excluded; being stationary there is
//! routine.

use crate::result::{eligible, DetectionResult, Detector, DetectorState, IncidentKind};
use scg_core::model::TrackLocation;
use scg_core::registry::DriverRegistry;
use tracing::{debug, info};

#[derive(Debug)]
pub struct StoppedDetector {
    min_progress: f32,
}

impl StoppedDetector {
    /// `min_progress` is the lap fraction a moving car is expected to cover
    /// between two polling cycles.
    pub fn new(min_progress: f32) -> Self {
        Self { min_progress }
    }
}

impl Detector for StoppedDetector {
    fn kind(&self) -> IncidentKind {
        IncidentKind::Stopped
    }

    fn should_run(&self, _state: &DetectorState) -> bool {
        true
    }

    fn detect(&mut self, registry: &DriverRegistry) -> DetectionResult {
        let mut stopped = Vec::new();

        for (current, previous) in registry.pairs() {
            if !eligible(current) {
                continue;
            }

            if current.on_pit_road
                || matches!(
                    current.track_location,
                    TrackLocation::InPitStall | TrackLocation::ApproachingPits
                )
            {
                continue;
            }

            // Crossing the line resets lap_distance; the car is moving
            if current.laps_completed != previous.laps_completed {
                continue;
            }

            if !previous.lap_distance.is_finite() {
                continue;
            }

            let progress = current.lap_distance.circular_distance(previous.lap_distance);
            if progress < self.min_progress {
                debug!(
                    driver_index = current.driver_index,
                    car_number = current.car_number.as_deref().unwrap_or("?"),
                    progress,
                    "car has stopped on circuit"
                );
                stopped.push(current.clone());
            }
        }

        if !stopped.is_empty() {
            info!(count = stopped.len(), "found stopped cars");
        }

        DetectionResult::with_drivers(IncidentKind::Stopped, stopped)
    }
}
