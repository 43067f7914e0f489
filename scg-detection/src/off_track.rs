//! Off-track detector
//!
//! Implicates every eligible car the simulator currently reports as off
//! the racing surface. Stateless; a car that stays off track is implicated
//! every cycle and collapses to one event per window in the threshold
//! checker's dedupe pass.

use crate::result::{eligible, DetectionResult, Detector, DetectorState, IncidentKind};
use scg_core::model::TrackLocation;
use scg_core::registry::DriverRegistry;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct OffTrackDetector;

impl OffTrackDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for OffTrackDetector {
    fn kind(&self) -> IncidentKind {
        IncidentKind::OffTrack
    }

    fn should_run(&self, _state: &DetectorState) -> bool {
        true
    }

    fn detect(&mut self, registry: &DriverRegistry) -> DetectionResult {
        let mut off_track = Vec::new();

        for driver in registry.current() {
            if !eligible(driver) {
                continue;
            }

            if driver.track_location == TrackLocation::OffTrack {
                debug!(
                    driver_index = driver.driver_index,
                    car_number = driver.car_number.as_deref().unwrap_or("?"),
                    lap_distance = driver.lap_distance.0,
                    "car is off track"
                );
                off_track.push(driver.clone());
            }
        }

        if !off_track.is_empty() {
            info!(count = off_track.len(), "found cars off track");
        }

        DetectionResult::with_drivers(IncidentKind::OffTrack, off_track)
    }
}
