//! Tow detector
//!
//! A towed car "teleports" straight into its pit stall: the previous cycle
//! had it out on the circuit, the current cycle has it parked, with no
//! pit-entry path in between. The detector emits the previous snapshot so
//! the reported position is the pre-tow incident site, which is what
//! proximity clustering needs.

use crate::result::{eligible, DetectionResult, Detector, DetectorState, IncidentKind};
use scg_core::model::TrackLocation;
use scg_core::registry::DriverRegistry;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct TowDetector;

impl TowDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Detector for TowDetector {
    fn kind(&self) -> IncidentKind {
        IncidentKind::Towing
    }

    fn should_run(&self, _state: &DetectorState) -> bool {
        true
    }

    fn detect(&mut self, registry: &DriverRegistry) -> DetectionResult {
        let mut towed = Vec::new();

        for (current, previous) in registry.pairs() {
            if !eligible(current) {
                continue;
            }

            // Tow signature: jumped straight into the stall without passing
            // through the pit entry
            if current.track_location == TrackLocation::InPitStall
                && !matches!(
                    previous.track_location,
                    TrackLocation::InPitStall | TrackLocation::ApproachingPits
                )
                && !previous.on_pit_road
            {
                debug!(
                    driver_index = previous.driver_index,
                    car_number = previous.car_number.as_deref().unwrap_or("?"),
                    from = ?previous.track_location,
                    lap_distance = previous.lap_distance.0,
                    "car towed to pits"
                );
                towed.push(previous.clone());
            }
        }

        if !towed.is_empty() {
            info!(count = towed.len(), "found cars towed to pits");
        }

        DetectionResult::with_drivers(IncidentKind::Towing, towed)
    }
}
