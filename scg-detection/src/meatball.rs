//! Meatball (repairs required) detector
//!
//! Transition-based: a car is implicated on the cycle where the repair
//! flag appears, not on every cycle it stays up. The detector also
//! remembers each car's last position on the racing surface, because a car
//! that is towed to its stall before the flag renders would otherwise
//! report the incident at the pits instead of at the crash site.

use crate::result::{eligible, DetectionResult, Detector, DetectorState, IncidentKind};
use scg_core::model::{LapPosition, TrackLocation};
use scg_core::registry::DriverRegistry;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct MeatballDetector {
    /// Last lap position observed per car while on-track or off-track.
    /// Never evicted, only overwritten by newer observations; lives as
    /// long as the detector instance.
    last_surface_positions: HashMap<i32, LapPosition>,
}

impl MeatballDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Detector for MeatballDetector {
    fn kind(&self) -> IncidentKind {
        IncidentKind::Meatball
    }

    fn should_run(&self, _state: &DetectorState) -> bool {
        true
    }

    fn detect(&mut self, registry: &DriverRegistry) -> DetectionResult {
        let mut flagged = Vec::new();

        for (current, previous) in registry.pairs() {
            if !eligible(current) {
                continue;
            }

            if matches!(
                current.track_location,
                TrackLocation::OnTrack | TrackLocation::OffTrack
            ) {
                self.last_surface_positions
                    .insert(current.driver_index, current.lap_distance);
            }

            let had_flag = previous.session_flags.needs_repair();
            let has_flag = current.session_flags.needs_repair();
            if !has_flag || had_flag {
                continue;
            }

            let mut snapshot = current.clone();
            if current.track_location == TrackLocation::InPitStall {
                // Flag rendered after a tow; report the crash site, not
                // the stall
                if let Some(&position) = self.last_surface_positions.get(&current.driver_index) {
                    debug!(
                        driver_index = current.driver_index,
                        stall_position = current.lap_distance.0,
                        surface_position = position.0,
                        "meatball shown in pit stall, using remembered track position"
                    );
                    snapshot.lap_distance = position;
                }
            }

            debug!(
                driver_index = current.driver_index,
                car_number = current.car_number.as_deref().unwrap_or("?"),
                session_flags = current.session_flags.0,
                "car received the meatball flag"
            );
            flagged.push(snapshot);
        }

        if !flagged.is_empty() {
            info!(count = flagged.len(), "found cars with a fresh meatball flag");
        }

        DetectionResult::with_drivers(IncidentKind::Meatball, flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::driver_at;
    use scg_core::model::{DriverSnapshot, SessionFlags, TrackLocation};

    const MEATBALL: u32 = SessionFlags::REPAIR | SessionFlags::SERVICEABLE;

    fn registry_of(current: Vec<DriverSnapshot>, previous: Vec<DriverSnapshot>) -> DriverRegistry {
        DriverRegistry::from_snapshots(current, previous)
    }

    fn flagged(driver_index: i32, lap_distance: f32) -> DriverSnapshot {
        let mut driver = driver_at(driver_index, lap_distance);
        driver.session_flags = SessionFlags(MEATBALL);
        driver
    }

    #[test]
    fn test_fires_on_flag_transition() {
        let registry = registry_of(
            vec![flagged(0, 0.5), driver_at(1, 0.6)],
            vec![driver_at(0, 0.49), driver_at(1, 0.59)],
        );

        let mut detector = MeatballDetector::new();
        let result = detector.detect(&registry);

        assert_eq!(result.kind(), IncidentKind::Meatball);
        assert_eq!(result.drivers().len(), 1);
        assert_eq!(result.drivers()[0].driver_index, 0);
    }

    #[test]
    fn test_does_not_refire_while_flag_held() {
        let mut detector = MeatballDetector::new();

        // Flag appears
        let registry = registry_of(vec![flagged(0, 0.5)], vec![driver_at(0, 0.49)]);
        assert_eq!(detector.detect(&registry).drivers().len(), 1);

        // Flag still up next cycle: no new event
        let registry = registry_of(vec![flagged(0, 0.51)], vec![flagged(0, 0.5)]);
        assert!(detector.detect(&registry).drivers().is_empty());
    }

    #[test]
    fn test_does_not_fire_on_flag_clearing() {
        let registry = registry_of(vec![driver_at(0, 0.52)], vec![flagged(0, 0.51)]);
        let mut detector = MeatballDetector::new();
        assert!(detector.detect(&registry).drivers().is_empty());
    }

    #[test]
    fn test_refires_on_second_transition() {
        let mut detector = MeatballDetector::new();

        let registry = registry_of(vec![flagged(0, 0.5)], vec![driver_at(0, 0.49)]);
        assert_eq!(detector.detect(&registry).drivers().len(), 1);

        // Flag cleared, then a second incident brings it back
        let registry = registry_of(vec![driver_at(0, 0.6)], vec![flagged(0, 0.55)]);
        assert!(detector.detect(&registry).drivers().is_empty());

        let registry = registry_of(vec![flagged(0, 0.7)], vec![driver_at(0, 0.65)]);
        assert_eq!(detector.detect(&registry).drivers().len(), 1);
    }

    #[test]
    fn test_serviceable_alone_is_not_a_meatball() {
        let mut current = driver_at(0, 0.5);
        current.session_flags = SessionFlags(SessionFlags::SERVICEABLE);

        let registry = registry_of(vec![current], vec![driver_at(0, 0.49)]);
        let mut detector = MeatballDetector::new();
        assert!(detector.detect(&registry).drivers().is_empty());
    }

    #[test]
    fn test_pit_stall_flag_uses_remembered_position() {
        let mut detector = MeatballDetector::new();

        // Cycle 1: car crashes off track at 0.62
        let mut wrecked = driver_at(0, 0.62);
        wrecked.track_location = TrackLocation::OffTrack;
        let registry = registry_of(vec![wrecked.clone()], vec![driver_at(0, 0.61)]);
        assert!(detector.detect(&registry).drivers().is_empty());

        // Cycle 2: towed to the stall, flag renders there
        let mut stalled = flagged(0, 0.15);
        stalled.track_location = TrackLocation::InPitStall;
        stalled.on_pit_road = true;
        let registry = registry_of(vec![stalled], vec![wrecked]);

        let result = detector.detect(&registry);
        assert_eq!(result.drivers().len(), 1);
        // Reported at the crash site, not the stall
        assert_eq!(result.drivers()[0].lap_distance.0, 0.62);
        assert_eq!(result.drivers()[0].driver_index, 0);
    }

    #[test]
    fn test_memory_keeps_latest_surface_position() {
        let mut detector = MeatballDetector::new();

        // Two clean cycles move the remembered position forward
        let registry = registry_of(vec![driver_at(0, 0.30)], vec![driver_at(0, 0.29)]);
        detector.detect(&registry);
        let registry = registry_of(vec![driver_at(0, 0.40)], vec![driver_at(0, 0.30)]);
        detector.detect(&registry);

        // Towed to the stall with the flag
        let mut stalled = flagged(0, 0.15);
        stalled.track_location = TrackLocation::InPitStall;
        let registry = registry_of(vec![stalled], vec![driver_at(0, 0.40)]);

        let result = detector.detect(&registry);
        assert_eq!(result.drivers()[0].lap_distance.0, 0.40);
    }

    #[test]
    fn test_pit_stall_flag_without_memory_keeps_stall_position() {
        // First ever observation of the car is already in the stall
        let mut stalled = flagged(0, 0.15);
        stalled.track_location = TrackLocation::InPitStall;
        let mut parked = driver_at(0, 0.15);
        parked.track_location = TrackLocation::InPitStall;

        let registry = registry_of(vec![stalled], vec![parked]);
        let mut detector = MeatballDetector::new();

        let result = detector.detect(&registry);
        assert_eq!(result.drivers().len(), 1);
        assert_eq!(result.drivers()[0].lap_distance.0, 0.15);
    }

    #[test]
    fn test_on_track_flag_keeps_live_position() {
        // A car that gets the flag while still driving reports where it is
        let registry = registry_of(vec![flagged(0, 0.77)], vec![driver_at(0, 0.76)]);
        let mut detector = MeatballDetector::new();

        let result = detector.detect(&registry);
        assert_eq!(result.drivers()[0].lap_distance.0, 0.77);
    }

    #[test]
    fn test_ignores_pace_car() {
        let mut pace = flagged(0, 0.5);
        pace.is_pace_car = true;
        let mut pace_prev = driver_at(0, 0.49);
        pace_prev.is_pace_car = true;

        let registry = registry_of(vec![pace], vec![pace_prev]);
        let mut detector = MeatballDetector::new();
        assert!(detector.detect(&registry).drivers().is_empty());
    }

    #[test]
    fn test_ignores_cars_not_in_world() {
        let mut unspawned = flagged(0, 0.5);
        unspawned.laps_completed = -1;
        let mut gone = flagged(1, 0.5);
        gone.track_location = TrackLocation::NotInWorld;

        let registry = registry_of(
            vec![unspawned, gone],
            vec![driver_at(0, 0.5), driver_at(1, 0.5)],
        );
        let mut detector = MeatballDetector::new();
        assert!(detector.detect(&registry).drivers().is_empty());
    }

    #[test]
    fn test_should_run_always_true() {
        let detector = MeatballDetector::new();
        assert!(detector.should_run(&DetectorState::new(0.0)));
        assert!(detector.should_run(&DetectorState::new(5_000.0)));
    }
}
