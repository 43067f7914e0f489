//! Detection result and detector contract
//!
//! A detector maps the driver registry to exactly one typed result per
//! cycle. Most detectors implicate a list of driver snapshots; the random
//! detector only reports whether its roll came up, independent of any car.

use scg_core::model::DriverSnapshot;
use scg_core::registry::DriverRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Closed classification of why a car (or the session) was flagged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum IncidentKind {
    OffTrack,
    Stopped,
    Random,
    Meatball,
    Towing,
}

impl IncidentKind {
    /// All kinds, in a stable order.
    pub const ALL: [IncidentKind; 5] = [
        IncidentKind::OffTrack,
        IncidentKind::Stopped,
        IncidentKind::Random,
        IncidentKind::Meatball,
        IncidentKind::Towing,
    ];
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IncidentKind::OffTrack => "off_track",
            IncidentKind::Stopped => "stopped",
            IncidentKind::Random => "random",
            IncidentKind::Meatball => "meatball",
            IncidentKind::Towing => "towing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Payload {
    /// Implicated cars, in detection order.
    Drivers(Vec<DriverSnapshot>),
    /// Occurrence marker for detections not tied to any car.
    Occurrence(bool),
}

/// One detector's output for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    kind: IncidentKind,
    payload: Payload,
}

impl DetectionResult {
    /// A result implicating the given cars (possibly none).
    pub fn with_drivers(kind: IncidentKind, drivers: Vec<DriverSnapshot>) -> Self {
        Self {
            kind,
            payload: Payload::Drivers(drivers),
        }
    }

    /// A bare occurrence marker, used by the random detector.
    pub fn occurrence(kind: IncidentKind, occurred: bool) -> Self {
        Self {
            kind,
            payload: Payload::Occurrence(occurred),
        }
    }

    pub fn kind(&self) -> IncidentKind {
        self.kind
    }

    /// Whether this result carries a driver list (as opposed to a bare
    /// occurrence marker). True even when the list is empty.
    pub fn has_drivers(&self) -> bool {
        matches!(self.payload, Payload::Drivers(_))
    }

    /// Implicated snapshots, in detection order. Empty for occurrence
    /// results.
    pub fn drivers(&self) -> &[DriverSnapshot] {
        match &self.payload {
            Payload::Drivers(drivers) => drivers,
            Payload::Occurrence(_) => &[],
        }
    }

    /// Whether anything was detected this cycle.
    pub fn occurred(&self) -> bool {
        match &self.payload {
            Payload::Drivers(drivers) => !drivers.is_empty(),
            Payload::Occurrence(occurred) => *occurred,
        }
    }
}

/// Engine-wide state a detector may gate on before running.
///
/// Supplied fresh by the host each cycle; detectors never mutate it.
#[derive(Debug, Clone, Default)]
pub struct DetectorState {
    /// Seconds since the session went green.
    pub session_elapsed: f64,

    /// How many times each incident kind has already triggered a caution
    /// this session.
    pub trigger_counts: HashMap<IncidentKind, u32>,
}

impl DetectorState {
    pub fn new(session_elapsed: f64) -> Self {
        Self {
            session_elapsed,
            trigger_counts: HashMap::new(),
        }
    }

    pub fn trigger_count(&self, kind: IncidentKind) -> u32 {
        self.trigger_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn record_trigger(&mut self, kind: IncidentKind) {
        *self.trigger_counts.entry(kind).or_insert(0) += 1;
    }
}

/// Trait for incident detectors
///
/// Each detector is responsible for:
/// - A cheap gating check against engine-wide state (`should_run`)
/// - Mapping the registry to one typed result per cycle (`detect`)
///
/// `detect` never fails: malformed data for a single car excludes that car
/// from the pass, it does not abort detection for the rest of the grid.
/// Enabling/disabling a detector entirely is a configuration concern
/// handled by [`build_detectors`](crate::settings::build_detectors), not a
/// runtime decision.
pub trait Detector: Send {
    /// The incident kind this detector emits.
    fn kind(&self) -> IncidentKind;

    /// Whether the detector should run this cycle. `true` for all variants
    /// except the random detector, which gates on its active window and
    /// prior trigger count.
    fn should_run(&self, state: &DetectorState) -> bool;

    /// Run one detection pass over the registry.
    fn detect(&mut self, registry: &DriverRegistry) -> DetectionResult;
}

/// Shared exclusion rule applied by every detector before considering a
/// car: the pace car, cars that have not entered the world and cars with a
/// garbage lap position never take part in detection.
pub(crate) fn eligible(driver: &DriverSnapshot) -> bool {
    !driver.is_pace_car && driver.in_world() && driver.lap_distance.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::make_driver;

    #[test]
    fn test_result_with_drivers() {
        let result =
            DetectionResult::with_drivers(IncidentKind::OffTrack, vec![make_driver(3)]);
        assert_eq!(result.kind(), IncidentKind::OffTrack);
        assert!(result.has_drivers());
        assert!(result.occurred());
        assert_eq!(result.drivers().len(), 1);
        assert_eq!(result.drivers()[0].driver_index, 3);
    }

    #[test]
    fn test_empty_driver_list_still_has_drivers() {
        // "Ran and found nothing" is distinct from an occurrence marker
        let result = DetectionResult::with_drivers(IncidentKind::Meatball, vec![]);
        assert!(result.has_drivers());
        assert!(!result.occurred());
        assert!(result.drivers().is_empty());
    }

    #[test]
    fn test_occurrence_result() {
        let result = DetectionResult::occurrence(IncidentKind::Random, true);
        assert!(!result.has_drivers());
        assert!(result.occurred());
        assert!(result.drivers().is_empty());

        let quiet = DetectionResult::occurrence(IncidentKind::Random, false);
        assert!(!quiet.occurred());
    }

    #[test]
    fn test_detector_state_counts() {
        let mut state = DetectorState::new(120.0);
        assert_eq!(state.trigger_count(IncidentKind::Random), 0);

        state.record_trigger(IncidentKind::Random);
        state.record_trigger(IncidentKind::Random);
        state.record_trigger(IncidentKind::OffTrack);

        assert_eq!(state.trigger_count(IncidentKind::Random), 2);
        assert_eq!(state.trigger_count(IncidentKind::OffTrack), 1);
        assert_eq!(state.trigger_count(IncidentKind::Stopped), 0);
    }

    #[test]
    fn test_eligibility_rules() {
        let driver = make_driver(1);
        assert!(eligible(&driver));

        let mut pace = make_driver(0);
        pace.is_pace_car = true;
        assert!(!eligible(&pace));

        let mut fresh = make_driver(2);
        fresh.laps_completed = -1;
        assert!(!eligible(&fresh));

        let mut gone = make_driver(3);
        gone.track_location = scg_core::model::TrackLocation::NotInWorld;
        assert!(!eligible(&gone));

        let mut broken = make_driver(4);
        broken.lap_distance = scg_core::model::LapPosition(f32::NAN);
        assert!(!eligible(&broken));
    }

    #[test]
    fn test_incident_kind_display() {
        assert_eq!(IncidentKind::OffTrack.to_string(), "off_track");
        assert_eq!(IncidentKind::Towing.to_string(), "towing");
    }
}
