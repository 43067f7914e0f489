//! Driver state model
//!
//! Defines the per-car snapshot that the registry assembles each polling
//! cycle and that detectors consume. A snapshot is immutable for the frame
//! it was captured in; consumers copy it rather than holding references
//! into the registry.

use serde::{Deserialize, Serialize};

/// Where a car currently is, as reported by the simulator surface sensor.
///
/// Raw values follow the simulator's convention (-1 through 3). Any value
/// outside the published range decodes to `NotInWorld`, which excludes the
/// car from detection for that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackLocation {
    NotInWorld,
    OffTrack,
    InPitStall,
    ApproachingPits,
    OnTrack,
}

impl TrackLocation {
    /// Decode the simulator's raw surface value.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => TrackLocation::OffTrack,
            1 => TrackLocation::InPitStall,
            2 => TrackLocation::ApproachingPits,
            3 => TrackLocation::OnTrack,
            _ => TrackLocation::NotInWorld,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            TrackLocation::NotInWorld => -1,
            TrackLocation::OffTrack => 0,
            TrackLocation::InPitStall => 1,
            TrackLocation::ApproachingPits => 2,
            TrackLocation::OnTrack => 3,
        }
    }
}

/// Session flag bitmask as published by the simulator, per car or
/// session-wide.
///
/// Only a handful of bits are consumed here (`REPAIR` by detection, `GREEN`
/// by the session tracker); the rest are carried through for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionFlags(pub u32);

impl SessionFlags {
    pub const CHECKERED: u32 = 0x0000_0001;
    pub const WHITE: u32 = 0x0000_0002;
    pub const GREEN: u32 = 0x0000_0004;
    pub const YELLOW: u32 = 0x0000_0008;
    pub const RED: u32 = 0x0000_0010;
    pub const BLUE: u32 = 0x0000_0020;
    pub const DEBRIS: u32 = 0x0000_0040;
    pub const YELLOW_WAVING: u32 = 0x0000_0100;
    pub const ONE_LAP_TO_GREEN: u32 = 0x0000_0200;
    pub const CAUTION: u32 = 0x0000_4000;
    pub const CAUTION_WAVING: u32 = 0x0000_8000;
    pub const BLACK: u32 = 0x0001_0000;
    pub const DISQUALIFY: u32 = 0x0002_0000;
    pub const SERVICEABLE: u32 = 0x0004_0000;
    pub const FURLED: u32 = 0x0008_0000;
    /// The "meatball": mandatory repairs required.
    pub const REPAIR: u32 = 0x0010_0000;

    pub fn contains(self, bits: u32) -> bool {
        self.0 & bits != 0
    }

    /// Whether the meatball (repairs required) flag is shown.
    pub fn needs_repair(self) -> bool {
        self.contains(Self::REPAIR)
    }

    pub fn is_green(self) -> bool {
        self.contains(Self::GREEN)
    }
}

/// Fractional progress through the current lap.
///
/// Conceptually lives in `[0, 1)` but the simulator reports values slightly
/// outside that range around the start/finish line, so all arithmetic treats
/// the value as circular.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LapPosition(pub f32);

impl LapPosition {
    /// Reduce into `[0, 1)`.
    pub fn normalized(self) -> f32 {
        let n = self.0.rem_euclid(1.0);
        // rem_euclid can return exactly 1.0 for tiny negative inputs
        if n >= 1.0 {
            0.0
        } else {
            n
        }
    }

    /// Shortest distance to `other` around the lap circle.
    ///
    /// Positions 0.95 and 0.05 are 0.1 apart, not 0.9.
    pub fn circular_distance(self, other: LapPosition) -> f32 {
        let d = (self.normalized() - other.normalized()).abs();
        d.min(1.0 - d)
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

/// One car's state at a single polling cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSnapshot {
    /// Stable car-slot identity for the session.
    pub driver_index: i32,

    /// Roster car number; `None` when the roster has no entry for the slot.
    pub car_number: Option<String>,

    pub car_class_id: i32,

    /// Class-representative lap time in seconds, for class ordering.
    pub car_class_est_lap_time: f32,

    /// The pace car is excluded from all incident detection.
    pub is_pace_car: bool,

    /// Negative while the car has not yet entered the world.
    pub laps_completed: i32,

    pub current_lap: i32,

    pub lap_distance: LapPosition,

    pub track_location: TrackLocation,

    /// Distinct from `track_location`: set for the whole pit lane, not just
    /// the stall.
    pub on_pit_road: bool,

    pub session_flags: SessionFlags,
}

impl DriverSnapshot {
    /// Whether the car is meaningfully present on the circuit.
    ///
    /// A car that has not completed its first out-lap, or that the
    /// simulator reports as not in the world, never takes part in
    /// detection.
    pub fn in_world(&self) -> bool {
        self.laps_completed >= 0 && self.track_location != TrackLocation::NotInWorld
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_location_from_raw_known_values() {
        assert_eq!(TrackLocation::from_raw(-1), TrackLocation::NotInWorld);
        assert_eq!(TrackLocation::from_raw(0), TrackLocation::OffTrack);
        assert_eq!(TrackLocation::from_raw(1), TrackLocation::InPitStall);
        assert_eq!(TrackLocation::from_raw(2), TrackLocation::ApproachingPits);
        assert_eq!(TrackLocation::from_raw(3), TrackLocation::OnTrack);
    }

    #[test]
    fn test_track_location_from_raw_unknown_is_not_in_world() {
        // Garbage surface values must exclude the car, not crash detection
        assert_eq!(TrackLocation::from_raw(7), TrackLocation::NotInWorld);
        assert_eq!(TrackLocation::from_raw(-42), TrackLocation::NotInWorld);
    }

    #[test]
    fn test_track_location_raw_roundtrip() {
        for loc in [
            TrackLocation::NotInWorld,
            TrackLocation::OffTrack,
            TrackLocation::InPitStall,
            TrackLocation::ApproachingPits,
            TrackLocation::OnTrack,
        ] {
            assert_eq!(TrackLocation::from_raw(loc.raw()), loc);
        }
    }

    #[test]
    fn test_session_flags_repair_bit() {
        let flags = SessionFlags(SessionFlags::REPAIR | SessionFlags::SERVICEABLE);
        assert!(flags.needs_repair());
        assert!(!SessionFlags(SessionFlags::SERVICEABLE).needs_repair());
        assert!(!SessionFlags::default().needs_repair());
    }

    #[test]
    fn test_session_flags_green() {
        assert!(SessionFlags(SessionFlags::GREEN).is_green());
        assert!(!SessionFlags(SessionFlags::YELLOW).is_green());
    }

    #[test]
    fn test_lap_position_normalized() {
        assert!((LapPosition(0.25).normalized() - 0.25).abs() < 1e-6);
        assert!((LapPosition(1.9).normalized() - 0.9).abs() < 1e-6);
        assert!(LapPosition(2.0).normalized().abs() < 1e-6);
        assert!((LapPosition(-0.1).normalized() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_circular_distance_simple() {
        let d = LapPosition(0.1).circular_distance(LapPosition(0.3));
        assert!((d - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_circular_distance_wraps_at_finish_line() {
        // 0.95 and 0.05 are 0.1 apart around the line, not 0.9
        let d = LapPosition(0.95).circular_distance(LapPosition(0.05));
        assert!((d - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_circular_distance_normalizes_inputs() {
        // 1.9 and 2.1 normalize to 0.9 and 0.1, distance 0.2 across the line
        let d = LapPosition(1.9).circular_distance(LapPosition(2.1));
        assert!((d - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_circular_distance_symmetric() {
        let a = LapPosition(0.02);
        let b = LapPosition(0.97);
        assert!((a.circular_distance(b) - b.circular_distance(a)).abs() < 1e-6);
    }

    #[test]
    fn test_in_world() {
        let mut snapshot = DriverSnapshot {
            driver_index: 0,
            car_number: Some("42".to_string()),
            car_class_id: 0,
            car_class_est_lap_time: 90.0,
            is_pace_car: false,
            laps_completed: 3,
            current_lap: 4,
            lap_distance: LapPosition(0.5),
            track_location: TrackLocation::OnTrack,
            on_pit_road: false,
            session_flags: SessionFlags::default(),
        };
        assert!(snapshot.in_world());

        snapshot.laps_completed = -1;
        assert!(!snapshot.in_world());

        snapshot.laps_completed = 0;
        snapshot.track_location = TrackLocation::NotInWorld;
        assert!(!snapshot.in_world());
    }

    #[test]
    fn test_snapshot_serialization_roundtrip() {
        let snapshot = DriverSnapshot {
            driver_index: 7,
            car_number: Some("07".to_string()),
            car_class_id: 2,
            car_class_est_lap_time: 101.5,
            is_pace_car: false,
            laps_completed: 12,
            current_lap: 13,
            lap_distance: LapPosition(0.731),
            track_location: TrackLocation::OffTrack,
            on_pit_road: false,
            session_flags: SessionFlags(SessionFlags::REPAIR),
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: DriverSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
