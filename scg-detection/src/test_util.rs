//! Shared helpers for the detection test modules.

use scg_core::model::{DriverSnapshot, LapPosition, SessionFlags, TrackLocation};

/// A plain on-track car with neutral defaults; tests override the fields
/// they care about.
pub(crate) fn make_driver(driver_index: i32) -> DriverSnapshot {
    DriverSnapshot {
        driver_index,
        car_number: Some(format!("{}", driver_index + 10)),
        car_class_id: 0,
        car_class_est_lap_time: 90.0,
        is_pace_car: false,
        laps_completed: 0,
        current_lap: 1,
        lap_distance: LapPosition(0.0),
        track_location: TrackLocation::OnTrack,
        on_pit_road: false,
        session_flags: SessionFlags::default(),
    }
}

/// A car at a given lap position.
pub(crate) fn driver_at(driver_index: i32, lap_distance: f32) -> DriverSnapshot {
    let mut driver = make_driver(driver_index);
    driver.lap_distance = LapPosition(lap_distance);
    driver
}
