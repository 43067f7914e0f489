//! Double-buffered driver registry
//!
//! Holds the current and previous full-grid snapshots, aligned by car slot.
//! Refreshed once per polling cycle; transition-based detectors compare the
//! two buffers to spot state changes between consecutive cycles.

use crate::model::{DriverSnapshot, SessionFlags, TrackLocation};
use crate::source::{GridSample, TelemetrySource};
use std::collections::HashMap;
use tracing::{debug, warn};

/// The registry exclusively owns driver snapshots; detectors and the
/// threshold checker only read or copy them.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    current: Vec<DriverSnapshot>,
    previous: Vec<DriverSnapshot>,
}

impl DriverRegistry {
    /// An empty registry; call [`update`](Self::update) to populate it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry directly from snapshot vectors.
    ///
    /// Used by recorded-session playback and tests; live operation goes
    /// through [`update`](Self::update).
    pub fn from_snapshots(current: Vec<DriverSnapshot>, previous: Vec<DriverSnapshot>) -> Self {
        Self { current, previous }
    }

    /// Refresh the grid from the source.
    ///
    /// On success the old current buffer becomes the previous buffer. If
    /// the source has no fresh data or fails, both buffers are left
    /// untouched: the last known state persists and the failure is logged,
    /// never propagated.
    pub fn update(&mut self, source: &mut dyn TelemetrySource) {
        let sample = match source.read_grid() {
            Ok(Some(sample)) => sample,
            Ok(None) => {
                debug!(source = source.name(), "no fresh grid data, keeping previous state");
                return;
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "failed to read grid data, keeping previous state");
                return;
            }
        };

        let fresh = Self::assemble(&sample);
        self.previous = std::mem::replace(&mut self.current, fresh);
    }

    /// Assemble snapshots from the sample's parallel arrays.
    ///
    /// `laps_completed` defines the slot count; missing entries in the
    /// other arrays or roster fall back to neutral defaults so one partial
    /// frame never drops the whole grid.
    fn assemble(sample: &GridSample) -> Vec<DriverSnapshot> {
        let mut snapshots = Vec::with_capacity(sample.slot_count());

        for slot in 0..sample.slot_count() {
            let roster = sample
                .roster
                .iter()
                .find(|entry| entry.car_index == slot as i32);

            snapshots.push(DriverSnapshot {
                driver_index: slot as i32,
                car_number: roster.map(|r| r.car_number.clone()),
                car_class_id: sample.car_class_id.get(slot).copied().unwrap_or(0),
                car_class_est_lap_time: roster.map(|r| r.car_class_est_lap_time).unwrap_or(0.0),
                is_pace_car: roster.map(|r| r.is_pace_car).unwrap_or(false),
                laps_completed: sample.laps_completed[slot],
                current_lap: sample.current_lap.get(slot).copied().unwrap_or(0),
                lap_distance: sample.lap_position(slot),
                track_location: sample
                    .track_location
                    .get(slot)
                    .copied()
                    .unwrap_or(TrackLocation::NotInWorld),
                on_pit_road: sample.on_pit_road.get(slot).copied().unwrap_or(false),
                session_flags: sample
                    .session_flags
                    .get(slot)
                    .copied()
                    .unwrap_or(SessionFlags::default()),
            });
        }

        snapshots
    }

    pub fn current(&self) -> &[DriverSnapshot] {
        &self.current
    }

    pub fn previous(&self) -> &[DriverSnapshot] {
        &self.previous
    }

    /// Current/previous snapshot pairs, aligned by slot.
    ///
    /// Empty on the first populated cycle (there is no previous buffer
    /// yet), which naturally disables transition-based detectors for that
    /// cycle.
    pub fn pairs(&self) -> impl Iterator<Item = (&DriverSnapshot, &DriverSnapshot)> {
        self.current.iter().zip(self.previous.iter())
    }

    /// Car number for a slot, if the roster knows it.
    pub fn driver_number(&self, driver_index: i32) -> Option<&str> {
        self.current
            .iter()
            .find(|d| d.driver_index == driver_index)
            .and_then(|d| d.car_number.as_deref())
    }

    /// Slots on the given lap or later and not on pit road.
    ///
    /// With `None`, the highest current lap on the grid is used.
    pub fn lead_lap_cars(&self, target_lap: Option<i32>) -> Vec<i32> {
        let target = target_lap.unwrap_or_else(|| self.max_lap());
        self.current
            .iter()
            .filter(|d| d.current_lap >= target && !d.on_pit_road)
            .map(|d| d.driver_index)
            .collect()
    }

    /// Slots grouped by car class, pace car excluded.
    pub fn cars_by_class(&self) -> HashMap<i32, Vec<i32>> {
        let mut by_class: HashMap<i32, Vec<i32>> = HashMap::new();
        for driver in self.current.iter().filter(|d| !d.is_pace_car) {
            by_class
                .entry(driver.car_class_id)
                .or_default()
                .push(driver.driver_index);
        }
        by_class
    }

    /// Unique class ids in grid order, pace car excluded.
    pub fn class_ids(&self) -> Vec<i32> {
        let mut ids = Vec::new();
        for driver in self.current.iter().filter(|d| !d.is_pace_car) {
            if !ids.contains(&driver.car_class_id) {
                ids.push(driver.car_class_id);
            }
        }
        ids
    }

    /// Highest current lap across the grid, 0 when empty.
    pub fn max_lap(&self) -> i32 {
        self.current.iter().map(|d| d.current_lap).max().unwrap_or(0)
    }

    /// Slots not currently on pit road.
    pub fn cars_not_on_pit_road(&self) -> Vec<i32> {
        self.current
            .iter()
            .filter(|d| !d.on_pit_road)
            .map(|d| d.driver_index)
            .collect()
    }
}
