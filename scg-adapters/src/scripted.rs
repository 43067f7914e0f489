//! Scripted playback source
//!
//! Plays back a pre-built sequence of grid samples, one per polling cycle,
//! then reports no further data. Integration tests and recorded-session
//! analysis use this to drive the pipeline through exact frame sequences.

use anyhow::Result;
use chrono::Utc;
use scg_core::model::DriverSnapshot;
use scg_core::source::{GridSample, RosterEntry, SessionSample, TelemetrySource};
use std::collections::VecDeque;

pub struct ScriptedSource {
    grids: VecDeque<GridSample>,
    session: Option<SessionSample>,
}

impl ScriptedSource {
    pub fn new(grids: Vec<GridSample>) -> Self {
        Self {
            grids: grids.into(),
            session: None,
        }
    }

    /// Serve the same session sample on every cycle.
    pub fn with_session(mut self, session: SessionSample) -> Self {
        self.session = Some(session);
        self
    }

    pub fn remaining(&self) -> usize {
        self.grids.len()
    }
}

impl TelemetrySource for ScriptedSource {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn connected(&self) -> bool {
        !self.grids.is_empty()
    }

    fn read_grid(&mut self) -> Result<Option<GridSample>> {
        Ok(self.grids.pop_front())
    }

    fn read_session(&mut self) -> Result<Option<SessionSample>> {
        Ok(self.session.clone())
    }
}

/// Explode snapshots into the parallel-array sample the registry consumes.
///
/// Snapshots are laid out by position; their `driver_index` fields are
/// expected to match, the way the registry would assemble them.
pub fn grid_from_snapshots(snapshots: &[DriverSnapshot]) -> GridSample {
    GridSample {
        captured_at: Utc::now(),
        laps_completed: snapshots.iter().map(|d| d.laps_completed).collect(),
        lap_distance: snapshots.iter().map(|d| d.lap_distance.0).collect(),
        track_location: snapshots.iter().map(|d| d.track_location).collect(),
        current_lap: snapshots.iter().map(|d| d.current_lap).collect(),
        on_pit_road: snapshots.iter().map(|d| d.on_pit_road).collect(),
        car_class_id: snapshots.iter().map(|d| d.car_class_id).collect(),
        session_flags: snapshots.iter().map(|d| d.session_flags).collect(),
        roster: snapshots
            .iter()
            .map(|d| RosterEntry {
                car_index: d.driver_index,
                car_number: d.car_number.clone().unwrap_or_default(),
                car_class_est_lap_time: d.car_class_est_lap_time,
                is_pace_car: d.is_pace_car,
            })
            .collect(),
    }
}
