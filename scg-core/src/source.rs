//! Telemetry source trait definition
//!
//! A source is whatever can yield the per-car grid arrays and session
//! metadata for one polling cycle: the simulator's shared memory on a live
//! machine, or a synthetic/scripted generator everywhere else.

use crate::model::{LapPosition, SessionFlags, TrackLocation};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trait for telemetry data sources
///
/// Each source is responsible for:
/// - Reporting whether the underlying feed is reachable
/// - Yielding one grid sample per polling cycle
/// - Yielding the current session metadata
///
/// Both read methods return `Ok(None)` when no fresh data is available this
/// cycle; consumers must treat `Ok(None)` and `Err(_)` as "keep the previous
/// state", never as fatal.
pub trait TelemetrySource: Send {
    /// Human-readable name of this source (e.g. "Demo grid").
    fn name(&self) -> &str;

    /// Lightweight reachability check for the underlying feed.
    fn connected(&self) -> bool;

    /// Read the per-car grid arrays for this cycle.
    fn read_grid(&mut self) -> Result<Option<GridSample>>;

    /// Read the session metadata for this cycle.
    fn read_session(&mut self) -> Result<Option<SessionSample>>;
}

/// Roster metadata for one car slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub car_index: i32,
    pub car_number: String,
    pub car_class_est_lap_time: f32,
    pub is_pace_car: bool,
}

/// One cycle's worth of per-car telemetry, as parallel arrays indexed by
/// car slot.
///
/// The arrays may be ragged (the simulator occasionally publishes partial
/// frames); `laps_completed` defines the slot count and missing entries in
/// the other arrays fall back to neutral defaults during assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSample {
    /// When this sample was captured.
    pub captured_at: DateTime<Utc>,

    pub laps_completed: Vec<i32>,
    pub lap_distance: Vec<f32>,
    pub track_location: Vec<TrackLocation>,
    pub current_lap: Vec<i32>,
    pub on_pit_road: Vec<bool>,
    pub car_class_id: Vec<i32>,
    pub session_flags: Vec<SessionFlags>,

    /// Driver roster; entries are matched to slots by `car_index` and may
    /// be missing for unoccupied slots.
    pub roster: Vec<RosterEntry>,
}

impl GridSample {
    /// Number of car slots in this sample.
    pub fn slot_count(&self) -> usize {
        self.laps_completed.len()
    }

    /// Lap distance for a slot as a circular position, 0.0 when absent.
    pub fn lap_position(&self, slot: usize) -> LapPosition {
        LapPosition(self.lap_distance.get(slot).copied().unwrap_or(0.0))
    }
}

/// Session-wide metadata for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSample {
    /// Ordered names of the sessions in the event (e.g. PRACTICE, RACE).
    pub session_names: Vec<String>,

    /// Index of the currently running session.
    pub current_session: i32,

    /// Session-wide flag bitmask.
    pub flags: SessionFlags,
}
