//! Demo source that generates a synthetic field for testing
//!
//! Simulates a small grid lapping a circuit at slightly different paces,
//! with a fixed schedule of incidents (cars going off track, stopping and
//! getting towed) so the full detection pipeline can be exercised without
//! a simulator. Everything is derived from the tick counter; two runs
//! produce identical telemetry.

use anyhow::Result;
use chrono::Utc;
use scg_core::model::{SessionFlags, TrackLocation};
use scg_core::source::{GridSample, RosterEntry, SessionSample, TelemetrySource};

/// Seconds of simulated time per polling tick.
const TICK_SECONDS: f64 = 1.0;

/// Ticks before the field goes green.
const GREEN_FLAG_TICK: u64 = 5;

#[derive(Clone, Copy)]
enum Mishap {
    /// Car runs wide and sits off track, stationary.
    OffTrack,
    /// Car stops on the racing line.
    Stopped,
    /// Car disappears into its pit stall (towed).
    Towed,
}

#[derive(Clone, Copy)]
struct ScriptedMishap {
    car: usize,
    from_tick: u64,
    to_tick: u64,
    mishap: Mishap,
}

/// A lap-25ish pile-up in turn form: two cars off together, one stopped
/// nearby a little later, plus an isolated tow much later in the run.
fn demo_script() -> Vec<ScriptedMishap> {
    vec![
        ScriptedMishap { car: 3, from_tick: 120, to_tick: 180, mishap: Mishap::OffTrack },
        ScriptedMishap { car: 7, from_tick: 124, to_tick: 180, mishap: Mishap::OffTrack },
        ScriptedMishap { car: 5, from_tick: 130, to_tick: 200, mishap: Mishap::Stopped },
        ScriptedMishap { car: 9, from_tick: 420, to_tick: 460, mishap: Mishap::Towed },
    ]
}

/// Deterministic noise from a seed, uniform-ish in [0, 1).
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0.
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

struct CarState {
    /// Total laps of progress, fractional.
    progress: f64,
    /// Seconds per lap for this car.
    lap_time: f64,
}

pub struct DemoGridSource {
    active: bool,
    tick: u64,
    cars: Vec<CarState>,
    script: Vec<ScriptedMishap>,
}

impl DemoGridSource {
    /// A field of `car_count` cars plus the pace car in slot 0.
    pub fn new(car_count: usize) -> Self {
        let cars = (0..=car_count)
            .map(|i| CarState {
                // Spread the field out along the lap
                progress: (i as f64) * 0.04,
                // Slot 0 is the pace car; give it a lazy pace
                lap_time: if i == 0 {
                    120.0
                } else {
                    90.0 + jitter(i as f64, 4.0)
                },
            })
            .collect();

        Self {
            active: true,
            tick: 0,
            cars,
            script: demo_script(),
        }
    }

    fn mishap_for(&self, car: usize) -> Option<Mishap> {
        self.script
            .iter()
            .find(|m| m.car == car && (m.from_tick..m.to_tick).contains(&self.tick))
            .map(|m| m.mishap)
    }

    fn green_flag_shown(&self) -> bool {
        self.tick >= GREEN_FLAG_TICK
    }
}

impl TelemetrySource for DemoGridSource {
    fn name(&self) -> &str {
        "Demo grid"
    }

    fn connected(&self) -> bool {
        self.active
    }

    fn read_grid(&mut self) -> Result<Option<GridSample>> {
        if !self.active {
            return Ok(None);
        }

        self.tick += 1;
        let racing = self.green_flag_shown();
        let slot_count = self.cars.len();

        let mut sample = GridSample {
            captured_at: Utc::now(),
            laps_completed: Vec::with_capacity(slot_count),
            lap_distance: Vec::with_capacity(slot_count),
            track_location: Vec::with_capacity(slot_count),
            current_lap: Vec::with_capacity(slot_count),
            on_pit_road: Vec::with_capacity(slot_count),
            car_class_id: Vec::with_capacity(slot_count),
            session_flags: Vec::with_capacity(slot_count),
            roster: Vec::with_capacity(slot_count),
        };

        for index in 0..slot_count {
            let mishap = self.mishap_for(index);
            let moving = racing && !matches!(mishap, Some(Mishap::Stopped) | Some(Mishap::OffTrack));

            let car = &mut self.cars[index];
            if moving {
                car.progress += TICK_SECONDS / car.lap_time;
            }

            let (location, on_pit_road) = match mishap {
                Some(Mishap::OffTrack) => (TrackLocation::OffTrack, false),
                Some(Mishap::Towed) => (TrackLocation::InPitStall, true),
                Some(Mishap::Stopped) | None => (TrackLocation::OnTrack, false),
            };

            sample.laps_completed.push(car.progress as i32);
            sample.lap_distance.push((car.progress % 1.0) as f32);
            sample.track_location.push(location);
            sample.current_lap.push(car.progress as i32 + 1);
            sample.on_pit_road.push(on_pit_road);
            sample.car_class_id.push(0);
            sample.session_flags.push(SessionFlags::default());
            sample.roster.push(RosterEntry {
                car_index: index as i32,
                car_number: format!("{index}"),
                car_class_est_lap_time: 90.0,
                is_pace_car: index == 0,
            });
        }

        Ok(Some(sample))
    }

    fn read_session(&mut self) -> Result<Option<SessionSample>> {
        if !self.active {
            return Ok(None);
        }

        let flags = if self.green_flag_shown() {
            SessionFlags(SessionFlags::GREEN)
        } else {
            SessionFlags::default()
        };

        Ok(Some(SessionSample {
            session_names: vec![
                "PRACTICE".to_string(),
                "QUALIFY".to_string(),
                "RACE".to_string(),
            ],
            current_session: 2,
            flags,
        }))
    }
}
