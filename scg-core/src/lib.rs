//! SafetyCarGenerator Core Library
//!
//! This crate provides the driver-state model, the telemetry source trait
//! and the double-buffered driver registry shared by the detection engine.

pub mod clock;
pub mod model;
pub mod registry;
pub mod session;
pub mod source;

pub use clock::{Clock, ManualClock, SystemClock};
pub use model::{DriverSnapshot, LapPosition, SessionFlags, TrackLocation};
pub use registry::DriverRegistry;
pub use session::Session;
pub use source::TelemetrySource;
