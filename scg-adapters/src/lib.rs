//! Telemetry sources that do not need a simulator
//!
//! The demo source generates a deterministic synthetic field for running
//! the monitor without a game; the scripted source plays back pre-built
//! samples for integration tests and recorded-session analysis.

pub mod demo;
pub mod scripted;

pub use demo::DemoGridSource;
pub use scripted::{grid_from_snapshots, ScriptedSource};
