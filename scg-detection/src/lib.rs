//! SafetyCarGenerator Detection Engine
//!
//! Turns per-cycle driver state into typed incident events and decides,
//! cycle by cycle, whether the accumulated events warrant a caution.
//!
//! The host loop drives one cycle as: registry update -> each detector's
//! `detect()` -> `ThresholdChecker::register_detection_result()` ->
//! `clean_up_events()` -> `threshold_met()`.

pub mod meatball;
pub mod off_track;
pub mod random;
pub mod result;
pub mod settings;
pub mod stopped;
pub mod threshold;
pub mod tow;

#[cfg(test)]
pub(crate) mod test_util;

pub use meatball::MeatballDetector;
pub use off_track::OffTrackDetector;
pub use random::{ProbabilitySource, RandomDetector, SineHashRoll};
pub use result::{DetectionResult, Detector, DetectorState, IncidentKind};
pub use settings::{
    build_detectors, DetectorSettings, RandomSettings, SettingsError, ThresholdCheckerSettings,
};
pub use stopped::StoppedDetector;
pub use threshold::{ThresholdChecker, ThresholdDecision, ThresholdEvent};
pub use tow::TowDetector;
