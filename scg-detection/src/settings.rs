//! Detection engine configuration
//!
//! All options are plain named numbers and booleans supplied once at
//! construction; nothing here is mutated at runtime. Invalid combinations
//! are rejected with a descriptive error instead of being auto-corrected.

use crate::meatball::MeatballDetector;
use crate::off_track::OffTrackDetector;
use crate::random::RandomDetector;
use crate::result::{Detector, IncidentKind};
use crate::stopped::StoppedDetector;
use crate::tow::TowDetector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Rejection reasons for invalid configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("event time window must be a positive number of seconds, got {0}")]
    InvalidTimeRange(f64),

    #[error("accumulative threshold must be a non-negative finite number, got {0}")]
    InvalidAccumulativeThreshold(f64),

    #[error("accumulative weight for {kind} must be a non-negative finite number, got {value}")]
    InvalidWeight { kind: IncidentKind, value: f64 },

    #[error("proximity distance must be within (0, 0.5] lap fractions, got {0}")]
    InvalidProximityDistance(f32),

    #[error("dynamic threshold multiplier must be a non-negative finite number, got {0}")]
    InvalidDynamicMultiplier(f64),

    #[error("dynamic threshold duration must be a non-negative finite number of seconds, got {0}")]
    InvalidDynamicTime(f64),

    #[error("random caution probability must be within 0..=1, got {0}")]
    InvalidRandomProbability(f64),

    #[error("random caution window end minute {end} must be greater than start minute {start}")]
    InvalidRandomWindow { start: f64, end: f64 },

    #[error("stopped detector minimum progress must be within (0, 0.5) lap fractions, got {0}")]
    InvalidMinProgress(f32),
}

/// Configuration for the threshold checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdCheckerSettings {
    /// Sliding window length in seconds.
    pub time_range: f64,

    /// Minimum distinct-driver count per incident kind, within one
    /// cluster, to trigger. A kind absent from the map never triggers on
    /// its own count.
    pub event_type_threshold: HashMap<IncidentKind, u32>,

    /// Minimum weighted score, within one cluster, to trigger.
    pub accumulative_threshold: f64,

    /// Per-kind weights for the accumulative score. A kind absent from the
    /// map contributes nothing.
    pub accumulative_weights: HashMap<IncidentKind, f64>,

    /// When enabled, only events close together on track count toward the
    /// same trigger.
    pub proximity_yellows_enabled: bool,

    /// Maximum circular lap-distance between two events to be considered
    /// part of the same incident.
    pub proximity_yellows_distance: f32,

    /// Temporarily scale thresholds after the race start.
    pub dynamic_threshold_enabled: bool,

    /// Multiplier applied to per-kind thresholds while the dynamic window
    /// is active.
    pub dynamic_threshold_multiplier: f64,

    /// How long after the race start the multiplier applies, in seconds.
    pub dynamic_threshold_time: f64,

    /// Whether the multiplier also scales the accumulative threshold.
    /// Off by default: only per-kind scaling is the established behavior.
    pub dynamic_threshold_scales_accumulative: bool,
}

impl Default for ThresholdCheckerSettings {
    fn default() -> Self {
        Self {
            time_range: 30.0,
            event_type_threshold: HashMap::from([
                (IncidentKind::OffTrack, 4),
                (IncidentKind::Stopped, 2),
                (IncidentKind::Towing, 1),
                (IncidentKind::Meatball, 1),
            ]),
            accumulative_threshold: 6.0,
            accumulative_weights: HashMap::from([
                (IncidentKind::OffTrack, 1.0),
                (IncidentKind::Stopped, 2.0),
                (IncidentKind::Towing, 2.0),
                (IncidentKind::Meatball, 1.5),
            ]),
            proximity_yellows_enabled: false,
            proximity_yellows_distance: 0.05,
            dynamic_threshold_enabled: false,
            dynamic_threshold_multiplier: 1.5,
            dynamic_threshold_time: 300.0,
            dynamic_threshold_scales_accumulative: false,
        }
    }
}

impl ThresholdCheckerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.time_range.is_finite() || self.time_range <= 0.0 {
            return Err(SettingsError::InvalidTimeRange(self.time_range));
        }

        if !self.accumulative_threshold.is_finite() || self.accumulative_threshold < 0.0 {
            return Err(SettingsError::InvalidAccumulativeThreshold(
                self.accumulative_threshold,
            ));
        }

        for (&kind, &value) in &self.accumulative_weights {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::InvalidWeight { kind, value });
            }
        }

        if self.proximity_yellows_enabled
            && (!self.proximity_yellows_distance.is_finite()
                || self.proximity_yellows_distance <= 0.0
                || self.proximity_yellows_distance > 0.5)
        {
            return Err(SettingsError::InvalidProximityDistance(
                self.proximity_yellows_distance,
            ));
        }

        if self.dynamic_threshold_enabled {
            if !self.dynamic_threshold_multiplier.is_finite()
                || self.dynamic_threshold_multiplier < 0.0
            {
                return Err(SettingsError::InvalidDynamicMultiplier(
                    self.dynamic_threshold_multiplier,
                ));
            }
            if !self.dynamic_threshold_time.is_finite() || self.dynamic_threshold_time < 0.0 {
                return Err(SettingsError::InvalidDynamicTime(self.dynamic_threshold_time));
            }
        }

        Ok(())
    }
}

/// Configuration for the random caution detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomSettings {
    /// Probability that any single detection pass signals a caution.
    pub probability: f64,

    /// Session minute at which random cautions become possible.
    pub start_minute: f64,

    /// Session minute after which random cautions stop.
    pub end_minute: f64,

    /// Cap on random cautions per session; 0 means unlimited.
    pub max_events: u32,
}

impl Default for RandomSettings {
    fn default() -> Self {
        Self {
            probability: 0.01,
            start_minute: 10.0,
            end_minute: 60.0,
            max_events: 1,
        }
    }
}

impl RandomSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.probability.is_finite() || !(0.0..=1.0).contains(&self.probability) {
            return Err(SettingsError::InvalidRandomProbability(self.probability));
        }
        if self.end_minute <= self.start_minute {
            return Err(SettingsError::InvalidRandomWindow {
                start: self.start_minute,
                end: self.end_minute,
            });
        }
        Ok(())
    }
}

/// Which detectors run, and their per-detector tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub off_track_enabled: bool,
    pub stopped_enabled: bool,
    pub random_enabled: bool,
    pub meatball_enabled: bool,
    pub tow_enabled: bool,

    /// Lap fraction a moving car is expected to cover between two polling
    /// cycles; less than this counts as stopped.
    pub stopped_min_progress: f32,

    pub random: RandomSettings,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            off_track_enabled: true,
            stopped_enabled: true,
            random_enabled: false,
            meatball_enabled: true,
            tow_enabled: true,
            stopped_min_progress: 0.0005,
            random: RandomSettings::default(),
        }
    }
}

impl DetectorSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.stopped_enabled
            && (!self.stopped_min_progress.is_finite()
                || self.stopped_min_progress <= 0.0
                || self.stopped_min_progress >= 0.5)
        {
            return Err(SettingsError::InvalidMinProgress(self.stopped_min_progress));
        }
        if self.random_enabled {
            self.random.validate()?;
        }
        Ok(())
    }
}

/// Build the enabled detector set.
///
/// Enable/disable lives here, not in `should_run`: a disabled detector is
/// simply never constructed.
pub fn build_detectors(settings: &DetectorSettings) -> Result<Vec<Box<dyn Detector>>, SettingsError> {
    settings.validate()?;

    let mut detectors: Vec<Box<dyn Detector>> = Vec::new();
    if settings.off_track_enabled {
        detectors.push(Box::new(OffTrackDetector::new()));
    }
    if settings.stopped_enabled {
        detectors.push(Box::new(StoppedDetector::new(settings.stopped_min_progress)));
    }
    if settings.meatball_enabled {
        detectors.push(Box::new(MeatballDetector::new()));
    }
    if settings.tow_enabled {
        detectors.push(Box::new(TowDetector::new()));
    }
    if settings.random_enabled {
        detectors.push(Box::new(RandomDetector::new(settings.random.clone())));
    }
    Ok(detectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(ThresholdCheckerSettings::default().validate().is_ok());
        assert!(DetectorSettings::default().validate().is_ok());
        assert!(RandomSettings::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_time_range() {
        let mut settings = ThresholdCheckerSettings::default();
        settings.time_range = 0.0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidTimeRange(_))
        ));

        settings.time_range = -5.0;
        assert!(settings.validate().is_err());

        settings.time_range = f64::NAN;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut settings = ThresholdCheckerSettings::default();
        settings
            .accumulative_weights
            .insert(IncidentKind::Stopped, -1.0);

        match settings.validate() {
            Err(SettingsError::InvalidWeight { kind, value }) => {
                assert_eq!(kind, IncidentKind::Stopped);
                assert_eq!(value, -1.0);
            }
            other => panic!("expected InvalidWeight, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_negative_accumulative_threshold() {
        let mut settings = ThresholdCheckerSettings::default();
        settings.accumulative_threshold = -0.1;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidAccumulativeThreshold(_))
        ));
    }

    #[test]
    fn test_rejects_bad_proximity_distance_only_when_enabled() {
        let mut settings = ThresholdCheckerSettings::default();
        settings.proximity_yellows_distance = 0.9;

        // Disabled: the bogus distance is never consulted
        assert!(settings.validate().is_ok());

        settings.proximity_yellows_enabled = true;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidProximityDistance(_))
        ));

        settings.proximity_yellows_distance = 0.0;
        assert!(settings.validate().is_err());

        settings.proximity_yellows_distance = 0.5;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_dynamic_settings_only_when_enabled() {
        let mut settings = ThresholdCheckerSettings::default();
        settings.dynamic_threshold_multiplier = -1.0;
        assert!(settings.validate().is_ok());

        settings.dynamic_threshold_enabled = true;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidDynamicMultiplier(_))
        ));

        settings.dynamic_threshold_multiplier = 0.5;
        settings.dynamic_threshold_time = -10.0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidDynamicTime(_))
        ));
    }

    #[test]
    fn test_rejects_random_probability_outside_unit_range() {
        let mut settings = RandomSettings::default();
        settings.probability = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidRandomProbability(_))
        ));

        settings.probability = -0.1;
        assert!(settings.validate().is_err());

        settings.probability = 0.0;
        assert!(settings.validate().is_ok());
        settings.probability = 1.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_random_window() {
        let mut settings = RandomSettings::default();
        settings.start_minute = 30.0;
        settings.end_minute = 30.0;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidRandomWindow { .. })
        ));

        settings.end_minute = 20.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_build_detectors_honors_enable_flags() {
        let mut settings = DetectorSettings::default();
        settings.random_enabled = false;
        let detectors = build_detectors(&settings).unwrap();
        assert_eq!(detectors.len(), 4);
        assert!(detectors
            .iter()
            .all(|d| d.kind() != IncidentKind::Random));

        settings.off_track_enabled = false;
        settings.tow_enabled = false;
        let detectors = build_detectors(&settings).unwrap();
        let kinds: Vec<_> = detectors.iter().map(|d| d.kind()).collect();
        assert_eq!(kinds, vec![IncidentKind::Stopped, IncidentKind::Meatball]);
    }

    #[test]
    fn test_build_detectors_rejects_invalid_tunables() {
        let mut settings = DetectorSettings::default();
        settings.stopped_min_progress = 0.0;
        assert!(matches!(
            build_detectors(&settings),
            Err(SettingsError::InvalidMinProgress(_))
        ));

        // Disabling the stopped detector makes its tunable irrelevant
        settings.stopped_enabled = false;
        assert!(build_detectors(&settings).is_ok());
    }
}
