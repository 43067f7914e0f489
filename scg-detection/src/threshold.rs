//! Caution threshold engine
//!
//! Accumulates incident events over a sliding time window and decides
//! whether a trigger condition has been met. Events may optionally be
//! clustered by physical proximity on the circular track, so two light
//! incidents on opposite sides of the circuit do not add up to one
//! caution. Within a cluster, two criteria are checked independently and
//! OR'd: a per-kind distinct-driver count and a weighted accumulative
//! score. Thresholds can be temporarily scaled for a configured period
//! after the race start.

use crate::result::{DetectionResult, IncidentKind};
use crate::settings::{SettingsError, ThresholdCheckerSettings};
use scg_core::clock::{Clock, SystemClock};
use scg_core::model::DriverSnapshot;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info, warn};

/// One incident observation held in the sliding window.
///
/// The snapshot is a copy taken at detection time, deliberately decoupled
/// from later registry updates: clustering must see the car where the
/// incident happened, not where the car is now.
#[derive(Debug, Clone)]
pub struct ThresholdEvent {
    pub timestamp: f64,
    pub driver_index: i32,
    pub kind: IncidentKind,
    pub snapshot: DriverSnapshot,
}

/// Outcome of one threshold evaluation.
///
/// The message identifies which criterion and cluster fired; it is for
/// logging, never for control flow.
#[derive(Debug, Clone)]
pub struct ThresholdDecision {
    pub met: bool,
    pub message: String,
}

/// Stateful trigger engine; see the module docs for the evaluation order.
///
/// After a caution triggers, the host replaces the checker with a fresh
/// instance sharing the same settings, which is what prevents the same
/// window of events from immediately re-triggering.
pub struct ThresholdChecker {
    settings: ThresholdCheckerSettings,
    clock: Box<dyn Clock>,
    events: Vec<ThresholdEvent>,
    race_start_time: Option<f64>,
}

impl ThresholdChecker {
    pub fn new(settings: ThresholdCheckerSettings) -> Result<Self, SettingsError> {
        Self::with_clock(settings, Box::new(SystemClock))
    }

    /// Construct with an injected clock, for deterministic tests and
    /// recorded-session replay.
    pub fn with_clock(
        settings: ThresholdCheckerSettings,
        clock: Box<dyn Clock>,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings,
            clock,
            events: Vec::new(),
            race_start_time: None,
        })
    }

    pub fn settings(&self) -> &ThresholdCheckerSettings {
        &self.settings
    }

    /// Anchor the dynamic threshold window to the race start.
    pub fn race_started(&mut self, timestamp: f64) {
        if let Some(previous) = self.race_start_time {
            debug!(previous, timestamp, "race start anchor replaced");
        }
        self.race_start_time = Some(timestamp);
    }

    pub fn race_start_time(&self) -> Option<f64> {
        self.race_start_time
    }

    /// Store one event per implicated driver at the current clock time.
    ///
    /// No-op for empty results and for occurrence-only results (a random
    /// caution implicates no particular car).
    pub fn register_detection_result(&mut self, result: &DetectionResult) {
        if result.drivers().is_empty() {
            return;
        }

        let now = self.clock.now();
        for driver in result.drivers() {
            self.register_event(result.kind(), driver.clone(), now);
        }
    }

    fn register_event(&mut self, kind: IncidentKind, snapshot: DriverSnapshot, timestamp: f64) {
        debug!(
            driver_index = snapshot.driver_index,
            %kind,
            timestamp,
            "registering incident event"
        );
        self.events.push(ThresholdEvent {
            timestamp,
            driver_index: snapshot.driver_index,
            kind,
            snapshot,
        });
    }

    /// Number of events currently stored (including any not yet evicted).
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Evict events older than the window. Idempotent at a fixed clock
    /// value; advancing the clock only ever removes events.
    pub fn clean_up_events(&mut self) {
        let cutoff = self.clock.now() - self.settings.time_range;
        let before = self.events.len();
        self.events.retain(|event| event.timestamp > cutoff);
        let evicted = before - self.events.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.events.len(), "evicted stale events");
        }
    }

    /// Evaluate the trigger condition over the current window.
    pub fn threshold_met(&self) -> ThresholdDecision {
        if self.race_start_time.is_none() {
            warn!("threshold check requested before the race start anchor was set; evaluating without dynamic scaling");
        }

        let now = self.clock.now();
        let windowed = self.windowed(now);
        if windowed.is_empty() {
            return ThresholdDecision {
                met: false,
                message: "no incident events in window".to_string(),
            };
        }

        let multiplier = self.dynamic_multiplier(now);
        let clusters = self.proximity_clusters(windowed.clone());

        for cluster in &clusters {
            let deduped = Self::dedupe_cluster(cluster);
            if let Some(reason) = self.cluster_trigger(&deduped, multiplier) {
                info!(
                    clusters = clusters.len(),
                    events = windowed.len(),
                    reason = %reason,
                    "caution threshold met"
                );
                return ThresholdDecision {
                    met: true,
                    message: reason,
                };
            }
        }

        ThresholdDecision {
            met: false,
            message: format!(
                "no trigger condition met across {} cluster(s) of {} event(s)",
                clusters.len(),
                windowed.len()
            ),
        }
    }

    /// Events inside the window at `now`, without mutating the store.
    fn windowed(&self, now: f64) -> Vec<&ThresholdEvent> {
        let cutoff = now - self.settings.time_range;
        self.events
            .iter()
            .filter(|event| event.timestamp > cutoff)
            .collect()
    }

    /// Multiplier applied to per-kind thresholds right now: 1.0 unless the
    /// dynamic window is enabled, anchored and still open.
    fn dynamic_multiplier(&self, now: f64) -> f64 {
        if !self.settings.dynamic_threshold_enabled {
            return 1.0;
        }
        let Some(start) = self.race_start_time else {
            return 1.0;
        };
        if now - start > self.settings.dynamic_threshold_time {
            return 1.0;
        }
        self.settings.dynamic_threshold_multiplier
    }

    /// Partition windowed events into proximity clusters.
    ///
    /// With proximity disabled, everything is one cluster. With it
    /// enabled, clusters are the connected components of the adjacency
    /// relation "circular lap distance at most the configured maximum";
    /// connectivity is computed by breadth-first search so chains of
    /// pairwise-adjacent events merge, including across the start/finish
    /// wrap. A car detected at materially different positions lands in
    /// different clusters.
    fn proximity_clusters<'a>(
        &self,
        events: Vec<&'a ThresholdEvent>,
    ) -> Vec<Vec<&'a ThresholdEvent>> {
        if events.is_empty() {
            return Vec::new();
        }
        if !self.settings.proximity_yellows_enabled {
            return vec![events];
        }

        let n = events.len();
        let max_distance = self.settings.proximity_yellows_distance;
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                let distance = events[i]
                    .snapshot
                    .lap_distance
                    .circular_distance(events[j].snapshot.lap_distance);
                if distance <= max_distance {
                    adjacency[i].push(j);
                    adjacency[j].push(i);
                }
            }
        }

        let mut visited = vec![false; n];
        let mut clusters = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(index) = queue.pop_front() {
                component.push(events[index]);
                for &neighbor in &adjacency[index] {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }
            clusters.push(component);
        }
        clusters
    }

    /// Keep only the latest event per `(driver, kind)` pair.
    fn dedupe_cluster<'a>(cluster: &[&'a ThresholdEvent]) -> Vec<&'a ThresholdEvent> {
        let mut latest: BTreeMap<(i32, IncidentKind), &ThresholdEvent> = BTreeMap::new();
        for &event in cluster {
            latest
                .entry((event.driver_index, event.kind))
                .and_modify(|kept| {
                    if event.timestamp > kept.timestamp {
                        *kept = event;
                    }
                })
                .or_insert(event);
        }
        latest.into_values().collect()
    }

    /// Check one deduplicated cluster against both criteria; returns the
    /// reason when either fires.
    fn cluster_trigger(&self, deduped: &[&ThresholdEvent], multiplier: f64) -> Option<String> {
        // Per-kind: distinct drivers carrying that kind
        let mut counts: BTreeMap<IncidentKind, u32> = BTreeMap::new();
        for event in deduped {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        for (kind, count) in &counts {
            let Some(&threshold) = self.settings.event_type_threshold.get(kind) else {
                continue;
            };
            let scaled = f64::from(threshold) * multiplier;
            if f64::from(*count) >= scaled {
                return Some(format!(
                    "{count} cars with {kind} incidents (threshold {scaled}) in a cluster of {} events",
                    deduped.len()
                ));
            }
        }

        // Accumulative: each driver contributes only its heaviest kind, so
        // one incident is never double-counted as two reasons to trigger
        let mut per_driver: BTreeMap<i32, f64> = BTreeMap::new();
        for event in deduped {
            let weight = self
                .settings
                .accumulative_weights
                .get(&event.kind)
                .copied()
                .unwrap_or(0.0);
            let heaviest = per_driver.entry(event.driver_index).or_insert(0.0);
            if weight > *heaviest {
                *heaviest = weight;
            }
        }
        let score: f64 = per_driver.values().sum();
        let threshold = if self.settings.dynamic_threshold_scales_accumulative {
            self.settings.accumulative_threshold * multiplier
        } else {
            self.settings.accumulative_threshold
        };
        if score >= threshold {
            return Some(format!(
                "accumulative score {score} (threshold {threshold}) across {} cars in a cluster of {} events",
                per_driver.len(),
                deduped.len()
            ));
        }

        None
    }
}
