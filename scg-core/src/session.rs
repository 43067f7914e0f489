//! Session state tracker
//!
//! Caches session-level telemetry (which session is running, the
//! session-wide flag state) so the host loop can gate on green-flag and
//! race-session conditions without touching the source directly.

use crate::model::SessionFlags;
use crate::source::{SessionSample, TelemetrySource};
use tracing::debug;

const NON_RACE_SESSIONS: &[&str] = &["PRACTICE", "QUALIFY", "WARMUP"];

#[derive(Debug, Default)]
pub struct Session {
    session_names: Vec<String>,
    current_session: i32,
    flags: SessionFlags,
    populated: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from the source.
    ///
    /// Mirrors the registry's failure contract: a source error or missing
    /// sample resets to the neutral "no data" state and is logged, never
    /// propagated.
    pub fn update(&mut self, source: &mut dyn TelemetrySource) {
        match source.read_session() {
            Ok(Some(sample)) => self.apply(sample),
            Ok(None) => {
                debug!(source = source.name(), "no session data this cycle");
                self.reset();
            }
            Err(e) => {
                debug!(source = source.name(), error = %e, "failed to read session data");
                self.reset();
            }
        }
    }

    fn apply(&mut self, sample: SessionSample) {
        self.session_names = sample.session_names;
        self.current_session = sample.current_session;
        self.flags = sample.flags;
        self.populated = true;
    }

    fn reset(&mut self) {
        self.session_names.clear();
        self.current_session = 0;
        self.flags = SessionFlags::default();
        self.populated = false;
    }

    /// Whether the green flag is currently displayed.
    pub fn is_green_flag(&self) -> bool {
        self.flags.is_green()
    }

    /// Whether the running session is a race (not practice, qualifying or
    /// warmup).
    pub fn is_race_session(&self) -> bool {
        match self.current_session_name() {
            Some(name) => !NON_RACE_SESSIONS.contains(&name),
            None => false,
        }
    }

    pub fn current_session_name(&self) -> Option<&str> {
        if !self.populated {
            return None;
        }
        usize::try_from(self.current_session)
            .ok()
            .and_then(|i| self.session_names.get(i))
            .map(String::as_str)
    }

    pub fn current_session_num(&self) -> i32 {
        self.current_session
    }

    pub fn session_flags(&self) -> SessionFlags {
        self.flags
    }
}
