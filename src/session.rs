//! Session metrics recording
//!
//! `SessionTracker` owns at most one active session plus the archive of
//! finished ones. Record calls without an active session are no-ops.
//! It is an ordinary value passed to the game engines, not a global.

use crate::config::DEFAULT_SAMPLE_INTERVAL_MS;
use crate::window::ratio_percent;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counters accumulated over one play session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub follow_successes: u32,
    pub follow_total: u32,
    pub blink_count: u32,
    pub focus_hold_frames: u32,
}

impl SessionMetrics {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at,
            ended_at: None,
            follow_successes: 0,
            follow_total: 0,
            blink_count: 0,
            focus_hold_frames: 0,
        }
    }

    /// Percentage of successful follow windows, 0 with no attempts
    pub fn follow_accuracy(&self) -> u32 {
        ratio_percent(self.follow_successes, self.follow_total)
    }

    /// Held-focus duration given the sampling period in seconds
    pub fn focus_hold_seconds(&self, frame_interval_secs: f64) -> u64 {
        (self.focus_hold_frames as f64 * frame_interval_secs).round() as u64
    }
}

/// Display view of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub follow_accuracy: u32,
    pub blink_count: u32,
    pub focus_hold_seconds: u64,
}

/// Records per-session counters and archives finished sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTracker {
    current: Option<SessionMetrics>,
    sessions: Vec<SessionMetrics>,
    frame_interval_secs: f64,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL_MS as f64 / 1000.0)
    }
}

impl SessionTracker {
    /// Create a tracker for a given sampling period (seconds per frame)
    pub fn new(frame_interval_secs: f64) -> Self {
        Self {
            current: None,
            sessions: Vec::new(),
            frame_interval_secs,
        }
    }

    /// Start a new session, ending any active one first. Returns the new id.
    pub fn start_session(&mut self) -> String {
        self.start_session_at(Utc::now())
    }

    pub fn start_session_at(&mut self, now: DateTime<Utc>) -> String {
        if let Some(previous) = self.end_session_at(now) {
            info!("session {} auto-ended by new session start", previous.id);
        }
        let session = SessionMetrics::new(now);
        let id = session.id.clone();
        debug!("session {} started", id);
        self.current = Some(session);
        id
    }

    /// Finalize and archive the active session. `None` if there is none.
    pub fn end_session(&mut self) -> Option<SessionMetrics> {
        self.end_session_at(Utc::now())
    }

    pub fn end_session_at(&mut self, now: DateTime<Utc>) -> Option<SessionMetrics> {
        let mut finished = self.current.take()?;
        finished.ended_at = Some(now);
        debug!(
            "session {} ended: follow {}/{}, blinks {}, hold frames {}",
            finished.id,
            finished.follow_successes,
            finished.follow_total,
            finished.blink_count,
            finished.focus_hold_frames
        );
        self.sessions.push(finished.clone());
        Some(finished)
    }

    pub fn record_follow(&mut self, ok: bool) {
        if let Some(current) = self.current.as_mut() {
            current.follow_total += 1;
            if ok {
                current.follow_successes += 1;
            }
        }
    }

    pub fn record_blink(&mut self) {
        if let Some(current) = self.current.as_mut() {
            current.blink_count += 1;
        }
    }

    pub fn record_focus_hold_frames(&mut self, frames: u32) {
        if let Some(current) = self.current.as_mut() {
            current.focus_hold_frames += frames;
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&SessionMetrics> {
        self.current.as_ref()
    }

    /// Live summary of the active session
    pub fn current_summary(&self) -> Option<SessionSummary> {
        self.current.as_ref().map(|s| self.summarize(s))
    }

    /// Summaries of archived sessions, in the order they ended
    pub fn all_sessions(&self) -> Vec<SessionSummary> {
        self.sessions.iter().map(|s| self.summarize(s)).collect()
    }

    /// Archived session records
    pub fn archived(&self) -> &[SessionMetrics] {
        &self.sessions
    }

    pub fn summarize(&self, session: &SessionMetrics) -> SessionSummary {
        SessionSummary {
            id: session.id.clone(),
            started_at: session.started_at,
            ended_at: session.ended_at,
            follow_accuracy: session.follow_accuracy(),
            blink_count: session.blink_count,
            focus_hold_seconds: session.focus_hold_seconds(self.frame_interval_secs),
        }
    }

    /// Load tracker state from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize tracker state to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_all_follow_successes() {
        let mut tracker = SessionTracker::default();
        tracker.start_session();
        for _ in 0..7 {
            tracker.record_follow(true);
        }
        let finished = tracker.end_session().unwrap();
        assert_eq!(finished.follow_accuracy(), 100);
    }

    #[test]
    fn test_interleaved_follow_accuracy() {
        for (n, m) in [(1u32, 2u32), (3, 1), (2, 5), (10, 3)] {
            let mut tracker = SessionTracker::default();
            tracker.start_session();
            let (mut s, mut f) = (0, 0);
            while s < n || f < m {
                if s < n {
                    tracker.record_follow(true);
                    s += 1;
                }
                if f < m {
                    tracker.record_follow(false);
                    f += 1;
                }
            }
            let finished = tracker.end_session().unwrap();
            let expected = ((n as f64 / (n + m) as f64) * 100.0).round() as u32;
            assert_eq!(finished.follow_accuracy(), expected);
        }
    }

    #[test]
    fn test_blink_session_archived() {
        let mut tracker = SessionTracker::default();
        tracker.start_session();
        tracker.record_blink();
        tracker.record_blink();
        tracker.end_session();

        let sessions = tracker.all_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].blink_count, 2);
        assert!(sessions[0].ended_at.is_some());
    }

    #[test]
    fn test_end_session_twice_is_idempotent() {
        let mut tracker = SessionTracker::default();
        tracker.start_session();
        assert!(tracker.end_session().is_some());
        assert!(tracker.end_session().is_none());
        assert_eq!(tracker.all_sessions().len(), 1);
    }

    #[test]
    fn test_record_without_session_is_noop() {
        let mut tracker = SessionTracker::default();
        tracker.record_follow(true);
        tracker.record_blink();
        tracker.record_focus_hold_frames(4);
        assert!(tracker.current_summary().is_none());
        assert!(tracker.end_session().is_none());
        assert!(tracker.all_sessions().is_empty());
    }

    #[test]
    fn test_start_auto_ends_active_session() {
        let mut tracker = SessionTracker::default();
        let first = tracker.start_session();
        tracker.record_blink();
        let second = tracker.start_session();

        assert_ne!(first, second);
        let archived = tracker.all_sessions();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, first);
        assert_eq!(archived[0].blink_count, 1);
        assert_eq!(tracker.current_summary().unwrap().blink_count, 0);
    }

    #[test]
    fn test_focus_hold_seconds() {
        let mut tracker = SessionTracker::new(0.45);
        tracker.start_session();
        tracker.record_focus_hold_frames(10);
        // 10 * 0.45 = 4.5 -> 5
        assert_eq!(tracker.current_summary().unwrap().focus_hold_seconds, 5);
        assert_eq!(tracker.current_summary().unwrap().follow_accuracy, 0);
    }

    #[test]
    fn test_injected_clock() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 14, 5, 0).unwrap();

        let mut tracker = SessionTracker::default();
        tracker.start_session_at(start);
        let finished = tracker.end_session_at(end).unwrap();
        assert_eq!(finished.started_at, start);
        assert_eq!(finished.ended_at, Some(end));
    }

    #[test]
    fn test_serialization() {
        let mut tracker = SessionTracker::default();
        tracker.start_session();
        tracker.record_blink();
        tracker.end_session();

        let json = tracker.to_json().unwrap();
        let loaded = SessionTracker::from_json(&json).unwrap();
        assert_eq!(loaded, tracker);
    }
}
