use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Where the capture state machine currently sits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScanPhase {
    Idle,
    Scanning,
    Capturing,
    AwaitingRecognition,
    Paused,
    MenuOpen,
}

impl Default for ScanPhase {
    fn default() -> Self {
        ScanPhase::Idle
    }
}

/// Transient state for one visit to the capture screen. Owned exclusively by
/// the scheduler; every mutation happens under its lock.
///
/// `generation` increments on teardown so results of in-flight work can be
/// recognized as stale and discarded instead of mutating a dead session.
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: Option<String>,
    pub phase: ScanPhase,
    /// True while a capture+recognize round-trip (or manual action) is in
    /// flight. A new attempt and `busy` are mutually exclusive.
    pub busy: bool,
    pub menu_open: bool,
    pub generation: u64,
    pub last_capture: Option<Instant>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self {
            id: None,
            phase: ScanPhase::Idle,
            busy: false,
            menu_open: false,
            generation: 0,
            last_capture: None,
            started_at: None,
        }
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Screen gained focus with camera permission granted.
    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.id = Some(Uuid::new_v4().to_string());
        self.phase = ScanPhase::Scanning;
        self.busy = false;
        self.menu_open = false;
        self.last_capture = None;
        self.started_at = Some(now);
    }

    /// Screen lost focus. Bumps the generation so anything still in flight
    /// settles into the void.
    pub fn deactivate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.id = None;
        self.phase = ScanPhase::Idle;
        self.busy = false;
        self.menu_open = false;
        self.last_capture = None;
        self.started_at = None;
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.phase != ScanPhase::Idle
    }

    /// Whether a periodic tick may start a capture right now.
    pub fn ready_for_capture(&self, now: Instant, interval: Duration) -> bool {
        if self.phase != ScanPhase::Scanning || self.busy || self.menu_open {
            return false;
        }
        match self.last_capture {
            Some(previous) => now.saturating_duration_since(previous) >= interval,
            None => true,
        }
    }

    /// Unconditionally claim the in-flight slot. Callers check eligibility
    /// first; returns the generation to validate the eventual result against.
    pub fn begin_capture(&mut self, now: Instant) -> u64 {
        self.busy = true;
        self.phase = ScanPhase::Capturing;
        self.last_capture = Some(now);
        self.generation
    }

    /// Periodic-tick entry: claims the slot only when ready, otherwise the
    /// attempt is dropped (never queued).
    pub fn begin_periodic_capture(&mut self, now: Instant, interval: Duration) -> Option<u64> {
        if !self.ready_for_capture(now, interval) {
            return None;
        }
        Some(self.begin_capture(now))
    }

    /// Claim the busy flag for a non-capture manual action (connectivity
    /// check, demo record).
    pub fn begin_task(&mut self) -> u64 {
        self.busy = true;
        self.generation
    }

    pub fn finish_task(&mut self) {
        self.busy = false;
    }

    pub fn mark_awaiting(&mut self) {
        self.phase = ScanPhase::AwaitingRecognition;
    }

    /// Frame capture fell over before anything was submitted; release the
    /// slot and fall straight back to scanning.
    pub fn abort_capture(&mut self) {
        self.busy = false;
        if self.phase == ScanPhase::Capturing || self.phase == ScanPhase::AwaitingRecognition {
            self.phase = if self.menu_open {
                ScanPhase::MenuOpen
            } else {
                ScanPhase::Scanning
            };
        }
    }

    /// A recognition round-trip settled. On identification the scheduler
    /// holds off further periodic captures until the user explicitly
    /// resumes; otherwise the phase stays put until the cooldown elapses.
    pub fn settle(&mut self, identified: bool) {
        self.busy = false;
        if identified {
            self.phase = ScanPhase::Paused;
        }
    }

    /// Cooldown after a non-identifying outcome elapsed.
    pub fn resume_after_cooldown(&mut self) {
        if self.phase == ScanPhase::AwaitingRecognition && !self.busy {
            self.phase = if self.menu_open {
                ScanPhase::MenuOpen
            } else {
                ScanPhase::Scanning
            };
        }
    }

    pub fn pause(&mut self) {
        if self.phase == ScanPhase::Scanning {
            self.phase = ScanPhase::Paused;
        }
    }

    /// Resume periodic scanning, both from an explicit user pause and from
    /// the hold after a successful identification.
    pub fn resume(&mut self) {
        if self.phase == ScanPhase::Paused {
            self.phase = ScanPhase::Scanning;
        }
    }

    pub fn open_menu(&mut self) {
        if self.phase == ScanPhase::Idle {
            return;
        }
        self.menu_open = true;
        // Mid-flight round-trips keep their phase; the cooldown transition
        // routes to MenuOpen instead of Scanning.
        if !self.busy {
            self.phase = ScanPhase::MenuOpen;
        }
    }

    pub fn close_menu(&mut self) {
        self.menu_open = false;
        if self.phase == ScanPhase::MenuOpen && !self.busy {
            self.phase = ScanPhase::Scanning;
        }
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            session_id: self.id.clone(),
            phase: self.phase,
            busy: self.busy,
            menu_open: self.menu_open,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSnapshot {
    pub session_id: Option<String>,
    pub phase: ScanPhase,
    pub busy: bool,
    pub menu_open: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_session() -> ScanSession {
        let mut session = ScanSession::new();
        session.activate(Utc::now());
        session
    }

    #[test]
    fn activation_and_teardown_lifecycle() {
        let mut session = ScanSession::new();
        assert_eq!(session.phase, ScanPhase::Idle);

        session.activate(Utc::now());
        assert_eq!(session.phase, ScanPhase::Scanning);
        assert!(session.id.is_some());

        let generation = session.generation;
        session.deactivate();
        assert_eq!(session.phase, ScanPhase::Idle);
        assert!(!session.is_current(generation));
    }

    #[test]
    fn ten_ticks_within_one_interval_yield_one_capture() {
        let mut session = active_session();
        let interval = Duration::from_secs(3);
        let start = Instant::now();

        let mut captures = 0;
        for i in 0..10 {
            let tick = start + Duration::from_millis(i * 100);
            if let Some(generation) = session.begin_periodic_capture(tick, interval) {
                captures += 1;
                // Round-trip settles immediately without identifying.
                assert!(session.is_current(generation));
                session.mark_awaiting();
                session.settle(false);
                session.resume_after_cooldown();
            }
        }

        assert_eq!(captures, 1);
    }

    #[test]
    fn busy_session_accepts_no_captures() {
        let mut session = active_session();
        session.begin_capture(Instant::now());

        let now = Instant::now() + Duration::from_secs(60);
        for _ in 0..10 {
            assert_eq!(session.begin_periodic_capture(now, Duration::from_secs(3)), None);
        }
    }

    #[test]
    fn identification_holds_scanning_until_resumed() {
        let mut session = active_session();
        session.begin_capture(Instant::now());
        session.mark_awaiting();
        session.settle(true);

        assert_eq!(session.phase, ScanPhase::Paused);
        assert!(!session.busy);
        assert!(!session.ready_for_capture(
            Instant::now() + Duration::from_secs(60),
            Duration::from_secs(3)
        ));

        session.resume();
        assert_eq!(session.phase, ScanPhase::Scanning);
    }

    #[test]
    fn failure_returns_to_scanning_after_cooldown() {
        let mut session = active_session();
        session.begin_capture(Instant::now());
        session.mark_awaiting();
        session.settle(false);

        assert!(!session.busy);
        assert_eq!(session.phase, ScanPhase::AwaitingRecognition);

        session.resume_after_cooldown();
        assert_eq!(session.phase, ScanPhase::Scanning);
    }

    #[test]
    fn menu_opened_mid_flight_wins_the_cooldown_transition() {
        let mut session = active_session();
        session.begin_capture(Instant::now());
        session.mark_awaiting();

        session.open_menu();
        assert_eq!(session.phase, ScanPhase::AwaitingRecognition);

        session.settle(false);
        session.resume_after_cooldown();
        assert_eq!(session.phase, ScanPhase::MenuOpen);

        session.close_menu();
        assert_eq!(session.phase, ScanPhase::Scanning);
    }

    #[test]
    fn menu_suppresses_periodic_captures() {
        let mut session = active_session();
        session.open_menu();
        assert_eq!(session.phase, ScanPhase::MenuOpen);
        assert_eq!(
            session.begin_periodic_capture(
                Instant::now() + Duration::from_secs(60),
                Duration::from_secs(3)
            ),
            None
        );
    }

    #[test]
    fn close_menu_waits_for_manual_action_to_finish() {
        let mut session = active_session();
        session.open_menu();
        session.begin_task();

        session.close_menu();
        assert_eq!(session.phase, ScanPhase::MenuOpen);

        session.finish_task();
        session.close_menu();
        assert_eq!(session.phase, ScanPhase::Scanning);
    }

    #[test]
    fn stale_generation_is_not_current() {
        let mut session = active_session();
        let generation = session.begin_capture(Instant::now());
        session.deactivate();
        assert!(!session.is_current(generation));

        session.activate(Utc::now());
        assert!(!session.is_current(generation));
    }
}
