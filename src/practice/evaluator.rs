// Score evaluator - matches performer input against the schedule
// Hit bookkeeping is keyed by note identity and tagged by play session

use crate::sequencer::{NoteIdentity, Schedule, ScheduledNote};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Monotonically increasing scoring epoch, minted on every reposition
pub type SessionId = u64;

/// Default match window either side of a note start, in milliseconds
pub const DEFAULT_TOLERANCE_MS: f64 = 200.0;

/// Outcome of one input evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitResult {
    Hit(ScheduledNote),
    /// Nothing matched; wrong notes carry no penalty
    NoMatch,
}

impl HitResult {
    pub fn is_hit(&self) -> bool {
        matches!(self, HitResult::Hit(_))
    }

    pub fn note(&self) -> Option<&ScheduledNote> {
        match self {
            HitResult::Hit(note) => Some(note),
            HitResult::NoMatch => None,
        }
    }
}

/// Aggregate score across every session of the run
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
}

/// Session-scoped hit evaluation
///
/// A note may be hit at most once per session but again in each later
/// session (loops, seeks, repeats).
#[derive(Debug, Clone)]
pub struct ScoreEvaluator {
    tolerance_ms: f64,
    session: SessionId,
    /// Notes starting before this time are outside the current session
    floor_time: Option<f64>,
    hits: HashMap<NoteIdentity, HashSet<SessionId>>,
    active: HashMap<NoteIdentity, HashSet<SessionId>>,
    missed: HashMap<NoteIdentity, HashSet<SessionId>>,
}

impl ScoreEvaluator {
    pub fn new(tolerance_ms: f64) -> Self {
        Self {
            tolerance_ms: tolerance_ms.max(0.0),
            session: 0,
            floor_time: None,
            hits: HashMap::new(),
            active: HashMap::new(),
            missed: HashMap::new(),
        }
    }

    pub fn tolerance_ms(&self) -> f64 {
        self.tolerance_ms
    }

    pub fn set_tolerance_ms(&mut self, tolerance_ms: f64) {
        self.tolerance_ms = tolerance_ms.max(0.0);
    }

    pub fn current_session(&self) -> SessionId {
        self.session
    }

    pub fn floor_time(&self) -> Option<f64> {
        self.floor_time
    }

    /// Begin a new scoring pass. Notes before `floor_time` are out of scope
    /// for this session.
    pub fn start_new_play_session(&mut self, floor_time: Option<f64>) -> SessionId {
        self.session += 1;
        self.floor_time = floor_time;
        info!(
            "Play session {} started (floor {:?} ms)",
            self.session, floor_time
        );
        self.session
    }

    /// Score an input of `pitch` at real time `time_ms`
    ///
    /// Picks the earliest unhit note of that pitch within the tolerance
    /// window, so an overdue note is caught before an upcoming one.
    pub fn evaluate_input(&mut self, pitch: u8, time_ms: f64, schedule: &Schedule) -> HitResult {
        let candidate = schedule
            .iter()
            .filter(|note| note.pitch == pitch)
            .filter(|note| (note.start_time - time_ms).abs() <= self.tolerance_ms)
            .filter(|note| self.in_session_scope(note))
            .filter(|note| !self.was_hit(&note.identity()))
            .min_by(|a, b| a.start_time.total_cmp(&b.start_time))
            .copied();

        let Some(note) = candidate else {
            debug!("Input {} at {:.1} ms matched nothing", pitch, time_ms);
            return HitResult::NoMatch;
        };

        let identity = note.identity();
        self.hits.entry(identity).or_default().insert(self.session);
        // An early hit is in scope even before the playhead reaches it
        self.active.entry(identity).or_default().insert(self.session);
        debug!(
            "Hit {} at {:.1} ms (scheduled {:.1} ms, session {})",
            note.note_name(),
            time_ms,
            note.start_time,
            self.session
        );
        HitResult::Hit(note)
    }

    /// Mark notes whose start has been reached as active in this session
    ///
    /// Returns the identities that became active on this call.
    pub fn update_active_notes(&mut self, time_ms: f64, schedule: &Schedule) -> Vec<NoteIdentity> {
        let mut activated = Vec::new();
        for note in schedule.iter().take_while(|note| note.start_time <= time_ms) {
            if !self.in_session_scope(note) {
                continue;
            }
            if self
                .active
                .entry(note.identity())
                .or_default()
                .insert(self.session)
            {
                activated.push(note.identity());
            }
        }
        activated
    }

    /// Active, unhit notes of this session whose window has closed
    pub fn missed_notes(&self, time_ms: f64, schedule: &Schedule) -> Vec<ScheduledNote> {
        schedule
            .iter()
            .filter(|note| self.is_missed(note, time_ms))
            .copied()
            .collect()
    }

    /// Like [`missed_notes`](Self::missed_notes), but each miss is returned
    /// only once per session
    pub fn take_new_misses(&mut self, time_ms: f64, schedule: &Schedule) -> Vec<ScheduledNote> {
        let misses = self.missed_notes(time_ms, schedule);
        misses
            .into_iter()
            .filter(|note| {
                self.missed
                    .entry(note.identity())
                    .or_default()
                    .insert(self.session)
            })
            .collect()
    }

    /// Cumulative hits over actives across all sessions
    pub fn score(&self) -> Score {
        let correct: usize = self.hits.values().map(HashSet::len).sum();
        let total: usize = self.active.values().map(HashSet::len).sum();
        let accuracy = if total == 0 {
            1.0
        } else {
            correct as f64 / total as f64
        };

        Score {
            correct,
            total,
            accuracy,
        }
    }

    /// Carry bookkeeping over to a rescheduled copy of the same notes
    ///
    /// Both schedules must come from the same authored notes, so their sort
    /// order matches note for note. `time_scale` is new over old quarter-note
    /// length and rescales the session floor. The session is kept.
    pub fn remap_identities(&mut self, old: &Schedule, new: &Schedule, time_scale: f64) {
        if old.len() != new.len() {
            debug!(
                "Schedules differ in length ({} vs {}), identities not remapped",
                old.len(),
                new.len()
            );
            return;
        }

        let pairs: Vec<(NoteIdentity, NoteIdentity)> = old
            .iter()
            .zip(new.iter())
            .map(|(before, after)| (before.identity(), after.identity()))
            .collect();

        for map in [&mut self.hits, &mut self.active, &mut self.missed] {
            let mut remapped: HashMap<NoteIdentity, HashSet<SessionId>> = HashMap::new();
            for (before, after) in &pairs {
                if let Some(sessions) = map.remove(before) {
                    remapped.entry(*after).or_default().extend(sessions);
                }
            }
            // Anything left was not in the old schedule
            for (identity, sessions) in map.drain() {
                remapped.entry(identity).or_default().extend(sessions);
            }
            *map = remapped;
        }

        self.floor_time = self.floor_time.map(|floor| floor * time_scale);
    }

    /// Clear all bookkeeping and return to session 0
    pub fn reset(&mut self) {
        self.session = 0;
        self.floor_time = None;
        self.hits.clear();
        self.active.clear();
        self.missed.clear();
    }

    fn in_session_scope(&self, note: &ScheduledNote) -> bool {
        self.floor_time.is_none_or(|floor| note.start_time >= floor)
    }

    fn was_hit(&self, identity: &NoteIdentity) -> bool {
        self.hits
            .get(identity)
            .is_some_and(|sessions| sessions.contains(&self.session))
    }

    fn is_active(&self, identity: &NoteIdentity) -> bool {
        self.active
            .get(identity)
            .is_some_and(|sessions| sessions.contains(&self.session))
    }

    fn is_missed(&self, note: &ScheduledNote, time_ms: f64) -> bool {
        let identity = note.identity();
        note.end_time() + self.tolerance_ms < time_ms
            && self.is_active(&identity)
            && !self.was_hit(&identity)
    }
}

impl Default for ScoreEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_MS)
    }
}
