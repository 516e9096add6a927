// Wait-for-input mode
// Freezes the transport at each note group until the performer plays it

use super::evaluator::{HitResult, ScoreEvaluator};
use crate::sequencer::{MusicalTimeManager, Schedule, note_name};
use log::{debug, info};
use std::collections::{BTreeSet, HashSet};

/// How far ahead of the playhead the next group is searched for
pub const DEFAULT_LOOKAHEAD_MS: f64 = 100.0;

/// How early before a group's start the transport is frozen
pub const DEFAULT_TRIGGER_MS: f64 = 50.0;

/// The note group the transport is currently waiting on
#[derive(Debug, Clone, PartialEq)]
pub struct WaitGroup {
    pub start_time: f64,
    pub required: BTreeSet<u8>,
    pub pressed_this_group: BTreeSet<u8>,
    /// Keys still down from the previous group; they must be released and
    /// pressed again to count
    pub held_from_previous: BTreeSet<u8>,
}

impl WaitGroup {
    pub fn is_satisfied(&self) -> bool {
        self.required.is_subset(&self.pressed_this_group)
    }

    /// Required pitches not yet pressed
    pub fn remaining(&self) -> BTreeSet<u8> {
        self.required
            .difference(&self.pressed_this_group)
            .copied()
            .collect()
    }
}

/// What a key press did while wait mode is engaged
#[derive(Debug, Clone, PartialEq)]
pub enum WaitInput {
    /// No group is pending; the caller scores the input normally
    NotWaiting,
    /// Pitch is not part of the pending group
    NotRequired,
    /// Key has not been released since the previous group
    HeldOver,
    /// Already counted for this group
    AlreadyPressed,
    Accepted { result: HitResult, remaining: usize },
    /// Last required pitch arrived; the transport is running again
    Released { start_time: f64, result: HitResult },
}

/// Rendezvous between the clock and the performer
///
/// There is no timeout: if the group is never completed the transport never
/// advances. Anything that moves the playhead away must call
/// [`cancel`](Self::cancel) or [`reposition`](Self::reposition) first.
#[derive(Debug, Clone)]
pub struct WaitForInputController {
    lookahead_ms: f64,
    trigger_ms: f64,
    floor_ms: f64,
    ceiling_ms: Option<f64>,
    /// Start times (as bits) already waited on in this pass
    processed: HashSet<u64>,
    held: BTreeSet<u8>,
    waiting: Option<WaitGroup>,
}

impl WaitForInputController {
    pub fn new(lookahead_ms: f64, trigger_ms: f64) -> Self {
        Self {
            lookahead_ms: lookahead_ms.max(0.0),
            trigger_ms: trigger_ms.max(0.0),
            floor_ms: 0.0,
            ceiling_ms: None,
            processed: HashSet::new(),
            held: BTreeSet::new(),
            waiting: None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.is_some()
    }

    pub fn current_group(&self) -> Option<&WaitGroup> {
        self.waiting.as_ref()
    }

    /// Pitches the performer must press, for an on-screen overlay
    pub fn required_pitches(&self) -> Option<&BTreeSet<u8>> {
        self.waiting.as_ref().map(|group| &group.required)
    }

    /// Every key currently down, whether waiting or not
    pub fn held_pitches(&self) -> &BTreeSet<u8> {
        &self.held
    }

    /// Groups at or after `ceiling_ms` are never waited on
    pub fn set_ceiling(&mut self, ceiling_ms: Option<f64>) {
        self.ceiling_ms = ceiling_ms;
    }

    /// Freeze ahead of the next unprocessed group once it is due
    ///
    /// Returns the group when waiting begins on this call.
    pub fn tick(
        &mut self,
        transport: &mut MusicalTimeManager,
        schedule: &Schedule,
    ) -> Option<WaitGroup> {
        if self.waiting.is_some() || !transport.is_running() {
            return None;
        }

        let now = transport.current_real_time();
        let processed = &self.processed;
        let ceiling = self.ceiling_ms;
        let group = schedule.next_group(self.floor_ms, now + self.lookahead_ms, |start| {
            processed.contains(&start.to_bits()) || ceiling.is_some_and(|c| start >= c)
        })?;

        if now < group.start_time - self.trigger_ms {
            return None;
        }

        transport.freeze_at(group.start_time);
        self.processed.insert(group.start_time.to_bits());

        let waiting = WaitGroup {
            start_time: group.start_time,
            required: group.pitches,
            pressed_this_group: BTreeSet::new(),
            held_from_previous: self.held.clone(),
        };
        info!(
            "Waiting at {:.1} ms for {:?}",
            waiting.start_time,
            waiting.required.iter().map(|&p| note_name(p)).collect::<Vec<_>>()
        );
        self.waiting = Some(waiting.clone());
        Some(waiting)
    }

    /// Key down. Accepted pitches are scored at the frozen group time.
    pub fn note_down(
        &mut self,
        pitch: u8,
        transport: &mut MusicalTimeManager,
        evaluator: &mut ScoreEvaluator,
        schedule: &Schedule,
    ) -> WaitInput {
        self.held.insert(pitch);

        let Some(group) = self.waiting.as_mut() else {
            return WaitInput::NotWaiting;
        };
        if !group.required.contains(&pitch) {
            return WaitInput::NotRequired;
        }
        if group.held_from_previous.contains(&pitch) {
            debug!("{} still held from previous group", note_name(pitch));
            return WaitInput::HeldOver;
        }
        if group.pressed_this_group.contains(&pitch) {
            return WaitInput::AlreadyPressed;
        }

        let result = evaluator.evaluate_input(pitch, group.start_time, schedule);
        group.pressed_this_group.insert(pitch);

        if !group.is_satisfied() {
            return WaitInput::Accepted {
                result,
                remaining: group.remaining().len(),
            };
        }

        let start_time = group.start_time;
        self.waiting = None;
        transport.unfreeze();
        info!("Group at {:.1} ms complete, resuming", start_time);
        WaitInput::Released { start_time, result }
    }

    /// Key up. A released key may count again if its pitch recurs.
    pub fn note_up(&mut self, pitch: u8) {
        self.held.remove(&pitch);
        if let Some(group) = self.waiting.as_mut() {
            group.held_from_previous.remove(&pitch);
        }
    }

    /// Abandon the pending group and unfreeze the transport
    pub fn cancel(&mut self, transport: &mut MusicalTimeManager) {
        if self.waiting.take().is_some() {
            transport.unfreeze();
            info!("Wait cancelled");
        }
    }

    /// Cancel, then start a fresh pass where groups before `floor_ms` are
    /// ignored
    pub fn reposition(&mut self, transport: &mut MusicalTimeManager, floor_ms: f64) {
        self.cancel(transport);
        self.processed.clear();
        self.floor_ms = floor_ms;
    }
}

impl Default for WaitForInputController {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKAHEAD_MS, DEFAULT_TRIGGER_MS)
    }
}
