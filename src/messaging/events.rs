// Practice events - Session → UI, scoreboard, audio collaborators
// Returned from each tick instead of fired through callbacks

use crate::practice::evaluator::SessionId;
use crate::sequencer::NoteIdentity;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum PracticeEvent {
    NoteHit {
        identity: NoteIdentity,
        session: SessionId,
    },
    NoteMissed {
        identity: NoteIdentity,
    },
    WaitStarted {
        start_time: f64,
        pitches: BTreeSet<u8>,
    },
    WaitReleased {
        start_time: f64,
    },
    SessionStarted {
        session: SessionId,
        floor_time: Option<f64>,
    },
    /// Playback reached the end of the repeat region and jumped back
    RepeatWrapped {
        session: SessionId,
    },
    TempoChanged {
        bpm: f64,
    },
    Finished,
}

impl PracticeEvent {
    /// Events a scoreboard needs to redraw on
    pub fn affects_score(&self) -> bool {
        matches!(
            self,
            PracticeEvent::NoteHit { .. } | PracticeEvent::NoteMissed { .. }
        )
    }
}
