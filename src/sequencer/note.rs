// Note representation for the practice schedule
// Authored notes live in beats; scheduled notes live in milliseconds

use crate::error::{PracticeError, PracticeResult};
use std::collections::BTreeSet;
use std::sync::Arc;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Get the note name for a MIDI pitch (e.g., "C4", "A#5")
pub fn note_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

/// A note as written in the score, positioned in quarter-note beats
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoredNote {
    /// MIDI note number (0-127, where 60 = C4)
    pub pitch: u8,

    /// Start position in beats from the top of the piece
    pub beat_start: f64,

    /// Length in beats
    pub beat_duration: f64,

    /// MIDI velocity (0-127)
    #[serde(default = "default_velocity")]
    pub velocity: u8,
}

fn default_velocity() -> u8 {
    80
}

impl AuthoredNote {
    /// Creates a new validated note
    pub fn new(pitch: u8, beat_start: f64, beat_duration: f64, velocity: u8) -> PracticeResult<Self> {
        let note = Self {
            pitch,
            beat_start,
            beat_duration,
            velocity,
        };
        note.validate()?;
        Ok(note)
    }

    /// Check ranges for notes that arrived through deserialization
    pub fn validate(&self) -> PracticeResult<()> {
        if self.pitch > 127 {
            return Err(PracticeError::InvalidPitch(self.pitch));
        }
        if self.velocity > 127 {
            return Err(PracticeError::InvalidVelocity(self.velocity));
        }
        if !self.beat_start.is_finite() || self.beat_start < 0.0 {
            return Err(PracticeError::InvalidPosition(self.beat_start));
        }
        if !self.beat_duration.is_finite() || self.beat_duration <= 0.0 {
            return Err(PracticeError::InvalidDuration(self.beat_duration));
        }
        Ok(())
    }
}

/// Beat-positioned text (rehearsal marks, fingering hints...)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    pub beat: f64,
    pub text: String,
}

impl Annotation {
    pub fn new(beat: f64, text: impl Into<String>) -> Self {
        Self {
            beat,
            text: text.into(),
        }
    }
}

/// An annotation converted to real time
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAnnotation {
    pub time_ms: f64,
    pub text: String,
}

/// Identity of one scorable event: pitch plus scheduled start time.
///
/// Array positions are never used as keys because a schedule may be resliced
/// (bar extraction, repeat regions) between play sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteIdentity {
    pub pitch: u8,
    start_bits: u64,
}

impl NoteIdentity {
    pub fn new(pitch: u8, start_time: f64) -> Self {
        // + 0.0 folds -0.0 into 0.0 so both hash alike
        Self {
            pitch,
            start_bits: (start_time + 0.0).to_bits(),
        }
    }

    pub fn start_time(&self) -> f64 {
        f64::from_bits(self.start_bits)
    }
}

/// A note placed in real time, milliseconds from the piece start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub pitch: u8,
    pub start_time: f64,
    pub duration: f64,
    pub velocity: u8,
}

impl ScheduledNote {
    pub fn identity(&self) -> NoteIdentity {
        NoteIdentity::new(self.pitch, self.start_time)
    }

    /// Get the end time of this note
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn note_name(&self) -> String {
        note_name(self.pitch)
    }
}

/// Notes sharing one exact start time (a chord or a single note)
#[derive(Debug, Clone, PartialEq)]
pub struct NoteGroup {
    pub start_time: f64,
    pub pitches: BTreeSet<u8>,
}

/// Read-only, time-ordered list of scheduled notes
///
/// Cloning is cheap and shares the underlying list. A tempo change builds a
/// whole new `Schedule` and swaps it in; an existing one is never mutated.
#[derive(Debug, Clone)]
pub struct Schedule {
    notes: Arc<[ScheduledNote]>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Schedule {
    /// Sorts by start time, then pitch
    pub fn new(mut notes: Vec<ScheduledNote>) -> Self {
        notes.sort_by(|a, b| {
            a.start_time
                .total_cmp(&b.start_time)
                .then(a.pitch.cmp(&b.pitch))
        });
        Self {
            notes: notes.into(),
        }
    }

    pub fn notes(&self) -> &[ScheduledNote] {
        &self.notes
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledNote> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// End time of the last-sounding note (0 for an empty schedule)
    pub fn total_duration_ms(&self) -> f64 {
        self.notes
            .iter()
            .map(ScheduledNote::end_time)
            .fold(0.0, f64::max)
    }

    /// Earliest note group with `from <= start_time <= to`, skipping start
    /// times for which `skip` returns true
    pub fn next_group(
        &self,
        from: f64,
        to: f64,
        mut skip: impl FnMut(f64) -> bool,
    ) -> Option<NoteGroup> {
        let first = self.notes.partition_point(|note| note.start_time < from);
        let start_time = self.notes[first..]
            .iter()
            .map(|note| note.start_time)
            .take_while(|&start| start <= to)
            .find(|&start| !skip(start))?;

        let pitches = self.notes[first..]
            .iter()
            .skip_while(|note| note.start_time < start_time)
            .take_while(|note| note.start_time == start_time)
            .map(|note| note.pitch)
            .collect();

        Some(NoteGroup {
            start_time,
            pitches,
        })
    }

    /// True if two handles share the same underlying list
    pub fn ptr_eq(&self, other: &Schedule) -> bool {
        Arc::ptr_eq(&self.notes, &other.notes)
    }
}
