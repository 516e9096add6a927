// Timeline - Musical time representation
// Handles conversion between beats (quarter notes), bars, and real time

use super::note::{Annotation, AuthoredNote, Schedule, ScheduledAnnotation, ScheduledNote};
use crate::error::{PracticeError, PracticeResult};
use std::fmt;

/// Milliseconds per minute, the numerator of every beat duration
const MS_PER_MINUTE: f64 = 60_000.0;

/// Time signature (numerator/denominator)
/// Example: 4/4 time = TimeSignature { numerator: 4, denominator: 4 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,   // Beats per bar (typically 3, 4, 5, 6, 7)
    pub denominator: u8, // Note value (4 = quarter note, 8 = eighth note)
}

impl TimeSignature {
    /// Creates a new time signature
    pub fn new(numerator: u8, denominator: u8) -> PracticeResult<Self> {
        if numerator == 0 || !denominator.is_power_of_two() {
            return Err(PracticeError::InvalidTimeSignature {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Common 4/4 time signature
    pub fn four_four() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    /// Common 3/4 time signature (waltz)
    pub fn three_four() -> Self {
        Self {
            numerator: 3,
            denominator: 4,
        }
    }

    /// Common 6/8 time signature
    pub fn six_eight() -> Self {
        Self {
            numerator: 6,
            denominator: 8,
        }
    }

    /// Length of one bar in quarter notes
    /// Example: 4/4 = 4.0, 3/4 = 3.0, 6/8 = 3.0
    pub fn quarter_notes_per_bar(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator as f64
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Tempo in BPM (quarter notes per minute)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Creates a new tempo
    /// BPM must be finite and strictly positive
    pub fn new(bpm: f64) -> PracticeResult<Self> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(PracticeError::InvalidTempo(bpm));
        }
        Ok(Self { bpm })
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one quarter note in milliseconds
    pub fn quarter_note_ms(&self) -> f64 {
        MS_PER_MINUTE / self.bpm
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Bidirectional beat <-> milliseconds mapping at the current tempo
///
/// Changing the tempo only affects future conversions. Anything computed
/// earlier (a [`Schedule`], scheduled annotations) must be rebuilt by the
/// caller. No rounding is applied; negative beats map to negative times
/// (pre-roll).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeatTimeConverter {
    tempo: Tempo,
}

impl BeatTimeConverter {
    pub fn new(tempo: Tempo) -> Self {
        Self { tempo }
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Replace the tempo. Fails without mutating on `bpm <= 0`.
    pub fn set_tempo(&mut self, bpm: f64) -> PracticeResult<()> {
        self.tempo = Tempo::new(bpm)?;
        Ok(())
    }

    pub fn quarter_note_ms(&self) -> f64 {
        self.tempo.quarter_note_ms()
    }

    pub fn beats_to_real_time(&self, beats: f64) -> f64 {
        beats * self.tempo.quarter_note_ms()
    }

    pub fn real_time_to_beats(&self, ms: f64) -> f64 {
        ms / self.tempo.quarter_note_ms()
    }

    /// Convert one authored note into its real-time form
    pub fn schedule_note(&self, note: &AuthoredNote) -> ScheduledNote {
        ScheduledNote {
            pitch: note.pitch,
            start_time: self.beats_to_real_time(note.beat_start),
            duration: self.beats_to_real_time(note.beat_duration),
            velocity: note.velocity,
        }
    }

    /// Build a fresh schedule from the full authored note list
    pub fn build_schedule(&self, notes: &[AuthoredNote]) -> Schedule {
        Schedule::new(notes.iter().map(|note| self.schedule_note(note)).collect())
    }

    /// Convert beat-positioned annotations, sorted by time
    pub fn schedule_annotations(&self, annotations: &[Annotation]) -> Vec<ScheduledAnnotation> {
        let mut scheduled: Vec<ScheduledAnnotation> = annotations
            .iter()
            .map(|annotation| ScheduledAnnotation {
                time_ms: self.beats_to_real_time(annotation.beat),
                text: annotation.text.clone(),
            })
            .collect();
        scheduled.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
        scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_signature() {
        let ts = TimeSignature::four_four();
        assert_eq!(ts.numerator, 4);
        assert_eq!(ts.denominator, 4);
        assert_eq!(ts.quarter_notes_per_bar(), 4.0);
        assert_eq!(ts.to_string(), "4/4");

        assert_eq!(TimeSignature::three_four().quarter_notes_per_bar(), 3.0);
        assert_eq!(TimeSignature::six_eight().quarter_notes_per_bar(), 3.0);
    }

    #[test]
    fn test_invalid_time_signature() {
        assert!(TimeSignature::new(0, 4).is_err());
        assert!(TimeSignature::new(4, 3).is_err());
        assert_eq!(TimeSignature::new(5, 8).unwrap().quarter_notes_per_bar(), 2.5);
    }

    #[test]
    fn test_tempo() {
        let tempo = Tempo::new(120.0).unwrap();
        assert_eq!(tempo.bpm(), 120.0);
        assert_eq!(tempo.quarter_note_ms(), 500.0);
        assert_eq!(tempo.to_string(), "120.0 BPM");
    }

    #[test]
    fn test_invalid_tempo() {
        assert!(matches!(Tempo::new(0.0), Err(PracticeError::InvalidTempo(_))));
        assert!(matches!(Tempo::new(-60.0), Err(PracticeError::InvalidTempo(_))));
        assert!(Tempo::new(f64::NAN).is_err());
        assert!(Tempo::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_converter_both_directions() {
        let converter = BeatTimeConverter::new(Tempo::new(120.0).unwrap());
        assert_eq!(converter.beats_to_real_time(4.0), 2000.0);
        assert_eq!(converter.real_time_to_beats(2000.0), 4.0);

        // Pre-roll positions are legal
        assert_eq!(converter.beats_to_real_time(-1.0), -500.0);
        // No rounding
        assert_eq!(converter.beats_to_real_time(0.001), 0.5);
    }

    #[test]
    fn test_set_tempo_rejects_without_mutation() {
        let mut converter = BeatTimeConverter::default();
        assert!(converter.set_tempo(0.0).is_err());
        assert_eq!(converter.tempo().bpm(), 120.0);

        converter.set_tempo(60.0).unwrap();
        assert_eq!(converter.beats_to_real_time(1.0), 1000.0);
    }

    #[test]
    fn test_schedule_note() {
        let converter = BeatTimeConverter::default();
        let note = AuthoredNote::new(60, 0.0, 1.0, 80).unwrap();
        let scheduled = converter.schedule_note(&note);

        assert_eq!(scheduled.pitch, 60);
        assert_eq!(scheduled.start_time, 0.0);
        assert_eq!(scheduled.duration, 500.0);
        assert_eq!(scheduled.velocity, 80);
    }

    #[test]
    fn test_annotations_follow_tempo() {
        let mut converter = BeatTimeConverter::default();
        let annotations = vec![
            Annotation::new(8.0, "Coda"),
            Annotation::new(2.0, "Verse"),
        ];

        let scheduled = converter.schedule_annotations(&annotations);
        assert_eq!(scheduled[0].text, "Verse");
        assert_eq!(scheduled[0].time_ms, 1000.0);
        assert_eq!(scheduled[1].time_ms, 4000.0);

        // Previously converted values are untouched by a tempo change
        converter.set_tempo(60.0).unwrap();
        assert_eq!(scheduled[0].time_ms, 1000.0);
        let rescheduled = converter.schedule_annotations(&annotations);
        assert_eq!(rescheduled[0].time_ms, 2000.0);
    }
}
