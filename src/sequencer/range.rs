// Practice ranges - bar extraction, hand filtering and repeat regions

use super::note::AuthoredNote;
use super::timeline::{BeatTimeConverter, TimeSignature};
use crate::error::{PracticeError, PracticeResult};

/// Default split point between the hands (middle C)
pub const DEFAULT_SPLIT_PITCH: u8 = 60;

/// Which hand to practice
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Hand {
    /// Pitches at or above the split point
    Right,
    /// Pitches below the split point
    Left,
}

/// Convert a 1-based inclusive bar range into a half-open beat range
pub fn bar_range_to_beats(
    start_bar: u32,
    end_bar: u32,
    signature: &TimeSignature,
) -> PracticeResult<(f64, f64)> {
    if start_bar == 0 || end_bar < start_bar {
        return Err(PracticeError::InvalidRange {
            start: start_bar as f64,
            end: end_bar as f64,
        });
    }

    let bar_beats = signature.quarter_notes_per_bar();
    Ok(((start_bar - 1) as f64 * bar_beats, end_bar as f64 * bar_beats))
}

/// Notes starting inside bars `start_bar..=end_bar`, rebased to beat 0
pub fn extract_bars(
    notes: &[AuthoredNote],
    start_bar: u32,
    end_bar: u32,
    signature: &TimeSignature,
) -> PracticeResult<Vec<AuthoredNote>> {
    let (start_beat, end_beat) = bar_range_to_beats(start_bar, end_bar, signature)?;

    Ok(notes
        .iter()
        .filter(|note| note.beat_start >= start_beat && note.beat_start < end_beat)
        .map(|note| AuthoredNote {
            beat_start: note.beat_start - start_beat,
            ..*note
        })
        .collect())
}

/// Keep notes whose pitch lies in `[min_pitch, max_pitch]`; a missing bound is open
pub fn filter_pitch_range(
    notes: &[AuthoredNote],
    min_pitch: Option<u8>,
    max_pitch: Option<u8>,
) -> Vec<AuthoredNote> {
    notes
        .iter()
        .filter(|note| min_pitch.is_none_or(|min| note.pitch >= min))
        .filter(|note| max_pitch.is_none_or(|max| note.pitch <= max))
        .copied()
        .collect()
}

/// Keep only the notes played by one hand
pub fn filter_hand(notes: &[AuthoredNote], hand: Hand, split_pitch: u8) -> Vec<AuthoredNote> {
    match hand {
        Hand::Right => filter_pitch_range(notes, Some(split_pitch), None),
        Hand::Left => match split_pitch.checked_sub(1) {
            Some(max) => filter_pitch_range(notes, None, Some(max)),
            None => Vec::new(),
        },
    }
}

/// Passage replayed in a loop, in beats so it survives tempo changes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepeatRegion {
    start_beat: f64,
    end_beat: f64,
}

impl RepeatRegion {
    /// `end_beat` must be strictly after `start_beat`, both non-negative
    pub fn new(start_beat: f64, end_beat: f64) -> PracticeResult<Self> {
        if !(start_beat >= 0.0 && end_beat.is_finite() && end_beat > start_beat) {
            return Err(PracticeError::InvalidRange {
                start: start_beat,
                end: end_beat,
            });
        }
        Ok(Self {
            start_beat,
            end_beat,
        })
    }

    /// Region covering whole bars `start_bar..=end_bar`
    pub fn from_bars(start_bar: u32, end_bar: u32, signature: &TimeSignature) -> PracticeResult<Self> {
        let (start, end) = bar_range_to_beats(start_bar, end_bar, signature)?;
        Self::new(start, end)
    }

    pub fn start_beat(&self) -> f64 {
        self.start_beat
    }

    pub fn end_beat(&self) -> f64 {
        self.end_beat
    }

    /// `(start_ms, end_ms)` at the converter's tempo
    pub fn to_real_time(&self, converter: &BeatTimeConverter) -> (f64, f64) {
        (
            converter.beats_to_real_time(self.start_beat),
            converter.beats_to_real_time(self.end_beat),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::timeline::Tempo;

    fn notes() -> Vec<AuthoredNote> {
        vec![
            AuthoredNote::new(48, 0.0, 4.0, 80).unwrap(),
            AuthoredNote::new(72, 3.5, 0.5, 80).unwrap(),
            AuthoredNote::new(64, 4.0, 1.0, 80).unwrap(),
            AuthoredNote::new(60, 7.0, 1.0, 80).unwrap(),
            AuthoredNote::new(43, 8.0, 2.0, 80).unwrap(),
        ]
    }

    #[test]
    fn test_bar_range_to_beats() {
        let ts = TimeSignature::four_four();
        assert_eq!(bar_range_to_beats(1, 1, &ts).unwrap(), (0.0, 4.0));
        assert_eq!(bar_range_to_beats(2, 3, &ts).unwrap(), (4.0, 12.0));

        let waltz = TimeSignature::three_four();
        assert_eq!(bar_range_to_beats(2, 2, &waltz).unwrap(), (3.0, 6.0));
    }

    #[test]
    fn test_invalid_bar_range() {
        let ts = TimeSignature::four_four();
        assert!(bar_range_to_beats(0, 2, &ts).is_err());
        assert!(bar_range_to_beats(3, 2, &ts).is_err());
    }

    #[test]
    fn test_extract_bars_rebases() {
        let extracted = extract_bars(&notes(), 2, 2, &TimeSignature::four_four()).unwrap();
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].pitch, 64);
        assert_eq!(extracted[0].beat_start, 0.0);
        assert_eq!(extracted[1].pitch, 60);
        assert_eq!(extracted[1].beat_start, 3.0);
    }

    #[test]
    fn test_filter_hand() {
        let right = filter_hand(&notes(), Hand::Right, DEFAULT_SPLIT_PITCH);
        let pitches: Vec<u8> = right.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![72, 64, 60]);

        let left = filter_hand(&notes(), Hand::Left, DEFAULT_SPLIT_PITCH);
        let pitches: Vec<u8> = left.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![48, 43]);
    }

    #[test]
    fn test_filter_pitch_range() {
        let pitches = |kept: Vec<AuthoredNote>| kept.iter().map(|n| n.pitch).collect::<Vec<u8>>();

        assert_eq!(pitches(filter_pitch_range(&notes(), Some(48), Some(64))), vec![48, 64, 60]);
        assert_eq!(pitches(filter_pitch_range(&notes(), None, Some(48))), vec![48, 43]);
        assert_eq!(pitches(filter_pitch_range(&notes(), Some(65), None)), vec![72]);
        assert_eq!(filter_pitch_range(&notes(), None, None).len(), notes().len());
        assert!(filter_pitch_range(&notes(), Some(70), Some(50)).is_empty());

        assert!(filter_hand(&notes(), Hand::Left, 0).is_empty());
        assert_eq!(filter_hand(&notes(), Hand::Right, 0).len(), notes().len());
    }

    #[test]
    fn test_repeat_region() {
        let region = RepeatRegion::from_bars(2, 3, &TimeSignature::four_four()).unwrap();
        assert_eq!(region.start_beat(), 4.0);
        assert_eq!(region.end_beat(), 12.0);

        let converter = BeatTimeConverter::new(Tempo::new(120.0).unwrap());
        assert_eq!(region.to_real_time(&converter), (2000.0, 6000.0));

        assert!(RepeatRegion::new(4.0, 4.0).is_err());
        assert!(RepeatRegion::new(-1.0, 4.0).is_err());
        assert!(RepeatRegion::new(f64::NAN, 4.0).is_err());
    }
}
