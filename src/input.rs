// Performer input events
// Device wiring lives upstream; this is the normalized event it produces

/// Key direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    NoteDown,
    NoteUp,
}

/// One key event from the performer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformerInput {
    pub kind: InputKind,
    /// MIDI note number (0-127)
    pub pitch: u8,
    /// Upstream timestamp in milliseconds, informational only
    pub timestamp_ms: f64,
}

impl PerformerInput {
    pub fn note_down(pitch: u8, timestamp_ms: f64) -> Self {
        Self {
            kind: InputKind::NoteDown,
            pitch,
            timestamp_ms,
        }
    }

    pub fn note_up(pitch: u8, timestamp_ms: f64) -> Self {
        Self {
            kind: InputKind::NoteUp,
            pitch,
            timestamp_ms,
        }
    }

    /// Decode a raw MIDI note message (any channel)
    ///
    /// Note On with velocity 0 is a Note Off. Anything else yields `None`.
    pub fn from_midi_bytes(bytes: &[u8], timestamp_ms: f64) -> Option<Self> {
        let &[status, pitch, velocity, ..] = bytes else {
            return None;
        };
        if pitch > 127 || velocity > 127 {
            return None;
        }

        match (status & 0xF0, velocity) {
            (0x90, 0) | (0x80, _) => Some(Self::note_up(pitch, timestamp_ms)),
            (0x90, _) => Some(Self::note_down(pitch, timestamp_ms)),
            _ => None,
        }
    }

    pub fn is_down(&self) -> bool {
        self.kind == InputKind::NoteDown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on() {
        let input = PerformerInput::from_midi_bytes(&[0x90, 60, 100], 12.5).unwrap();
        assert_eq!(input, PerformerInput::note_down(60, 12.5));
        assert!(input.is_down());
    }

    #[test]
    fn test_note_off_explicit_and_velocity_zero() {
        let off = PerformerInput::from_midi_bytes(&[0x83, 60, 64], 0.0).unwrap();
        assert_eq!(off.kind, InputKind::NoteUp);

        let off = PerformerInput::from_midi_bytes(&[0x9F, 64, 0], 0.0).unwrap();
        assert_eq!(off, PerformerInput::note_up(64, 0.0));
    }

    #[test]
    fn test_non_note_messages_rejected() {
        // Control change, pitch bend, truncated, data byte out of range
        assert!(PerformerInput::from_midi_bytes(&[0xB0, 7, 100], 0.0).is_none());
        assert!(PerformerInput::from_midi_bytes(&[0xE0, 0, 64], 0.0).is_none());
        assert!(PerformerInput::from_midi_bytes(&[0x90, 60], 0.0).is_none());
        assert!(PerformerInput::from_midi_bytes(&[], 0.0).is_none());
        assert!(PerformerInput::from_midi_bytes(&[0x90, 200, 100], 0.0).is_none());
    }
}
