// Sequencer module
// Musical time, the note schedule, and the transport clock

pub mod clock;
pub mod note;
pub mod range;
pub mod timeline;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use note::{
    Annotation, AuthoredNote, NoteGroup, NoteIdentity, Schedule, ScheduledAnnotation,
    ScheduledNote, note_name,
};
pub use range::{
    DEFAULT_SPLIT_PITCH, Hand, RepeatRegion, bar_range_to_beats, extract_bars, filter_hand,
    filter_pitch_range,
};
pub use timeline::{BeatTimeConverter, Tempo, TimeSignature};
pub use transport::{MusicalTimeManager, TransportState};
