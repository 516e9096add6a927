// Piano Practice - Library exports for tests and benchmarks

pub mod config;
pub mod error;
pub mod input;
pub mod messaging;
pub mod practice;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use config::PracticeConfig;
pub use error::{PracticeError, PracticeResult};
pub use input::{InputKind, PerformerInput};
pub use messaging::{Command, PracticeEvent, create_command_channel, create_event_channel};
pub use practice::{
    HitResult, PracticeSession, Score, ScoreEvaluator, SessionId, TickReport,
    WaitForInputController, WaitInput,
};
pub use sequencer::{
    Annotation, AuthoredNote, BeatTimeConverter, Clock, ManualClock, MusicalTimeManager,
    RepeatRegion, Schedule, ScheduledNote, SystemClock, Tempo, TimeSignature, TransportState,
};
