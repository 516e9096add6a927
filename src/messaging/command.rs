// Command types - Controls and performer input → practice session

use crate::input::PerformerInput;
use crate::sequencer::RepeatRegion;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    SetTempo(f64),
    SeekToPosition(f64),
    SeekToRealTime(f64),
    /// Fraction of the whole schedule, 0.0 to 1.0
    SeekToProgress(f64),
    SetWaitMode(bool),
    SetRepeatRegion(Option<RepeatRegion>),
    Input(PerformerInput),
}
