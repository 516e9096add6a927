// Practice module
// Scoring, wait-for-input, and the session that drives them

pub mod evaluator;
pub mod session;
pub mod wait_mode;

pub use evaluator::{DEFAULT_TOLERANCE_MS, HitResult, Score, ScoreEvaluator, SessionId};
pub use session::{PracticeSession, TickReport};
pub use wait_mode::{
    DEFAULT_LOOKAHEAD_MS, DEFAULT_TRIGGER_MS, WaitForInputController, WaitGroup, WaitInput,
};
