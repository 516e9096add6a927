// Practice engine errors
// Synchronous validation failures; nothing here is retried

use thiserror::Error;

/// Result type for practice engine operations
pub type PracticeResult<T> = Result<T, PracticeError>;

/// Errors returned by the practice engine
///
/// State-transition misuse (pausing twice, unfreezing a running clock...) is
/// deliberately absent: those calls are no-ops, never errors.
#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("Invalid tempo: {0} BPM (must be > 0)")]
    InvalidTempo(f64),

    #[error("Invalid MIDI pitch: {0} (must be 0-127)")]
    InvalidPitch(u8),

    #[error("Invalid MIDI velocity: {0} (must be 0-127)")]
    InvalidVelocity(u8),

    #[error("Invalid note duration: {0} beats (must be > 0)")]
    InvalidDuration(f64),

    #[error("Invalid note position: {0}")]
    InvalidPosition(f64),

    #[error("Invalid range: {start} to {end}")]
    InvalidRange { start: f64, end: f64 },

    #[error("Invalid time signature: {numerator}/{denominator}")]
    InvalidTimeSignature { numerator: u8, denominator: u8 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("Song parse error: {0}")]
    Song(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
