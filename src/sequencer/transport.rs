// Transport - Playback control and musical clock
// Turns wall-clock elapse into "real time since piece start", honoring
// pause, tempo change, seek and freeze

use super::clock::{Clock, SystemClock};
use super::timeline::{BeatTimeConverter, Tempo};
use crate::error::PracticeResult;
use log::{debug, info};

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Running,
    Paused,
    /// Held at a fixed time while wall-clock time keeps passing
    Frozen,
}

impl TransportState {
    /// Check if transport has been started and not stopped
    pub fn is_active(&self) -> bool {
        !matches!(self, TransportState::Stopped)
    }
}

/// Internal offsets. Only the derived real time / position leave this module.
#[derive(Debug, Clone, Copy, Default)]
struct ClockState {
    /// Wall-clock time at `start()`
    origin_ms: f64,
    /// Wall-clock time spent paused, excluded from elapsed time
    paused_total_ms: f64,
    /// Correction applied by seeks, tempo changes and unfreezes
    seek_offset_ms: f64,
    pause_started_ms: Option<f64>,
    /// Position captured by `pause()`, in beats
    paused_position: Option<f64>,
    frozen_at: Option<f64>,
}

/// Authoritative musical clock
///
/// Calls made from the "wrong" state are no-ops so an imprecisely timed UI
/// can never corrupt the clock. Tempo changes anchor to musical position:
/// `current_position()` is unchanged immediately after `set_tempo`.
pub struct MusicalTimeManager {
    clock: Box<dyn Clock>,
    converter: BeatTimeConverter,
    state: TransportState,
    timing: ClockState,
}

impl MusicalTimeManager {
    /// Create a transport driven by the system clock
    pub fn new(tempo: Tempo) -> Self {
        Self::with_clock(tempo, SystemClock::new())
    }

    /// Create a transport driven by an injected clock
    pub fn with_clock(tempo: Tempo, clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            converter: BeatTimeConverter::new(tempo),
            state: TransportState::Stopped,
            timing: ClockState::default(),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn tempo(&self) -> Tempo {
        self.converter.tempo()
    }

    /// Converter at the transport's current tempo
    pub fn converter(&self) -> &BeatTimeConverter {
        &self.converter
    }

    pub fn is_running(&self) -> bool {
        self.state == TransportState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == TransportState::Paused
    }

    pub fn is_frozen(&self) -> bool {
        self.state == TransportState::Frozen
    }

    pub fn is_stopped(&self) -> bool {
        self.state == TransportState::Stopped
    }

    /// Start from zero. No-op unless stopped.
    pub fn start(&mut self) {
        self.start_from(0.0);
    }

    /// Start at `real_time_ms`, which may be negative for a count-in
    pub fn start_from(&mut self, real_time_ms: f64) {
        if self.state != TransportState::Stopped {
            debug!("start() ignored: transport is {:?}", self.state);
            return;
        }

        self.timing = ClockState {
            origin_ms: self.clock.now_ms(),
            ..ClockState::default()
        };
        self.state = TransportState::Running;
        self.anchor_to(real_time_ms);
        info!("Transport started at {:.1} ms ({})", real_time_ms, self.tempo());
    }

    /// Pause (keep current position)
    pub fn pause(&mut self) {
        if self.state != TransportState::Running {
            debug!("pause() ignored: transport is {:?}", self.state);
            return;
        }

        let position = self.current_position();
        self.timing.paused_position = Some(position);
        self.timing.pause_started_ms = Some(self.clock.now_ms());
        self.state = TransportState::Paused;
        info!("Transport paused at beat {:.3}", position);
    }

    /// Resume from the captured (possibly re-seeked) position
    pub fn resume(&mut self) {
        if self.state != TransportState::Paused {
            debug!("resume() ignored: transport is {:?}", self.state);
            return;
        }

        let now = self.clock.now_ms();
        if let Some(started) = self.timing.pause_started_ms.take() {
            self.timing.paused_total_ms += now - started;
        }
        let position = self.timing.paused_position.take().unwrap_or(0.0);
        self.state = TransportState::Running;
        self.anchor_to(self.converter.beats_to_real_time(position));
        info!("Transport resumed at beat {:.3}", position);
    }

    /// Stop and reset every offset. Safe from any state.
    pub fn stop(&mut self) {
        if self.state != TransportState::Stopped {
            info!("Transport stopped");
        }
        self.timing = ClockState::default();
        self.state = TransportState::Stopped;
    }

    /// Pin the visible real time at `time_ms` until `unfreeze()`
    pub fn freeze_at(&mut self, time_ms: f64) {
        if self.state != TransportState::Running {
            debug!("freeze_at() ignored: transport is {:?}", self.state);
            return;
        }

        self.timing.frozen_at = Some(time_ms);
        self.state = TransportState::Frozen;
        debug!("Transport frozen at {:.1} ms", time_ms);
    }

    /// Continue from the frozen value with no jump
    pub fn unfreeze(&mut self) {
        if self.state != TransportState::Frozen {
            debug!("unfreeze() ignored: transport is {:?}", self.state);
            return;
        }

        let frozen_at = self.timing.frozen_at.take().unwrap_or(0.0);
        self.state = TransportState::Running;
        self.anchor_to(frozen_at);
        debug!("Transport unfrozen at {:.1} ms", frozen_at);
    }

    /// Seek to a real time in milliseconds
    ///
    /// Negative (or NaN) targets are clamped to 0. Seeking while frozen
    /// unfreezes first. Ignored while stopped.
    pub fn seek_to_real_time(&mut self, time_ms: f64) {
        let target = if time_ms >= 0.0 {
            time_ms
        } else {
            debug!("Seek target {} clamped to 0", time_ms);
            0.0
        };

        match self.state {
            TransportState::Stopped => {
                debug!("seek ignored: transport is stopped");
            }
            TransportState::Paused => {
                self.timing.paused_position = Some(self.converter.real_time_to_beats(target));
            }
            TransportState::Frozen => {
                self.unfreeze();
                self.anchor_to(target);
            }
            TransportState::Running => {
                self.anchor_to(target);
            }
        }
    }

    /// Seek to a musical position in beats
    pub fn seek_to_position(&mut self, beats: f64) {
        self.seek_to_real_time(self.converter.beats_to_real_time(beats));
    }

    /// Seek to a fraction of `total_ms` (ratio clamped to [0, 1])
    pub fn seek_to_progress(&mut self, ratio: f64, total_ms: f64) {
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        self.seek_to_real_time(ratio * total_ms.max(0.0));
    }

    /// Change tempo, keeping the current musical position
    ///
    /// Fails without mutation when `bpm <= 0`.
    pub fn set_tempo(&mut self, bpm: f64) -> PracticeResult<()> {
        let tempo = Tempo::new(bpm)?;
        let position = self.current_position();
        self.converter = BeatTimeConverter::new(tempo);

        match self.state {
            TransportState::Running => {
                self.anchor_to(self.converter.beats_to_real_time(position));
            }
            TransportState::Frozen => {
                self.timing.frozen_at = Some(self.converter.beats_to_real_time(position));
            }
            // The paused position is already stored in beats
            TransportState::Paused | TransportState::Stopped => {}
        }

        info!("Tempo set to {}", tempo);
        Ok(())
    }

    /// Current real time since piece start in milliseconds
    pub fn current_real_time(&self) -> f64 {
        match self.state {
            TransportState::Stopped => 0.0,
            TransportState::Running => self.running_real_time(),
            TransportState::Paused => self
                .converter
                .beats_to_real_time(self.timing.paused_position.unwrap_or(0.0)),
            TransportState::Frozen => self.timing.frozen_at.unwrap_or(0.0),
        }
    }

    /// Current musical position in beats
    pub fn current_position(&self) -> f64 {
        match self.state {
            TransportState::Paused => self.timing.paused_position.unwrap_or(0.0),
            _ => self.converter.real_time_to_beats(self.current_real_time()),
        }
    }

    /// Progress through a piece of `total_ms`, clamped to [0, 1]
    pub fn progress(&self, total_ms: f64) -> f64 {
        if total_ms.is_nan() || total_ms <= 0.0 {
            return 0.0;
        }
        (self.current_real_time() / total_ms).clamp(0.0, 1.0)
    }

    fn raw_elapsed_ms(&self) -> f64 {
        self.clock.now_ms() - self.timing.origin_ms - self.timing.paused_total_ms
    }

    fn running_real_time(&self) -> f64 {
        self.raw_elapsed_ms() + self.timing.seek_offset_ms
    }

    /// Re-derive the seek offset so the running clock reads `real_time_ms` now
    fn anchor_to(&mut self, real_time_ms: f64) {
        self.timing.seek_offset_ms = real_time_ms - self.raw_elapsed_ms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::clock::ManualClock;

    fn transport(bpm: f64) -> (MusicalTimeManager, ManualClock) {
        let clock = ManualClock::new();
        let transport = MusicalTimeManager::with_clock(Tempo::new(bpm).unwrap(), clock.clone());
        (transport, clock)
    }

    #[test]
    fn test_transport_state() {
        assert!(!TransportState::Stopped.is_active());
        assert!(TransportState::Running.is_active());
        assert!(TransportState::Frozen.is_active());
        assert_eq!(TransportState::default(), TransportState::Stopped);
    }

    #[test]
    fn test_start_and_run() {
        let (mut transport, clock) = transport(120.0);
        clock.advance(5000.0);
        assert_eq!(transport.current_real_time(), 0.0);

        transport.start();
        assert!(transport.is_running());
        assert_eq!(transport.current_real_time(), 0.0);

        clock.advance(1000.0);
        assert_eq!(transport.current_real_time(), 1000.0);
        assert_eq!(transport.current_position(), 2.0);
    }

    #[test]
    fn test_pause_excludes_paused_time() {
        let (mut transport, clock) = transport(120.0);
        transport.start();
        clock.advance(1500.0);

        transport.pause();
        assert!(transport.is_paused());
        clock.advance(10_000.0);
        assert_eq!(transport.current_real_time(), 1500.0);
        assert_eq!(transport.current_position(), 3.0);

        transport.resume();
        assert_eq!(transport.current_real_time(), 1500.0);
        clock.advance(500.0);
        assert_eq!(transport.current_real_time(), 2000.0);
    }

    #[test]
    fn test_redundant_calls_are_noops() {
        let (mut transport, clock) = transport(120.0);

        transport.pause();
        transport.resume();
        transport.unfreeze();
        transport.freeze_at(100.0);
        assert!(transport.is_stopped());

        transport.start();
        clock.advance(700.0);
        transport.start();
        transport.resume();
        transport.unfreeze();
        assert_eq!(transport.current_real_time(), 700.0);

        transport.pause();
        transport.pause();
        clock.advance(300.0);
        transport.resume();
        assert_eq!(transport.current_real_time(), 700.0);
    }

    #[test]
    fn test_stop_resets() {
        let (mut transport, clock) = transport(120.0);
        transport.start();
        clock.advance(2000.0);
        transport.seek_to_real_time(9000.0);
        transport.stop();

        assert!(transport.is_stopped());
        assert_eq!(transport.current_real_time(), 0.0);

        clock.advance(400.0);
        transport.start();
        clock.advance(100.0);
        assert_eq!(transport.current_real_time(), 100.0);
    }

    #[test]
    fn test_freeze_is_time_neutral() {
        let (mut transport, clock) = transport(120.0);
        transport.start();
        clock.advance(1950.0);

        transport.freeze_at(2000.0);
        assert!(transport.is_frozen());
        assert_eq!(transport.current_real_time(), 2000.0);

        clock.advance(60_000.0);
        assert_eq!(transport.current_real_time(), 2000.0);
        assert_eq!(transport.current_position(), 4.0);

        transport.unfreeze();
        assert!(transport.is_running());
        assert_eq!(transport.current_real_time(), 2000.0);

        clock.advance(250.0);
        assert_eq!(transport.current_real_time(), 2250.0);
    }

    #[test]
    fn test_tempo_change_anchors_position() {
        let (mut transport, clock) = transport(120.0);
        transport.start();
        clock.advance(2000.0);
        assert_eq!(transport.current_position(), 4.0);

        transport.set_tempo(60.0).unwrap();
        assert_eq!(transport.current_position(), 4.0);
        assert_eq!(transport.current_real_time(), 4000.0);

        clock.advance(1000.0);
        assert_eq!(transport.current_position(), 5.0);
    }

    #[test]
    fn test_tempo_change_while_paused() {
        let (mut transport, clock) = transport(120.0);
        transport.start();
        clock.advance(2000.0);
        transport.pause();

        transport.set_tempo(240.0).unwrap();
        assert_eq!(transport.current_position(), 4.0);
        assert_eq!(transport.current_real_time(), 1000.0);

        clock.advance(3000.0);
        transport.resume();
        assert_eq!(transport.current_position(), 4.0);
        clock.advance(250.0);
        assert_eq!(transport.current_position(), 5.0);
    }

    #[test]
    fn test_tempo_change_while_frozen() {
        let (mut transport, clock) = transport(120.0);
        transport.start();
        transport.freeze_at(1000.0);
        transport.set_tempo(60.0).unwrap();

        assert!(transport.is_frozen());
        assert_eq!(transport.current_position(), 2.0);
        assert_eq!(transport.current_real_time(), 2000.0);

        transport.unfreeze();
        clock.advance(1000.0);
        assert_eq!(transport.current_position(), 3.0);
    }

    #[test]
    fn test_invalid_tempo_no_mutation() {
        let (mut transport, clock) = transport(120.0);
        transport.start();
        clock.advance(1000.0);

        assert!(transport.set_tempo(0.0).is_err());
        assert!(transport.set_tempo(-5.0).is_err());
        assert_eq!(transport.tempo().bpm(), 120.0);
        assert_eq!(transport.current_real_time(), 1000.0);
    }

    #[test]
    fn test_seek_variants() {
        let (mut transport, clock) = transport(120.0);
        transport.start();
        clock.advance(300.0);

        transport.seek_to_position(8.0);
        assert_eq!(transport.current_real_time(), 4000.0);

        transport.seek_to_real_time(1234.0);
        assert_eq!(transport.current_real_time(), 1234.0);

        transport.seek_to_progress(0.5, 10_000.0);
        assert_eq!(transport.current_real_time(), 5000.0);
        assert_eq!(transport.progress(10_000.0), 0.5);

        clock.advance(100.0);
        assert_eq!(transport.current_real_time(), 5100.0);
    }

    #[test]
    fn test_seek_clamps_negative_targets() {
        let (mut transport, _clock) = transport(120.0);
        transport.start();
        transport.seek_to_real_time(-250.0);
        assert_eq!(transport.current_real_time(), 0.0);

        transport.seek_to_progress(-3.0, 10_000.0);
        assert_eq!(transport.current_real_time(), 0.0);

        transport.seek_to_progress(7.0, 10_000.0);
        assert_eq!(transport.current_real_time(), 10_000.0);
    }

    #[test]
    fn test_seek_while_paused_and_frozen() {
        let (mut transport, clock) = transport(120.0);
        transport.start();
        transport.pause();
        transport.seek_to_real_time(3000.0);
        assert!(transport.is_paused());
        assert_eq!(transport.current_position(), 6.0);
        transport.resume();
        assert_eq!(transport.current_real_time(), 3000.0);

        transport.freeze_at(3500.0);
        transport.seek_to_real_time(500.0);
        assert!(transport.is_running());
        clock.advance(10.0);
        assert_eq!(transport.current_real_time(), 510.0);
    }

    #[test]
    fn test_seek_while_stopped_ignored() {
        let (mut transport, _clock) = transport(120.0);
        transport.seek_to_real_time(5000.0);
        assert!(transport.is_stopped());
        assert_eq!(transport.current_real_time(), 0.0);
    }

    #[test]
    fn test_count_in_start() {
        let (mut transport, clock) = transport(120.0);
        transport.start_from(-1000.0);
        assert_eq!(transport.current_position(), -2.0);

        clock.advance(1000.0);
        assert_eq!(transport.current_real_time(), 0.0);
    }

    #[test]
    fn test_progress_clamped() {
        let (mut transport, clock) = transport(120.0);
        assert_eq!(transport.progress(10_000.0), 0.0);

        transport.start();
        clock.advance(20_000.0);
        assert_eq!(transport.progress(10_000.0), 1.0);
        assert_eq!(transport.progress(0.0), 0.0);
    }
}
