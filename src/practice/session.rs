// Practice session - owns the clock, the schedule, scoring and wait mode
// Driven by one tick per frame; each tick returns the state to render

use super::evaluator::{HitResult, Score, ScoreEvaluator, SessionId};
use super::wait_mode::{WaitForInputController, WaitInput};
use crate::config::PracticeConfig;
use crate::error::PracticeResult;
use crate::input::{InputKind, PerformerInput};
use crate::messaging::{Command, CommandConsumer, PracticeEvent};
use crate::sequencer::{
    Annotation, AuthoredNote, Clock, MusicalTimeManager, RepeatRegion, Schedule,
    ScheduledAnnotation, ScheduledNote, SystemClock, Tempo, TransportState,
};
use log::{debug, info, warn};
use std::collections::{BTreeSet, VecDeque};

/// Snapshot returned by every tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub real_time_ms: f64,
    pub position_beats: f64,
    pub progress: f64,
    pub state: TransportState,
    /// Pitches to press while waiting
    pub waiting_for: Option<BTreeSet<u8>>,
    pub score: Score,
    /// Everything that happened since the previous tick
    pub events: Vec<PracticeEvent>,
}

/// One practice run over a fixed piece
///
/// Commands apply immediately; performer input is queued and consumed by the
/// next [`tick`](Self::tick), after active notes have been updated.
pub struct PracticeSession {
    config: PracticeConfig,
    transport: MusicalTimeManager,
    evaluator: ScoreEvaluator,
    wait: WaitForInputController,
    wait_mode: bool,
    notes: Vec<AuthoredNote>,
    annotations: Vec<Annotation>,
    schedule: Schedule,
    scheduled_annotations: Vec<ScheduledAnnotation>,
    repeat: Option<RepeatRegion>,
    pending_inputs: VecDeque<PerformerInput>,
    events: Vec<PracticeEvent>,
    finished: bool,
}

impl PracticeSession {
    /// Create a session on the system clock
    pub fn new(
        config: PracticeConfig,
        notes: Vec<AuthoredNote>,
        annotations: Vec<Annotation>,
    ) -> PracticeResult<Self> {
        Self::with_clock(config, notes, annotations, SystemClock::new())
    }

    /// Create a session on an injected clock
    pub fn with_clock(
        config: PracticeConfig,
        notes: Vec<AuthoredNote>,
        annotations: Vec<Annotation>,
        clock: impl Clock + 'static,
    ) -> PracticeResult<Self> {
        config.validate()?;
        for note in &notes {
            note.validate()?;
        }

        let transport = MusicalTimeManager::with_clock(Tempo::new(config.initial_bpm)?, clock);
        let schedule = transport.converter().build_schedule(&notes);
        let scheduled_annotations = transport.converter().schedule_annotations(&annotations);

        info!(
            "Practice session ready: {} notes, {:.1} ms at {}",
            schedule.len(),
            schedule.total_duration_ms(),
            transport.tempo()
        );

        Ok(Self {
            evaluator: ScoreEvaluator::new(config.tolerance_ms),
            wait: WaitForInputController::new(config.wait_lookahead_ms, config.wait_trigger_ms),
            wait_mode: config.wait_mode,
            config,
            transport,
            notes,
            annotations,
            schedule,
            scheduled_annotations,
            repeat: None,
            pending_inputs: VecDeque::new(),
            events: Vec::new(),
            finished: false,
        })
    }

    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    pub fn transport(&self) -> &MusicalTimeManager {
        &self.transport
    }

    pub fn evaluator(&self) -> &ScoreEvaluator {
        &self.evaluator
    }

    /// Current schedule; a clone stays valid after tempo changes
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn annotations(&self) -> &[ScheduledAnnotation] {
        &self.scheduled_annotations
    }

    pub fn score(&self) -> Score {
        self.evaluator.score()
    }

    pub fn current_session(&self) -> SessionId {
        self.evaluator.current_session()
    }

    pub fn wait_mode(&self) -> bool {
        self.wait_mode
    }

    pub fn is_waiting(&self) -> bool {
        self.wait.is_waiting()
    }

    pub fn required_pitches(&self) -> Option<&BTreeSet<u8>> {
        self.wait.required_pitches()
    }

    pub fn repeat_region(&self) -> Option<RepeatRegion> {
        self.repeat
    }

    pub fn current_real_time(&self) -> f64 {
        self.transport.current_real_time()
    }

    pub fn current_position(&self) -> f64 {
        self.transport.current_position()
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.schedule.total_duration_ms()
    }

    pub fn progress(&self) -> f64 {
        self.transport.progress(self.total_duration_ms())
    }

    /// Notes missed so far in the current play session
    pub fn missed_notes(&self) -> Vec<ScheduledNote> {
        self.evaluator
            .missed_notes(self.transport.current_real_time(), &self.schedule)
    }

    /// Start playback (at the repeat region start if one is set)
    pub fn start(&mut self) {
        if !self.transport.is_stopped() {
            debug!("start() ignored: already {:?}", self.transport.state());
            return;
        }

        let converter = *self.transport.converter();
        let floor = self
            .repeat
            .map(|region| converter.beats_to_real_time(region.start_beat()));
        let count_in = converter.beats_to_real_time(self.config.count_in_beats);

        self.transport.start_from(floor.unwrap_or(0.0) - count_in);
        self.begin_pass(floor);
    }

    pub fn pause(&mut self) {
        self.transport.pause();
    }

    pub fn resume(&mut self) {
        self.transport.resume();
    }

    /// Stop from any state. Scores are kept; see [`reset_score`](Self::reset_score).
    pub fn stop(&mut self) {
        self.wait.reposition(&mut self.transport, 0.0);
        self.transport.stop();
        self.pending_inputs.clear();
        self.finished = false;
    }

    pub fn reset_score(&mut self) {
        self.evaluator.reset();
    }

    /// Change tempo, keeping the musical position, and rebuild the schedule
    pub fn set_tempo(&mut self, bpm: f64) -> PracticeResult<()> {
        Tempo::new(bpm)?;

        let old_quarter_ms = self.transport.converter().quarter_note_ms();
        self.wait.cancel(&mut self.transport);
        self.transport.set_tempo(bpm)?;

        let converter = *self.transport.converter();
        let schedule = converter.build_schedule(&self.notes);
        let annotations = converter.schedule_annotations(&self.annotations);

        // Same pass, new start times: hits and misses follow their notes
        self.evaluator.remap_identities(
            &self.schedule,
            &schedule,
            converter.quarter_note_ms() / old_quarter_ms,
        );
        self.schedule = schedule;
        self.scheduled_annotations = annotations;
        self.sync_wait_ceiling();

        if self.transport.state().is_active() {
            let now = self.transport.current_real_time();
            self.wait.reposition(&mut self.transport, now);
        }
        self.events.push(PracticeEvent::TempoChanged { bpm });
        Ok(())
    }

    pub fn seek_to_position(&mut self, beats: f64) {
        self.seek_with(|transport| transport.seek_to_position(beats));
    }

    pub fn seek_to_real_time(&mut self, time_ms: f64) {
        self.seek_with(|transport| transport.seek_to_real_time(time_ms));
    }

    /// Seek to a fraction of the whole schedule
    pub fn seek_to_progress(&mut self, ratio: f64) {
        let total = self.total_duration_ms();
        self.seek_with(|transport| transport.seek_to_progress(ratio, total));
    }

    pub fn set_wait_mode(&mut self, enabled: bool) {
        if enabled == self.wait_mode {
            return;
        }

        if enabled {
            // Groups already behind the playhead are not waited on
            let now = self.transport.current_real_time();
            self.wait.reposition(&mut self.transport, now);
        } else {
            self.wait.cancel(&mut self.transport);
        }
        self.wait_mode = enabled;
        info!("Wait-for-input mode {}", if enabled { "on" } else { "off" });
    }

    pub fn set_repeat_region(&mut self, region: Option<RepeatRegion>) {
        self.repeat = region;
        self.sync_wait_ceiling();
        match region {
            Some(region) => info!(
                "Repeat region set: beats {} to {}",
                region.start_beat(),
                region.end_beat()
            ),
            None => info!("Repeat region cleared"),
        }
    }

    /// Queue performer input for the next tick
    pub fn queue_input(&mut self, input: PerformerInput) {
        self.pending_inputs.push_back(input);
    }

    pub fn handle_command(&mut self, cmd: Command) -> PracticeResult<()> {
        match cmd {
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Stop => self.stop(),
            Command::SetTempo(bpm) => self.set_tempo(bpm)?,
            Command::SeekToPosition(beats) => self.seek_to_position(beats),
            Command::SeekToRealTime(time_ms) => self.seek_to_real_time(time_ms),
            Command::SeekToProgress(ratio) => self.seek_to_progress(ratio),
            Command::SetWaitMode(enabled) => self.set_wait_mode(enabled),
            Command::SetRepeatRegion(region) => self.set_repeat_region(region),
            Command::Input(input) => self.queue_input(input),
        }
        Ok(())
    }

    /// Apply every queued command; rejected ones are logged and skipped
    pub fn drain_commands(&mut self, rx: &mut CommandConsumer) -> usize {
        let mut applied = 0;
        while let Some(cmd) = ringbuf::traits::Consumer::try_pop(rx) {
            if let Err(e) = self.handle_command(cmd) {
                warn!("Command {:?} rejected: {}", cmd, e);
                continue;
            }
            applied += 1;
        }
        applied
    }

    /// Advance one frame
    ///
    /// Order: repeat wrap, wait-mode freeze, active-note update, queued
    /// input, miss detection.
    pub fn tick(&mut self) -> TickReport {
        self.wrap_repeat_region();

        if self.wait_mode {
            if let Some(group) = self.wait.tick(&mut self.transport, &self.schedule) {
                self.events.push(PracticeEvent::WaitStarted {
                    start_time: group.start_time,
                    pitches: group.required,
                });
            }
        }

        let now = self.transport.current_real_time();
        let active = self.transport.state().is_active();
        if active {
            self.evaluator.update_active_notes(now, &self.schedule);
        }

        self.process_inputs(now);

        let now = self.transport.current_real_time();
        if active {
            for note in self.evaluator.take_new_misses(now, &self.schedule) {
                self.events.push(PracticeEvent::NoteMissed {
                    identity: note.identity(),
                });
            }
            self.check_finished(now);
        }

        TickReport {
            real_time_ms: now,
            position_beats: self.transport.current_position(),
            progress: self.progress(),
            state: self.transport.state(),
            waiting_for: self.wait.required_pitches().cloned(),
            score: self.evaluator.score(),
            events: std::mem::take(&mut self.events),
        }
    }

    fn process_inputs(&mut self, now: f64) {
        while let Some(input) = self.pending_inputs.pop_front() {
            if input.kind == InputKind::NoteUp {
                self.wait.note_up(input.pitch);
                continue;
            }

            let outcome = self.wait.note_down(
                input.pitch,
                &mut self.transport,
                &mut self.evaluator,
                &self.schedule,
            );
            match outcome {
                WaitInput::NotWaiting => {
                    if self.transport.is_running() {
                        let result = self.evaluator.evaluate_input(input.pitch, now, &self.schedule);
                        self.record_hit(result);
                    }
                }
                WaitInput::Accepted { result, .. } => self.record_hit(result),
                WaitInput::Released { start_time, result } => {
                    self.record_hit(result);
                    self.events.push(PracticeEvent::WaitReleased { start_time });
                }
                WaitInput::NotRequired | WaitInput::HeldOver | WaitInput::AlreadyPressed => {}
            }
        }
    }

    fn record_hit(&mut self, result: HitResult) {
        if let HitResult::Hit(note) = result {
            self.events.push(PracticeEvent::NoteHit {
                identity: note.identity(),
                session: self.evaluator.current_session(),
            });
        }
    }

    /// Mint a play session starting at `floor` and restart wait tracking
    fn begin_pass(&mut self, floor: Option<f64>) -> SessionId {
        let session = self.evaluator.start_new_play_session(floor);
        self.wait
            .reposition(&mut self.transport, floor.unwrap_or(0.0));
        self.finished = false;
        self.events.push(PracticeEvent::SessionStarted {
            session,
            floor_time: floor,
        });
        session
    }

    fn seek_with(&mut self, seek: impl FnOnce(&mut MusicalTimeManager)) {
        if self.transport.is_stopped() {
            debug!("seek ignored: session is stopped");
            return;
        }

        self.wait.cancel(&mut self.transport);
        seek(&mut self.transport);
        let target = self.transport.current_real_time();
        self.begin_pass(Some(target));
    }

    fn wrap_repeat_region(&mut self) {
        let Some(region) = self.repeat else {
            return;
        };
        if !self.transport.is_running() {
            return;
        }

        let (start, end) = region.to_real_time(self.transport.converter());
        if self.transport.current_real_time() < end {
            return;
        }

        self.transport.seek_to_real_time(start);
        let session = self.begin_pass(Some(start));
        self.events.push(PracticeEvent::RepeatWrapped { session });
    }

    fn sync_wait_ceiling(&mut self) {
        let ceiling = self
            .repeat
            .map(|region| region.to_real_time(self.transport.converter()).1);
        self.wait.set_ceiling(ceiling);
    }

    fn check_finished(&mut self, now: f64) {
        if self.finished || self.repeat.is_some() || self.schedule.is_empty() {
            return;
        }
        if self.transport.is_running()
            && now > self.schedule.total_duration_ms() + self.evaluator.tolerance_ms()
        {
            self.finished = true;
            info!("Reached the end of the piece: {:?}", self.evaluator.score());
            self.events.push(PracticeEvent::Finished);
        }
    }
}
