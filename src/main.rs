use piano_practice::messaging::{publish_events, send_command};
use piano_practice::sequencer::{DEFAULT_SPLIT_PITCH, Hand, filter_hand, note_name};
use piano_practice::{
    Annotation, AuthoredNote, Command, ManualClock, PerformerInput, PracticeConfig, PracticeEvent,
    PracticeResult, PracticeSession, create_command_channel, create_event_channel,
};
use std::collections::BTreeSet;
use std::path::PathBuf;

// Ringbuffer capacity constants
const COMMAND_RINGBUFFER_CAPACITY: usize = 64;
const EVENT_RINGBUFFER_CAPACITY: usize = 256;

/// One display frame at 60 Hz
const FRAME_MS: f64 = 16.0;

/// How long the simulated performer takes to answer a wait
const REACTION_MS: f64 = 250.0;

/// Give up after ten virtual minutes
const MAX_FRAMES: usize = 37_500;

#[derive(serde::Deserialize)]
struct SongFile {
    bpm: Option<f64>,
    notes: Vec<AuthoredNote>,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

struct Args {
    config: Option<PathBuf>,
    song: Option<PathBuf>,
    hand: Option<Hand>,
}

fn parse_args() -> Args {
    let mut args = Args {
        config: None,
        song: None,
        hand: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = iter.next().map(PathBuf::from),
            "--song" => args.song = iter.next().map(PathBuf::from),
            "--left" => args.hand = Some(Hand::Left),
            "--right" => args.hand = Some(Hand::Right),
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
    }
    args
}

/// C major five-finger exercise ending on a triad
fn demo_song() -> PracticeResult<SongFile> {
    let mut notes = Vec::new();
    for (beat, pitch) in [60u8, 62, 64, 65, 67, 65, 64, 62].into_iter().enumerate() {
        notes.push(AuthoredNote::new(pitch, beat as f64, 1.0, 80)?);
    }
    for pitch in [60, 64, 67] {
        notes.push(AuthoredNote::new(pitch, 8.0, 4.0, 90)?);
    }

    Ok(SongFile {
        bpm: None,
        notes,
        annotations: vec![Annotation::new(0.0, "Right hand"), Annotation::new(8.0, "Final chord")],
    })
}

fn load_song(path: Option<PathBuf>) -> PracticeResult<SongFile> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => demo_song(),
    }
}

fn main() {
    env_logger::init();

    println!("=== Piano Practice ===");
    println!("Version 0.1.0 - headless demo\n");

    let args = parse_args();
    let mut config = match args.config {
        Some(path) => match PracticeConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                return;
            }
        },
        None => PracticeConfig {
            wait_mode: true,
            count_in_beats: 2.0,
            ..PracticeConfig::default()
        },
    };

    let mut song = match load_song(args.song) {
        Ok(song) => song,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return;
        }
    };
    if let Some(bpm) = song.bpm {
        config.initial_bpm = bpm;
    }
    if let Some(hand) = args.hand {
        song.notes = filter_hand(&song.notes, hand, DEFAULT_SPLIT_PITCH);
    }

    let clock = ManualClock::new();
    let mut session = match PracticeSession::with_clock(config, song.notes, song.annotations, clock.clone()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return;
        }
    };

    println!(
        "{} notes, {:.1} s at {}, wait mode {}",
        session.schedule().len(),
        session.total_duration_ms() / 1000.0,
        session.transport().tempo(),
        if session.wait_mode() { "on" } else { "off" }
    );
    for annotation in session.annotations() {
        println!("  [{:>7.1} ms] {}", annotation.time_ms, annotation.text);
    }
    println!();

    let (mut command_tx, mut command_rx) = create_command_channel(COMMAND_RINGBUFFER_CAPACITY);
    let (mut event_tx, mut event_rx) = create_event_channel(EVENT_RINGBUFFER_CAPACITY);
    send_command(&mut command_tx, Command::Start);

    let notes = session.schedule().clone();
    let mut next_note = 0;
    let mut held: BTreeSet<u8> = BTreeSet::new();
    let mut waited_ms = 0.0;

    for _ in 0..MAX_FRAMES {
        session.drain_commands(&mut command_rx);
        clock.advance(FRAME_MS);
        let report = session.tick();
        publish_events(&mut event_tx, &report.events);

        let mut finished = false;
        while let Some(event) = ringbuf::traits::Consumer::try_pop(&mut event_rx) {
            match event {
                PracticeEvent::NoteHit { identity, .. } => {
                    println!("  hit   {:<4} @ {:>7.1} ms", note_name(identity.pitch), identity.start_time())
                }
                PracticeEvent::NoteMissed { identity } => {
                    println!("  miss  {:<4} @ {:>7.1} ms", note_name(identity.pitch), identity.start_time())
                }
                PracticeEvent::WaitStarted { start_time, pitches } => println!(
                    "  wait  {:?} @ {:>7.1} ms",
                    pitches.iter().map(|&p| note_name(p)).collect::<Vec<_>>(),
                    start_time
                ),
                PracticeEvent::Finished => finished = true,
                _ => {}
            }
        }
        if finished {
            break;
        }

        // Simulated performer: answers waits after a delay, otherwise plays
        // on time and skips every seventh note
        if let Some(required) = report.waiting_for {
            waited_ms += FRAME_MS;
            if waited_ms >= REACTION_MS {
                for &pitch in &held {
                    send_command(&mut command_tx, Command::Input(PerformerInput::note_up(pitch, report.real_time_ms)));
                }
                for &pitch in &required {
                    send_command(&mut command_tx, Command::Input(PerformerInput::note_down(pitch, report.real_time_ms)));
                }
                held = required;
                waited_ms = 0.0;
            }
        } else if !session.wait_mode() {
            while let Some(note) = notes.notes().get(next_note) {
                if note.start_time > report.real_time_ms {
                    break;
                }
                if next_note % 7 != 6 {
                    send_command(&mut command_tx, Command::Input(PerformerInput::note_down(note.pitch, report.real_time_ms)));
                }
                next_note += 1;
            }
        }
    }

    let score = session.score();
    println!(
        "\nScore: {}/{} ({:.0}%)",
        score.correct,
        score.total,
        score.accuracy * 100.0
    );
}
