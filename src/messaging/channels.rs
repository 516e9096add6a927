// Communication channels lock-free

use crate::messaging::command::Command;
use crate::messaging::events::PracticeEvent;
use log::warn;
use ringbuf::{HeapRb, traits::Split};

pub type CommandProducer = ringbuf::HeapProd<Command>;
pub type CommandConsumer = ringbuf::HeapCons<Command>;

pub fn create_command_channel(capacity: usize) -> (CommandProducer, CommandConsumer) {
    let rb = HeapRb::<Command>::new(capacity);
    rb.split()
}

pub type EventProducer = ringbuf::HeapProd<PracticeEvent>;
pub type EventConsumer = ringbuf::HeapCons<PracticeEvent>;

pub fn create_event_channel(capacity: usize) -> (EventProducer, EventConsumer) {
    let rb = HeapRb::<PracticeEvent>::new(capacity);
    rb.split()
}

/// Queue a command; returns false (and logs) if the channel is full
pub fn send_command(tx: &mut CommandProducer, cmd: Command) -> bool {
    if ringbuf::traits::Producer::try_push(tx, cmd).is_err() {
        warn!("Command channel full, dropping {:?}", cmd);
        return false;
    }
    true
}

/// Forward events to a consumer; returns how many were dropped
pub fn publish_events(tx: &mut EventProducer, events: &[PracticeEvent]) -> usize {
    let mut dropped = 0;
    for event in events {
        if ringbuf::traits::Producer::try_push(tx, event.clone()).is_err() {
            dropped += 1;
        }
    }
    if dropped > 0 {
        warn!("Event channel full, dropped {} events", dropped);
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_channel_roundtrip() {
        let (mut tx, mut rx) = create_command_channel(2);
        assert!(send_command(&mut tx, Command::Start));
        assert!(send_command(&mut tx, Command::SetTempo(90.0)));
        assert!(!send_command(&mut tx, Command::Stop));

        assert_eq!(ringbuf::traits::Consumer::try_pop(&mut rx), Some(Command::Start));
        assert_eq!(
            ringbuf::traits::Consumer::try_pop(&mut rx),
            Some(Command::SetTempo(90.0))
        );
        assert_eq!(ringbuf::traits::Consumer::try_pop(&mut rx), None);
    }

    #[test]
    fn test_publish_events_reports_drops() {
        let (mut tx, mut rx) = create_event_channel(1);
        let events = vec![PracticeEvent::Finished, PracticeEvent::TempoChanged { bpm: 60.0 }];
        assert_eq!(publish_events(&mut tx, &events), 1);
        assert_eq!(
            ringbuf::traits::Consumer::try_pop(&mut rx),
            Some(PracticeEvent::Finished)
        );
    }
}
