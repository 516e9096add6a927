// Messaging - commands in, practice events out

pub mod channels;
pub mod command;
pub mod events;

pub use channels::{
    CommandConsumer, CommandProducer, EventConsumer, EventProducer, create_command_channel,
    create_event_channel, publish_events, send_command,
};
pub use command::Command;
pub use events::PracticeEvent;
