pub mod client;
pub mod messages;

pub use client::{voice_subject, NatsClient, NatsSubmitter};
pub use messages::VoiceMessage;
