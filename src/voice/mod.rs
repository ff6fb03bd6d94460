//! Voice notes for the chat composer
//!
//! A `VoiceSession` owns one record → review → send cycle:
//! - microphone permission and capture through a `RecordingEngine`
//! - review through a `PlaybackEngine`
//! - clip lifecycle on disk through a `FileStore`
//! - delivery through a `MessageSubmitter`
//! - derived UI data (state, button affordances, elapsed time, waveform)

mod config;
mod engine;
mod error;
mod files;
mod session;
mod state;
mod submission;
mod timers;
mod waveform;

pub use config::VoiceConfig;
pub use engine::{
    FixedPermission, PermissionGate, PermissionStatus, PlaybackEngine, PlaybackProgress,
    RecordingEngine, RecordingOptions, RecordingProgress, RecordingStart,
};
pub use error::{Notice, VoiceError};
pub use files::{FileStat, FileStore, LocalFileStore};
pub use session::{Collaborators, VoiceSession};
pub use state::{
    clock_label, Affordances, PausedActivity, PlayIcon, PrimaryIcon, Trigger, VoiceSnapshot,
    VoiceState,
};
pub use submission::{LogSubmitter, MediaDescriptor, MessageSubmitter};
pub use timers::{TaskGuard, Ticker};
pub use waveform::{Waveform, MAX_BAR_HEIGHT};
