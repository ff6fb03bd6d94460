use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use super::state::{Trigger, VoiceState};

/// Failures a voice session reports to its caller
#[derive(Debug, Error)]
pub enum VoiceError {
    /// User refused microphone access; nothing changed
    #[error("microphone permission denied")]
    PermissionDenied,

    /// An engine could not start; the session is back to idle
    #[error("{engine} engine failed to start")]
    EngineStart {
        engine: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// An engine failed mid-session; the session is back to idle
    #[error("{engine} engine failed to {action}")]
    Engine {
        engine: &'static str,
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("filesystem error on {}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The clip was not delivered; it is still held for retry
    #[error("voice message could not be sent")]
    Submission(#[source] anyhow::Error),

    #[error("cannot {trigger:?} while {from:?}")]
    InvalidTransition { from: VoiceState, trigger: Trigger },

    #[error("no voice clip to send")]
    NothingToSave,
}

/// Toast-style message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notice {
    PermissionDenied,
    EngineFailed(String),
    SaveFailed(String),
}
