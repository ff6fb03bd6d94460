use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::audio::{AudioBackendConfig, AudioBackendFactory, ClipPlayer, WavRecorder};
use crate::voice::{
    Collaborators, FileStore, FixedPermission, LocalFileStore, MessageSubmitter,
    PermissionStatus, VoiceConfig, VoiceSession,
};

/// Builds voice sessions wired to the host's engines
#[derive(Clone)]
pub struct ComposerFactory {
    config: VoiceConfig,
    files: Arc<dyn FileStore>,
    submitter: Arc<dyn MessageSubmitter>,
}

impl ComposerFactory {
    pub fn new(config: VoiceConfig, submitter: Arc<dyn MessageSubmitter>) -> Self {
        Self {
            config,
            files: Arc::new(LocalFileStore),
            submitter,
        }
    }

    /// A fresh session with its own engines
    pub fn create(&self) -> Result<VoiceSession> {
        let backend_config = AudioBackendConfig {
            target_sample_rate: self.config.sample_rate,
            target_channels: self.config.channels,
            buffer_duration_ms: self.config.progress_interval_ms,
        };

        let backend = AudioBackendFactory::create(self.config.source.clone(), backend_config)
            .context("Failed to create audio backend")?;

        let permission = if self.config.microphone_permission {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };

        info!("Creating voice composer (backend={})", backend.name());

        Ok(VoiceSession::new(
            self.config.clone(),
            Collaborators {
                permissions: Box::new(FixedPermission(permission)),
                recorder: Box::new(WavRecorder::new(backend)),
                player: Box::new(ClipPlayer::new(self.config.playback_tick())),
                files: Arc::clone(&self.files),
                submitter: Arc::clone(&self.submitter),
            },
        ))
    }
}
