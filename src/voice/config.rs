use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::engine::RecordingOptions;
use crate::audio::AudioSource;

/// Configuration for voice composers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Cache directory for clips; `~` is expanded
    pub recordings_path: String,

    /// Clip sample rate (speech only, 16kHz is plenty)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Waveform refresh period while recording
    pub waveform_interval_ms: u64,

    /// Number of bars kept in the waveform
    pub waveform_bars: usize,

    /// Minimum spacing between recording position reports
    pub progress_interval_ms: u64,

    /// Playback clock step
    pub playback_tick_ms: u64,

    pub mime_type: String,
    pub file_extension: String,

    /// Answer to the microphone prompt on hosts without one
    pub microphone_permission: bool,

    /// Delete the clip once the message is sent
    pub remove_after_submit: bool,

    /// Capture source for the WAV recorder
    #[serde(skip_serializing)]
    pub source: AudioSource,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            recordings_path: "~/.cache/marketchat/voice".to_string(),
            sample_rate: 16000,
            channels: 1,
            waveform_interval_ms: 200,
            waveform_bars: 32,
            progress_interval_ms: 100,
            playback_tick_ms: 100,
            mime_type: "audio/wav".to_string(),
            file_extension: "wav".to_string(),
            microphone_permission: true,
            remove_after_submit: true,
            source: AudioSource::Silence,
        }
    }
}

impl VoiceConfig {
    pub fn recordings_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.recordings_path).into_owned())
    }

    pub fn recording_options(&self) -> RecordingOptions {
        RecordingOptions {
            sample_rate: self.sample_rate,
            channels: self.channels,
            progress_interval_ms: self.progress_interval_ms,
        }
    }

    pub fn waveform_interval(&self) -> Duration {
        Duration::from_millis(self.waveform_interval_ms.max(1))
    }

    pub fn playback_tick(&self) -> Duration {
        Duration::from_millis(self.playback_tick_ms.max(1))
    }

    /// Fresh file name for a new clip
    pub fn clip_file_name(&self) -> String {
        format!("voice-{}.{}", uuid::Uuid::new_v4(), self.file_extension)
    }
}
