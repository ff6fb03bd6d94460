//! Collaborator seams for the voice session
//!
//! The session never touches a device itself. Capture, playback and the
//! microphone permission prompt are behind these traits so the host can plug
//! in whatever the platform offers.

use anyhow::Result;
use std::path::Path;
use tokio::sync::mpsc;

/// Parameters handed to the recording engine for a new clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingOptions {
    pub sample_rate: u32,
    pub channels: u16,
    /// Minimum spacing between progress reports
    pub progress_interval_ms: u64,
}

/// Periodic report from an active recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingProgress {
    /// Captured audio so far; does not advance while paused
    pub position_ms: u64,
    /// Peak input level of the latest buffer, [0.0, 1.0]
    pub level: Option<f32>,
}

/// Periodic report from an active playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackProgress {
    pub position_ms: u64,
    pub duration_ms: u64,
}

/// Handle returned when capture begins
pub struct RecordingStart {
    /// Where the engine is writing the clip
    pub uri: String,
    pub progress: mpsc::Receiver<RecordingProgress>,
}

#[async_trait::async_trait]
pub trait RecordingEngine: Send + Sync {
    async fn start_recording(
        &mut self,
        path: &Path,
        options: &RecordingOptions,
    ) -> Result<RecordingStart>;

    async fn pause_recording(&mut self) -> Result<()>;

    async fn resume_recording(&mut self) -> Result<()>;

    /// Finish the clip; returns the final uri
    async fn stop_recording(&mut self) -> Result<String>;

    fn name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Begin playing `uri` from the start
    ///
    /// The progress channel closes when playback ends or is stopped.
    async fn start_playback(&mut self, uri: &str) -> Result<mpsc::Receiver<PlaybackProgress>>;

    async fn pause_playback(&mut self) -> Result<()>;

    async fn resume_playback(&mut self) -> Result<()>;

    async fn stop_playback(&mut self) -> Result<()>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// OS microphone permission prompt
#[async_trait::async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request_microphone(&self) -> Result<PermissionStatus>;
}

/// Answers every request the same way; used where the host has already
/// settled the permission (desktop shells, headless runs).
#[derive(Debug, Clone, Copy)]
pub struct FixedPermission(pub PermissionStatus);

#[async_trait::async_trait]
impl PermissionGate for FixedPermission {
    async fn request_microphone(&self) -> Result<PermissionStatus> {
        Ok(self.0)
    }
}
