use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use super::config::VoiceConfig;
use super::engine::{
    PermissionGate, PermissionStatus, PlaybackEngine, PlaybackProgress, RecordingEngine,
    RecordingProgress,
};
use super::error::{Notice, VoiceError};
use super::files::FileStore;
use super::state::{clock_label, PausedActivity, Trigger, VoiceSnapshot, VoiceState};
use super::submission::{MediaDescriptor, MessageSubmitter};
use super::timers::{TaskGuard, Ticker};
use super::waveform::Waveform;

/// External collaborators a session drives
pub struct Collaborators {
    pub permissions: Box<dyn PermissionGate>,
    pub recorder: Box<dyn RecordingEngine>,
    pub player: Box<dyn PlaybackEngine>,
    pub files: Arc<dyn FileStore>,
    pub submitter: Arc<dyn MessageSubmitter>,
}

/// Record/review/send state machine behind one chat composer
///
/// Transport presses are serialized: each operation holds the session's
/// operation lock across its engine calls, so a `cancel` issued while a
/// `save` is stopping the recorder runs after it. Observable state sits behind
/// a separate lock that is only held briefly, which is what lets a snapshot
/// see `Processing` while an engine is starting.
pub struct VoiceSession {
    shared: Arc<Shared>,
}

struct Shared {
    config: VoiceConfig,
    ops: Mutex<Engines>,
    machine: Mutex<Machine>,
    notices: broadcast::Sender<Notice>,
}

struct Engines {
    permissions: Box<dyn PermissionGate>,
    recorder: Box<dyn RecordingEngine>,
    player: Box<dyn PlaybackEngine>,
    files: Arc<dyn FileStore>,
    submitter: Arc<dyn MessageSubmitter>,
    timers: Timers,
}

/// Background work owned by the session; see `timers`
#[derive(Default)]
struct Timers {
    waveform: Option<Ticker>,
    recording_listener: Option<TaskGuard>,
    playback_listener: Option<TaskGuard>,
}

impl Timers {
    fn cancel_all(&mut self) {
        *self = Timers::default();
    }
}

struct Machine {
    state: VoiceState,
    file_path: Option<PathBuf>,
    elapsed_recording_ms: u64,
    playback_position_ms: u64,
    playback_duration_ms: u64,
    recording_active: bool,
    playback_active: bool,
    waveform: Waveform,
    /// Bumped whenever an engine starts or the session resets; background
    /// tasks carry the value they were started under and go quiet once it
    /// moves on.
    generation: u64,
}

impl Machine {
    fn new(waveform_bars: usize) -> Self {
        Self {
            state: VoiceState::Idle,
            file_path: None,
            elapsed_recording_ms: 0,
            playback_position_ms: 0,
            playback_duration_ms: 0,
            recording_active: false,
            playback_active: false,
            waveform: Waveform::new(waveform_bars),
            generation: 0,
        }
    }

    /// Engines are stopped; keep the clip and the elapsed time
    fn settle_idle(&mut self) {
        self.state = VoiceState::Idle;
        self.recording_active = false;
        self.playback_active = false;
        self.playback_position_ms = 0;
        self.playback_duration_ms = 0;
        self.generation += 1;
    }

    /// Back to a blank composer
    fn reset(&mut self) {
        self.settle_idle();
        self.file_path = None;
        self.elapsed_recording_ms = 0;
        self.waveform.clear();
    }

    fn snapshot(&self) -> VoiceSnapshot {
        debug_assert!(!(self.recording_active && self.playback_active));

        VoiceSnapshot {
            state: self.state,
            label: self.state.label(),
            file_path: self.file_path.as_ref().map(|p| p.display().to_string()),
            elapsed_recording_ms: self.elapsed_recording_ms,
            elapsed_label: clock_label(self.elapsed_recording_ms),
            playback_position_ms: self.playback_position_ms,
            playback_duration_ms: self.playback_duration_ms,
            recording_active: self.recording_active,
            playback_active: self.playback_active,
            visualization_samples: self.waveform.samples(),
            affordances: self.state.affordances(self.file_path.is_some()),
        }
    }
}

impl VoiceSession {
    pub fn new(config: VoiceConfig, collaborators: Collaborators) -> Self {
        let (notices, _) = broadcast::channel(16);
        let machine = Machine::new(config.waveform_bars);

        let engines = Engines {
            permissions: collaborators.permissions,
            recorder: collaborators.recorder,
            player: collaborators.player,
            files: collaborators.files,
            submitter: collaborators.submitter,
            timers: Timers::default(),
        };

        Self {
            shared: Arc::new(Shared {
                config,
                ops: Mutex::new(engines),
                machine: Mutex::new(machine),
                notices,
            }),
        }
    }

    pub async fn state(&self) -> VoiceState {
        self.machine().await.state
    }

    pub async fn snapshot(&self) -> VoiceSnapshot {
        self.machine().await.snapshot()
    }

    /// User-facing notices (permission denied, failed sends)
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.shared.notices.subscribe()
    }

    /// Record button: start, pause or resume capture
    pub async fn press_primary(&self) -> Result<VoiceState, VoiceError> {
        let mut engines = self.shared.ops.lock().await;
        let state = self.state().await;

        match state {
            VoiceState::Idle | VoiceState::Paused(PausedActivity::Playback) => {
                self.start_recording(&mut engines).await
            }
            VoiceState::Recording => self.pause_recording(&mut engines).await,
            VoiceState::Paused(PausedActivity::Recording) => {
                self.resume_recording(&mut engines).await
            }
            VoiceState::Playing | VoiceState::Processing => Err(VoiceError::InvalidTransition {
                from: state,
                trigger: Trigger::Primary,
            }),
        }
    }

    /// Play button: start, pause or resume playback of the clip
    pub async fn press_play(&self) -> Result<VoiceState, VoiceError> {
        let mut engines = self.shared.ops.lock().await;
        let (state, clip) = {
            let machine = self.machine().await;
            (machine.state, machine.file_path.clone())
        };

        match state {
            VoiceState::Idle => match clip {
                Some(path) => self.start_playback(&mut engines, &path).await,
                None => {
                    debug!("Play pressed with no clip, ignoring");
                    Ok(state)
                }
            },
            VoiceState::Playing => self.pause_playback(&mut engines).await,
            VoiceState::Paused(PausedActivity::Playback) => {
                self.resume_playback(&mut engines).await
            }
            _ => Err(VoiceError::InvalidTransition {
                from: state,
                trigger: Trigger::Play,
            }),
        }
    }

    /// Discard everything: stop both engines, delete the clip, zero counters
    pub async fn cancel(&self) -> Result<VoiceState, VoiceError> {
        let mut engines = self.shared.ops.lock().await;
        let clip = self.stop_engines(&mut engines).await;

        if let Some(path) = clip {
            Self::remove_clip(&engines, &path).await;
        }

        self.machine().await.reset();
        info!("Voice session cancelled");

        Ok(VoiceState::Idle)
    }

    /// Stop whatever is running, send the clip, and reset on success
    ///
    /// When the clip cannot be read or sent the session stays idle with its
    /// clip and elapsed time intact so `save` can simply be called again.
    pub async fn save(&self) -> Result<MediaDescriptor, VoiceError> {
        let mut engines = self.shared.ops.lock().await;
        let (state, has_clip) = {
            let machine = self.machine().await;
            (machine.state, machine.file_path.is_some())
        };

        match state {
            VoiceState::Idle if !has_clip => return Err(VoiceError::NothingToSave),
            VoiceState::Processing => {
                return Err(VoiceError::InvalidTransition {
                    from: state,
                    trigger: Trigger::Save,
                })
            }
            _ => {}
        }

        engines.timers.cancel_all();
        let (recording, playing) = {
            let machine = self.machine().await;
            (machine.recording_active, machine.playback_active)
        };

        if recording {
            match engines.recorder.stop_recording().await {
                Ok(uri) => {
                    let mut machine = self.machine().await;
                    machine.file_path = Some(path_from_uri(&uri));
                    machine.recording_active = false;
                }
                Err(e) => {
                    error!("Failed to stop recording before send: {:#}", e);
                    self.machine().await.settle_idle();
                    self.notify(Notice::EngineFailed(e.to_string()));
                    return Err(VoiceError::Engine {
                        engine: "recording",
                        action: "stop",
                        source: e,
                    });
                }
            }
        }

        if playing {
            if let Err(e) = engines.player.stop_playback().await {
                warn!("Failed to stop playback before send: {:#}", e);
            }
        }

        let path = {
            let mut machine = self.machine().await;
            machine.settle_idle();
            machine.file_path.clone()
        };
        let Some(path) = path else {
            return Err(VoiceError::NothingToSave);
        };

        let stat = match engines.files.stat(&path).await {
            Ok(stat) => stat,
            Err(e) => {
                error!("Failed to stat voice clip {}: {:#}", path.display(), e);
                self.notify(Notice::SaveFailed(e.to_string()));
                return Err(VoiceError::FileSystem { path, source: e });
            }
        };

        let media = MediaDescriptor::for_file(&path, &self.shared.config.mime_type, stat.size);

        if let Err(e) = engines.submitter.submit(&media).await {
            error!("Failed to send voice message {}: {:#}", media.file_name, e);
            self.notify(Notice::SaveFailed(e.to_string()));
            return Err(VoiceError::Submission(e));
        }

        info!("Voice message sent: {} ({} bytes)", media.file_name, media.size);

        if self.shared.config.remove_after_submit {
            Self::remove_clip(&engines, &path).await;
        }
        self.machine().await.reset();

        Ok(media)
    }

    /// Adopt an existing clip (e.g. a received message) for playback
    pub async fn load_for_review(&self, path: impl AsRef<Path>) -> Result<VoiceState, VoiceError> {
        let path = path.as_ref().to_path_buf();
        let engines = self.shared.ops.lock().await;
        let (state, previous) = {
            let machine = self.machine().await;
            (machine.state, machine.file_path.clone())
        };

        if state != VoiceState::Idle {
            return Err(VoiceError::InvalidTransition {
                from: state,
                trigger: Trigger::Review,
            });
        }

        match engines.files.exists(&path).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(VoiceError::FileSystem {
                    source: anyhow::anyhow!("clip does not exist"),
                    path,
                })
            }
            Err(e) => return Err(VoiceError::FileSystem { path, source: e }),
        }

        if let Some(previous) = previous.filter(|p| *p != path) {
            Self::remove_clip(&engines, &previous).await;
        }

        let mut machine = self.machine().await;
        machine.reset();
        machine.file_path = Some(path.clone());
        info!("Loaded clip for review: {}", path.display());

        Ok(machine.state)
    }

    /// Tear the session down: engines stopped, timers cancelled
    ///
    /// The clip is left on disk; it lives in the cache directory.
    pub async fn close(&self) {
        let mut engines = self.shared.ops.lock().await;
        let clip = self.stop_engines(&mut engines).await;

        let mut machine = self.machine().await;
        machine.settle_idle();
        info!(
            "Voice session closed (clip: {})",
            clip.map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
    }

    async fn start_recording(&self, engines: &mut Engines) -> Result<VoiceState, VoiceError> {
        match engines.permissions.request_microphone().await {
            Ok(PermissionStatus::Granted) => {}
            Ok(PermissionStatus::Denied) => {
                warn!("Microphone permission denied");
                self.notify(Notice::PermissionDenied);
                return Err(VoiceError::PermissionDenied);
            }
            Err(e) => {
                warn!("Microphone permission request failed: {:#}", e);
                self.notify(Notice::PermissionDenied);
                return Err(VoiceError::PermissionDenied);
            }
        }

        // Re-recording over a paused review
        let was_playing = self.machine().await.playback_active;
        if was_playing {
            engines.timers.playback_listener = None;
            if let Err(e) = engines.player.stop_playback().await {
                warn!("Failed to stop playback before recording: {:#}", e);
            }
        }

        let stale = {
            let mut machine = self.machine().await;
            machine.settle_idle();
            machine.state = VoiceState::Processing;
            machine.file_path.take()
        };

        if let Some(stale) = stale {
            Self::remove_clip(engines, &stale).await;
        }

        let dir = self.shared.config.recordings_dir();
        if let Err(e) = engines.files.ensure_dir(&dir).await {
            error!("Failed to prepare recordings directory: {:#}", e);
            self.machine().await.reset();
            return Err(VoiceError::FileSystem {
                path: dir,
                source: e,
            });
        }

        let path = dir.join(self.shared.config.clip_file_name());
        let options = self.shared.config.recording_options();

        let start = match engines.recorder.start_recording(&path, &options).await {
            Ok(start) => start,
            Err(e) => {
                error!(
                    "Failed to start {} recorder: {:#}",
                    engines.recorder.name(),
                    e
                );
                self.machine().await.reset();
                self.notify(Notice::EngineFailed(e.to_string()));
                return Err(VoiceError::EngineStart {
                    engine: "recording",
                    source: e,
                });
            }
        };

        let generation = {
            let mut machine = self.machine().await;
            machine.reset();
            machine.state = VoiceState::Recording;
            machine.recording_active = true;
            machine.file_path = Some(path_from_uri(&start.uri));
            machine.generation
        };

        engines.timers.recording_listener = Some(TaskGuard::spawn(follow_recording(
            self.weak(),
            generation,
            start.progress,
        )));
        engines.timers.waveform = Some(self.waveform_ticker(generation));

        info!("Voice recording started: {}", start.uri);
        Ok(VoiceState::Recording)
    }

    async fn pause_recording(&self, engines: &mut Engines) -> Result<VoiceState, VoiceError> {
        if let Err(e) = engines.recorder.pause_recording().await {
            return Err(self.engine_failed(engines, "recording", "pause", e).await);
        }

        engines.timers.waveform = None;
        self.machine().await.state = VoiceState::Paused(PausedActivity::Recording);
        debug!("Voice recording paused");

        Ok(VoiceState::Paused(PausedActivity::Recording))
    }

    async fn resume_recording(&self, engines: &mut Engines) -> Result<VoiceState, VoiceError> {
        if let Err(e) = engines.recorder.resume_recording().await {
            return Err(self.engine_failed(engines, "recording", "resume", e).await);
        }

        let generation = {
            let mut machine = self.machine().await;
            machine.state = VoiceState::Recording;
            machine.generation
        };
        engines.timers.waveform = Some(self.waveform_ticker(generation));
        debug!("Voice recording resumed");

        Ok(VoiceState::Recording)
    }

    async fn start_playback(
        &self,
        engines: &mut Engines,
        path: &Path,
    ) -> Result<VoiceState, VoiceError> {
        self.machine().await.state = VoiceState::Processing;

        let uri = path.display().to_string();
        let progress = match engines.player.start_playback(&uri).await {
            Ok(progress) => progress,
            Err(e) => {
                error!("Failed to start {} player: {:#}", engines.player.name(), e);
                self.machine().await.settle_idle();
                self.notify(Notice::EngineFailed(e.to_string()));
                return Err(VoiceError::EngineStart {
                    engine: "playback",
                    source: e,
                });
            }
        };

        let generation = {
            let mut machine = self.machine().await;
            machine.settle_idle();
            machine.state = VoiceState::Playing;
            machine.playback_active = true;
            machine.generation
        };

        engines.timers.playback_listener = Some(TaskGuard::spawn(follow_playback(
            self.weak(),
            generation,
            progress,
        )));

        info!("Voice playback started: {}", uri);
        Ok(VoiceState::Playing)
    }

    async fn pause_playback(&self, engines: &mut Engines) -> Result<VoiceState, VoiceError> {
        if let Err(e) = engines.player.pause_playback().await {
            return Err(self.engine_failed(engines, "playback", "pause", e).await);
        }

        self.machine().await.state = VoiceState::Paused(PausedActivity::Playback);
        debug!("Voice playback paused");

        Ok(VoiceState::Paused(PausedActivity::Playback))
    }

    async fn resume_playback(&self, engines: &mut Engines) -> Result<VoiceState, VoiceError> {
        if let Err(e) = engines.player.resume_playback().await {
            return Err(self.engine_failed(engines, "playback", "resume", e).await);
        }

        self.machine().await.state = VoiceState::Playing;
        debug!("Voice playback resumed");

        Ok(VoiceState::Playing)
    }

    /// Playback reached the end of the clip on its own
    async fn complete_playback(&self, generation: u64) {
        let mut engines = self.shared.ops.lock().await;
        {
            let machine = self.machine().await;
            if machine.generation != generation || machine.state != VoiceState::Playing {
                return;
            }
        }

        engines.timers.playback_listener = None;
        if let Err(e) = engines.player.stop_playback().await {
            warn!("Failed to stop finished playback: {:#}", e);
        }

        self.machine().await.settle_idle();
        debug!("Voice playback finished");
    }

    /// Stop both engines and all timers; returns the clip, if any
    async fn stop_engines(&self, engines: &mut Engines) -> Option<PathBuf> {
        engines.timers.cancel_all();

        let (recording, playing) = {
            let machine = self.machine().await;
            (machine.recording_active, machine.playback_active)
        };

        if recording {
            if let Err(e) = engines.recorder.stop_recording().await {
                warn!("Failed to stop recording: {:#}", e);
            }
        }
        if playing {
            if let Err(e) = engines.player.stop_playback().await {
                warn!("Failed to stop playback: {:#}", e);
            }
        }

        let mut machine = self.machine().await;
        machine.recording_active = false;
        machine.playback_active = false;
        machine.file_path.clone()
    }

    /// An engine call failed mid-session: stop everything, keep the clip
    async fn engine_failed(
        &self,
        engines: &mut Engines,
        engine: &'static str,
        action: &'static str,
        source: anyhow::Error,
    ) -> VoiceError {
        error!("Failed to {} {}: {:#}", action, engine, source);
        self.stop_engines(engines).await;
        self.machine().await.settle_idle();
        self.notify(Notice::EngineFailed(source.to_string()));

        VoiceError::Engine {
            engine,
            action,
            source,
        }
    }

    async fn remove_clip(engines: &Engines, path: &Path) {
        match engines.files.unlink(path).await {
            Ok(()) => debug!("Removed voice clip {}", path.display()),
            Err(e) => warn!("Failed to remove voice clip {}: {:#}", path.display(), e),
        }
    }

    fn waveform_ticker(&self, generation: u64) -> Ticker {
        let weak = self.weak();
        Ticker::every(self.shared.config.waveform_interval(), move || {
            let weak = weak.clone();
            async move {
                let Some(shared) = weak.upgrade() else {
                    return ControlFlow::Break(());
                };
                let mut machine = shared.machine.lock().await;
                if machine.generation != generation || machine.state != VoiceState::Recording {
                    return ControlFlow::Break(());
                }
                machine.waveform.refresh();
                ControlFlow::Continue(())
            }
        })
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine
        let _ = self.shared.notices.send(notice);
    }

    fn weak(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    async fn machine(&self) -> MutexGuard<'_, Machine> {
        self.shared.machine.lock().await
    }
}

async fn follow_recording(
    session: Weak<Shared>,
    generation: u64,
    mut progress: mpsc::Receiver<RecordingProgress>,
) {
    while let Some(report) = progress.recv().await {
        let Some(shared) = session.upgrade() else {
            return;
        };
        let mut machine = shared.machine.lock().await;
        if machine.generation != generation {
            return;
        }

        machine.elapsed_recording_ms = machine.elapsed_recording_ms.max(report.position_ms);
        if let Some(level) = report.level {
            machine.waveform.set_level(level);
        }
    }
}

async fn follow_playback(
    session: Weak<Shared>,
    generation: u64,
    mut progress: mpsc::Receiver<PlaybackProgress>,
) {
    while let Some(report) = progress.recv().await {
        let Some(shared) = session.upgrade() else {
            return;
        };
        let mut machine = shared.machine.lock().await;
        if machine.generation != generation {
            return;
        }

        machine.playback_position_ms = report.position_ms;
        machine.playback_duration_ms = report.duration_ms;
        if report.position_ms >= report.duration_ms {
            break;
        }
    }

    // Reached the end, or the engine closed the channel on its own. The
    // completion runs detached because it drops this listener's guard.
    if let Some(shared) = session.upgrade() {
        tokio::spawn(async move {
            VoiceSession { shared }.complete_playback(generation).await;
        });
    }
}

fn path_from_uri(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}
