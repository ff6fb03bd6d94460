use serde::Serialize;

/// Which activity a `Paused` session will go back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PausedActivity {
    Recording,
    Playback,
}

/// Voice session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "paused", rename_all = "snake_case")]
pub enum VoiceState {
    /// Nothing running; may or may not hold a clip
    Idle,
    /// Capturing audio
    Recording,
    /// Capture or playback suspended
    Paused(PausedActivity),
    /// Playing the clip back
    Playing,
    /// Waiting on an engine to start
    Processing,
}

impl Default for VoiceState {
    fn default() -> Self {
        Self::Idle
    }
}

impl VoiceState {
    pub fn label(&self) -> &'static str {
        match self {
            VoiceState::Idle => "Idle",
            VoiceState::Recording => "Recording",
            VoiceState::Paused(PausedActivity::Recording) => "Recording paused",
            VoiceState::Paused(PausedActivity::Playback) => "Playback paused",
            VoiceState::Playing => "Playing",
            VoiceState::Processing => "Processing",
        }
    }

    /// Derive the composer's button layout
    pub fn affordances(&self, has_clip: bool) -> Affordances {
        let primary_icon = match self {
            VoiceState::Recording => PrimaryIcon::Pause,
            VoiceState::Paused(PausedActivity::Recording) => PrimaryIcon::Resume,
            _ => PrimaryIcon::Microphone,
        };

        let play_icon = match self {
            VoiceState::Playing => PlayIcon::Pause,
            _ => PlayIcon::Play,
        };

        let idle_with_clip = *self == VoiceState::Idle && has_clip;

        Affordances {
            primary_icon,
            primary_enabled: matches!(
                self,
                VoiceState::Idle | VoiceState::Recording | VoiceState::Paused(_)
            ),
            play_icon,
            play_enabled: idle_with_clip
                || matches!(
                    self,
                    VoiceState::Playing | VoiceState::Paused(PausedActivity::Playback)
                ),
            save_enabled: idle_with_clip
                || matches!(
                    self,
                    VoiceState::Recording | VoiceState::Paused(_) | VoiceState::Playing
                ),
            cancel_enabled: idle_with_clip
                || !matches!(self, VoiceState::Idle | VoiceState::Processing),
        }
    }
}

/// User actions a session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Primary,
    Play,
    Save,
    Cancel,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryIcon {
    Microphone,
    Pause,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayIcon {
    Play,
    Pause,
}

/// Icons and enabled flags for the composer's transport buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Affordances {
    pub primary_icon: PrimaryIcon,
    pub primary_enabled: bool,
    pub play_icon: PlayIcon,
    pub play_enabled: bool,
    pub save_enabled: bool,
    pub cancel_enabled: bool,
}

/// Everything a composer view needs to render the voice row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSnapshot {
    #[serde(flatten)]
    pub state: VoiceState,
    pub label: &'static str,
    pub file_path: Option<String>,
    pub elapsed_recording_ms: u64,
    /// `m:ss` rendering of the elapsed time
    pub elapsed_label: String,
    pub playback_position_ms: u64,
    pub playback_duration_ms: u64,
    pub recording_active: bool,
    pub playback_active: bool,
    pub visualization_samples: Vec<u8>,
    pub affordances: Affordances,
}

/// Format milliseconds as `m:ss`
pub fn clock_label(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
