pub mod audio;
pub mod composer;
pub mod config;
pub mod http;
pub mod nats;
pub mod store;
pub mod voice;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile, AudioFrame, AudioSource,
    ClipPlayer, WavRecorder,
};
pub use composer::ComposerFactory;
pub use config::Config;
pub use http::{create_router, AppState};
pub use nats::{NatsClient, NatsSubmitter, VoiceMessage};
pub use store::{HttpApi, Store};
pub use voice::{MediaDescriptor, VoiceConfig, VoiceError, VoiceSession, VoiceState};
