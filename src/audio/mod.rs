pub mod backend;
pub mod convert;
pub mod file;
pub mod player;
pub mod recorder;
pub mod source;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use file::AudioFile;
pub use player::ClipPlayer;
pub use recorder::WavRecorder;
pub use source::{FileBackend, SilenceBackend};
