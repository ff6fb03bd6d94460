use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// What the chat backend needs to attach a clip to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    /// `file://` url of the clip
    pub url: String,
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
}

impl MediaDescriptor {
    pub fn for_file(path: &Path, mime_type: &str, size: u64) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            url: format!("file://{}", path.display()),
            file_name,
            mime_type: mime_type.to_string(),
            size,
        }
    }

    /// Local path behind a `file://` url
    pub fn local_path(&self) -> Option<PathBuf> {
        self.url.strip_prefix("file://").map(PathBuf::from)
    }
}

/// Hands a finished clip to the chat backend
#[async_trait::async_trait]
pub trait MessageSubmitter: Send + Sync {
    async fn submit(&self, media: &MediaDescriptor) -> Result<()>;
}

/// Accepts every clip without sending it anywhere
///
/// Used when no chat backend is configured so composers can still be driven.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSubmitter;

#[async_trait::async_trait]
impl MessageSubmitter for LogSubmitter {
    async fn submit(&self, media: &MediaDescriptor) -> Result<()> {
        info!(
            "No chat backend configured, dropping voice message {} ({} bytes)",
            media.file_name, media.size
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_for_file() {
        let media = MediaDescriptor::for_file(Path::new("/tmp/voice/voice-1.wav"), "audio/wav", 42);
        assert_eq!(media.url, "file:///tmp/voice/voice-1.wav");
        assert_eq!(media.file_name, "voice-1.wav");
        assert_eq!(media.size, 42);
        assert_eq!(media.local_path(), Some(PathBuf::from("/tmp/voice/voice-1.wav")));
    }

    #[test]
    fn test_descriptor_uses_camel_case() {
        let media = MediaDescriptor::for_file(Path::new("/a/b.wav"), "audio/wav", 1);
        let json = serde_json::to_string(&media).unwrap();
        assert!(json.contains("\"fileName\":\"b.wav\""));
        assert!(json.contains("\"mimeType\":\"audio/wav\""));
    }
}
