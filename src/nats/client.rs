use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use tracing::info;

use super::messages::VoiceMessage;
use crate::voice::{MediaDescriptor, MessageSubmitter};

pub struct NatsClient {
    client: Client,
    conversation_id: String,
    sender_id: String,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str, conversation_id: String, sender_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            conversation_id,
            sender_id,
        })
    }

    pub fn subject(&self) -> String {
        voice_subject(&self.conversation_id)
    }

    /// Publish a voice clip to the conversation and wait for the server to
    /// take it
    pub async fn publish_voice_message(
        &self,
        media: &MediaDescriptor,
        clip: &[u8],
    ) -> Result<()> {
        let subject = self.subject();

        let message = VoiceMessage {
            conversation_id: self.conversation_id.clone(),
            sender_id: self.sender_id.clone(),
            message_id: uuid::Uuid::new_v4().to_string(),
            attachment: media.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(clip),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish voice message")?;
        self.client
            .flush()
            .await
            .context("Failed to flush voice message")?;

        info!(
            "Published voice message to {} (file={}, bytes={})",
            subject,
            media.file_name,
            clip.len()
        );

        Ok(())
    }
}

/// Subject voice messages for a conversation are published on
pub fn voice_subject(conversation_id: &str) -> String {
    format!("chat.voice.{}", conversation_id)
}

/// `MessageSubmitter` that ships the clip over NATS
pub struct NatsSubmitter {
    client: NatsClient,
}

impl NatsSubmitter {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MessageSubmitter for NatsSubmitter {
    async fn submit(&self, media: &MediaDescriptor) -> Result<()> {
        let path = media
            .local_path()
            .with_context(|| format!("Not a local clip: {}", media.url))?;

        let clip = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read clip {}", path.display()))?;

        self.client.publish_voice_message(media, &clip).await
    }
}
