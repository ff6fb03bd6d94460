use serde::{Deserialize, Serialize};

use crate::voice::MediaDescriptor;

/// Voice message published to the chat backend
#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceMessage {
    pub conversation_id: String,
    pub sender_id: String,
    pub message_id: String,
    pub attachment: MediaDescriptor,
    pub data: String, // Base64-encoded clip bytes
    pub timestamp: String, // RFC3339 timestamp
}
