use base64::Engine;
use marketchat::nats::{voice_subject, VoiceMessage};
use marketchat::voice::MediaDescriptor;
use std::path::Path;

fn attachment() -> MediaDescriptor {
    MediaDescriptor::for_file(
        Path::new("/cache/voice/voice-1234.wav"),
        "audio/wav",
        4,
    )
}

#[test]
fn test_voice_message_serialization() {
    let msg = VoiceMessage {
        conversation_id: "conv-42".to_string(),
        sender_id: "buyer-7".to_string(),
        message_id: "msg-1".to_string(),
        attachment: attachment(),
        data: base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 4]),
        timestamp: "2026-03-01T09:15:00Z".to_string(),
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"conversation_id\":\"conv-42\""));
    assert!(json.contains("\"fileName\":\"voice-1234.wav\""));
    assert!(json.contains("\"mimeType\":\"audio/wav\""));
    assert!(json.contains("\"url\":\"file:///cache/voice/voice-1234.wav\""));

    let deserialized: VoiceMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.sender_id, "buyer-7");
    assert_eq!(deserialized.attachment, attachment());

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&deserialized.data)
        .unwrap();
    assert_eq!(bytes, vec![1, 2, 3, 4]);
    assert_eq!(bytes.len() as u64, deserialized.attachment.size);
}

#[test]
fn test_voice_subject_per_conversation() {
    assert_eq!(voice_subject("conv-42"), "chat.voice.conv-42");
    assert_ne!(voice_subject("a"), voice_subject("b"));
}

#[test]
fn test_attachment_local_path() {
    let media = attachment();
    assert_eq!(
        media.local_path().unwrap(),
        Path::new("/cache/voice/voice-1234.wav")
    );

    let remote = MediaDescriptor {
        url: "https://cdn.example.com/voice.wav".to_string(),
        ..attachment()
    };
    assert_eq!(remote.local_path(), None);
}
