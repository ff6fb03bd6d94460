use anyhow::Result;
use serde::Deserialize;

use crate::voice::VoiceConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    pub chat: Option<ChatConfig>,
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Where finished voice notes are delivered
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub nats_url: String,
    pub conversation_id: String,
    pub sender_id: String,
}

/// Marketplace REST backend
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
