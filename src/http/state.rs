use crate::composer::ComposerFactory;
use crate::store::Store;
use crate::voice::VoiceSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active composers (composer_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<VoiceSession>>>>,

    /// Builds the session behind each new composer
    pub factory: ComposerFactory,

    /// Marketplace cache, when a backend is configured
    pub store: Option<Arc<Store>>,
}

impl AppState {
    pub fn new(factory: ComposerFactory) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            factory,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn session(&self, composer_id: &str) -> Option<Arc<VoiceSession>> {
        self.sessions.read().await.get(composer_id).cloned()
    }
}
