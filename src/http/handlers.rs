use super::state::AppState;
use crate::store::StoreState;
use crate::voice::{VoiceError, VoiceSession, VoiceSnapshot};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CreateComposerResponse {
    pub composer_id: String,
    pub snapshot: VoiceSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// Clip to load for playback
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn composer_not_found(composer_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Composer {} not found", composer_id),
    )
}

fn voice_error_response(err: VoiceError) -> Response {
    let status = match &err {
        VoiceError::PermissionDenied => StatusCode::FORBIDDEN,
        VoiceError::InvalidTransition { .. } | VoiceError::NothingToSave => StatusCode::CONFLICT,
        VoiceError::Submission(_) => StatusCode::BAD_GATEWAY,
        VoiceError::EngineStart { .. }
        | VoiceError::Engine { .. }
        | VoiceError::FileSystem { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Composer operation failed: {:#}", anyhow::Error::from(err));
        return error_response(status, "Composer operation failed");
    }

    warn!("Composer operation rejected: {}", err);
    error_response(status, err)
}

/// Run a transport operation and answer with the resulting snapshot
async fn drive<F, Fut, T>(state: &AppState, composer_id: &str, op: F) -> Response
where
    F: FnOnce(Arc<VoiceSession>) -> Fut,
    Fut: Future<Output = Result<T, VoiceError>>,
{
    let Some(session) = state.session(composer_id).await else {
        return composer_not_found(composer_id);
    };

    match op(Arc::clone(&session)).await {
        Ok(_) => (StatusCode::OK, Json(session.snapshot().await)).into_response(),
        Err(e) => voice_error_response(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /composers
/// Open a new voice composer
pub async fn create_composer(State(state): State<AppState>) -> impl IntoResponse {
    let session = match state.factory.create() {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("Failed to create composer: {:#}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create composer: {}", e),
            );
        }
    };

    let composer_id = format!("composer-{}", uuid::Uuid::new_v4());
    let snapshot = session.snapshot().await;

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(composer_id.clone(), session);
    }

    info!("Composer opened: {}", composer_id);

    (
        StatusCode::CREATED,
        Json(CreateComposerResponse {
            composer_id,
            snapshot,
        }),
    )
        .into_response()
}

/// GET /composers/:composer_id
pub async fn get_composer(
    State(state): State<AppState>,
    Path(composer_id): Path<String>,
) -> impl IntoResponse {
    match state.session(&composer_id).await {
        Some(session) => (StatusCode::OK, Json(session.snapshot().await)).into_response(),
        None => composer_not_found(&composer_id),
    }
}

/// POST /composers/:composer_id/primary
pub async fn press_primary(
    State(state): State<AppState>,
    Path(composer_id): Path<String>,
) -> impl IntoResponse {
    drive(&state, &composer_id, |session| async move {
        session.press_primary().await
    })
    .await
}

/// POST /composers/:composer_id/play
pub async fn press_play(
    State(state): State<AppState>,
    Path(composer_id): Path<String>,
) -> impl IntoResponse {
    drive(&state, &composer_id, |session| async move {
        session.press_play().await
    })
    .await
}

/// POST /composers/:composer_id/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(composer_id): Path<String>,
) -> impl IntoResponse {
    drive(&state, &composer_id, |session| async move { session.cancel().await }).await
}

/// POST /composers/:composer_id/save
pub async fn save(
    State(state): State<AppState>,
    Path(composer_id): Path<String>,
) -> impl IntoResponse {
    drive(&state, &composer_id, |session| async move { session.save().await }).await
}

/// POST /composers/:composer_id/review
pub async fn review(
    State(state): State<AppState>,
    Path(composer_id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> impl IntoResponse {
    drive(&state, &composer_id, |session| async move {
        session.load_for_review(&req.path).await
    })
    .await
}

/// DELETE /composers/:composer_id
/// Tear the composer down
pub async fn close_composer(
    State(state): State<AppState>,
    Path(composer_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&composer_id)
    };

    match session {
        Some(session) => {
            session.close().await;
            info!("Composer closed: {}", composer_id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => composer_not_found(&composer_id),
    }
}

/// GET /store
pub async fn get_store(State(state): State<AppState>) -> impl IntoResponse {
    match &state.store {
        Some(store) => {
            let snapshot: StoreState = store.snapshot().await;
            (StatusCode::OK, Json(snapshot)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "No marketplace backend configured"),
    }
}

/// POST /store/refresh
pub async fn refresh_store(State(state): State<AppState>) -> impl IntoResponse {
    let Some(store) = &state.store else {
        return error_response(StatusCode::NOT_FOUND, "No marketplace backend configured");
    };

    match store.refresh_all().await {
        Ok(()) => (StatusCode::OK, Json(store.snapshot().await)).into_response(),
        Err(e) => {
            error!("Store refresh failed: {:#}", anyhow::Error::from(e));
            error_response(StatusCode::BAD_GATEWAY, "Store refresh failed")
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
