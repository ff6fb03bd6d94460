// Integration tests for the composer HTTP API
//
// Requests go straight into the router with `oneshot`; composers run on the
// silence backend and write clips to a temporary directory.

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use marketchat::voice::{LogSubmitter, VoiceConfig};
use marketchat::{create_router, AppState, ComposerFactory, Store};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir, configure: impl FnOnce(&mut VoiceConfig)) -> Router {
    let mut config = VoiceConfig {
        recordings_path: dir.path().join("voice").display().to_string(),
        ..VoiceConfig::default()
    };
    configure(&mut config);

    let factory = ComposerFactory::new(config, Arc::new(LogSubmitter));
    create_router(AppState::new(factory))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json)?)
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body)?).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    Ok((status, value))
}

async fn open_composer(app: &Router) -> Result<String> {
    let (status, body) = call(app, Method::POST, "/composers", None).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(body["composer_id"].as_str().unwrap().to_string())
}

fn clips_in(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |_| {});

    let (status, body) = call(&app, Method::GET, "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_open_composer_starts_idle() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |_| {});

    let (status, body) = call(&app, Method::POST, "/composers", None).await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["composer_id"].as_str().unwrap();
    assert!(id.starts_with("composer-"));
    assert_eq!(body["snapshot"]["state"], "idle");

    let (status, snapshot) = call(&app, Method::GET, &format!("/composers/{}", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["label"], "Idle");
    assert_eq!(snapshot["elapsed_label"], "0:00");
    assert_eq!(snapshot["affordances"]["play_enabled"], false);

    Ok(())
}

#[tokio::test]
async fn test_unknown_composer() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |_| {});

    let (status, body) = call(&app, Method::POST, "/composers/nope/primary", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let (status, _) = call(&app, Method::DELETE, "/composers/nope", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_empty_composer_buttons() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |_| {});
    let id = open_composer(&app).await?;

    let (status, snapshot) = call(&app, Method::POST, &format!("/composers/{}/play", id), None).await?;
    assert_eq!(status, StatusCode::OK, "play without a clip is ignored");
    assert_eq!(snapshot["state"], "idle");

    let (status, _) = call(&app, Method::POST, &format!("/composers/{}/save", id), None).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, snapshot) = call(&app, Method::POST, &format!("/composers/{}/cancel", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"], "idle");

    Ok(())
}

#[tokio::test]
async fn test_record_pause_and_send() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |_| {});
    let id = open_composer(&app).await?;
    let voice_dir = dir.path().join("voice");

    let (status, snapshot) = call(&app, Method::POST, &format!("/composers/{}/primary", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"], "recording");
    assert_eq!(snapshot["recording_active"], true);
    assert_eq!(snapshot["affordances"]["primary_icon"], "pause");
    assert_eq!(clips_in(&voice_dir), 1);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let (_, snapshot) = call(&app, Method::POST, &format!("/composers/{}/primary", id), None).await?;
    assert_eq!(snapshot["state"], "paused");
    assert_eq!(snapshot["paused"], "recording");

    let (status, _) = call(&app, Method::POST, &format!("/composers/{}/play", id), None).await?;
    assert_eq!(status, StatusCode::CONFLICT, "capture still owns the clip");

    let (status, snapshot) = call(&app, Method::POST, &format!("/composers/{}/save", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"], "idle");
    assert_eq!(snapshot["file_path"], Value::Null);
    assert_eq!(snapshot["elapsed_recording_ms"], 0);
    assert_eq!(clips_in(&voice_dir), 0, "sent clip is removed");

    Ok(())
}

#[tokio::test]
async fn test_permission_denied_is_forbidden() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |config| config.microphone_permission = false);
    let id = open_composer(&app).await?;

    let (status, body) = call(&app, Method::POST, &format!("/composers/{}/primary", id), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "microphone permission denied");

    let (_, snapshot) = call(&app, Method::GET, &format!("/composers/{}", id), None).await?;
    assert_eq!(snapshot["state"], "idle");

    Ok(())
}

#[tokio::test]
async fn test_review_and_play_existing_clip() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |_| {});
    let id = open_composer(&app).await?;

    let clip = dir.path().join("received.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&clip, spec)?;
    for _ in 0..16000 {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;

    let (status, snapshot) = call(
        &app,
        Method::POST,
        &format!("/composers/{}/review", id),
        Some(json!({"path": clip.display().to_string()})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["file_path"], clip.display().to_string());
    assert_eq!(snapshot["affordances"]["play_enabled"], true);

    let (status, snapshot) = call(&app, Method::POST, &format!("/composers/{}/play", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["state"], "playing");
    assert_eq!(snapshot["affordances"]["play_icon"], "pause");

    let (status, _) = call(&app, Method::POST, &format!("/composers/{}/primary", id), None).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, snapshot) = call(&app, Method::POST, &format!("/composers/{}/cancel", id), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["file_path"], Value::Null);
    assert!(!clip.exists(), "cancel discards the clip");

    Ok(())
}

#[tokio::test]
async fn test_review_missing_clip() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |_| {});
    let id = open_composer(&app).await?;

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/composers/{}/review", id),
        Some(json!({"path": "/nonexistent/clip.wav"})),
    )
    .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    Ok(())
}

#[tokio::test]
async fn test_close_composer() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |_| {});
    let id = open_composer(&app).await?;

    call(&app, Method::POST, &format!("/composers/{}/primary", id), None).await?;

    let (status, _) = call(&app, Method::DELETE, &format!("/composers/{}", id), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::GET, &format!("/composers/{}", id), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_store_without_backend() -> Result<()> {
    let dir = TempDir::new()?;
    let app = app(&dir, |_| {});

    let (status, _) = call(&app, Method::GET, "/store", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::POST, "/store/refresh", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

struct OfflineApi;

#[async_trait::async_trait]
impl marketchat::store::ApiBackend for OfflineApi {
    async fn get(&self, path: &str, _token: Option<&str>) -> Result<Value> {
        anyhow::bail!("offline: GET {}", path)
    }

    async fn post(&self, path: &str, _token: Option<&str>, _body: Value) -> Result<Value> {
        anyhow::bail!("offline: POST {}", path)
    }

    async fn delete(&self, path: &str, _token: Option<&str>) -> Result<()> {
        anyhow::bail!("offline: DELETE {}", path)
    }
}

#[tokio::test]
async fn test_store_refresh_signed_out() -> Result<()> {
    let dir = TempDir::new()?;
    let config = VoiceConfig {
        recordings_path: dir.path().join("voice").display().to_string(),
        ..VoiceConfig::default()
    };
    let store = Store::new(Arc::new(OfflineApi));
    let state = AppState::new(ComposerFactory::new(config, Arc::new(LogSubmitter)))
        .with_store(Arc::new(store));
    let app = create_router(state);

    let (status, body) = call(&app, Method::POST, "/store/refresh", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["auth"]["value"], Value::Null);
    assert_eq!(body["auth"]["stale"], false);
    assert_eq!(body["cart"]["value"], Value::Null);

    let (status, _) = call(&app, Method::GET, "/store", None).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}
