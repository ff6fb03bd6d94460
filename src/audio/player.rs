// Clip playback engine
//
// Decodes the clip up front and advances a playback clock in fixed ticks.
// Each tick's samples go to an optional output sink (the host's audio
// device); progress is reported on every tick and the progress channel
// closes once the clock reaches the clip's duration.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::AudioFrame;
use super::file::AudioFile;
use crate::voice::{PlaybackEngine, PlaybackProgress};

pub struct ClipPlayer {
    tick: Duration,
    sink: Option<mpsc::Sender<AudioFrame>>,
    playback: Option<Playback>,
}

struct Playback {
    paused: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ClipPlayer {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            sink: None,
            playback: None,
        }
    }

    /// Forward played samples to an output device
    pub fn with_sink(mut self, sink: mpsc::Sender<AudioFrame>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished() && !p.paused.load(Ordering::SeqCst))
    }
}

#[async_trait::async_trait]
impl PlaybackEngine for ClipPlayer {
    async fn start_playback(&mut self, uri: &str) -> Result<mpsc::Receiver<PlaybackProgress>> {
        if let Some(previous) = self.playback.take() {
            previous.handle.abort();
        }

        let path = uri.strip_prefix("file://").unwrap_or(uri).to_string();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(&path))
            .await
            .context("Decode task panicked")??;

        let duration_ms = audio.duration_ms();
        let tick_ms = (self.tick.as_millis() as u64).max(1);
        let paused = Arc::new(AtomicBool::new(false));
        let (progress_tx, progress_rx) = mpsc::channel(32);

        let handle = tokio::spawn(play_loop(
            audio,
            duration_ms,
            tick_ms,
            Arc::clone(&paused),
            self.sink.clone(),
            progress_tx,
        ));

        info!("Playback started: {} ({}ms)", uri, duration_ms);
        self.playback = Some(Playback { paused, handle });

        Ok(progress_rx)
    }

    async fn pause_playback(&mut self) -> Result<()> {
        let playback = self.playback.as_ref().context("Nothing is playing")?;
        playback.paused.store(true, Ordering::SeqCst);
        debug!("Playback paused");
        Ok(())
    }

    async fn resume_playback(&mut self) -> Result<()> {
        let playback = self.playback.as_ref().context("Nothing is playing")?;
        playback.paused.store(false, Ordering::SeqCst);
        debug!("Playback resumed");
        Ok(())
    }

    async fn stop_playback(&mut self) -> Result<()> {
        if let Some(playback) = self.playback.take() {
            playback.handle.abort();
            let _ = playback.handle.await;
            debug!("Playback stopped");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "clip"
    }
}

async fn play_loop(
    audio: AudioFile,
    duration_ms: u64,
    tick_ms: u64,
    paused: Arc<AtomicBool>,
    sink: Option<mpsc::Sender<AudioFrame>>,
    progress: mpsc::Sender<PlaybackProgress>,
) {
    let sample_rate = audio.sample_rate as u64;
    let channels = audio.channels.max(1) as usize;
    // Interleaved sample index of the frame playing at `ms`
    let offset = |ms: u64| (ms * sample_rate / 1000) as usize * channels;
    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms));
    let mut position_ms = 0u64;

    loop {
        interval.tick().await;
        if paused.load(Ordering::SeqCst) {
            continue;
        }

        let next_ms = (position_ms + tick_ms).min(duration_ms);

        if let Some(sink) = &sink {
            let start = offset(position_ms);
            let end = if next_ms >= duration_ms {
                audio.samples.len()
            } else {
                offset(next_ms).min(audio.samples.len())
            };
            if start < end {
                let _ = sink.try_send(AudioFrame {
                    samples: audio.samples[start..end].to_vec(),
                    sample_rate: audio.sample_rate,
                    channels: audio.channels,
                    timestamp_ms: position_ms,
                });
            }
        }

        position_ms = next_ms;
        let report = PlaybackProgress {
            position_ms,
            duration_ms,
        };
        if progress.send(report).await.is_err() {
            break;
        }
        if position_ms >= duration_ms {
            break;
        }
    }
}
