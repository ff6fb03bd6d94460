// Capture sources for the recording engine
//
// Neither source talks to a sound card. `SilenceBackend` stands in for an
// input device on headless hosts; `FileBackend` replays a clip at real-time
// pace so a composer can be driven end to end without a microphone.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::file::AudioFile;

/// Frames of digital silence at the configured format
pub struct SilenceBackend {
    config: AudioBackendConfig,
    producer: Option<Producer>,
}

impl SilenceBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            producer: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for SilenceBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.producer.is_some() {
            anyhow::bail!("Silence backend already capturing");
        }

        let samples_per_frame = (self.config.target_sample_rate as u64
            * self.config.buffer_duration_ms
            / 1000) as usize
            * self.config.target_channels as usize;
        let template = AudioFrame {
            samples: vec![0; samples_per_frame],
            sample_rate: self.config.target_sample_rate,
            channels: self.config.target_channels,
            timestamp_ms: 0,
        };

        let (producer, rx) = Producer::spawn(self.config.buffer_duration_ms, move |index, step| {
            let mut frame = template.clone();
            frame.timestamp_ms = index * step;
            Some(frame)
        });
        self.producer = Some(producer);

        info!("Silence backend started");
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(producer) = self.producer.take() {
            producer.stop().await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.producer.as_ref().is_some_and(Producer::is_running)
    }

    fn name(&self) -> &str {
        "silence"
    }
}

/// Replays a clip as if it were being captured live
pub struct FileBackend {
    path: String,
    config: AudioBackendConfig,
    producer: Option<Producer>,
}

impl FileBackend {
    pub fn new(path: impl Into<String>, config: AudioBackendConfig) -> Self {
        Self {
            path: path.into(),
            config,
            producer: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.producer.is_some() {
            anyhow::bail!("File backend already capturing");
        }

        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(&path))
            .await
            .context("Decode task panicked")??;

        let step_ms = self.config.buffer_duration_ms;
        let samples_per_frame = (audio.sample_rate as u64 * step_ms / 1000) as usize
            * audio.channels as usize;
        let samples_per_frame = samples_per_frame.max(1);

        let (producer, rx) = Producer::spawn(step_ms, move |index, step| {
            let start = index as usize * samples_per_frame;
            if start >= audio.samples.len() {
                return None;
            }
            let end = (start + samples_per_frame).min(audio.samples.len());
            Some(AudioFrame {
                samples: audio.samples[start..end].to_vec(),
                sample_rate: audio.sample_rate,
                channels: audio.channels,
                timestamp_ms: index * step,
            })
        });
        self.producer = Some(producer);

        info!("File backend started: {}", self.path);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(producer) = self.producer.take() {
            producer.stop().await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.producer.as_ref().is_some_and(Producer::is_running)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Paced frame producer shared by both sources
struct Producer {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Producer {
    fn spawn<F>(step_ms: u64, mut next: F) -> (Self, mpsc::Receiver<AudioFrame>)
    where
        F: FnMut(u64, u64) -> Option<AudioFrame> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(100);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let step_ms = step_ms.max(1);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(step_ms));
            let mut index = 0u64;

            while flag.load(Ordering::SeqCst) {
                interval.tick().await;
                let Some(frame) = next(index, step_ms) else {
                    break;
                };
                if tx.send(frame).await.is_err() {
                    warn!("Frame receiver dropped, stopping producer");
                    break;
                }
                index += 1;
            }

            flag.store(false, Ordering::SeqCst);
        });

        (Self { running, handle }, rx)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        self.handle.abort();
        let _ = self.handle.await;
    }
}
