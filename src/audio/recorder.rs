// WAV recording engine
//
// Pulls frames from an `AudioBackend` and writes them to a 16-bit PCM WAV
// file. While paused the backend keeps running and frames are discarded, so
// the reported position is captured audio only.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioFrame};
use super::convert::conform_frame;
use crate::voice::{RecordingEngine, RecordingOptions, RecordingProgress, RecordingStart};

pub struct WavRecorder {
    backend: Box<dyn AudioBackend>,
    paused: Arc<AtomicBool>,
    capture: Option<Capture>,
}

struct Capture {
    uri: String,
    handle: JoinHandle<Result<u64>>,
}

impl WavRecorder {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            paused: Arc::new(AtomicBool::new(false)),
            capture: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_some()
    }
}

#[async_trait::async_trait]
impl RecordingEngine for WavRecorder {
    async fn start_recording(
        &mut self,
        path: &Path,
        options: &RecordingOptions,
    ) -> Result<RecordingStart> {
        if self.capture.is_some() {
            anyhow::bail!("Recorder already capturing");
        }

        let spec = hound::WavSpec {
            channels: options.channels,
            sample_rate: options.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        // Nothing touches the disk until the device is running
        let frames = self
            .backend
            .start()
            .await
            .with_context(|| format!("Failed to start {} backend", self.backend.name()))?;

        let writer = match hound::WavWriter::create(path, spec) {
            Ok(writer) => writer,
            Err(e) => {
                if let Err(stop_err) = self.backend.stop().await {
                    warn!("Failed to stop {} backend: {}", self.backend.name(), stop_err);
                }
                return Err(e).with_context(|| format!("Failed to create WAV file: {:?}", path));
            }
        };

        self.paused.store(false, Ordering::SeqCst);

        let (progress_tx, progress_rx) = mpsc::channel(32);
        let handle = tokio::spawn(capture_loop(
            frames,
            writer,
            options.clone(),
            Arc::clone(&self.paused),
            progress_tx,
        ));

        let uri = path.display().to_string();
        info!("Recording started: {} (backend={})", uri, self.backend.name());

        self.capture = Some(Capture {
            uri: uri.clone(),
            handle,
        });

        Ok(RecordingStart {
            uri,
            progress: progress_rx,
        })
    }

    async fn pause_recording(&mut self) -> Result<()> {
        if self.capture.is_none() {
            anyhow::bail!("Recorder is not capturing");
        }
        self.paused.store(true, Ordering::SeqCst);
        debug!("Recording paused");
        Ok(())
    }

    async fn resume_recording(&mut self) -> Result<()> {
        if self.capture.is_none() {
            anyhow::bail!("Recorder is not capturing");
        }
        self.paused.store(false, Ordering::SeqCst);
        debug!("Recording resumed");
        Ok(())
    }

    async fn stop_recording(&mut self) -> Result<String> {
        let capture = self.capture.take().context("Recorder is not capturing")?;

        // Closing the backend closes the frame channel, which ends the loop
        if let Err(e) = self.backend.stop().await {
            warn!("Failed to stop {} backend: {}", self.backend.name(), e);
        }

        let captured_ms = capture
            .handle
            .await
            .context("Capture task panicked")??;

        info!("Recording stopped: {} ({}ms captured)", capture.uri, captured_ms);

        Ok(capture.uri)
    }

    fn name(&self) -> &str {
        "wav"
    }
}

async fn capture_loop(
    mut frames: mpsc::Receiver<AudioFrame>,
    mut writer: hound::WavWriter<BufWriter<File>>,
    options: RecordingOptions,
    paused: Arc<AtomicBool>,
    progress: mpsc::Sender<RecordingProgress>,
) -> Result<u64> {
    let samples_per_second = options.sample_rate as u64 * options.channels.max(1) as u64;
    let mut captured_samples = 0u64;
    let mut position_ms = 0u64;
    let mut last_report_ms: Option<u64> = None;

    while let Some(frame) = frames.recv().await {
        if paused.load(Ordering::SeqCst) {
            continue;
        }

        let level = frame.peak_level();
        let frame = conform_frame(frame, options.sample_rate, options.channels);
        if frame.sample_rate != options.sample_rate || frame.channels != options.channels {
            warn!(
                "Frame format {}Hz/{}ch does not match clip format, writing as-is",
                frame.sample_rate, frame.channels
            );
        }

        for &sample in &frame.samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }

        captured_samples += frame.samples.len() as u64;
        position_ms = captured_samples * 1000 / samples_per_second.max(1);

        let due = match last_report_ms {
            None => true,
            Some(last) => position_ms.saturating_sub(last) >= options.progress_interval_ms,
        };
        if due {
            last_report_ms = Some(position_ms);
            // A slow listener only loses cosmetic updates
            let _ = progress.try_send(RecordingProgress {
                position_ms,
                level: Some(level),
            });
        }
    }

    writer.finalize().context("Failed to finalize WAV file")?;

    Ok(position_ms)
}
