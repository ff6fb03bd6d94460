// Format conversion between capture frames and the voice-note format
//
// Capture sources hand over whatever their device produces; voice notes are
// written at a single fixed rate and channel count. Integer-ratio decimation
// only, no filtering.

use super::backend::AudioFrame;

/// Convert a frame to the target rate and channel count
pub fn conform_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    if processed.sample_rate != target_sample_rate {
        processed = downsample_frame(processed, target_sample_rate);
    }

    if processed.channels != target_channels && target_channels == 1 {
        processed = stereo_to_mono(processed);
    }

    processed
}

/// Downsample audio frame by decimation
fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if frame.sample_rate == target_rate || target_rate == 0 {
        return frame;
    }

    let ratio = frame.sample_rate / target_rate;
    if ratio <= 1 {
        return frame; // Can't upsample
    }

    let channels = frame.channels.max(1) as usize;

    // Keep every Nth sample frame, all channels of it
    let downsampled: Vec<i16> = frame
        .samples
        .chunks(channels)
        .step_by(ratio as usize)
        .flatten()
        .copied()
        .collect();

    AudioFrame {
        samples: downsampled,
        sample_rate: target_rate,
        channels: frame.channels,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Convert stereo to mono by summing channels
fn stereo_to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels != 2 {
        return frame;
    }

    let mono_samples = frame
        .samples
        .chunks_exact(2)
        .map(|pair| (pair[0] as i32 + pair[1] as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16)
        .collect();

    AudioFrame {
        samples: mono_samples,
        sample_rate: frame.sample_rate,
        channels: 1,
        timestamp_ms: frame.timestamp_ms,
    }
}
