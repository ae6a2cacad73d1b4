//! Asset decoding and preparation.
//!
//! Beacon loops are decoded once when a beacon is created and then converted into
//! the byte format its sound is rendered in. Decoding is behind the
//! [`AudioDataLoader`] trait; [`SymphoniaLoader`] is the default implementation.

mod load_options;
mod loader;
mod resampler;
mod symphonia_loader;

use crate::error::Result;
pub use load_options::{ConvertToMono, LoadOptions};
pub use loader::AudioDataLoader;
pub use resampler::BatchResampler;
use std::sync::Arc;
use std::time::Duration;
pub use symphonia_loader::SymphoniaLoader;

/// Decoded audio with reference-counted sample storage.
///
/// # Data Format
/// Samples are stored INTERLEAVED: `[L0, R0, L1, R1, ...]` for stereo,
/// `[M0, M1, ...]` for mono.
#[derive(Debug, Clone)]
pub struct AudioData {
    inner: Arc<AudioDataInner>,
}

#[derive(Debug)]
struct AudioDataInner {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    total_frames: usize,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let total_frames = samples.len() / channels as usize;
        Self {
            inner: Arc::new(AudioDataInner {
                samples,
                sample_rate,
                channels,
                total_frames,
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.inner.samples
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn duration(&self) -> Duration {
        if self.inner.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.inner.total_frames as f64 / self.inner.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    /// Downmixes all channels into one by averaging.
    pub fn to_mono(&self) -> Self {
        if self.inner.channels == 1 {
            return self.clone();
        }

        let channels = self.inner.channels as usize;
        let mono: Vec<f32> = self
            .inner
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Self::new(mono, self.inner.sample_rate, 1)
    }

    /// Repeats each sample across `channels` output channels.
    ///
    /// Only valid on mono audio; multi-channel audio is folded to mono first.
    pub fn expand_channels(&self, channels: u16) -> Self {
        let mono = self.to_mono();
        if channels <= 1 {
            return mono;
        }

        let mut expanded = Vec::with_capacity(mono.samples().len() * channels as usize);
        for &sample in mono.samples() {
            expanded.extend(std::iter::repeat(sample).take(channels as usize));
        }
        Self::new(expanded, self.inner.sample_rate, channels)
    }

    /// Resamples to a different rate using rubato.
    pub fn resample(&self, target_sample_rate: u32) -> Result<Self> {
        if target_sample_rate == self.inner.sample_rate {
            return Ok(self.clone());
        }

        log::debug!(
            "Resampling {} frames: {} Hz -> {} Hz",
            self.inner.total_frames,
            self.inner.sample_rate,
            target_sample_rate
        );

        let resampler = BatchResampler::new(
            self.inner.sample_rate,
            target_sample_rate,
            self.inner.channels,
            Some(1024),
        )?;
        let resampled = resampler.resample_interleaved(&self.inner.samples)?;

        Ok(Self::new(resampled, target_sample_rate, self.inner.channels))
    }
}
