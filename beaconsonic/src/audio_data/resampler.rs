use crate::error::{BeaconError, Result};
use rubato::{FftFixedIn, Resampler};

/// Offline resampler used when assets are prepared for a beacon.
///
/// # Data Format
/// Works on INTERLEAVED input and produces INTERLEAVED output; each channel is
/// resampled independently.
pub struct BatchResampler {
    source_sample_rate: u32,
    target_sample_rate: u32,
    channels: u16,
    chunk_size: usize,
}

impl BatchResampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: u16,
        chunk_size: Option<usize>,
    ) -> Result<Self> {
        if source_sample_rate == 0 || target_sample_rate == 0 {
            return Err(BeaconError::AudioFormat(
                "Sample rates must be greater than 0".to_string(),
            ));
        }

        if channels == 0 {
            return Err(BeaconError::AudioFormat(
                "Channel count must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            source_sample_rate,
            target_sample_rate,
            channels,
            chunk_size: chunk_size.unwrap_or(1024),
        })
    }

    /// Resamples one NON-INTERLEAVED channel.
    ///
    /// The tail is zero padded to a whole chunk and the output trimmed back to the
    /// expected length, so loop lengths stay proportional to the input.
    pub fn resample_channel(&self, channel_samples: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate {
            return Ok(channel_samples.to_vec());
        }

        let mut resampler = FftFixedIn::<f32>::new(
            self.source_sample_rate as usize,
            self.target_sample_rate as usize,
            self.chunk_size,
            2, // sub_chunks
            1,
        )
        .map_err(|e| BeaconError::AudioLoading(format!("Failed to create resampler: {}", e)))?;

        let delay = resampler.output_delay();
        let expected = self.output_len(channel_samples.len());
        let mut output = Vec::with_capacity(expected + delay + self.chunk_size * 2);
        let mut input_index = 0;

        // Keep feeding silence after the input to flush the filter delay
        while output.len() < expected + delay {
            let mut chunk = vec![0.0f32; self.chunk_size];
            if input_index < channel_samples.len() {
                let end = (input_index + self.chunk_size).min(channel_samples.len());
                chunk[..end - input_index].copy_from_slice(&channel_samples[input_index..end]);
            }
            input_index += self.chunk_size;

            let waves_out = resampler
                .process(&[chunk], None)
                .map_err(|e| BeaconError::AudioLoading(format!("Resampling error: {}", e)))?;
            if let Some(first) = waves_out.first() {
                output.extend_from_slice(first);
            }
        }

        Ok(output[delay..delay + expected].to_vec())
    }

    /// Resamples INTERLEAVED audio.
    pub fn resample_interleaved(&self, interleaved: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate {
            return Ok(interleaved.to_vec());
        }

        let channels = self.channels as usize;
        let mut resampled = Vec::with_capacity(channels);
        for ch in 0..channels {
            let planar: Vec<f32> = interleaved
                .chunks(channels)
                .map(|frame| frame.get(ch).copied().unwrap_or(0.0))
                .collect();
            resampled.push(self.resample_channel(&planar)?);
        }

        let frames = resampled.first().map_or(0, Vec::len);
        let mut output = Vec::with_capacity(frames * channels);
        for frame in 0..frames {
            for channel in &resampled {
                output.push(channel[frame]);
            }
        }
        Ok(output)
    }

    /// Number of output frames produced for `input_frames` frames.
    pub fn output_len(&self, input_frames: usize) -> usize {
        (input_frames as u64 * self.target_sample_rate as u64 / self.source_sample_rate as u64)
            as usize
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resampler_creation() {
        let resampler = BatchResampler::new(44100, 48000, 2, None).unwrap();
        assert_eq!(resampler.source_sample_rate(), 44100);
        assert_eq!(resampler.target_sample_rate(), 48000);
    }

    #[test]
    fn test_resampler_no_resampling_needed() {
        let resampler = BatchResampler::new(44100, 44100, 1, None).unwrap();
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resampler.resample_channel(&samples).unwrap(), samples);
    }

    #[test]
    fn test_invalid_sample_rates() {
        assert!(BatchResampler::new(0, 48000, 2, None).is_err());
        assert!(BatchResampler::new(44100, 0, 2, None).is_err());
        assert!(BatchResampler::new(44100, 48000, 0, None).is_err());
    }

    #[test]
    fn test_output_length_follows_ratio() {
        let resampler = BatchResampler::new(48000, 24000, 2, Some(256)).unwrap();
        let input = vec![0.25f32; 4800 * 2];
        let output = resampler.resample_interleaved(&input).unwrap();
        assert_eq!(output.len(), 2400 * 2);
    }
}
