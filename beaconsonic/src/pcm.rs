//! Raw PCM formats exchanged with the renderer.
//!
//! Sources hand the renderer interleaved little-endian bytes, so every read and
//! every byte position is expressed in bytes. These helpers convert between those
//! bytes and the `f32` samples the decoder and mixer work with.

use crate::error::{BeaconError, Result};
use cpal::{FromSample, Sample};

/// Encoding of a single PCM sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// Unsigned 8-bit, silence at 128
    Pcm8,
    /// Signed 16-bit little endian
    #[default]
    Pcm16,
    /// 32-bit float little endian
    Float32,
}

impl SampleFormat {
    /// Maps the platform audio encoding codes (2 = PCM16, 3 = PCM8, 4 = float).
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            2 => Ok(Self::Pcm16),
            3 => Ok(Self::Pcm8),
            4 => Ok(Self::Float32),
            other => Err(BeaconError::AudioFormat(format!(
                "Unsupported sample encoding {}",
                other
            ))),
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Pcm8 => 1,
            Self::Pcm16 => 2,
            Self::Float32 => 4,
        }
    }

    /// Byte pattern of a silent sample.
    pub fn silence_byte(self) -> u8 {
        match self {
            Self::Pcm8 => 0x80,
            Self::Pcm16 | Self::Float32 => 0,
        }
    }
}

/// Format of the PCM stream a beacon produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub format: SampleFormat,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            format: SampleFormat::Pcm16,
            channels: 1,
        }
    }
}

impl AudioConfig {
    pub fn new(sample_rate: u32, format: SampleFormat, channels: u16) -> Self {
        Self {
            sample_rate,
            format,
            channels,
        }
    }

    /// Builds a config from the integer triple used on the scheduling interface.
    pub fn from_raw(sample_rate: i32, format: i32, channels: i32) -> Result<Self> {
        if sample_rate <= 0 {
            return Err(BeaconError::AudioFormat(format!(
                "Sample rate must be positive, got {}",
                sample_rate
            )));
        }
        if !(1..=8).contains(&channels) {
            return Err(BeaconError::AudioFormat(format!(
                "Unsupported channel count {}",
                channels
            )));
        }
        Ok(Self::new(
            sample_rate as u32,
            SampleFormat::from_code(format)?,
            channels as u16,
        ))
    }

    pub fn frame_bytes(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }

    /// Rounds a byte count down to a whole number of frames.
    pub fn align_to_frame(&self, bytes: usize) -> usize {
        let frame = self.frame_bytes();
        bytes - bytes % frame
    }
}

/// Fills `dest` with silence for the given format.
pub fn fill_silence(dest: &mut [u8], format: SampleFormat) {
    dest.fill(format.silence_byte());
}

/// Encodes interleaved `f32` samples into little-endian PCM bytes.
///
/// Samples are clamped to `[-1.0, 1.0]`; integer formats saturate at full scale.
pub fn encode_samples(samples: &[f32], format: SampleFormat) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * format.bytes_per_sample());
    for &sample in samples {
        let sample = sample.clamp(-1.0, 1.0);
        match format {
            SampleFormat::Pcm8 => bytes.push(u8::from_sample(sample)),
            SampleFormat::Pcm16 => bytes.extend_from_slice(&i16::from_sample(sample).to_le_bytes()),
            SampleFormat::Float32 => bytes.extend_from_slice(&sample.to_le_bytes()),
        }
    }
    bytes
}

/// Decodes PCM bytes into `dest`, returning the number of samples written.
///
/// Trailing bytes that do not make up a whole sample are ignored. Does not allocate.
pub fn decode_samples(bytes: &[u8], format: SampleFormat, dest: &mut [f32]) -> usize {
    let width = format.bytes_per_sample();
    let count = (bytes.len() / width).min(dest.len());
    for (out, raw) in dest.iter_mut().zip(bytes.chunks_exact(width)) {
        *out = match format {
            SampleFormat::Pcm8 => raw[0].to_sample::<f32>(),
            SampleFormat::Pcm16 => f32::from_sample(i16::from_le_bytes([raw[0], raw[1]])),
            SampleFormat::Float32 => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        };
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_from_code() {
        assert_eq!(SampleFormat::from_code(2).unwrap(), SampleFormat::Pcm16);
        assert_eq!(SampleFormat::from_code(3).unwrap(), SampleFormat::Pcm8);
        assert_eq!(SampleFormat::from_code(4).unwrap(), SampleFormat::Float32);
        assert!(SampleFormat::from_code(13).is_err());
    }

    #[test]
    fn test_from_raw_rejects_bad_values() {
        assert!(AudioConfig::from_raw(0, 2, 1).is_err());
        assert!(AudioConfig::from_raw(22050, 2, 0).is_err());
        let config = AudioConfig::from_raw(22050, 2, 1).unwrap();
        assert_eq!(config.frame_bytes(), 2);
        assert_eq!(config.align_to_frame(7), 6);
    }

    #[test]
    fn test_pcm16_encoding_is_little_endian() {
        let bytes = encode_samples(&[1.0, -1.0, 0.0], SampleFormat::Pcm16);
        assert_eq!(bytes, vec![0xFF, 0x7F, 0x00, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_pcm8_is_offset_binary() {
        let bytes = encode_samples(&[0.0, 1.0, -1.0, 2.5], SampleFormat::Pcm8);
        assert_eq!(bytes, vec![0x80, 0xFF, 0x00, 0xFF]);

        let mut decoded = [1.0f32; 3];
        assert_eq!(decode_samples(&[0x80, 0x00, 0xC0], SampleFormat::Pcm8, &mut decoded), 3);
        assert_eq!(decoded, [0.0, -1.0, 0.5]);
    }

    #[test]
    fn test_conversions_agree_with_device_samples() {
        // Bytes written here must play back exactly as the output device would convert them
        let samples = [0.75f32, -0.5, 0.3, -0.999];
        let pcm16 = encode_samples(&samples, SampleFormat::Pcm16);
        let pcm8 = encode_samples(&samples, SampleFormat::Pcm8);
        for (i, &sample) in samples.iter().enumerate() {
            let word = i16::from_le_bytes([pcm16[2 * i], pcm16[2 * i + 1]]);
            assert_eq!(word, sample.to_sample::<i16>());
            assert_eq!(pcm8[i], sample.to_sample::<u8>());
        }

        let mut decoded = [0.0f32; 4];
        decode_samples(&pcm16, SampleFormat::Pcm16, &mut decoded);
        for (word, &value) in pcm16.chunks_exact(2).zip(decoded.iter()) {
            assert_eq!(value, f32::from_sample(i16::from_le_bytes([word[0], word[1]])));
        }
    }

    #[test]
    fn test_decode_ignores_partial_samples() {
        let mut decoded = [9.0f32; 4];
        assert_eq!(decode_samples(&[0x00, 0x40, 0x00], SampleFormat::Pcm16, &mut decoded), 1);
        assert_eq!(decoded, [0.5, 9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_decode_matches_encode_within_quantization() {
        let samples = [0.5, -0.25, 0.125];
        for format in [SampleFormat::Pcm8, SampleFormat::Pcm16, SampleFormat::Float32] {
            let bytes = encode_samples(&samples, format);
            let mut decoded = [0.0f32; 3];
            assert_eq!(decode_samples(&bytes, format, &mut decoded), 3);
            for (a, b) in samples.iter().zip(decoded.iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 0.01);
            }
        }
    }

    #[test]
    fn test_silence_bytes() {
        let mut buf = [1u8; 4];
        fill_silence(&mut buf, SampleFormat::Pcm8);
        assert_eq!(buf, [0x80; 4]);
        fill_silence(&mut buf, SampleFormat::Pcm16);
        assert_eq!(buf, [0; 4]);
    }
}
