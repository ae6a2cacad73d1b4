use crate::audio_data::AudioData;
use crate::error::{BeaconError, Result};
use crate::pcm::{AudioConfig, encode_samples};

/// One looped PCM block, valid within `max_angle` degrees either side of the beacon.
///
/// The bytes are immutable once built and always hold a whole number of frames.
#[derive(Debug, Clone)]
pub struct BeaconBuffer {
    name: String,
    max_angle: f64,
    data: Box<[u8]>,
}

impl BeaconBuffer {
    pub fn new(name: impl Into<String>, data: Vec<u8>, max_angle: f64) -> Result<Self> {
        let name = name.into();
        if data.is_empty() {
            return Err(BeaconError::Asset(format!("Beacon buffer '{}' is empty", name)));
        }
        Ok(Self {
            name,
            max_angle,
            data: data.into_boxed_slice(),
        })
    }

    /// Converts decoded audio into the byte layout described by `config`.
    pub fn from_audio(
        name: impl Into<String>,
        audio: &AudioData,
        max_angle: f64,
        config: &AudioConfig,
    ) -> Result<Self> {
        let prepared = audio
            .to_mono()
            .resample(config.sample_rate)?
            .expand_channels(config.channels);
        let mut bytes = encode_samples(prepared.samples(), config.format);
        bytes.truncate(config.align_to_frame(bytes.len()));
        Self::new(name, bytes, max_angle)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_angle(&self) -> f64 {
        self.max_angle
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if this buffer covers `degrees_off_axis`.
    pub fn check_is_active(&self, degrees_off_axis: f64) -> bool {
        degrees_off_axis.abs() <= self.max_angle
    }

    /// Copies `dest.len()` bytes starting at `position`, wrapping to the start of the
    /// buffer as often as needed. Returns the number of bytes written.
    pub fn read(&self, dest: &mut [u8], position: usize) -> usize {
        let size = self.data.len();
        let mut pos = position % size;
        let mut written = 0;

        while written < dest.len() {
            let chunk = (size - pos).min(dest.len() - written);
            dest[written..written + chunk].copy_from_slice(&self.data[pos..pos + chunk]);
            written += chunk;
            pos = (pos + chunk) % size;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::SampleFormat;

    fn ramp(len: usize) -> BeaconBuffer {
        BeaconBuffer::new("ramp", (0..len).map(|i| i as u8).collect(), 30.0).unwrap()
    }

    #[test]
    fn test_check_is_active() {
        let buffer = ramp(4);
        assert!(buffer.check_is_active(0.0));
        assert!(buffer.check_is_active(30.0));
        assert!(buffer.check_is_active(-30.0));
        assert!(!buffer.check_is_active(30.1));
        assert!(!buffer.check_is_active(f64::NAN));
    }

    #[test]
    fn test_read_wraps() {
        let buffer = ramp(5);
        let mut dest = [0u8; 7];
        assert_eq!(buffer.read(&mut dest, 3), 7);
        assert_eq!(dest, [3, 4, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_read_longer_than_buffer() {
        let buffer = ramp(3);
        let mut dest = [0u8; 8];
        buffer.read(&mut dest, 0);
        assert_eq!(dest, [0, 1, 2, 0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_split_reads_match_single_read() {
        let buffer = ramp(11);
        for start in 0..11 {
            for n in 1..15 {
                let mut whole = vec![0u8; 2 * n];
                buffer.read(&mut whole, start);

                let mut first = vec![0u8; n];
                let mut second = vec![0u8; n];
                buffer.read(&mut first, start);
                buffer.read(&mut second, (start + n) % buffer.len());

                assert_eq!(&whole[..n], &first[..]);
                assert_eq!(&whole[n..], &second[..]);
            }
        }
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        assert!(BeaconBuffer::new("empty", Vec::new(), 180.0).is_err());
    }

    #[test]
    fn test_from_audio_is_frame_aligned() {
        let audio = AudioData::new(vec![0.5; 101], 48000, 1);
        let config = AudioConfig::new(48000, SampleFormat::Pcm16, 2);
        let buffer = BeaconBuffer::from_audio("tone", &audio, 180.0, &config).unwrap();
        assert_eq!(buffer.len(), 101 * 4);
        assert_eq!(buffer.len() % config.frame_bytes(), 0);
    }
}
