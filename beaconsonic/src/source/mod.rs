//! Beacon audio sources.
//!
//! A source produces the PCM bytes for one beacon. There are three kinds, kept in the
//! closed [`BeaconAudioSource`] enum:
//!
//! - [`BeaconBufferGroup`]: heading-banded pre-recorded loops
//! - [`StreamingSource`]: live bytes from a speech transport
//! - [`EarconSource`]: one fixed buffer, ignoring geometry
//!
//! # Threading
//!
//! Once its sound is created a source is owned by the renderer and read on the
//! render thread. The update thread only reaches it through the shared
//! [`SourceGeometry`] cell, which is lock-free.

mod buffer;
mod buffer_group;
mod earcon;
mod streaming;

pub use buffer::BeaconBuffer;
pub use buffer_group::{BeaconBufferGroup, select_buffer};
pub use earcon::EarconSource;
pub use streaming::{SpeechStreamReader, SpeechStreamWriter, StreamingSource, speech_stream};

use crate::pcm::AudioConfig;
use crate::renderer::BeaconSound;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

/// Distance band a proximity beacon is currently in.
///
/// Non-proximity beacons always stay in `Direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SourceMode {
    #[default]
    Direction = 0,
    Near = 1,
    Far = 2,
    TooFar = 3,
}

impl SourceMode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Near,
            2 => Self::Far,
            3 => Self::TooFar,
            _ => Self::Direction,
        }
    }

    /// Classifies a listener-to-beacon distance against the near threshold.
    ///
    /// Unknown (`NaN`) distances or thresholds leave the beacon in `Direction`. Any
    /// other pair falls in exactly one band, so a zero or negative threshold puts
    /// every distance in `TooFar`.
    pub fn classify(distance: f64, proximity_near: f64) -> Self {
        if distance.is_nan() || proximity_near.is_nan() {
            Self::Direction
        } else if distance < proximity_near {
            Self::Near
        } else if distance < 2.0 * proximity_near {
            Self::Far
        } else {
            Self::TooFar
        }
    }
}

/// Result of one PCM pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmStatus {
    /// The whole request was filled (possibly with silence).
    Ok,
    /// The source has nothing more to play; the request holds silence.
    EndOfStream,
}

/// State shared between the update thread and the render thread.
///
/// `degrees_off_axis` is an `f64` stored as bits; the proximity band is a separate
/// atomic byte. Readers load each once per PCM pull.
#[derive(Debug)]
pub struct SourceGeometry {
    degrees_off_axis: AtomicU64,
    mode: AtomicU8,
    eof: AtomicBool,
}

impl SourceGeometry {
    pub fn new(degrees_off_axis: f64) -> Self {
        Self {
            degrees_off_axis: AtomicU64::new(degrees_off_axis.to_bits()),
            mode: AtomicU8::new(SourceMode::Direction as u8),
            eof: AtomicBool::new(false),
        }
    }

    pub fn update(&self, degrees_off_axis: f64, mode: SourceMode) {
        self.degrees_off_axis
            .store(degrees_off_axis.to_bits(), Ordering::Release);
        self.mode.store(mode as u8, Ordering::Release);
    }

    pub fn degrees_off_axis(&self) -> f64 {
        f64::from_bits(self.degrees_off_axis.load(Ordering::Acquire))
    }

    pub fn mode(&self) -> SourceMode {
        SourceMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub(crate) fn mark_eof(&self) {
        self.eof.store(true, Ordering::Release);
    }

    pub fn is_eof(&self) -> bool {
        self.eof.load(Ordering::Acquire)
    }
}

/// Which variant a source is, for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    BufferGroup,
    Streaming,
    Earcon,
}

/// One beacon's audio source.
pub enum BeaconAudioSource {
    BufferGroup(BeaconBufferGroup),
    Streaming(StreamingSource),
    Earcon(EarconSource),
}

impl BeaconAudioSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::BufferGroup(_) => SourceKind::BufferGroup,
            Self::Streaming(_) => SourceKind::Streaming,
            Self::Earcon(_) => SourceKind::Earcon,
        }
    }

    pub fn geometry(&self) -> &Arc<SourceGeometry> {
        match self {
            Self::BufferGroup(source) => source.geometry(),
            Self::Streaming(source) => source.geometry(),
            Self::Earcon(source) => source.geometry(),
        }
    }

    pub fn config(&self) -> AudioConfig {
        match self {
            Self::BufferGroup(source) => source.config(),
            Self::Streaming(source) => source.config(),
            Self::Earcon(source) => source.config(),
        }
    }

    /// Whether the source can produce sound right away.
    ///
    /// Only a speech stream that has not received its first bytes is not ready.
    pub fn is_ready(&self) -> bool {
        match self {
            Self::Streaming(source) => source.is_ready(),
            Self::BufferGroup(_) | Self::Earcon(_) => true,
        }
    }

    /// Whether the sound should loop on the renderer side.
    pub fn is_looping(&self) -> bool {
        match self {
            Self::BufferGroup(_) => true,
            Self::Streaming(_) => false,
            Self::Earcon(source) => source.is_looping(),
        }
    }

    /// Replaces the byte format of a source whose format is not baked into its
    /// buffers. Returns false for sources that cannot change format.
    pub fn set_config(&mut self, config: AudioConfig) -> bool {
        match self {
            Self::Streaming(source) => {
                source.set_config(config);
                true
            }
            Self::BufferGroup(_) | Self::Earcon(_) => false,
        }
    }

    /// Records the latest angular offset and proximity band.
    pub fn update_geometry(&self, degrees_off_axis: f64, mode: SourceMode) {
        self.geometry().update(degrees_off_axis, mode);
    }

    /// Fills `data` with PCM in the source's [`AudioConfig`].
    ///
    /// Called on the render thread. Never blocks and never allocates.
    pub fn read_pcm(&mut self, data: &mut [u8]) -> PcmStatus {
        let status = match self {
            Self::BufferGroup(source) => source.read_pcm(data),
            Self::Streaming(source) => source.read_pcm(data),
            Self::Earcon(source) => source.read_pcm(data),
        };
        if status == PcmStatus::EndOfStream {
            self.geometry().mark_eof();
        }
        status
    }

    /// Turns the source into the sound handed to the renderer.
    ///
    /// Consuming `self` means a source can only ever back one sound.
    pub fn create_sound(self, min_distance: f32, max_distance: f32) -> BeaconSound {
        BeaconSound::new(self, min_distance, max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bands() {
        assert_eq!(SourceMode::classify(15.0, 20.0), SourceMode::Near);
        assert_eq!(SourceMode::classify(20.0, 20.0), SourceMode::Far);
        assert_eq!(SourceMode::classify(35.0, 20.0), SourceMode::Far);
        assert_eq!(SourceMode::classify(40.0, 20.0), SourceMode::TooFar);
        assert_eq!(SourceMode::classify(45.0, 20.0), SourceMode::TooFar);
        assert_eq!(SourceMode::classify(f64::NAN, 20.0), SourceMode::Direction);
        assert_eq!(SourceMode::classify(20.0, f64::NAN), SourceMode::Direction);
    }

    #[test]
    fn test_classify_degenerate_threshold() {
        assert_eq!(SourceMode::classify(5.0, 0.0), SourceMode::TooFar);
        assert_eq!(SourceMode::classify(0.0, 0.0), SourceMode::TooFar);
        assert_eq!(SourceMode::classify(5.0, -10.0), SourceMode::TooFar);
        assert_eq!(SourceMode::classify(f64::INFINITY, 20.0), SourceMode::TooFar);
        assert_eq!(SourceMode::classify(0.0, 20.0), SourceMode::Near);
    }

    #[test]
    fn test_geometry_cell() {
        let geometry = SourceGeometry::new(12.5);
        assert_eq!(geometry.degrees_off_axis(), 12.5);
        assert_eq!(geometry.mode(), SourceMode::Direction);

        geometry.update(-170.0, SourceMode::Far);
        assert_eq!(geometry.degrees_off_axis(), -170.0);
        assert_eq!(geometry.mode(), SourceMode::Far);

        assert!(!geometry.is_eof());
        geometry.mark_eof();
        assert!(geometry.is_eof());
    }

    #[test]
    fn test_update_geometry_reaches_shared_cell() {
        use crate::catalog::{BeaconAsset, BeaconDescriptor};
        use crate::pcm::SampleFormat;

        let geometry = Arc::new(SourceGeometry::new(0.0));
        let group = BeaconBufferGroup::new(
            Arc::new(BeaconDescriptor::new(
                "Test",
                2,
                vec![BeaconAsset::new("a.wav", 180.0)],
            )),
            [
                vec![BeaconBuffer::new("a.wav", vec![1; 4], 180.0).unwrap()],
                vec![],
                vec![],
                vec![],
            ],
            AudioConfig::new(48000, SampleFormat::Pcm8, 1),
            geometry.clone(),
        );
        let source = BeaconAudioSource::BufferGroup(group);

        source.update_geometry(-95.0, SourceMode::Far);
        assert_eq!(geometry.degrees_off_axis(), -95.0);
        assert_eq!(geometry.mode(), SourceMode::Far);
        assert!(Arc::ptr_eq(source.geometry(), &geometry));
    }

    #[test]
    fn test_geometry_cell_across_threads() {
        let geometry = Arc::new(SourceGeometry::new(0.0));
        let writer = {
            let geometry = geometry.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    geometry.update(i as f64 % 360.0 - 180.0, SourceMode::Near);
                }
            })
        };
        for _ in 0..1000 {
            let degrees = geometry.degrees_off_axis();
            assert!((-180.0..=180.0).contains(&degrees));
        }
        writer.join().unwrap();
        assert_eq!(geometry.mode(), SourceMode::Near);
    }
}
