use crate::audio_data::{AudioDataLoader, LoadOptions};
use crate::error::Result;
use crate::pcm::{AudioConfig, fill_silence};
use crate::source::{BeaconBuffer, PcmStatus, SourceGeometry};
use std::path::Path;
use std::sync::Arc;

/// A non-directional cue backed by a single buffer.
///
/// Geometry updates are accepted but never change what plays. By default the cue
/// plays once and then reports end of stream.
pub struct EarconSource {
    buffer: BeaconBuffer,
    config: AudioConfig,
    geometry: Arc<SourceGeometry>,
    looping: bool,
    position: usize,
}

impl EarconSource {
    pub fn new(
        buffer: BeaconBuffer,
        config: AudioConfig,
        geometry: Arc<SourceGeometry>,
        looping: bool,
    ) -> Self {
        Self {
            buffer,
            config,
            geometry,
            looping,
            position: 0,
        }
    }

    pub fn load(
        path: &Path,
        loader: &dyn AudioDataLoader,
        config: AudioConfig,
        geometry: Arc<SourceGeometry>,
        looping: bool,
    ) -> Result<Self> {
        let options = LoadOptions::new().target_sample_rate(config.sample_rate);
        let audio = loader.load(path, &options)?;
        let name = path.display().to_string();
        let buffer = BeaconBuffer::from_audio(name, &audio, 180.0, &config)?;
        Ok(Self::new(buffer, config, geometry, looping))
    }

    pub fn geometry(&self) -> &Arc<SourceGeometry> {
        &self.geometry
    }

    pub fn config(&self) -> AudioConfig {
        self.config
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn read_pcm(&mut self, data: &mut [u8]) -> PcmStatus {
        if self.looping {
            self.buffer.read(data, self.position);
            self.position = (self.position + data.len()) % self.buffer.len();
            return PcmStatus::Ok;
        }

        let remaining = self.buffer.len().saturating_sub(self.position);
        if remaining == 0 {
            fill_silence(data, self.config.format);
            return PcmStatus::EndOfStream;
        }

        let count = remaining.min(data.len());
        self.buffer.read(&mut data[..count], self.position);
        fill_silence(&mut data[count..], self.config.format);
        self.position += count;
        PcmStatus::Ok
    }
}
