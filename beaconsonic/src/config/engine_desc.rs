use crate::error::{BeaconError, Result};
use std::path::PathBuf;

/// Configuration descriptor for a beacon engine
#[derive(Debug, Clone)]
pub struct BeaconEngineDesc {
    /// Output sample rate of the mixer
    pub sample_rate: u32,
    /// Number of frames the mixer renders per block
    pub block_size: usize,
    /// Output channel count (typically 2 for stereo)
    pub channels: u16,
    /// Distance in meters up to which a beacon plays at full volume
    pub min_distance: f32,
    /// Distance in meters past which a beacon gets no quieter
    pub max_distance: f32,
    /// Near threshold for proximity beacons, in meters
    pub proximity_near: f64,
    /// How far ahead compass beacons are projected, in meters
    pub compass_distance: f64,
    /// Consecutive empty speech reads tolerated before end of stream
    pub starvation_threshold: u32,
    /// Gain applied to the beacon group while speech plays
    pub duck_gain: f32,
    /// Capacity of a speech stream ring in bytes
    pub speech_buffer_bytes: usize,
    /// Directory beacon asset filenames are resolved against
    pub asset_root: PathBuf,
    /// Catalog voice used for new beacons
    pub beacon_type: String,
}

impl Default for BeaconEngineDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            channels: 2,
            min_distance: 10.0,
            max_distance: 20.0,
            proximity_near: 20.0,
            compass_distance: 100.0,
            starvation_threshold: 20,
            duck_gain: 0.3,
            speech_buffer_bytes: 256 * 1024,
            asset_root: PathBuf::from("assets"),
            beacon_type: "Current".to_string(),
        }
    }
}

impl BeaconEngineDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn distance_range(mut self, min_distance: f32, max_distance: f32) -> Self {
        self.min_distance = min_distance;
        self.max_distance = max_distance;
        self
    }

    pub fn proximity_near(mut self, meters: f64) -> Self {
        self.proximity_near = meters;
        self
    }

    pub fn compass_distance(mut self, meters: f64) -> Self {
        self.compass_distance = meters;
        self
    }

    pub fn starvation_threshold(mut self, reads: u32) -> Self {
        self.starvation_threshold = reads;
        self
    }

    pub fn duck_gain(mut self, gain: f32) -> Self {
        self.duck_gain = gain;
        self
    }

    pub fn speech_buffer_bytes(mut self, bytes: usize) -> Self {
        self.speech_buffer_bytes = bytes;
        self
    }

    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn beacon_type(mut self, name: impl Into<String>) -> Self {
        self.beacon_type = name.into();
        self
    }

    /// Rejects values the mixer or the geometry code cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(BeaconError::Configuration(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(BeaconError::Configuration(
                "Block size must be greater than 0".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(BeaconError::Configuration(
                "Channel count must be greater than 0".to_string(),
            ));
        }
        if !(self.min_distance > 0.0 && self.max_distance >= self.min_distance) {
            return Err(BeaconError::Configuration(format!(
                "Invalid distance range {}..{}",
                self.min_distance, self.max_distance
            )));
        }
        if !(0.0..=1.0).contains(&self.duck_gain) {
            return Err(BeaconError::Configuration(format!(
                "Duck gain {} outside 0..=1",
                self.duck_gain
            )));
        }
        if self.speech_buffer_bytes == 0 {
            return Err(BeaconError::Configuration(
                "Speech buffer must hold at least one byte".to_string(),
            ));
        }
        Ok(())
    }
}
