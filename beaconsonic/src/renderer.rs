//! The mixing-engine collaborator.
//!
//! Beacons never mix audio themselves. They hand a [`BeaconSound`] to a
//! [`Renderer`], which owns it from then on and pulls PCM from it on its own
//! render thread. All other calls are control operations made from the update
//! thread.

use crate::error::Result;
use crate::pcm::AudioConfig;
use crate::source::{BeaconAudioSource, PcmStatus, SourceGeometry, SourceKind};
use crate::spatial::SpatialAttributes;
use std::sync::Arc;

/// Handle to a channel created by a renderer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

/// Handle to a spatial DSP node attached to a channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DspId(pub u64);

/// Mix group a channel plays in. Beacons duck while speech is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelGroup {
    Beacon,
    Speech,
}

/// A beacon source prepared for the renderer.
///
/// Carries the 3D attenuation range: full volume up to `min_distance`, no further
/// attenuation past `max_distance`.
pub struct BeaconSound {
    source: BeaconAudioSource,
    config: AudioConfig,
    min_distance: f32,
    max_distance: f32,
}

impl BeaconSound {
    pub(crate) fn new(source: BeaconAudioSource, min_distance: f32, max_distance: f32) -> Self {
        let config = source.config();
        Self {
            source,
            config,
            min_distance,
            max_distance: max_distance.max(min_distance),
        }
    }

    pub fn config(&self) -> AudioConfig {
        self.config
    }

    pub fn min_distance(&self) -> f32 {
        self.min_distance
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn is_looping(&self) -> bool {
        self.source.is_looping()
    }

    pub fn geometry(&self) -> &Arc<SourceGeometry> {
        self.source.geometry()
    }

    /// PCM pull, in the byte layout of [`config`](Self::config).
    pub fn read_pcm(&mut self, data: &mut [u8]) -> PcmStatus {
        self.source.read_pcm(data)
    }
}

/// Control interface of a mixing engine.
///
/// Channels are created paused. Errors are reported to the caller, which logs them;
/// they never reach the render thread.
pub trait Renderer: Send + Sync {
    /// Takes ownership of `sound` and creates a paused channel playing it.
    fn create_channel(&self, sound: BeaconSound, group: ChannelGroup) -> Result<ChannelId>;

    fn set_paused(&self, channel: ChannelId, paused: bool) -> Result<()>;

    fn set_mute(&self, channel: ChannelId, mute: bool) -> Result<()>;

    /// Adds a spatial DSP node at the tail of the channel's chain.
    fn attach_spatial_dsp(&self, channel: ChannelId) -> Result<DspId>;

    fn set_spatial_attributes(&self, dsp: DspId, attributes: &SpatialAttributes) -> Result<()>;

    fn detach_spatial_dsp(&self, channel: ChannelId, dsp: DspId) -> Result<()>;

    /// Stops the channel and frees its sound once the render thread is done with it.
    fn release_channel(&self, channel: ChannelId) -> Result<()>;
}
