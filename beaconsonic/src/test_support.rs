//! In-memory collaborators for unit tests.

use crate::audio_data::{AudioData, AudioDataLoader, LoadOptions};
use crate::error::{BeaconError, Result};
use crate::pcm::AudioConfig;
use crate::renderer::{BeaconSound, ChannelGroup, ChannelId, DspId, Renderer};
use crate::spatial::SpatialAttributes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Serves a short sine tone for every path, except the one it is told to fail.
#[derive(Default)]
pub struct ToneLoader {
    missing: Option<String>,
}

impl ToneLoader {
    pub fn failing(file_name: &str) -> Self {
        Self {
            missing: Some(file_name.to_string()),
        }
    }
}

impl AudioDataLoader for ToneLoader {
    fn load(&self, path: &Path, _options: &LoadOptions) -> Result<AudioData> {
        if let Some(missing) = &self.missing {
            if path.ends_with(missing) {
                return Err(BeaconError::Asset(format!("{} not found", path.display())));
            }
        }
        let samples = (0..4800)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 48000.0).sin() * 0.5)
            .collect();
        Ok(AudioData::new(samples, 48000, 1))
    }
}

struct RecordedChannel {
    sound: BeaconSound,
    group: ChannelGroup,
    paused: bool,
    muted: bool,
    dsp: Option<DspId>,
    attributes: Vec<SpatialAttributes>,
}

#[derive(Default)]
struct RecorderState {
    next_id: u64,
    channels: HashMap<ChannelId, RecordedChannel>,
    released: Vec<ChannelId>,
    detached: usize,
    fail_dsp_attach: bool,
}

/// Renderer that records every call and lets tests pull PCM by hand.
#[derive(Default)]
pub struct RecordingRenderer {
    state: Mutex<RecorderState>,
}

impl RecordingRenderer {
    fn with_channel<T>(&self, channel: ChannelId, f: impl FnOnce(&mut RecordedChannel) -> T) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        state.channels.get_mut(&channel).map(f)
    }

    pub fn fail_dsp_attach(&self, fail: bool) {
        self.state.lock().unwrap().fail_dsp_attach = fail;
    }

    pub fn live_channels(&self) -> usize {
        self.state.lock().unwrap().channels.len()
    }

    pub fn was_released(&self, channel: ChannelId) -> bool {
        self.state.lock().unwrap().released.contains(&channel)
    }

    pub fn detached_dsps(&self) -> usize {
        self.state.lock().unwrap().detached
    }

    pub fn group(&self, channel: ChannelId) -> Option<ChannelGroup> {
        self.with_channel(channel, |c| c.group)
    }

    pub fn config(&self, channel: ChannelId) -> Option<AudioConfig> {
        self.with_channel(channel, |c| c.sound.config())
    }

    pub fn is_paused(&self, channel: ChannelId) -> bool {
        self.with_channel(channel, |c| c.paused).unwrap_or(true)
    }

    pub fn is_muted(&self, channel: ChannelId) -> bool {
        self.with_channel(channel, |c| c.muted).unwrap_or(false)
    }

    pub fn has_dsp(&self, channel: ChannelId) -> bool {
        self.with_channel(channel, |c| c.dsp.is_some()).unwrap_or(false)
    }

    pub fn attribute_updates(&self, channel: ChannelId) -> usize {
        self.with_channel(channel, |c| c.attributes.len()).unwrap_or(0)
    }

    pub fn total_attribute_updates(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.channels.values().map(|c| c.attributes.len()).sum()
    }

    pub fn last_attributes(&self, channel: ChannelId) -> Option<SpatialAttributes> {
        self.with_channel(channel, |c| c.attributes.last().copied())
            .flatten()
    }

    pub fn pull(&self, channel: ChannelId, data: &mut [u8]) {
        self.with_channel(channel, |c| c.sound.read_pcm(data));
    }
}

impl Renderer for RecordingRenderer {
    fn create_channel(&self, sound: BeaconSound, group: ChannelGroup) -> Result<ChannelId> {
        let mut state = self.state.lock().unwrap();
        let id = ChannelId(state.next_id);
        state.next_id += 1;
        state.channels.insert(
            id,
            RecordedChannel {
                sound,
                group,
                paused: true,
                muted: false,
                dsp: None,
                attributes: Vec::new(),
            },
        );
        Ok(id)
    }

    fn set_paused(&self, channel: ChannelId, paused: bool) -> Result<()> {
        self.with_channel(channel, |c| c.paused = paused)
            .ok_or_else(|| BeaconError::Renderer(format!("unknown {}", channel)))
    }

    fn set_mute(&self, channel: ChannelId, mute: bool) -> Result<()> {
        self.with_channel(channel, |c| c.muted = mute)
            .ok_or_else(|| BeaconError::Renderer(format!("unknown {}", channel)))
    }

    fn attach_spatial_dsp(&self, channel: ChannelId) -> Result<DspId> {
        let mut state = self.state.lock().unwrap();
        if state.fail_dsp_attach {
            return Err(BeaconError::Renderer("DSP creation failed".to_string()));
        }
        let dsp = DspId(channel.0);
        let entry = state
            .channels
            .get_mut(&channel)
            .ok_or_else(|| BeaconError::Renderer(format!("unknown {}", channel)))?;
        entry.dsp = Some(dsp);
        Ok(dsp)
    }

    fn set_spatial_attributes(&self, dsp: DspId, attributes: &SpatialAttributes) -> Result<()> {
        self.with_channel(ChannelId(dsp.0), |c| c.attributes.push(*attributes))
            .ok_or_else(|| BeaconError::Renderer("unknown DSP".to_string()))
    }

    fn detach_spatial_dsp(&self, channel: ChannelId, _dsp: DspId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.detached += 1;
        if let Some(entry) = state.channels.get_mut(&channel) {
            entry.dsp = None;
        }
        Ok(())
    }

    fn release_channel(&self, channel: ChannelId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.channels.remove(&channel);
        state.released.push(channel);
        Ok(())
    }
}
