//! One beacon's lifecycle.
//!
//! [`PositionedAudio`] owns a beacon's positioning mode and its audio source until
//! the sound is handed to the renderer. On every location or heading tick it turns
//! the listener's fix into an angular offset and a proximity band, pushes both into
//! the source's shared cell and refreshes the renderer's spatial attributes.
//!
//! ```text
//! Created --init--> Active
//!    |                ^
//!    |  (not ready)   | play_now
//!    +------------> SourcePending
//!
//! any state --drop / failure--> Released
//! ```

use crate::audio_data::AudioDataLoader;
use crate::catalog::BeaconDescriptor;
use crate::config::BeaconEngineDesc;
use crate::engine::{SharedListener, lock_listener};
use crate::error::{BeaconError, Result};
use crate::geometry::{self, LocalProjection};
use crate::pcm::AudioConfig;
use crate::positioning::{AudioType, PositioningMode};
use crate::registry::{BeaconId, BeaconRegistry};
use crate::renderer::{ChannelGroup, ChannelId, DspId, Renderer};
use crate::source::{
    BeaconAudioSource, BeaconBufferGroup, EarconSource, SourceGeometry, SourceMode,
    SpeechStreamReader, StreamingSource,
};
use crate::spatial::{ListenerFix, compute_attributes};
use std::path::PathBuf;
use std::sync::{Arc, Weak};

/// Lifecycle of a [`PositionedAudio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeaconState {
    /// Constructed, `init` not called yet.
    Created,
    /// Source exists but is not ready; waiting for `play_now`.
    SourcePending,
    /// Sound is playing on a renderer channel.
    Active,
    /// Torn down; every renderer handle has been released.
    Released,
}

/// Which source variant `init` should build.
pub enum SourceRequest {
    /// Heading-banded loops of a catalog voice.
    Voice(Arc<BeaconDescriptor>),
    /// Live bytes from a speech stream.
    Speech(SpeechStreamReader),
    /// A single cue file, relative to the asset root.
    Earcon { asset: PathBuf, looping: bool },
}

/// Collaborators handed to every beacon by its engine.
pub(crate) struct BeaconContext {
    pub(crate) desc: Arc<BeaconEngineDesc>,
    pub(crate) loader: Arc<dyn AudioDataLoader>,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) listener: SharedListener,
    pub(crate) registry: Weak<BeaconRegistry>,
}

/// A sound anchored to a point or a direction.
pub struct PositionedAudio {
    id: BeaconId,
    mode: PositioningMode,
    dimmable: bool,
    utterance_id: Option<String>,
    state: BeaconState,
    request: Option<SourceRequest>,
    source: Option<BeaconAudioSource>,
    geometry: Option<Arc<SourceGeometry>>,
    channel: Option<ChannelId>,
    dsp: Option<DspId>,
    muted: bool,
    beacon_position: (f64, f64),
    context: BeaconContext,
}

impl PositionedAudio {
    pub(crate) fn new(
        context: BeaconContext,
        id: BeaconId,
        mode: PositioningMode,
        dimmable: bool,
        request: SourceRequest,
    ) -> Self {
        Self {
            id,
            mode,
            dimmable,
            utterance_id: None,
            state: BeaconState::Created,
            request: Some(request),
            source: None,
            geometry: None,
            channel: None,
            dsp: None,
            muted: false,
            beacon_position: (mode.latitude, mode.longitude),
            context,
        }
    }

    pub(crate) fn with_utterance_id(mut self, utterance_id: impl Into<String>) -> Self {
        self.utterance_id = Some(utterance_id.into());
        self
    }

    pub fn id(&self) -> BeaconId {
        self.id
    }

    pub fn mode(&self) -> &PositioningMode {
        &self.mode
    }

    pub fn is_dimmable(&self) -> bool {
        self.dimmable
    }

    pub fn utterance_id(&self) -> Option<&str> {
        self.utterance_id.as_deref()
    }

    pub fn state(&self) -> BeaconState {
        self.state
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Offset last pushed to the source, once it exists.
    pub fn degrees_off_axis(&self) -> Option<f64> {
        self.geometry.as_ref().map(|g| g.degrees_off_axis())
    }

    /// Proximity band last pushed to the source, once it exists.
    pub fn source_mode(&self) -> Option<SourceMode> {
        self.geometry.as_ref().map(|g| g.mode())
    }

    /// True once the source has run out of audio.
    pub fn is_eof(&self) -> bool {
        self.geometry.as_ref().is_some_and(|g| g.is_eof())
    }

    /// Creates the audio source and, if it can play right away, the sound.
    ///
    /// `format` is a platform encoding code (2 = PCM16, 3 = PCM8, 4 = float).
    /// A failure leaves the beacon released and unregistered.
    pub fn init(
        &mut self,
        degrees_off_axis: f64,
        proximity: bool,
        sample_rate: i32,
        format: i32,
        channels: i32,
    ) -> Result<()> {
        if self.state != BeaconState::Created {
            return Err(BeaconError::InvalidState(format!(
                "{} cannot init from {:?}",
                self.id, self.state
            )));
        }

        let result = AudioConfig::from_raw(sample_rate, format, channels)
            .and_then(|config| self.create_source(degrees_off_axis, proximity, config));

        let ready = match result {
            Ok(ready) => ready,
            Err(e) => {
                log::warn!("{} failed to create its source: {}", self.id, e);
                self.release();
                return Err(e);
            }
        };

        if ready {
            if let Err(e) = self.start_sound() {
                log::warn!("{} failed to start: {}", self.id, e);
                self.release();
                return Err(e);
            }
        } else {
            self.state = BeaconState::SourcePending;
        }

        if let Some(registry) = self.context.registry.upgrade() {
            registry.add(self.id, !ready);
        }
        log::info!(
            "{} initialised ({:?}, {:?})",
            self.id,
            self.mode.audio_type,
            self.state
        );
        Ok(())
    }

    /// Starts a beacon whose source was not ready at `init`.
    pub fn play_now(&mut self) -> Result<()> {
        match self.state {
            BeaconState::SourcePending => {}
            BeaconState::Active => return Ok(()),
            state => {
                return Err(BeaconError::InvalidState(format!(
                    "{} cannot play from {:?}",
                    self.id, state
                )));
            }
        }

        if let Err(e) = self.start_sound() {
            log::warn!("{} failed to start: {}", self.id, e);
            self.release();
            return Err(e);
        }
        if let Some(registry) = self.context.registry.upgrade() {
            registry.mark_playing(self.id);
        }
        log::info!("{} playing", self.id);
        Ok(())
    }

    /// Offset of the beacon's fixed point from `heading`, in `(-180, 180]`.
    ///
    /// `latitude`/`longitude` are the listener's. `NaN` when the mode has no coordinates.
    pub fn heading_offset(&self, heading: f64, latitude: f64, longitude: f64) -> f64 {
        geometry::heading_offset(
            heading,
            latitude,
            longitude,
            self.mode.latitude,
            self.mode.longitude,
        )
    }

    /// Per-tick update from a listener fix.
    ///
    /// `latitude`/`longitude` are the beacon's current point and may be `NaN`, in
    /// which case the mode's own coordinates are used. Nothing here fails: unknown
    /// values fall back to fixed offsets.
    pub fn update_geometry(
        &mut self,
        listener_latitude: f64,
        listener_longitude: f64,
        heading: f64,
        latitude: f64,
        longitude: f64,
        proximity_near: f64,
    ) {
        if self.state == BeaconState::Released {
            return;
        }

        let beacon = if latitude.is_nan() || longitude.is_nan() {
            (self.mode.latitude, self.mode.longitude)
        } else {
            (latitude, longitude)
        };
        self.beacon_position = beacon;

        let band = if self.mode.is_proximity() {
            let d = geometry::distance(listener_latitude, listener_longitude, beacon.0, beacon.1);
            SourceMode::classify(d, proximity_near)
        } else {
            SourceMode::Direction
        };

        let offset = if heading.is_nan() {
            self.fallback_offset()
        } else {
            self.offset_towards(heading, listener_latitude, listener_longitude, beacon)
        };

        // A pending source is still ours; once playing only the shared cell is reachable
        match (&self.source, &self.geometry) {
            (Some(source), _) => source.update_geometry(offset, band),
            (None, Some(geometry)) => geometry.update(offset, band),
            (None, None) => {}
        }

        let fix = ListenerFix {
            latitude: listener_latitude,
            longitude: listener_longitude,
            heading,
        };
        let projection = lock_listener(&self.context.listener)
            .projection_or_anchor(listener_latitude, listener_longitude);
        self.push_spatial_attributes(&fix, projection);
    }

    /// Updates from the engine's current listener state.
    pub fn refresh(&mut self) {
        let listener = *lock_listener(&self.context.listener);
        let (latitude, longitude) = self.beacon_position;
        let proximity_near = self.context.desc.proximity_near;
        self.update_geometry(
            listener.latitude,
            listener.longitude,
            listener.heading,
            latitude,
            longitude,
            proximity_near,
        );
    }

    /// Mutes or unmutes the channel; remembered if the channel does not exist yet.
    pub fn mute(&mut self, mute: bool) -> Result<()> {
        self.muted = mute;
        match self.channel {
            Some(channel) => self.context.renderer.set_mute(channel, mute),
            None => Ok(()),
        }
    }

    /// Changes the byte format of a source that has no sound yet.
    ///
    /// Once the sound exists its format is fixed and the call is ignored.
    pub fn update_audio_config(
        &mut self,
        sample_rate: i32,
        format: i32,
        channels: i32,
    ) -> Result<()> {
        let config = AudioConfig::from_raw(sample_rate, format, channels)?;
        match self.state {
            BeaconState::SourcePending => {
                if let Some(source) = self.source.as_mut() {
                    if !source.set_config(config) {
                        log::warn!(
                            "{} source {:?} has a fixed format",
                            self.id,
                            source.kind()
                        );
                    }
                }
                Ok(())
            }
            BeaconState::Active => {
                log::warn!(
                    "{} ignoring audio config change after its sound was created",
                    self.id
                );
                Ok(())
            }
            state => Err(BeaconError::InvalidState(format!(
                "{} cannot change audio config in {:?}",
                self.id, state
            ))),
        }
    }

    fn fallback_offset(&self) -> f64 {
        // Dimmable beacons sound from behind when orientation is unknown
        if self.dimmable { 180.0 } else { 0.0 }
    }

    fn offset_towards(
        &self,
        heading: f64,
        listener_latitude: f64,
        listener_longitude: f64,
        beacon: (f64, f64),
    ) -> f64 {
        let offset = geometry::heading_offset(
            heading,
            listener_latitude,
            listener_longitude,
            beacon.0,
            beacon.1,
        );
        if !offset.is_nan() {
            return offset;
        }

        match self.mode.audio_type {
            AudioType::Relative if !self.mode.heading.is_nan() => {
                geometry::normalize_offset(geometry::wrap_degrees(self.mode.heading))
            }
            AudioType::Compass if !self.mode.heading.is_nan() => geometry::normalize_offset(
                geometry::wrap_degrees(self.mode.heading) - geometry::wrap_degrees(heading),
            ),
            _ => self.fallback_offset(),
        }
    }

    /// Returns whether the source can play immediately.
    fn create_source(
        &mut self,
        degrees_off_axis: f64,
        proximity: bool,
        config: AudioConfig,
    ) -> Result<bool> {
        let request = self.request.take().ok_or_else(|| {
            BeaconError::InvalidState(format!("{} has no source request", self.id))
        })?;
        let geometry = Arc::new(SourceGeometry::new(degrees_off_axis));
        let desc = &self.context.desc;

        let source = match request {
            SourceRequest::Voice(descriptor) => {
                BeaconAudioSource::BufferGroup(BeaconBufferGroup::load(
                    descriptor,
                    proximity,
                    self.context.loader.as_ref(),
                    &desc.asset_root,
                    config,
                    geometry.clone(),
                )?)
            }
            SourceRequest::Speech(reader) => BeaconAudioSource::Streaming(StreamingSource::new(
                reader,
                config,
                geometry.clone(),
                desc.starvation_threshold,
            )),
            SourceRequest::Earcon { asset, looping } => {
                BeaconAudioSource::Earcon(EarconSource::load(
                    &desc.asset_root.join(asset),
                    self.context.loader.as_ref(),
                    config,
                    geometry.clone(),
                    looping,
                )?)
            }
        };

        log::debug!(
            "{} created {:?} source at {} Hz",
            self.id,
            source.kind(),
            config.sample_rate
        );

        let ready = source.is_ready();
        self.geometry = Some(geometry);
        self.source = Some(source);
        Ok(ready)
    }

    /// Hands the source to the renderer and starts the channel.
    fn start_sound(&mut self) -> Result<()> {
        let source = self.source.take().ok_or_else(|| {
            BeaconError::InvalidState(format!("{} has no source to play", self.id))
        })?;
        let renderer = self.context.renderer.clone();
        let desc = self.context.desc.clone();

        let sound = source.create_sound(desc.min_distance, desc.max_distance);
        let group = if self.dimmable {
            ChannelGroup::Beacon
        } else {
            ChannelGroup::Speech
        };
        let channel = renderer.create_channel(sound, group)?;
        self.channel = Some(channel);

        if self.muted {
            renderer.set_mute(channel, true)?;
        }

        if self.mode.is_spatial() {
            self.dsp = Some(renderer.attach_spatial_dsp(channel)?);
            let listener = *lock_listener(&self.context.listener);
            self.push_spatial_attributes(&listener.fix(), listener.projection());
        }

        renderer.set_paused(channel, false)?;
        self.state = BeaconState::Active;
        Ok(())
    }

    fn push_spatial_attributes(&self, fix: &ListenerFix, projection: Option<LocalProjection>) {
        let (Some(dsp), Some(projection)) = (self.dsp, projection) else {
            return;
        };
        let Some(attributes) = compute_attributes(
            &self.mode,
            &projection,
            fix,
            self.beacon_position,
            self.context.desc.compass_distance,
        ) else {
            return;
        };
        if let Err(e) = self.context.renderer.set_spatial_attributes(dsp, &attributes) {
            log::warn!("{} spatial update failed: {}", self.id, e);
        }
    }

    /// Detaches the DSP, releases the channel and deregisters. Safe to repeat.
    fn release(&mut self) {
        let renderer = self.context.renderer.clone();

        if let (Some(channel), Some(dsp)) = (self.channel, self.dsp.take()) {
            if let Err(e) = renderer.detach_spatial_dsp(channel, dsp) {
                log::warn!("{} failed to detach DSP: {}", self.id, e);
            }
        }
        if let Some(channel) = self.channel.take() {
            if let Err(e) = renderer.release_channel(channel) {
                log::warn!("{} failed to release {}: {}", self.id, channel, e);
            }
        }
        self.source = None;
        self.request = None;

        if let Some(registry) = self.context.registry.upgrade() {
            registry.remove(self.id);
        }
        if self.state != BeaconState::Released {
            log::debug!("{} released from {:?}", self.id, self.state);
        }
        self.state = BeaconState::Released;
    }
}

impl Drop for PositionedAudio {
    fn drop(&mut self) {
        self.release();
    }
}
