//! # BeaconSonic
//!
//! Audio beacons for location-aware navigation.
//!
//! A beacon is a looping sound anchored to a real-world point or direction. As the
//! listener moves and turns, each beacon converts the listener's fix into an angular
//! offset and a distance band, picks the pre-recorded loop that matches that offset
//! and hands the renderer the spatial attributes it needs for binaural rendering.
//!
//! ## Quick Start
//!
//! ```no_run
//! use beaconsonic::*;
//! use std::sync::Arc;
//!
//! let desc = BeaconEngineDesc::default().asset_root("assets/beacons");
//!
//! // Reference mixer and default output device
//! let (mixer, core) = Mixer::new(&desc)?;
//! let mixer = Arc::new(mixer);
//! let mut output = OutputStream::new(desc.clone())?;
//! output.start_mixer(core)?;
//!
//! let engine = BeaconEngine::with_defaults(desc, mixer.clone())?;
//! engine.set_listener(47.6205, -122.3493, 90.0);
//!
//! // A destination beacon that ducks under speech
//! let mut beacon = engine.create_beacon(PositioningMode::localized(47.6215, -122.3480), true)?;
//! beacon.init(0.0, false, 48000, 2, 1)?;
//!
//! // On every location or heading update
//! engine.set_listener(47.6206, -122.3492, 80.0);
//! beacon.refresh();
//! mixer.collect_released();
//! # Ok::<(), BeaconError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`BeaconEngine`]**: owns the catalog, loader, renderer handle and listener state; creates beacons
//! - **[`PositionedAudio`]**: one beacon's lifecycle and per-tick geometry
//! - **[`BeaconAudioSource`](source::BeaconAudioSource)**: banded loops, live speech or a static cue
//! - **[`Renderer`]**: the mixing-engine interface beacons drive
//! - **[`Mixer`]** / **[`MixerCore`]**: reference renderer with panning, attenuation and ducking
//! - **[`OutputStream`]**: cpal output device
//!
//! ## Threading
//!
//! The update thread owns the engine and the beacons. The render thread owns the
//! sounds and pulls PCM from them. The only state they share per beacon is a
//! lock-free cell holding the angular offset and proximity band.

pub mod audio_data;
pub mod beacon;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod geometry;
pub mod mixer;
pub mod output;
pub mod pcm;
pub mod positioning;
pub mod registry;
pub mod renderer;
pub mod source;
pub mod spatial;

#[cfg(test)]
mod test_support;

pub use beacon::{BeaconState, PositionedAudio, SourceRequest};
pub use catalog::{BeaconAsset, BeaconCatalog, BeaconDescriptor};
pub use config::BeaconEngineDesc;
pub use engine::{BeaconEngine, ListenerState};
pub use error::{BeaconError, Result};
pub use events::MixerEvent;
pub use mixer::{Mixer, MixerCore};
pub use output::{AudioFillCallback, OutputStream};
pub use pcm::{AudioConfig, SampleFormat};
pub use positioning::{AudioMode, AudioType, PositioningMode};
pub use registry::{BeaconId, BeaconRegistry};
pub use renderer::{BeaconSound, ChannelGroup, ChannelId, DspId, Renderer};
pub use source::{SourceMode, SpeechStreamReader, SpeechStreamWriter};
pub use spatial::SpatialAttributes;
