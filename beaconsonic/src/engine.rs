use crate::audio_data::{AudioDataLoader, SymphoniaLoader};
use crate::beacon::{BeaconContext, PositionedAudio, SourceRequest};
use crate::catalog::{BeaconCatalog, BeaconDescriptor};
use crate::config::BeaconEngineDesc;
use crate::error::{BeaconError, Result};
use crate::geometry::LocalProjection;
use crate::positioning::PositioningMode;
use crate::registry::BeaconRegistry;
use crate::renderer::Renderer;
use crate::source::{SpeechStreamWriter, speech_stream};
use crate::spatial::ListenerFix;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Latest listener fix plus the origin of the renderer's coordinate plane.
///
/// The projection origin is fixed by the first known position and never moves, so
/// positions already handed to the renderer stay consistent.
#[derive(Debug, Clone, Copy)]
pub struct ListenerState {
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
    projection: Option<LocalProjection>,
}

impl Default for ListenerState {
    fn default() -> Self {
        Self {
            latitude: f64::NAN,
            longitude: f64::NAN,
            heading: f64::NAN,
            projection: None,
        }
    }
}

impl ListenerState {
    pub fn has_position(&self) -> bool {
        !self.latitude.is_nan() && !self.longitude.is_nan()
    }

    pub fn fix(&self) -> ListenerFix {
        ListenerFix {
            latitude: self.latitude,
            longitude: self.longitude,
            heading: self.heading,
        }
    }

    pub fn projection(&self) -> Option<LocalProjection> {
        self.projection
    }

    /// Returns the projection, anchoring it at `(latitude, longitude)` if unset.
    pub fn projection_or_anchor(&mut self, latitude: f64, longitude: f64) -> Option<LocalProjection> {
        if self.projection.is_none() && !latitude.is_nan() && !longitude.is_nan() {
            log::debug!("Anchoring renderer plane at ({}, {})", latitude, longitude);
            self.projection = Some(LocalProjection::new(latitude, longitude));
        }
        self.projection
    }

    pub fn set(&mut self, latitude: f64, longitude: f64, heading: f64) {
        self.latitude = latitude;
        self.longitude = longitude;
        self.heading = heading;
        self.projection_or_anchor(latitude, longitude);
    }
}

/// Listener state shared between the engine and its beacons.
pub type SharedListener = Arc<Mutex<ListenerState>>;

pub(crate) fn lock_listener(listener: &SharedListener) -> MutexGuard<'_, ListenerState> {
    listener.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Factory and owner of the state every beacon needs.
///
/// Holds the voice catalog, the asset loader, the renderer handle, the listener
/// state and the beacon registry. Beacons are returned to the caller, who owns
/// them; dropping a beacon tears it down and deregisters it.
pub struct BeaconEngine {
    desc: Arc<BeaconEngineDesc>,
    beacon_type: String,
    catalog: BeaconCatalog,
    loader: Arc<dyn AudioDataLoader>,
    renderer: Arc<dyn Renderer>,
    registry: Arc<BeaconRegistry>,
    listener: SharedListener,
}

impl BeaconEngine {
    pub fn new(
        desc: BeaconEngineDesc,
        catalog: BeaconCatalog,
        loader: Arc<dyn AudioDataLoader>,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self> {
        desc.validate()?;
        if catalog.get(&desc.beacon_type).is_none() {
            return Err(BeaconError::Catalog(format!(
                "Beacon type '{}' is not in the catalog",
                desc.beacon_type
            )));
        }

        log::info!(
            "Beacon engine ready: {} voices, active '{}', assets in {}",
            catalog.len(),
            desc.beacon_type,
            desc.asset_root.display()
        );

        Ok(Self {
            beacon_type: desc.beacon_type.clone(),
            desc: Arc::new(desc),
            catalog,
            loader,
            renderer,
            registry: Arc::new(BeaconRegistry::new()),
            listener: Arc::new(Mutex::new(ListenerState::default())),
        })
    }

    /// Engine with the built-in catalog and the symphonia asset loader.
    pub fn with_defaults(desc: BeaconEngineDesc, renderer: Arc<dyn Renderer>) -> Result<Self> {
        Self::new(
            desc,
            BeaconCatalog::builtin(),
            Arc::new(SymphoniaLoader),
            renderer,
        )
    }

    pub fn desc(&self) -> &BeaconEngineDesc {
        &self.desc
    }

    pub fn catalog(&self) -> &BeaconCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<BeaconRegistry> {
        &self.registry
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    pub fn beacon_type(&self) -> &str {
        &self.beacon_type
    }

    /// Switches the voice used by beacons created from now on.
    pub fn set_beacon_type(&mut self, name: &str) -> Result<()> {
        if self.catalog.get(name).is_none() {
            return Err(BeaconError::Catalog(format!(
                "Beacon type '{}' is not in the catalog",
                name
            )));
        }
        log::info!("Beacon type changed: {} -> {}", self.beacon_type, name);
        self.beacon_type = name.to_string();
        Ok(())
    }

    /// Records the listener's latest location and heading. Any value may be `NaN`.
    pub fn set_listener(&self, latitude: f64, longitude: f64, heading: f64) {
        lock_listener(&self.listener).set(latitude, longitude, heading);
    }

    pub fn listener(&self) -> ListenerState {
        *lock_listener(&self.listener)
    }

    fn context(&self) -> BeaconContext {
        BeaconContext {
            desc: self.desc.clone(),
            loader: self.loader.clone(),
            renderer: self.renderer.clone(),
            listener: self.listener.clone(),
            registry: Arc::downgrade(&self.registry),
        }
    }

    fn descriptor(&self, name: &str) -> Result<Arc<BeaconDescriptor>> {
        self.catalog
            .get(name)
            .ok_or_else(|| BeaconError::Catalog(format!("Unknown beacon voice '{}'", name)))
    }

    /// A looping beacon in the active voice.
    pub fn create_beacon(&self, mode: PositioningMode, dimmable: bool) -> Result<PositionedAudio> {
        self.create_voice_beacon(mode, dimmable, &self.beacon_type)
    }

    /// A looping beacon in a specific catalog voice.
    pub fn create_voice_beacon(
        &self,
        mode: PositioningMode,
        dimmable: bool,
        voice: &str,
    ) -> Result<PositionedAudio> {
        let descriptor = self.descriptor(voice)?;
        Ok(PositionedAudio::new(
            self.context(),
            self.registry.allocate_id(),
            mode,
            dimmable,
            SourceRequest::Voice(descriptor),
        ))
    }

    /// A speech beacon fed through the returned writer.
    ///
    /// Speech is never dimmable; it is what the beacon group ducks under.
    pub fn create_speech(
        &self,
        mode: PositioningMode,
        utterance_id: impl Into<String>,
    ) -> (PositionedAudio, SpeechStreamWriter) {
        let (writer, reader) = speech_stream(self.desc.speech_buffer_bytes);
        let beacon = PositionedAudio::new(
            self.context(),
            self.registry.allocate_id(),
            mode,
            false,
            SourceRequest::Speech(reader),
        )
        .with_utterance_id(utterance_id);
        (beacon, writer)
    }

    /// A static cue read from `asset`, resolved against the asset root.
    pub fn create_earcon(
        &self,
        mode: PositioningMode,
        dimmable: bool,
        asset: impl Into<PathBuf>,
        looping: bool,
    ) -> PositionedAudio {
        PositionedAudio::new(
            self.context(),
            self.registry.allocate_id(),
            mode,
            dimmable,
            SourceRequest::Earcon {
                asset: asset.into(),
                looping,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::BeaconState;
    use crate::test_support::{RecordingRenderer, ToneLoader};

    fn engine() -> (BeaconEngine, Arc<RecordingRenderer>) {
        let renderer = Arc::new(RecordingRenderer::default());
        let engine = BeaconEngine::new(
            BeaconEngineDesc::default(),
            BeaconCatalog::builtin(),
            Arc::new(ToneLoader::default()),
            renderer.clone(),
        )
        .unwrap();
        (engine, renderer)
    }

    #[test]
    fn test_unknown_beacon_type_rejected() {
        let result = BeaconEngine::new(
            BeaconEngineDesc::default().beacon_type("Nope"),
            BeaconCatalog::builtin(),
            Arc::new(ToneLoader::default()),
            Arc::new(RecordingRenderer::default()),
        );
        assert!(matches!(result, Err(BeaconError::Catalog(_))));
    }

    #[test]
    fn test_projection_anchored_once() {
        let (engine, _) = engine();
        assert!(engine.listener().projection().is_none());

        engine.set_listener(f64::NAN, f64::NAN, 0.0);
        assert!(engine.listener().projection().is_none());

        engine.set_listener(47.6, -122.3, 10.0);
        engine.set_listener(47.7, -122.4, 20.0);
        let listener = engine.listener();
        assert_eq!(listener.projection().unwrap().origin(), (47.6, -122.3));
        assert_eq!(listener.heading, 20.0);
    }

    #[test]
    fn test_beacons_register_and_deregister() {
        let (engine, renderer) = engine();
        engine.set_listener(47.6, -122.3, 0.0);

        let mut beacon = engine
            .create_beacon(PositioningMode::localized(47.601, -122.3), true)
            .unwrap();
        assert!(engine.registry().is_empty());

        beacon.init(0.0, false, 48000, 2, 1).unwrap();
        assert_eq!(beacon.state(), BeaconState::Active);
        assert_eq!(engine.registry().ids(), vec![beacon.id()]);
        assert_eq!(renderer.live_channels(), 1);

        drop(beacon);
        assert!(engine.registry().is_empty());
        assert_eq!(renderer.live_channels(), 0);
    }

    #[test]
    fn test_set_beacon_type() {
        let (mut engine, _) = engine();
        assert!(engine.set_beacon_type("Ping").is_ok());
        assert_eq!(engine.beacon_type(), "Ping");
        assert!(engine.set_beacon_type("Missing").is_err());
        assert_eq!(engine.beacon_type(), "Ping");
    }

    #[test]
    fn test_speech_is_queued_until_data() {
        let (engine, _) = engine();
        let (mut speech, mut writer) = engine.create_speech(PositioningMode::standard(), "utt-1");
        speech.init(0.0, false, 22050, 2, 1).unwrap();
        assert_eq!(engine.registry().queued(), vec![speech.id()]);

        writer.write(&[0; 64]);
        speech.play_now().unwrap();
        assert!(engine.registry().queued().is_empty());
        assert_eq!(speech.utterance_id(), Some("utt-1"));
    }
}
