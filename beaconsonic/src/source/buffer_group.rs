use crate::audio_data::{AudioDataLoader, LoadOptions};
use crate::catalog::{BeaconAsset, BeaconDescriptor};
use crate::error::Result;
use crate::pcm::{AudioConfig, fill_silence};
use crate::source::{BeaconBuffer, PcmStatus, SourceGeometry, SourceMode};
use std::path::Path;
use std::sync::Arc;

/// Index of the buffer that should play for `degrees_off_axis`.
///
/// `buffers` must be sorted by ascending `max_angle`; the first covering buffer is
/// therefore the narrowest one. Returns `None` when no band covers the offset.
pub fn select_buffer(buffers: &[BeaconBuffer], degrees_off_axis: f64) -> Option<usize> {
    buffers
        .iter()
        .position(|buffer| buffer.check_is_active(degrees_off_axis))
}

/// Heading-banded loops for one beacon voice.
///
/// Holds one set of buffers per [`SourceMode`]. The directional set always exists;
/// the proximity sets are only loaded for proximity beacons whose voice has them,
/// and a missing set falls back to the directional one.
pub struct BeaconBufferGroup {
    descriptor: Arc<BeaconDescriptor>,
    sets: [Vec<BeaconBuffer>; 4],
    config: AudioConfig,
    geometry: Arc<SourceGeometry>,
    byte_pos: usize,
}

impl BeaconBufferGroup {
    /// Builds a group from already prepared buffers. Each set is sorted by angle.
    pub fn new(
        descriptor: Arc<BeaconDescriptor>,
        mut sets: [Vec<BeaconBuffer>; 4],
        config: AudioConfig,
        geometry: Arc<SourceGeometry>,
    ) -> Self {
        for set in sets.iter_mut() {
            // Stable sort keeps catalog order for equal angles
            set.sort_by(|a, b| a.max_angle().total_cmp(&b.max_angle()));
        }
        Self {
            descriptor,
            sets,
            config,
            geometry,
            byte_pos: 0,
        }
    }

    /// Decodes every asset of `descriptor` and prepares it for `config`.
    ///
    /// Any missing or undecodable asset fails the whole group.
    pub fn load(
        descriptor: Arc<BeaconDescriptor>,
        proximity: bool,
        loader: &dyn AudioDataLoader,
        asset_root: &Path,
        config: AudioConfig,
        geometry: Arc<SourceGeometry>,
    ) -> Result<Self> {
        descriptor.validate()?;

        let load_set = |assets: &[BeaconAsset]| -> Result<Vec<BeaconBuffer>> {
            assets
                .iter()
                .map(|asset| {
                    let path = asset_root.join(&asset.filename);
                    let options = LoadOptions::new().target_sample_rate(config.sample_rate);
                    let audio = loader.load(&path, &options)?;
                    BeaconBuffer::from_audio(&asset.filename, &audio, asset.max_angle, &config)
                })
                .collect()
        };

        let direction = load_set(&descriptor.assets)?;
        let (near, far, too_far) = if proximity {
            (
                load_set(&descriptor.near)?,
                load_set(&descriptor.far)?,
                load_set(&descriptor.too_far)?,
            )
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };

        log::debug!(
            "Loaded beacon voice '{}' ({} directional buffers, proximity: {})",
            descriptor.name,
            direction.len(),
            proximity
        );

        Ok(Self::new(
            descriptor,
            [direction, near, far, too_far],
            config,
            geometry,
        ))
    }

    pub fn descriptor(&self) -> &Arc<BeaconDescriptor> {
        &self.descriptor
    }

    pub fn geometry(&self) -> &Arc<SourceGeometry> {
        &self.geometry
    }

    pub fn config(&self) -> AudioConfig {
        self.config
    }

    fn set_index(&self, mode: SourceMode) -> usize {
        let index = mode as usize;
        if self.sets[index].is_empty() { 0 } else { index }
    }

    /// The buffer that currently applies, if any.
    pub fn active_buffer(&self, degrees_off_axis: f64, mode: SourceMode) -> Option<&BeaconBuffer> {
        let set = &self.sets[self.set_index(mode)];
        select_buffer(set, degrees_off_axis).map(|index| &set[index])
    }

    /// Render-thread read.
    ///
    /// The geometry is loaded once per call. Switching buffers keeps the byte
    /// position so the loops stay in phase; with no covering buffer the request is
    /// filled with silence.
    pub fn read_pcm(&mut self, data: &mut [u8]) -> PcmStatus {
        let degrees = self.geometry.degrees_off_axis();
        let mode = self.geometry.mode();
        let set = self.set_index(mode);

        match select_buffer(&self.sets[set], degrees) {
            Some(index) => {
                let buffer = &self.sets[set][index];
                let pos = self.byte_pos % buffer.len();
                buffer.read(data, pos);
                self.byte_pos = (pos + data.len()) % buffer.len();
            }
            None => fill_silence(data, self.config.format),
        }
        PcmStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_data::AudioData;
    use crate::error::BeaconError;
    use crate::pcm::SampleFormat;

    fn buffer(fill: u8, len: usize, max_angle: f64) -> BeaconBuffer {
        BeaconBuffer::new(format!("b{}", fill), vec![fill; len], max_angle).unwrap()
    }

    fn group(sets: [Vec<BeaconBuffer>; 4]) -> BeaconBufferGroup {
        let descriptor = Arc::new(BeaconDescriptor::new(
            "Test",
            2,
            vec![BeaconAsset::new("a.wav", 180.0)],
        ));
        BeaconBufferGroup::new(
            descriptor,
            sets,
            AudioConfig::new(48000, SampleFormat::Pcm8, 1),
            Arc::new(SourceGeometry::new(0.0)),
        )
    }

    fn bands() -> Vec<BeaconBuffer> {
        // Deliberately out of order
        vec![
            buffer(3, 8, 125.0),
            buffer(1, 8, 15.0),
            buffer(4, 8, 180.0),
            buffer(2, 8, 55.0),
        ]
    }

    #[test]
    fn test_smallest_covering_band_wins() {
        let group = group([bands(), vec![], vec![], vec![]]);
        let pick = |d| group.active_buffer(d, SourceMode::Direction).map(|b| b.max_angle());
        assert_eq!(pick(0.0), Some(15.0));
        assert_eq!(pick(-15.0), Some(15.0));
        assert_eq!(pick(30.0), Some(55.0));
        assert_eq!(pick(-100.0), Some(125.0));
        assert_eq!(pick(179.0), Some(180.0));
        assert_eq!(pick(-180.0), Some(180.0));
    }

    #[test]
    fn test_selection_is_total_without_gaps() {
        let group = group([bands(), vec![], vec![], vec![]]);
        let mut d = -180.0;
        while d <= 180.0 {
            let selected: Vec<_> = group.sets[0]
                .iter()
                .enumerate()
                .filter(|(i, _)| select_buffer(&group.sets[0], d) == Some(*i))
                .collect();
            assert_eq!(selected.len(), 1, "offset {}", d);
            d += 0.5;
        }
    }

    #[test]
    fn test_gap_gives_silence() {
        let mut group = group([vec![buffer(7, 4, 90.0)], vec![], vec![], vec![]]);
        group.geometry.update(120.0, SourceMode::Direction);
        let mut data = [0u8; 6];
        assert_eq!(group.read_pcm(&mut data), PcmStatus::Ok);
        assert_eq!(data, [0x80; 6]);

        group.geometry.update(-45.0, SourceMode::Direction);
        group.read_pcm(&mut data);
        assert_eq!(data, [7; 6]);
    }

    #[test]
    fn test_switching_keeps_position() {
        let on_axis = BeaconBuffer::new("on", (0..10).collect(), 15.0).unwrap();
        let off_axis = BeaconBuffer::new("off", (100..110).collect(), 180.0).unwrap();
        let mut group = group([vec![on_axis, off_axis], vec![], vec![], vec![]]);

        let mut data = [0u8; 4];
        group.read_pcm(&mut data);
        assert_eq!(data, [0, 1, 2, 3]);

        group.geometry.update(90.0, SourceMode::Direction);
        group.read_pcm(&mut data);
        assert_eq!(data, [104, 105, 106, 107]);

        group.geometry.update(5.0, SourceMode::Direction);
        group.read_pcm(&mut data);
        assert_eq!(data, [8, 9, 0, 1]);
    }

    #[test]
    fn test_proximity_sets() {
        let mut group = group([
            vec![buffer(1, 4, 180.0)],
            vec![buffer(2, 4, 180.0)],
            vec![buffer(3, 4, 180.0)],
            vec![],
        ]);
        let mut data = [0u8; 2];

        group.geometry.update(0.0, SourceMode::Near);
        group.read_pcm(&mut data);
        assert_eq!(data, [2, 2]);

        group.geometry.update(0.0, SourceMode::Far);
        group.read_pcm(&mut data);
        assert_eq!(data, [3, 3]);

        // No too-far set, back to the directional loop
        group.geometry.update(0.0, SourceMode::TooFar);
        group.read_pcm(&mut data);
        assert_eq!(data, [1, 1]);
    }

    #[test]
    fn test_concurrent_updates_never_mix_buffers() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let mut group = group([
            vec![buffer(1, 7, 15.0), buffer(2, 7, 180.0)],
            vec![buffer(3, 7, 180.0)],
            vec![],
            vec![],
        ]);
        let geometry = group.geometry().clone();
        let stop = Arc::new(AtomicBool::new(false));

        let writer = {
            let stop = stop.clone();
            std::thread::spawn(move || {
                let steps = [
                    (0.0, SourceMode::Direction),
                    (90.0, SourceMode::Direction),
                    (0.0, SourceMode::Near),
                ];
                let mut i = 0;
                while !stop.load(Ordering::Relaxed) {
                    let (degrees, mode) = steps[i % steps.len()];
                    geometry.update(degrees, mode);
                    i += 1;
                }
            })
        };

        // Reads wrap across the loop end, so a mid-read switch would show up as mixed bytes
        let mut data = [0u8; 11];
        for _ in 0..20_000 {
            group.read_pcm(&mut data);
            let first = data[0];
            assert!((1..=3).contains(&first), "unexpected byte {}", first);
            assert!(data.iter().all(|&b| b == first), "mixed chunk {:?}", data);
        }

        stop.store(true, Ordering::Relaxed);
        writer.join().unwrap();
    }

    struct ToneLoader;

    impl AudioDataLoader for ToneLoader {
        fn load(&self, path: &Path, _options: &LoadOptions) -> Result<AudioData> {
            if path.ends_with("missing.wav") {
                return Err(BeaconError::Asset(format!("{} not found", path.display())));
            }
            Ok(AudioData::new(vec![0.25; 480], 48000, 1))
        }
    }

    #[test]
    fn test_load_from_descriptor() {
        let descriptor = Arc::new(BeaconDescriptor::new(
            "Test",
            2,
            vec![
                BeaconAsset::new("on.wav", 15.0),
                BeaconAsset::new("off.wav", 180.0),
            ],
        ));
        let config = AudioConfig::new(48000, SampleFormat::Pcm16, 1);
        let group = BeaconBufferGroup::load(
            descriptor,
            false,
            &ToneLoader,
            Path::new("assets"),
            config,
            Arc::new(SourceGeometry::new(0.0)),
        )
        .unwrap();
        let active = group.active_buffer(0.0, SourceMode::Direction).unwrap();
        assert_eq!(active.name(), "on.wav");
        assert_eq!(active.len(), 960);
    }

    #[test]
    fn test_missing_asset_fails_load() {
        let descriptor = Arc::new(BeaconDescriptor::new(
            "Broken",
            2,
            vec![
                BeaconAsset::new("on.wav", 15.0),
                BeaconAsset::new("missing.wav", 180.0),
            ],
        ));
        let result = BeaconBufferGroup::load(
            descriptor,
            false,
            &ToneLoader,
            Path::new("assets"),
            AudioConfig::default(),
            Arc::new(SourceGeometry::new(0.0)),
        );
        assert!(matches!(result, Err(BeaconError::Asset(_))));
    }
}
