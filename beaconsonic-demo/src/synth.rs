use beaconsonic::audio_data::{AudioData, AudioDataLoader, LoadOptions};
use beaconsonic::error::Result;
use std::f32::consts::TAU;
use std::path::Path;

const SAMPLE_RATE: u32 = 48000;
const LOOP_SECONDS: f32 = 1.0;

/// Generates a short pulsed tone for every asset instead of reading files.
///
/// The pitch comes from the asset name, so the on-axis, off-axis and behind loops
/// of a voice are audibly different and the demo runs without any audio files.
pub struct SynthLoader;

impl SynthLoader {
    fn pitch(path: &Path) -> f32 {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.contains("a+") || name.contains("onaxis") {
            880.0
        } else if name.ends_with("_a") {
            660.0
        } else if name.contains("behind") {
            220.0
        } else if name.contains("_b") || name.contains("offaxis") {
            440.0
        } else if name.contains("close") {
            1320.0
        } else if name.contains("far") {
            330.0
        } else {
            // Unknown names still get a stable pitch
            let hash = name.bytes().fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
            220.0 + (hash % 8) as f32 * 110.0
        }
    }
}

impl AudioDataLoader for SynthLoader {
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<AudioData> {
        let sample_rate = options.target_sample_rate.unwrap_or(SAMPLE_RATE);
        let frequency = Self::pitch(path);
        let frames = (sample_rate as f32 * LOOP_SECONDS) as usize;
        let pulse = frames / 4;

        let mono: Vec<f32> = (0..frames)
            .map(|i| {
                if i >= pulse {
                    return 0.0;
                }
                let t = i as f32 / sample_rate as f32;
                // Short fade at both ends of the pulse
                let edge = (i.min(pulse - i) as f32 / 240.0).min(1.0);
                (TAU * frequency * t).sin() * 0.4 * edge
            })
            .collect();

        log::debug!("Synthesized {} at {} Hz", path.display(), frequency);

        Ok(AudioData::new(mono, sample_rate, 1))
    }
}
