use crate::{
    audio_data::{AudioData, AudioDataLoader, ConvertToMono, LoadOptions},
    error::{BeaconError, Result},
};
use std::fs::File;
use std::path::Path;
use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
        io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default::{get_codecs, get_probe},
};

/// Asset loader backed by the Symphonia decoders (WAV, FLAC, OGG, MP3, ...).
pub struct SymphoniaLoader;

impl AudioDataLoader for SymphoniaLoader {
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<AudioData> {
        let file = File::open(path).map_err(|e| {
            BeaconError::Asset(format!("Cannot open asset {}: {}", path.display(), e))
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                BeaconError::AudioLoading(format!(
                    "Failed to probe {}: {:?}",
                    path.display(),
                    e
                ))
            })?;

        let mut format = probed.format;

        let track = format.default_track().ok_or_else(|| {
            BeaconError::AudioLoading(format!("No default track in {}", path.display()))
        })?;
        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| BeaconError::AudioLoading("Sample rate not found".to_string()))?;

        let channels = track
            .codec_params
            .channels
            .ok_or_else(|| BeaconError::AudioLoading("Channel count not found".to_string()))?
            .count() as u16;

        let mut decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| BeaconError::AudioLoading(format!("Failed to create decoder: {:?}", e)))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(_)) => break, // end-of-file
                Err(e) => {
                    return Err(BeaconError::AudioLoading(format!(
                        "Error reading packet: {:?}",
                        e
                    )));
                }
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(Error::IoError(_)) => break,
                Err(Error::DecodeError(_)) => continue, // recoverable corruption
                Err(e) => {
                    return Err(BeaconError::AudioLoading(format!(
                        "Error decoding packet: {:?}",
                        e
                    )));
                }
            };

            let spec = *decoded.spec();
            let mut tmp = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            tmp.copy_interleaved_ref(decoded);
            samples.extend_from_slice(tmp.samples());
        }

        if samples.is_empty() {
            return Err(BeaconError::Asset(format!(
                "Asset {} decoded to no audio",
                path.display()
            )));
        }

        log::debug!(
            "Decoded {} ({} Hz, {} channels, {} samples)",
            path.display(),
            sample_rate,
            channels,
            samples.len()
        );

        let mut audio = AudioData::new(samples, sample_rate, channels);
        if options.convert_to_mono == ConvertToMono::ForceMono {
            audio = audio.to_mono();
        }
        if let Some(rate) = options.target_sample_rate {
            audio = audio.resample(rate)?;
        }
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_an_asset_error() {
        let result = SymphoniaLoader.load(Path::new("no/such/beacon.wav"), &LoadOptions::default());
        assert!(matches!(result, Err(BeaconError::Asset(_))));
    }
}
