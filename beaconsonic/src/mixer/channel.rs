use crate::error::{BeaconError, Result};
use crate::pcm::decode_samples;
use crate::renderer::{BeaconSound, ChannelGroup, ChannelId, DspId};
use crate::source::PcmStatus;
use crate::spatial::SpatialAttributes;
use rubato::{FastFixedOut, PolynomialDegree, Resampler};

/// Constant-power stereo gains for a spatialised source.
///
/// The pan follows the azimuth in the listener's frame; the overall level falls off
/// as `min / distance` between `min_distance` and `max_distance` and stays flat
/// outside that range.
pub fn pan_gains(attributes: &SpatialAttributes, min_distance: f32, max_distance: f32) -> [f32; 2] {
    let distance = attributes.distance();
    let attenuation = if distance.is_finite() && min_distance > 0.0 {
        min_distance / distance.clamp(min_distance, max_distance.max(min_distance))
    } else {
        1.0
    };

    let pan = if distance > f32::EPSILON {
        attributes.azimuth().sin()
    } else {
        0.0
    };
    let angle = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
    [angle.cos() * attenuation, angle.sin() * attenuation]
}

/// One renderer channel as seen by the render thread.
///
/// Every scratch buffer is sized when the channel is built so rendering a block
/// never allocates.
pub(crate) struct MixChannel {
    pub(crate) id: ChannelId,
    pub(crate) group: ChannelGroup,
    pub(crate) paused: bool,
    pub(crate) muted: bool,
    pub(crate) ended: bool,
    pub(crate) dsp: Option<DspId>,
    pub(crate) attributes: Option<SpatialAttributes>,
    sound: BeaconSound,
    block_size: usize,
    bytes: Vec<u8>,
    decoded: Vec<f32>,
    mono_in: Vec<f32>,
    mono_out: Vec<f32>,
    resampler: Option<FastFixedOut<f32>>,
}

impl MixChannel {
    pub(crate) fn new(
        id: ChannelId,
        sound: BeaconSound,
        group: ChannelGroup,
        output_sample_rate: u32,
        block_size: usize,
    ) -> Result<Self> {
        let config = sound.config();
        let resampler = if config.sample_rate != output_sample_rate {
            let ratio = output_sample_rate as f64 / config.sample_rate as f64;
            log::debug!(
                "{} resampling {} Hz -> {} Hz",
                id,
                config.sample_rate,
                output_sample_rate
            );
            Some(
                FastFixedOut::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, block_size, 1)
                    .map_err(|e| {
                        BeaconError::Renderer(format!("Failed to create channel resampler: {}", e))
                    })?,
            )
        } else {
            None
        };

        let max_input = resampler
            .as_ref()
            .map_or(block_size, |r| r.input_frames_max());
        let channels = config.channels as usize;

        Ok(Self {
            id,
            group,
            paused: true,
            muted: false,
            ended: false,
            dsp: None,
            attributes: None,
            sound,
            block_size,
            bytes: vec![0; max_input * config.frame_bytes()],
            decoded: vec![0.0; max_input * channels],
            mono_in: vec![0.0; max_input],
            mono_out: vec![0.0; block_size],
            resampler,
        })
    }

    pub(crate) fn into_sound(self) -> BeaconSound {
        self.sound
    }

    /// Output gains for the left and right channel.
    pub(crate) fn gains(&self) -> [f32; 2] {
        match &self.attributes {
            Some(attributes) => pan_gains(
                attributes,
                self.sound.min_distance(),
                self.sound.max_distance(),
            ),
            None => [1.0, 1.0],
        }
    }

    /// The last rendered block, mono at the output rate.
    pub(crate) fn block(&self) -> &[f32] {
        &self.mono_out
    }

    pub(crate) fn has_signal(&self) -> bool {
        self.mono_out.iter().any(|s| s.abs() > 1e-6)
    }

    /// Pulls one block from the sound and converts it to mono at the output rate.
    ///
    /// Returns `Err(())` only when resampling failed; the block is silent then.
    pub(crate) fn render(&mut self) -> std::result::Result<PcmStatus, ()> {
        let config = self.sound.config();
        let channels = config.channels as usize;
        let frames = self
            .resampler
            .as_ref()
            .map_or(self.block_size, |r| r.input_frames_next());

        let bytes = &mut self.bytes[..frames * config.frame_bytes()];
        let status = self.sound.read_pcm(bytes);
        let decoded = &mut self.decoded[..frames * channels];
        decode_samples(bytes, config.format, decoded);

        let scale = 1.0 / channels as f32;
        for (mono, frame) in self.mono_in[..frames]
            .iter_mut()
            .zip(decoded.chunks_exact(channels))
        {
            *mono = frame.iter().sum::<f32>() * scale;
        }

        match self.resampler.as_mut() {
            Some(resampler) => {
                let input = [&self.mono_in[..frames]];
                let mut output = [&mut self.mono_out[..]];
                if resampler.process_into_buffer(&input, &mut output, None).is_err() {
                    self.mono_out.fill(0.0);
                    return Err(());
                }
            }
            None => self.mono_out.copy_from_slice(&self.mono_in[..self.block_size]),
        }
        Ok(status)
    }
}
