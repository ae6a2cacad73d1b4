use crate::config::BeaconEngineDesc;
use crate::error::{BeaconError, Result};
use crate::mixer::MixerCore;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Callback that fills interleaved `f32` output.
///
/// Receives the buffer to fill and returns the number of frames written. Called on
/// the device thread, so it must not block.
pub type AudioFillCallback = Box<dyn FnMut(&mut [f32]) -> usize + Send>;

/// Default output device driven by a fill callback.
pub struct OutputStream {
    desc: BeaconEngineDesc,
    stream: Option<cpal::Stream>,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicUsize>,
}

impl OutputStream {
    pub fn new(desc: BeaconEngineDesc) -> Result<Self> {
        desc.validate()?;
        Ok(Self {
            desc,
            stream: None,
            is_running: Arc::new(AtomicBool::new(false)),
            frames_processed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Starts the device with a mixer core as the fill callback.
    pub fn start_mixer(&mut self, mut core: MixerCore) -> Result<()> {
        self.start(Box::new(move |buffer: &mut [f32]| core.render(buffer)))
    }

    /// Opens the default output device and starts pulling from `fill`.
    pub fn start(&mut self, fill: AudioFillCallback) -> Result<()> {
        if self.is_running.load(Ordering::Relaxed) {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            BeaconError::AudioDevice("No default output device available".into())
        })?;
        let default_config = device.default_output_config().map_err(|e| {
            BeaconError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        let config = cpal::StreamConfig {
            channels: self.desc.channels,
            sample_rate: cpal::SampleRate(self.desc.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        log::info!(
            "Opening output device {} at {} Hz, {} channels ({:?})",
            device.name().unwrap_or_else(|_| "<unknown>".to_string()),
            config.sample_rate.0,
            config.channels,
            default_config.sample_format()
        );

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => self.create_stream::<f32>(&device, &config, fill)?,
            cpal::SampleFormat::I16 => self.create_stream::<i16>(&device, &config, fill)?,
            cpal::SampleFormat::U16 => self.create_stream::<u16>(&device, &config, fill)?,
            other => {
                return Err(BeaconError::AudioFormat(format!(
                    "Unsupported device sample format {:?}",
                    other
                )));
            }
        };

        stream
            .play()
            .map_err(|e| BeaconError::AudioDevice(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        self.is_running.store(true, Ordering::Relaxed);
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.is_running.store(false, Ordering::Relaxed);
            drop(stream);
            log::info!("Output stream stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Frames delivered to the device since start.
    pub fn frames_processed(&self) -> usize {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn desc(&self) -> &BeaconEngineDesc {
        &self.desc
    }

    fn create_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut fill: AudioFillCallback,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let is_running = self.is_running.clone();
        let frames_processed = self.frames_processed.clone();
        // Grown only if the device asks for a larger buffer than the last one
        let mut scratch = vec![0.0f32; self.desc.block_size * config.channels as usize];

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if !is_running.load(Ordering::Relaxed) {
                        data.fill(T::EQUILIBRIUM);
                        return;
                    }

                    if scratch.len() < data.len() {
                        scratch.resize(data.len(), 0.0);
                    }
                    let buffer = &mut scratch[..data.len()];
                    let frames = fill(buffer);

                    for (out, &sample) in data.iter_mut().zip(buffer.iter()) {
                        *out = T::from_sample(sample);
                    }
                    frames_processed.fetch_add(frames, Ordering::Relaxed);
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| BeaconError::AudioDevice(format!("Failed to build stream: {}", e)))
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.stop();
    }
}
