/// Defines how to handle channel conversion during asset loading.
///
/// Beacon loops are spatialized after loading, so they are normally folded to mono
/// first and only expanded to the beacon's output channel count at the very end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertToMono {
    /// Keep original channels: stereo if input is stereo, mono if input is mono.
    Original,

    /// Force mono: if input is mono use it, if input is stereo average the channels.
    ForceMono,
}

/// Options for controlling asset loading behavior.
///
/// # Examples
///
/// ```no_run
/// # use beaconsonic::audio_data::{LoadOptions, ConvertToMono};
/// let options = LoadOptions::new()
///     .convert_to_mono(ConvertToMono::Original)
///     .target_sample_rate(22050);
/// ```
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// How to handle mono conversion during loading.
    pub convert_to_mono: ConvertToMono,
    /// Resample to this rate after decoding (None = keep the file's rate)
    pub target_sample_rate: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            convert_to_mono: ConvertToMono::ForceMono,
            target_sample_rate: None,
        }
    }
}

impl LoadOptions {
    /// Creates a new `LoadOptions` with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mono conversion option.
    pub fn convert_to_mono(mut self, convert: ConvertToMono) -> Self {
        self.convert_to_mono = convert;
        self
    }

    /// Sets the rate the decoded audio is resampled to.
    pub fn target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = Some(rate);
        self
    }
}
