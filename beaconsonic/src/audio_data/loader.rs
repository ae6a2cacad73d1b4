use crate::audio_data::{AudioData, LoadOptions};
use crate::error::Result;
use std::path::Path;

/// Trait for decoding beacon assets.
///
/// The engine resolves asset names from the catalog against its asset root and asks
/// the loader for decoded audio. [`SymphoniaLoader`](super::SymphoniaLoader) reads
/// files from disk; applications can plug in their own loader to read from an
/// archive, a platform asset manager or to synthesize audio.
///
/// # Example
///
/// ```ignore
/// use beaconsonic::audio_data::{AudioData, AudioDataLoader, LoadOptions};
/// use beaconsonic::error::Result;
/// use std::path::Path;
///
/// struct PackedAssets;
///
/// impl AudioDataLoader for PackedAssets {
///     fn load(&self, path: &Path, options: &LoadOptions) -> Result<AudioData> {
///         todo!()
///     }
/// }
/// ```
pub trait AudioDataLoader: Send + Sync {
    /// Decodes the asset at `path`.
    ///
    /// # Errors
    ///
    /// Returns a `BeaconError` if the asset is missing or cannot be decoded.
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<AudioData>;
}
