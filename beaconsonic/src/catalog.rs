//! Static catalog of beacon voices.
//!
//! A voice ([`BeaconDescriptor`]) is an ordered list of looped assets, each valid
//! within `max_angle` degrees of the beacon's direction. The catalog is loaded once
//! at start-up and shared read-only by every beacon using it.

use crate::error::{BeaconError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One looped audio file and the angular half-width it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconAsset {
    pub filename: String,
    pub max_angle: f64,
}

impl BeaconAsset {
    pub fn new(filename: impl Into<String>, max_angle: f64) -> Self {
        Self {
            filename: filename.into(),
            max_angle,
        }
    }
}

/// A named beacon voice.
///
/// `assets` are used while the listener is outside proximity range (or for
/// non-proximity beacons). The optional `near`, `far` and `too_far` sets replace
/// them in the matching proximity band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconDescriptor {
    pub name: String,
    pub beats_in_phrase: u32,
    pub assets: Vec<BeaconAsset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub near: Vec<BeaconAsset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub far: Vec<BeaconAsset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub too_far: Vec<BeaconAsset>,
}

impl BeaconDescriptor {
    pub fn new(name: impl Into<String>, beats_in_phrase: u32, assets: Vec<BeaconAsset>) -> Self {
        Self {
            name: name.into(),
            beats_in_phrase,
            assets,
            near: Vec::new(),
            far: Vec::new(),
            too_far: Vec::new(),
        }
    }

    pub fn with_proximity(
        mut self,
        near: Vec<BeaconAsset>,
        far: Vec<BeaconAsset>,
        too_far: Vec<BeaconAsset>,
    ) -> Self {
        self.near = near;
        self.far = far;
        self.too_far = too_far;
        self
    }

    pub fn has_proximity_assets(&self) -> bool {
        !(self.near.is_empty() && self.far.is_empty() && self.too_far.is_empty())
    }

    /// Checks that the descriptor can be turned into a working buffer group.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(BeaconError::Catalog("Beacon voice without a name".into()));
        }
        if self.beats_in_phrase == 0 {
            return Err(BeaconError::Catalog(format!(
                "Voice '{}' has zero beats in phrase",
                self.name
            )));
        }
        if self.assets.is_empty() {
            return Err(BeaconError::Catalog(format!(
                "Voice '{}' has no assets",
                self.name
            )));
        }

        let all = self
            .assets
            .iter()
            .chain(&self.near)
            .chain(&self.far)
            .chain(&self.too_far);
        for asset in all {
            if asset.filename.is_empty() {
                return Err(BeaconError::Catalog(format!(
                    "Voice '{}' has an asset without a filename",
                    self.name
                )));
            }
            if !(asset.max_angle > 0.0 && asset.max_angle <= 180.0) {
                return Err(BeaconError::Catalog(format!(
                    "Voice '{}' asset '{}' has max_angle {} outside (0, 180]",
                    self.name, asset.filename, asset.max_angle
                )));
            }
        }
        Ok(())
    }
}

/// Read-only set of beacon voices, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct BeaconCatalog {
    order: Vec<String>,
    voices: HashMap<String, Arc<BeaconDescriptor>>,
}

impl BeaconCatalog {
    /// Builds a catalog after validating every descriptor.
    pub fn new(descriptors: Vec<BeaconDescriptor>) -> Result<Self> {
        let mut catalog = Self::default();
        for descriptor in descriptors {
            descriptor.validate()?;
            if catalog.voices.contains_key(&descriptor.name) {
                return Err(BeaconError::Catalog(format!(
                    "Duplicate beacon voice '{}'",
                    descriptor.name
                )));
            }
            catalog.order.push(descriptor.name.clone());
            catalog
                .voices
                .insert(descriptor.name.clone(), Arc::new(descriptor));
        }
        Ok(catalog)
    }

    /// Parses a JSON array of descriptors.
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptors: Vec<BeaconDescriptor> = serde_json::from_str(json)?;
        Self::new(descriptors)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&json)?;
        log::info!(
            "Loaded {} beacon voices from {}",
            catalog.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    /// The voices shipped with the application.
    pub fn builtin() -> Self {
        let voice = |name: &str, beats: u32, assets: &[(&str, f64)]| {
            BeaconDescriptor::new(
                name,
                beats,
                assets
                    .iter()
                    .map(|(file, angle)| BeaconAsset::new(format!("{}/{}", name, file), *angle))
                    .collect(),
            )
        };

        let descriptors = vec![
            voice(
                "Original",
                2,
                &[("Original_OnAxis.wav", 22.5), ("Original_OffAxis.wav", 180.0)],
            ),
            voice(
                "Current",
                6,
                &[
                    ("Current_A+.wav", 15.0),
                    ("Current_A.wav", 55.0),
                    ("Current_B.wav", 125.0),
                    ("Current_Behind.wav", 180.0),
                ],
            ),
            voice(
                "Tactile",
                6,
                &[
                    ("Tactile_OnAxis.wav", 15.0),
                    ("Tactile_OffAxis.wav", 125.0),
                    ("Tactile_Behind.wav", 180.0),
                ],
            ),
            voice(
                "Flare",
                6,
                &[
                    ("Flare_A+.wav", 15.0),
                    ("Flare_A.wav", 55.0),
                    ("Flare_B.wav", 125.0),
                    ("Flare_Behind.wav", 180.0),
                ],
            ),
            voice(
                "Ping",
                6,
                &[
                    ("Ping_A+.wav", 15.0),
                    ("Ping_A.wav", 55.0),
                    ("Ping_B.wav", 125.0),
                    ("Ping_Behind.wav", 180.0),
                ],
            ),
            voice(
                "Proximity",
                6,
                &[("Proximity_OnAxis.wav", 15.0), ("Proximity_OffAxis.wav", 180.0)],
            )
            .with_proximity(
                vec![BeaconAsset::new("Proximity/Proximity_Close.wav", 180.0)],
                vec![BeaconAsset::new("Proximity/Proximity_Far.wav", 180.0)],
                Vec::new(),
            ),
        ];

        // The built-in table is static data and always validates
        Self::new(descriptors).unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<BeaconDescriptor>> {
        self.voices.get(name).cloned()
    }

    /// Voice names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
