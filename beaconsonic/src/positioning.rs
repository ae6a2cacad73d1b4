//! How a beacon's position is interpreted.

/// Where the sound of a beacon appears to come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioType {
    /// Non-directional, played without any spatial cue.
    #[default]
    Standard,
    /// Anchored to a fixed latitude/longitude.
    Localized,
    /// Fixed offset from whatever direction the listener is facing.
    Relative,
    /// Fixed compass direction, projected from the listener's location.
    Compass,
}

/// Whether the beacon also reacts to the listener's distance from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioMode {
    #[default]
    Standard,
    Proximity,
}

/// Immutable description of how a beacon is positioned, fixed at construction.
///
/// `latitude`/`longitude` are `NaN` when the beacon is not anchored to a point.
/// `heading` is the offset used by [`AudioType::Relative`] and
/// [`AudioType::Compass`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositioningMode {
    pub audio_type: AudioType,
    pub audio_mode: AudioMode,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
}

impl Default for PositioningMode {
    fn default() -> Self {
        Self::standard()
    }
}

impl PositioningMode {
    /// A non-directional beacon.
    pub fn standard() -> Self {
        Self {
            audio_type: AudioType::Standard,
            audio_mode: AudioMode::Standard,
            latitude: f64::NAN,
            longitude: f64::NAN,
            heading: f64::NAN,
        }
    }

    /// A beacon anchored at a geographic point.
    pub fn localized(latitude: f64, longitude: f64) -> Self {
        Self {
            audio_type: AudioType::Localized,
            latitude,
            longitude,
            ..Self::standard()
        }
    }

    /// A beacon at `heading` degrees clockwise from the listener's facing direction.
    pub fn relative(heading: f64) -> Self {
        Self {
            audio_type: AudioType::Relative,
            heading,
            ..Self::standard()
        }
    }

    /// A beacon in a fixed compass direction from wherever the listener is.
    pub fn compass(heading: f64) -> Self {
        Self {
            audio_type: AudioType::Compass,
            heading,
            ..Self::standard()
        }
    }

    /// Switches on proximity banding.
    pub fn with_proximity(mut self) -> Self {
        self.audio_mode = AudioMode::Proximity;
        self
    }

    pub fn has_location(&self) -> bool {
        !self.latitude.is_nan() && !self.longitude.is_nan()
    }

    pub fn is_spatial(&self) -> bool {
        self.audio_type != AudioType::Standard
    }

    pub fn is_proximity(&self) -> bool {
        self.audio_mode == AudioMode::Proximity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let standard = PositioningMode::standard();
        assert!(!standard.is_spatial());
        assert!(!standard.has_location());

        let localized = PositioningMode::localized(55.95, -3.19).with_proximity();
        assert_eq!(localized.audio_type, AudioType::Localized);
        assert!(localized.has_location());
        assert!(localized.is_proximity());

        let relative = PositioningMode::relative(90.0);
        assert_eq!(relative.heading, 90.0);
        assert!(relative.is_spatial());
        assert!(!relative.has_location());
    }

    #[test]
    fn test_partial_location_is_not_a_location() {
        let mode = PositioningMode::localized(55.95, f64::NAN);
        assert!(!mode.has_location());
    }
}
