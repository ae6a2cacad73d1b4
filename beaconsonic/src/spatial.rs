//! Binaural attribute frames.
//!
//! Spatial DSP nodes do not track the listener's orientation themselves, so every
//! update carries both the source's absolute pose and its pose in the listener's
//! frame. Positions live on the plane of [`LocalProjection`] (x east, z north).

use crate::geometry::{LocalProjection, destination};
use crate::positioning::{AudioType, PositioningMode};
use glam::Vec3;

/// Position and orientation of a source in one reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame3D {
    pub position: Vec3,
    pub velocity: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for Frame3D {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
        }
    }
}

/// Attribute block handed to a spatial DSP node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpatialAttributes {
    pub absolute: Frame3D,
    pub relative: Frame3D,
}

impl SpatialAttributes {
    /// Builds both frames for a source at `source` heard from `listener` facing
    /// `heading` degrees clockwise from north.
    pub fn from_positions(source: Vec3, listener: Vec3, heading: f64) -> Self {
        let radians = heading.to_radians() as f32;
        let (sin_h, cos_h) = radians.sin_cos();
        let dx = source.x - listener.x;
        let dz = source.z - listener.z;

        Self {
            absolute: Frame3D {
                position: source,
                ..Frame3D::default()
            },
            relative: Frame3D {
                position: Vec3::new(cos_h * dx - sin_h * dz, 0.0, sin_h * dx + cos_h * dz),
                velocity: Vec3::ZERO,
                forward: Vec3::new(-sin_h, 0.0, cos_h),
                up: Vec3::Y,
            },
        }
    }

    /// Distance from the listener in the relative frame.
    pub fn distance(&self) -> f32 {
        self.relative.position.length()
    }

    /// Horizontal angle of the source, radians clockwise from straight ahead.
    pub fn azimuth(&self) -> f32 {
        self.relative.position.x.atan2(self.relative.position.z)
    }
}

/// Listener fix used for an attribute update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerFix {
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
}

/// Where the sound of a beacon sits on the projection plane.
///
/// `beacon` is the beacon's current point for anchored beacons. Returns `None` when
/// the mode carries no spatial cue or the needed coordinates are unknown.
pub fn source_position(
    mode: &PositioningMode,
    projection: &LocalProjection,
    listener: &ListenerFix,
    beacon: (f64, f64),
    compass_distance: f64,
) -> Option<Vec3> {
    let listener_position = projection.to_local(listener.latitude, listener.longitude);
    match mode.audio_type {
        AudioType::Standard => None,
        AudioType::Localized => {
            let (lat, lon) = beacon;
            (!lat.is_nan() && !lon.is_nan()).then(|| projection.to_local(lat, lon))
        }
        AudioType::Relative => {
            let radians = (listener.heading + mode.heading).to_radians() as f32;
            Some(listener_position + Vec3::new(radians.sin(), 0.0, radians.cos()))
        }
        AudioType::Compass => {
            let (lat, lon) = destination(
                listener.latitude,
                listener.longitude,
                mode.heading,
                compass_distance,
            );
            Some(projection.to_local(lat, lon))
        }
    }
}

/// Computes the attribute block for one beacon.
///
/// Nothing is produced for non-directional beacons, for an unknown heading or when
/// the listener position is unknown.
pub fn compute_attributes(
    mode: &PositioningMode,
    projection: &LocalProjection,
    listener: &ListenerFix,
    beacon: (f64, f64),
    compass_distance: f64,
) -> Option<SpatialAttributes> {
    if mode.audio_type == AudioType::Standard
        || listener.heading.is_nan()
        || listener.latitude.is_nan()
        || listener.longitude.is_nan()
    {
        return None;
    }

    let source = source_position(mode, projection, listener, beacon, compass_distance)?;
    let listener_position = projection.to_local(listener.latitude, listener.longitude);
    Some(SpatialAttributes::from_positions(
        source,
        listener_position,
        listener.heading,
    ))
}
