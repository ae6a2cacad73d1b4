//! Geodetic helpers for beacon placement.
//!
//! All angles are in degrees and all distances in meters. Coordinates are WGS84
//! latitude/longitude treated on a sphere of the WGS84 equatorial radius, which is
//! accurate enough for the walking-scale distances beacons deal with.
//!
//! None of these functions fail for finite input. Callers that represent "unknown"
//! with `NaN` must guard before calling; a `NaN` in gives a `NaN` out.

use glam::Vec3;

/// Radius used for all great-circle calculations.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Great-circle (haversine) distance between two points.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Initial bearing from point 1 to point 2, in `[0, 360)`.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    wrap_degrees(y.atan2(x).to_degrees())
}

/// Point reached by travelling `distance_m` from `(lat, lon)` along `bearing_deg`.
pub fn destination(lat: f64, lon: f64, bearing_deg: f64, distance_m: f64) -> (f64, f64) {
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();
    let theta = bearing_deg.to_radians();
    let delta = distance_m / EARTH_RADIUS_METERS;

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    // Keep longitude in [-180, 180)
    let lon2 = (lambda2.to_degrees() + 540.0) % 360.0 - 180.0;
    (phi2.to_degrees(), lon2)
}

/// Wraps any angle into `[0, 360)`.
pub fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees % 360.0;
    if wrapped < 0.0 {
        // -1e-15 % 360 + 360 rounds to 360
        let positive = wrapped + 360.0;
        if positive >= 360.0 { 0.0 } else { positive }
    } else {
        wrapped
    }
}

/// Normalizes a heading difference into `(-180, 180]` with a single wrap.
///
/// The input is expected to be the difference of two angles in `[0, 360)`, so it is
/// already bounded to `(-360, 360)` and one addition or subtraction is enough.
pub fn normalize_offset(degrees: f64) -> f64 {
    if degrees > 180.0 {
        degrees - 360.0
    } else if degrees <= -180.0 {
        degrees + 360.0
    } else {
        degrees
    }
}

/// Signed offset of the direction to a target relative to the listener heading.
pub fn heading_offset(
    heading: f64,
    listener_lat: f64,
    listener_lon: f64,
    target_lat: f64,
    target_lon: f64,
) -> f64 {
    let target_bearing = bearing(listener_lat, listener_lon, target_lat, target_lon);
    normalize_offset(target_bearing - wrap_degrees(heading))
}

/// Flattens geodetic coordinates onto a local tangent plane for the renderer.
///
/// The plane is centred on `origin`: `x` grows eastwards, `z` grows northwards and
/// `y` is always zero. An equirectangular approximation is used, which keeps the
/// error well under a meter within a few kilometers of the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin_lat: f64,
    origin_lon: f64,
    meters_per_degree_lon: f64,
}

impl LocalProjection {
    const METERS_PER_DEGREE_LAT: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

    pub fn new(origin_lat: f64, origin_lon: f64) -> Self {
        Self {
            origin_lat,
            origin_lon,
            meters_per_degree_lon: Self::METERS_PER_DEGREE_LAT * origin_lat.to_radians().cos(),
        }
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.origin_lat, self.origin_lon)
    }

    /// Projects a point onto the plane.
    pub fn to_local(&self, lat: f64, lon: f64) -> Vec3 {
        let x = (lon - self.origin_lon) * self.meters_per_degree_lon;
        let z = (lat - self.origin_lat) * Self::METERS_PER_DEGREE_LAT;
        Vec3::new(x as f32, 0.0, z as f32)
    }

    /// Inverse of [`to_local`](Self::to_local).
    pub fn to_geodetic(&self, point: Vec3) -> (f64, f64) {
        let lat = self.origin_lat + point.z as f64 / Self::METERS_PER_DEGREE_LAT;
        let lon = self.origin_lon + point.x as f64 / self.meters_per_degree_lon;
        (lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EDINBURGH: (f64, f64) = (55.9533, -3.1883);
    const GLASGOW: (f64, f64) = (55.8642, -4.2518);

    #[test]
    fn test_distance_between_cities() {
        let d = distance(EDINBURGH.0, EDINBURGH.1, GLASGOW.0, GLASGOW.1);
        // Roughly 67 km apart
        assert!(d > 66_000.0 && d < 68_000.0, "unexpected distance {}", d);
        assert_abs_diff_eq!(distance(EDINBURGH.0, EDINBURGH.1, EDINBURGH.0, EDINBURGH.1), 0.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        assert_abs_diff_eq!(bearing(0.0, 0.0, 1.0, 0.0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bearing(0.0, 0.0, 0.0, 1.0), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bearing(0.0, 0.0, -1.0, 0.0), 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bearing(0.0, 0.0, 0.0, -1.0), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bearing_range() {
        for i in 0..72 {
            let (lat, lon) = destination(EDINBURGH.0, EDINBURGH.1, i as f64 * 5.0, 250.0);
            let b = bearing(EDINBURGH.0, EDINBURGH.1, lat, lon);
            assert!((0.0..360.0).contains(&b), "bearing {} out of range", b);
        }
    }

    #[test]
    fn test_destination_round_trip() {
        let targets = [GLASGOW, (55.9600, -3.1700), (55.9400, -3.2100), (55.9533, -3.1800)];
        for (lat2, lon2) in targets {
            let b = bearing(EDINBURGH.0, EDINBURGH.1, lat2, lon2);
            let d = distance(EDINBURGH.0, EDINBURGH.1, lat2, lon2);
            let (lat, lon) = destination(EDINBURGH.0, EDINBURGH.1, b, d);
            assert_abs_diff_eq!(lat, lat2, epsilon = 1e-6);
            assert_abs_diff_eq!(lon, lon2, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_destination_crosses_antimeridian() {
        let (_, lon) = destination(0.0, 179.9999, 90.0, 1_000.0);
        assert!(lon < -179.0);
    }

    #[test]
    fn test_normalize_offset_range() {
        let mut h = 0.0;
        while h < 360.0 {
            let mut b = 0.0;
            while b < 360.0 {
                let offset = normalize_offset(b - h);
                assert!(offset > -180.0 && offset <= 180.0, "{} - {} -> {}", b, h, offset);
                assert_abs_diff_eq!(wrap_degrees(offset), wrap_degrees(b - h), epsilon = 1e-9);
                b += 7.5;
            }
            h += 5.0;
        }
        assert_eq!(normalize_offset(-180.0), 180.0);
        assert_eq!(normalize_offset(180.0), 180.0);
    }

    #[test]
    fn test_heading_offset_example() {
        // Beacon to the north east of a listener facing east
        let (lat, lon) = destination(EDINBURGH.0, EDINBURGH.1, 45.0, 100.0);
        let offset = heading_offset(90.0, EDINBURGH.0, EDINBURGH.1, lat, lon);
        assert_abs_diff_eq!(offset, -45.0, epsilon = 0.01);
    }

    #[test]
    fn test_projection_axes() {
        let projection = LocalProjection::new(EDINBURGH.0, EDINBURGH.1);
        assert_eq!(projection.to_local(EDINBURGH.0, EDINBURGH.1), Vec3::ZERO);

        let (lat, lon) = destination(EDINBURGH.0, EDINBURGH.1, 90.0, 100.0);
        let east = projection.to_local(lat, lon);
        assert_abs_diff_eq!(east.x, 100.0, epsilon = 0.5);
        assert_abs_diff_eq!(east.z, 0.0, epsilon = 0.5);

        let (lat, lon) = destination(EDINBURGH.0, EDINBURGH.1, 0.0, 100.0);
        let north = projection.to_local(lat, lon);
        assert_abs_diff_eq!(north.x, 0.0, epsilon = 0.5);
        assert_abs_diff_eq!(north.z, 100.0, epsilon = 0.5);

        let (back_lat, back_lon) = projection.to_geodetic(north);
        assert_abs_diff_eq!(back_lat, lat, epsilon = 1e-5);
        assert_abs_diff_eq!(back_lon, lon, epsilon = 1e-5);
    }
}
