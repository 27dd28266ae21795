//! # Geo Module
//!
//! Great-circle distance between two coordinates.
//!
//! ## Coordinate Order
//! Points are `[longitude, latitude]` in decimal degrees, the GeoJSON order
//! used by both the sale and retailer payloads.
//!
//! ## Haversine
//! ```text
//! a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)
//! c = 2 · atan2(√a, √(1−a))
//! d = R · c            R = 6,371,000 m
//! ```

use serde::{Deserialize, Serialize};

use crate::{COORDINATE_DECIMAL_PLACES, EARTH_RADIUS_METERS};

/// A point on the Earth's surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        GeoPoint {
            longitude,
            latitude,
        }
    }

    /// Returns the point as a GeoJSON `[longitude, latitude]` pair.
    pub const fn to_pair(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// True when both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }

    /// True when both components are finite and within WGS84 bounds.
    pub fn is_in_bounds(&self) -> bool {
        self.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(pair: [f64; 2]) -> Self {
        GeoPoint::new(pair[0], pair[1])
    }
}

/// Returns the great-circle distance between `a` and `b` in meters.
///
/// NaN in either input yields NaN; callers that gate on the result must treat
/// a non-finite distance as a failed computation.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Rounds a value to [`COORDINATE_DECIMAL_PLACES`] for log output.
pub fn round_for_display(value: f64) -> f64 {
    let factor = 10f64.powi(COORDINATE_DECIMAL_PLACES as i32);
    (value * factor).round() / factor
}

/// Degree deltas of a bounding box around `center` covering `radius_meters`.
///
/// Used as a cheap SQL prefilter before exact haversine distances are
/// computed. Returns `(delta_latitude, delta_longitude)`.
pub fn bounding_deltas(center: GeoPoint, radius_meters: f64) -> (f64, f64) {
    let delta_lat = (radius_meters / EARTH_RADIUS_METERS).to_degrees();
    let cos_lat = center.latitude.to_radians().cos().abs();
    let delta_lon = if cos_lat < 1e-9 {
        180.0
    } else {
        (radius_meters / (EARTH_RADIUS_METERS * cos_lat))
            .to_degrees()
            .min(180.0)
    };
    (delta_lat, delta_lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let points = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(73.0479, 33.6844),
            GeoPoint::new(-122.4194, 37.7749),
            GeoPoint::new(179.9, -89.9),
        ];
        for p in points {
            assert_eq!(haversine_distance(p, p), 0.0);
        }
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            (GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.01)),
            (GeoPoint::new(73.0479, 33.6844), GeoPoint::new(74.3587, 31.5204)),
            (GeoPoint::new(-0.1276, 51.5072), GeoPoint::new(2.3522, 48.8566)),
        ];
        for (a, b) in pairs {
            assert_eq!(haversine_distance(a, b), haversine_distance(b, a));
        }
    }

    #[test]
    fn test_known_distances() {
        let origin = GeoPoint::new(0.0, 0.0);

        let near = haversine_distance(origin, GeoPoint::new(0.0, 0.0017));
        assert!((near - 189.03).abs() < 0.1, "got {near}");

        let far = haversine_distance(origin, GeoPoint::new(0.0, 0.01));
        assert!((far - 1111.95).abs() < 0.1, "got {far}");

        // London -> Paris is roughly 343.5 km
        let london = GeoPoint::new(-0.1276, 51.5072);
        let paris = GeoPoint::new(2.3522, 48.8566);
        let d = haversine_distance(london, paris);
        assert!((d - 343_500.0).abs() < 1_000.0, "got {d}");
    }

    #[test]
    fn test_nan_propagates() {
        let d = haversine_distance(GeoPoint::new(f64::NAN, 0.0), GeoPoint::new(0.0, 0.0));
        assert!(d.is_nan());
    }

    #[test]
    fn test_round_for_display() {
        assert_eq!(round_for_display(189.034_567), 189.0346);
        assert_eq!(round_for_display(0.000_04), 0.0);
    }

    #[test]
    fn test_bounds() {
        assert!(GeoPoint::new(180.0, -90.0).is_in_bounds());
        assert!(!GeoPoint::new(181.0, 0.0).is_in_bounds());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_in_bounds());
    }

    #[test]
    fn test_bounding_deltas_cover_radius() {
        let center = GeoPoint::new(73.0, 33.0);
        let (dlat, dlon) = bounding_deltas(center, 10_000.0);
        let north = GeoPoint::new(center.longitude, center.latitude + dlat);
        let east = GeoPoint::new(center.longitude + dlon, center.latitude);
        assert!((haversine_distance(center, north) - 10_000.0).abs() < 1.0);
        assert!(haversine_distance(center, east) >= 9_999.0);
    }
}
