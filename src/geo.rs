/// Great-circle distance used by the nearby query
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite and inside the valid latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Haversine distance between two points, in kilometers
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Inclusive radius check: a point exactly on the boundary is kept
pub fn within_radius(center: GeoPoint, point: GeoPoint, radius_km: f64) -> bool {
    haversine_km(center, point) <= radius_km
}

/// Planar radius, in degrees, used to count neighbours for map colouring
pub const HOTSPOT_RADIUS_DEG: f64 = 0.1;

/// Neighbour count at which a hotspot saturates
pub const HOTSPOT_SATURATION: usize = 10;

/// Marker intensity in `[0, 1]` for `point`: the share of
/// `HOTSPOT_SATURATION` reached by points (itself included) closer than
/// `HOTSPOT_RADIUS_DEG` in plain degree space.
///
/// Presentation only; the nearby query uses great-circle distance.
pub fn hotspot_intensity<I>(point: GeoPoint, others: I) -> f64
where
    I: IntoIterator<Item = GeoPoint>,
{
    let nearby = others
        .into_iter()
        .filter(|p| {
            let d_lat = p.latitude - point.latitude;
            let d_lon = p.longitude - point.longitude;
            (d_lat * d_lat + d_lon * d_lon).sqrt() < HOTSPOT_RADIUS_DEG
        })
        .count();

    (nearby as f64 / HOTSPOT_SATURATION as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = GeoPoint::new(12.97, 77.59);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_one_degree_longitude_at_equator() {
        let d = haversine_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert!((d - 111.19).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_symmetric() {
        let a = GeoPoint::new(37.7749, -122.4194);
        let b = GeoPoint::new(34.0522, -118.2437);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
        // San Francisco to Los Angeles is roughly 559 km
        assert!((haversine_km(a, b) - 559.0).abs() < 5.0);
    }

    #[test]
    fn test_within_radius() {
        let origin = GeoPoint::new(0.0, 0.0);
        assert!(within_radius(origin, GeoPoint::new(0.0, 0.01), 5.0));
        assert!(!within_radius(origin, GeoPoint::new(0.0, 1.0), 5.0));
        assert!(within_radius(origin, origin, 0.0));
    }

    #[test]
    fn test_validity() {
        assert!(GeoPoint::new(90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_hotspot_intensity() {
        let here = GeoPoint::new(20.0, 78.0);

        assert_eq!(hotspot_intensity(here, std::iter::empty()), 0.0);

        let cluster: Vec<GeoPoint> = (0..3)
            .map(|i| GeoPoint::new(20.0 + i as f64 * 0.01, 78.0))
            .chain([GeoPoint::new(20.5, 78.0)])
            .collect();
        assert!((hotspot_intensity(here, cluster) - 0.3).abs() < 1e-9);

        let crowd = vec![here; 25];
        assert_eq!(hotspot_intensity(here, crowd), 1.0);

        // Boundary is exclusive
        assert_eq!(hotspot_intensity(here, [GeoPoint::new(20.1, 78.0)]), 0.0);
    }
}
