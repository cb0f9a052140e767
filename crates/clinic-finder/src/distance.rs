//! Great-circle distance between coordinates.
use clinic_finder_data::Coordinate;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A distance function over coordinates, in kilometres.
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, a: Coordinate, b: Coordinate) -> f64;
}

/// Haversine distance on a sphere of radius [`EARTH_RADIUS_KM`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

impl DistanceMetric for Haversine {
    fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        haversine_km(a, b)
    }
}

/// Inputs are not range-checked and NaN propagates.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push h marginally above 1 for antipodal points; clamp keeps NaN.
    2.0 * EARTH_RADIUS_KM * h.sqrt().clamp(0.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROME: Coordinate = Coordinate::new(41.9028, 12.4964);
    const MILAN: Coordinate = Coordinate::new(45.4642, 9.1900);

    fn assert_relative_eq(a: f64, b: f64) {
        let scale = a.abs().max(b.abs()).max(1.0);
        assert!((a - b).abs() <= 1e-9 * scale, "{a} != {b}");
    }

    #[test]
    fn test_rome_to_milan() {
        let d = haversine_km(ROME, MILAN);
        assert!((d - 477.0).abs() <= 2.0, "Rome-Milan was {d} km");
    }

    #[test]
    fn test_symmetry() {
        let points = [
            ROME,
            MILAN,
            Coordinate::new(0.0, 0.0),
            Coordinate::new(-33.8688, 151.2093),
            Coordinate::new(64.1466, -21.9426),
            Coordinate::new(-90.0, 180.0),
            Coordinate::new(89.9, -179.9),
        ];
        for a in points {
            for b in points {
                assert_relative_eq(haversine_km(a, b), haversine_km(b, a));
            }
        }
    }

    #[test]
    fn test_identity_is_zero() {
        for p in [ROME, MILAN, Coordinate::new(0.0, 0.0), Coordinate::new(-45.0, -170.0)] {
            assert_eq!(haversine_km(p, p), 0.0);
        }
    }

    #[test]
    fn test_antipodes_are_half_circumference() {
        let d = haversine_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert_relative_eq(d, std::f64::consts::PI * EARTH_RADIUS_KM);
    }

    #[test]
    fn test_nan_propagates() {
        assert!(haversine_km(Coordinate::new(f64::NAN, 0.0), ROME).is_nan());
    }

    #[test]
    fn test_metric_trait_matches_function() {
        assert_eq!(Haversine.distance(ROME, MILAN), haversine_km(ROME, MILAN));
    }
}
