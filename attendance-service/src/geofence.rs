//! Geofence validation for clock events.
//!
//! Pure great-circle math; the caller supplies the authorized location
//! and the coordinate the client reported.

use thiserror::Error;

use crate::models::Coordinate;

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Rejection of a clock event reported outside the geofence.
///
/// Always a client-correctable condition; never retried.
#[derive(Debug, Error, PartialEq)]
#[error("You are {overage_meters:.2} meters away from location.")]
pub struct OutOfRange {
    /// How far beyond the radius the reported point is, rounded to 2 decimals.
    pub overage_meters: f64,
}

/// Great-circle distance between two coordinates, in meters (haversine).
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_long = (b.long - a.long).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_long / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Check a reported coordinate against a location's geofence.
///
/// Returns the measured distance on acceptance. On rejection the overage
/// is surfaced so the caller can tell the user how far out of range they are.
pub fn check(reported: Coordinate, authorized: Coordinate, radius_meters: f64) -> Result<f64, OutOfRange> {
    let distance = distance_meters(reported, authorized);
    if distance <= radius_meters {
        return Ok(distance);
    }
    let overage = distance - radius_meters;
    Err(OutOfRange {
        overage_meters: (overage * 100.0).round() / 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: Coordinate = Coordinate {
        lat: 51.5007,
        long: -0.1246,
    };

    #[test]
    fn test_zero_distance_accepted() {
        assert!(check(SHOP, SHOP, 0.0).is_ok());
    }

    #[test]
    fn test_point_inside_radius_accepted() {
        // Roughly 78 meters north of the shop.
        let nearby = Coordinate {
            lat: SHOP.lat + 0.0007,
            long: SHOP.long,
        };
        let distance = check(nearby, SHOP, 100.0).unwrap();
        assert!(distance > 0.0 && distance < 100.0);
    }

    #[test]
    fn test_point_outside_radius_rejected_with_overage() {
        // One degree of latitude is about 111 km.
        let faraway = Coordinate {
            lat: SHOP.lat + 1.0,
            long: SHOP.long,
        };
        let err = check(faraway, SHOP, 50.0).unwrap_err();
        assert!(err.overage_meters > 0.0);
        // Overage is rounded to 2 decimals.
        assert_eq!(err.overage_meters, (err.overage_meters * 100.0).round() / 100.0);
    }

    #[test]
    fn test_overage_message() {
        let err = OutOfRange { overage_meters: 70.0 };
        assert_eq!(err.to_string(), "You are 70.00 meters away from location.");
    }
}
