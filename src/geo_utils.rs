//! # Geographic Utilities
//!
//! Distance and search-box math for the recommendation pipeline.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_km`] | Great-circle distance between two coordinates in kilometers |
//! | [`bounding_box`] | Search box of a given radius around a coordinate |
//! | [`latitude_delta`] | Meters to degrees of latitude |
//! | [`longitude_delta`] | Meters to degrees of longitude at a latitude |
//!
//! ## Example
//!
//! ```rust
//! use trip_insights::{Coordinate, geo_utils};
//!
//! let origin = Coordinate::new(23.0225, 72.5714);
//! let bbox = geo_utils::bounding_box(&origin, 3000.0).unwrap();
//! assert!(bbox.contains(&origin));
//!
//! let red_fort = Coordinate::new(28.6562, 77.2410);
//! let km = geo_utils::haversine_km(&origin, &red_fort);
//! assert!((km - 781.0).abs() < 5.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a sphere of radius 6371 km.
//! `geo`'s `Haversine` uses the 6371.0088 km mean radius, so the formula is
//! written out here to keep results identical to the trip log's distances.
//!
//! The search box uses the flat-earth approximation of 111,320 meters per
//! degree, with the longitude delta widened by `1 / cos(latitude)`.

use crate::{BoundingBox, Coordinate, DashboardError, Result};

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two coordinates in kilometers.
///
/// Symmetric in its arguments and exactly `0.0` for identical coordinates.
///
/// # Example
///
/// ```rust
/// use trip_insights::{Coordinate, geo_utils};
///
/// let london = Coordinate::new(51.5074, -0.1278);
/// let paris = Coordinate::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_km(&london, &paris);
/// assert!((distance - 343.5).abs() < 1.0);
/// ```
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h just past 1 for near-antipodal points
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Convert meters to degrees of latitude.
#[inline]
pub fn latitude_delta(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Convert meters to degrees of longitude at the given latitude.
///
/// Returns `None` at the poles, where a degree of longitude has no width.
#[inline]
pub fn longitude_delta(meters: f64, latitude: f64) -> Option<f64> {
    let cos_lat = latitude.to_radians().cos();
    if latitude.abs() >= 90.0 || cos_lat <= f64::EPSILON {
        return None;
    }
    Some(meters / (METERS_PER_DEGREE * cos_lat))
}

/// Compute the search box of `radius_meters` around `origin`.
///
/// # Errors
///
/// - [`DashboardError::InvalidCoordinate`] for an out-of-range origin or one
///   at latitude ±90, where the longitude span would be infinite
/// - [`DashboardError::Validation`] for a negative or non-finite radius
///
/// # Example
///
/// ```rust
/// use trip_insights::{Coordinate, geo_utils};
///
/// let bbox = geo_utils::bounding_box(&Coordinate::new(0.0, 0.0), 1000.0).unwrap();
/// assert!((bbox.lon_span() - bbox.lat_span()).abs() < 1e-12);
///
/// assert!(geo_utils::bounding_box(&Coordinate::new(90.0, 0.0), 1000.0).is_err());
/// ```
pub fn bounding_box(origin: &Coordinate, radius_meters: f64) -> Result<BoundingBox> {
    if !radius_meters.is_finite() || radius_meters < 0.0 {
        return Err(DashboardError::validation(format!(
            "search radius must be a non-negative number of meters, got {}",
            radius_meters
        )));
    }

    let invalid = || DashboardError::InvalidCoordinate {
        latitude: origin.latitude,
        longitude: origin.longitude,
    };

    if !origin.is_valid() {
        return Err(invalid());
    }

    let d_lat = latitude_delta(radius_meters);
    let d_lon = longitude_delta(radius_meters, origin.latitude).ok_or_else(invalid)?;

    Ok(BoundingBox {
        min_lon: origin.longitude - d_lon,
        min_lat: origin.latitude - d_lat,
        max_lon: origin.longitude + d_lon,
        max_lat: origin.latitude + d_lat,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
