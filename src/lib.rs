//! # Trip Insights
//!
//! Geospatial recommendations and trip analytics for a travel dashboard.
//!
//! This library provides:
//! - Nearest places of interest per category around a user coordinate
//! - A join between a ratings-bearing feature store and a free-text trip log
//! - Top-rated visited places and trip summaries, including carbon emissions
//!
//! ## Features
//!
//! - **`http`** - Enable WFS and trip log HTTP clients
//! - **`scheduler`** - Enable the cancellable periodic refresh task
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trip_insights::{Coordinate, SpatialFeature, CategoryFilter, nearest};
//!
//! let origin = Coordinate::new(23.0225, 72.5714); // Ahmedabad
//! let features = vec![
//!     SpatialFeature::new("Calico Museum", "museum", Coordinate::new(23.0480, 72.5800)),
//!     SpatialFeature::new("Gandhi Ashram", "museum", Coordinate::new(23.0600, 72.5800)),
//!     SpatialFeature::new("Hotel Lotus", "hotel", Coordinate::new(23.0230, 72.5720)),
//! ];
//!
//! let names = nearest(&features, &origin, &CategoryFilter::single("museum"), 2);
//! assert_eq!(names, vec!["Calico Museum", "Gandhi Ashram"]);
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{DashboardError, Result};

pub mod config;
pub use config::{Credentials, DashboardConfig};

// GeoMath
pub mod geo_utils;
pub use geo_utils::{bounding_box, haversine_km};

// NameNormalizer
pub mod normalize;
pub use normalize::normalize_name;

// SpatialFeatureFilter
pub mod spatial;
pub use spatial::{nearest, CategoryFilter, FeatureIndex};

// PlaceMatcher
pub mod matcher;
pub use matcher::{match_places, CollisionPolicy};

// Collaborator seams
pub mod source;
pub use source::{FeatureQuery, FeatureSource, LocationProvider, TripSink, TripSource};

// Aggregators
pub mod recommend;
pub use recommend::{RecommendationAggregator, RecommendationSet};

pub mod analytics;
pub use analytics::{
    group_visits, top_places, total_distance_km, AnalyticsAggregator, TopPlacesOutcome,
    TripCounts,
};

// Carbon accounting
pub mod emissions;
pub use emissions::{
    trip_emissions, EcoscorePoint, EmissionsSummary, ModeEmissions, TripEmissions,
};

// Trip submission pipeline
pub mod trip_entry;
pub use trip_entry::{prepare_trip, submit_trip, Destination, NewTrip, TripDraft};

// HTTP clients for the feature store and trip log
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{TripApiClient, WfsClient};

// Periodic refresh
#[cfg(feature = "scheduler")]
pub mod scheduler;

#[cfg(feature = "scheduler")]
pub use scheduler::PeriodicTask;

/// Placeholder shown for a recommendation category whose query failed.
pub const UNAVAILABLE_PLACEHOLDER: &str = "Unable to load places";

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in degrees.
///
/// # Example
/// ```
/// use trip_insights::Coordinate;
/// let point = Coordinate::new(28.6562, 77.2410); // Red Fort
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the coordinate is finite and within the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Point::new(c.longitude, c.latitude)
    }
}

impl From<geo::Point<f64>> for Coordinate {
    fn from(p: geo::Point<f64>) -> Self {
        Coordinate::new(p.y(), p.x())
    }
}

/// Axis-aligned search rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// The `[minLon, minLat, maxLon, maxLat]` ordering used by WFS `bbox` parameters.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a coordinate lies inside the box, edges included.
    pub fn contains(&self, c: &Coordinate) -> bool {
        c.longitude >= self.min_lon
            && c.longitude <= self.max_lon
            && c.latitude >= self.min_lat
            && c.latitude <= self.max_lat
    }

    /// The box as a `geo` rectangle (x = longitude, y = latitude).
    pub fn as_rect(&self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::coord! { x: self.min_lon, y: self.min_lat },
            geo::coord! { x: self.max_lon, y: self.max_lat },
        )
    }
}

/// A point of interest from the spatial feature store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialFeature {
    pub site_name: String,
    /// The store's "layer" attribute (`hotel`, `food`, `museum`, ...)
    pub category: String,
    pub coordinate: Coordinate,
    /// `None` or `<= 0` means unrated
    pub rating: Option<f64>,
}

impl SpatialFeature {
    /// Create an unrated feature.
    pub fn new(site_name: &str, category: &str, coordinate: Coordinate) -> Self {
        Self {
            site_name: site_name.to_string(),
            category: category.to_string(),
            coordinate,
            rating: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Rating used for ranking; unrated features rank as 0.
    pub fn rating_value(&self) -> f64 {
        self.rating.filter(|r| r.is_finite()).unwrap_or(0.0)
    }

    pub fn is_rated(&self) -> bool {
        self.rating_value() > 0.0
    }
}

/// Trip lifecycle state in the trip log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Completed,
    Pending,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Completed => "completed",
            TripStatus::Pending => "pending",
        }
    }
    /// Status of a trip dated `visit_date` as seen on `today`. Past visits
    /// are completed; today's and future ones are pending.
    pub fn for_visit_date(visit_date: chrono::NaiveDate, today: chrono::NaiveDate) -> Self {
        if visit_date < today {
            TripStatus::Completed
        } else {
            TripStatus::Pending
        }
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a trip was travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Car,
    #[default]
    Bus,
    Ev,
    Bike,
    Walk,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Car => "car",
            TransportMode::Bus => "bus",
            TransportMode::Ev => "ev",
            TransportMode::Bike => "bike",
            TransportMode::Walk => "walk",
        }
    }
}

impl std::str::FromStr for TransportMode {
    type Err = DashboardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "car" => Ok(TransportMode::Car),
            "bus" => Ok(TransportMode::Bus),
            "ev" => Ok(TransportMode::Ev),
            "bike" => Ok(TransportMode::Bike),
            "walk" => Ok(TransportMode::Walk),
            other => Err(DashboardError::validation(format!(
                "unknown transport mode '{}'",
                other
            ))),
        }
    }
}

/// A trip record read from the trip log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    /// Free-text location name as entered by the user
    pub location_name: String,
    /// Destination coordinate, when the log recorded one
    pub coordinate: Option<Coordinate>,
    pub status: TripStatus,
    pub visit_date: chrono::NaiveDate,
    pub distance_km: Option<f64>,
    pub transport_mode: Option<TransportMode>,
    pub category: Option<String>,
    /// Emissions as stored by the trip log, if it reported them
    pub emissions: Option<TripEmissions>,
}

impl Trip {
    /// Create a trip with only the fields the analytics need.
    pub fn new(
        id: &str,
        location_name: &str,
        status: TripStatus,
        visit_date: chrono::NaiveDate,
    ) -> Self {
        Self {
            id: id.to_string(),
            location_name: location_name.to_string(),
            coordinate: None,
            status,
            visit_date,
            distance_km: None,
            transport_mode: None,
            category: None,
            emissions: None,
        }
    }

    pub fn with_distance(mut self, distance_km: f64) -> Self {
        self.distance_km = Some(distance_km);
        self
    }

    pub fn with_transport_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = Some(mode);
        self
    }
}

/// A location from the trip log with how often it was visited.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitedLocality {
    /// First-seen spelling of the location, used for display
    pub display_name: String,
    pub visit_count: u32,
}

impl VisitedLocality {
    pub fn new(display_name: &str, visit_count: u32) -> Self {
        Self {
            display_name: display_name.to_string(),
            visit_count,
        }
    }
}

/// A visited locality joined with the rating of its feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPlace {
    pub display_name: String,
    pub rating: f64,
    pub visit_count: u32,
}

/// Nearest places for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub category: String,
    /// Nearest first; holds the placeholder alone when the query failed
    pub names: Vec<String>,
}

impl Recommendation {
    pub fn new(category: &str, names: Vec<String>) -> Self {
        Self {
            category: category.to_string(),
            names,
        }
    }

    /// A recommendation signalling that the category could not be loaded.
    pub fn unavailable(category: &str) -> Self {
        Self::new(category, vec![UNAVAILABLE_PLACEHOLDER.to_string()])
    }

    pub fn is_unavailable(&self) -> bool {
        self.names.len() == 1 && self.names[0] == UNAVAILABLE_PLACEHOLDER
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(28.6562, 77.2410).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_coordinate_geo_point_axes() {
        let c = Coordinate::new(23.0225, 72.5714);
        let p: geo::Point<f64> = c.into();
        assert_eq!(p.x(), 72.5714);
        assert_eq!(p.y(), 23.0225);
        assert_eq!(Coordinate::from(p), c);
    }

    #[test]
    fn test_bounding_box_contains_edges() {
        let bbox = BoundingBox { min_lon: 72.0, min_lat: 23.0, max_lon: 73.0, max_lat: 24.0 };
        assert!(bbox.contains(&Coordinate::new(23.5, 72.5)));
        assert!(bbox.contains(&Coordinate::new(23.0, 72.0)));
        assert!(!bbox.contains(&Coordinate::new(24.1, 72.5)));
        assert_eq!(bbox.to_array(), [72.0, 23.0, 73.0, 24.0]);

        let rect = bbox.as_rect();
        assert_eq!(rect.min().x, 72.0);
        assert_eq!(rect.max().y, 24.0);
    }

    #[test]
    fn test_feature_rating() {
        let c = Coordinate::new(0.0, 0.0);
        assert!(!SpatialFeature::new("a", "museum", c).is_rated());
        assert!(!SpatialFeature::new("a", "museum", c).with_rating(0.0).is_rated());
        assert!(SpatialFeature::new("a", "museum", c).with_rating(4.2).is_rated());
        assert_eq!(SpatialFeature::new("a", "museum", c).with_rating(f64::NAN).rating_value(), 0.0);
    }

    #[test]
    fn test_transport_mode_parse() {
        assert_eq!("Car".parse::<TransportMode>().unwrap(), TransportMode::Car);
        assert_eq!(" walk ".parse::<TransportMode>().unwrap(), TransportMode::Walk);
        assert!("plane".parse::<TransportMode>().is_err());
        assert_eq!(TransportMode::default(), TransportMode::Bus);
    }

    #[test]
    fn test_unavailable_recommendation() {
        let rec = Recommendation::unavailable("hotel");
        assert!(rec.is_unavailable());
        assert_eq!(rec.names, vec!["Unable to load places"]);
        assert!(!Recommendation::new("hotel", vec![]).is_unavailable());
    }
}
