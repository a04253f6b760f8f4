//! Async seams to the external collaborators.
//!
//! The aggregators only talk to the outside world through these traits.
//! The `http` feature provides implementations backed by a WFS server and
//! the trip log REST API; [`FeatureIndex`] serves features from memory.

use std::sync::Arc;

use async_trait::async_trait;

use crate::spatial::{CategoryFilter, FeatureIndex};
use crate::trip_entry::NewTrip;
use crate::{BoundingBox, Coordinate, Result, SpatialFeature, Trip, TripStatus};

/// Parameters of a spatial feature request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureQuery {
    /// Restrict results to this box; `None` requests the whole store
    pub bbox: Option<BoundingBox>,
    /// Restrict results to these categories; `None` requests every layer
    pub category: Option<CategoryFilter>,
}

impl FeatureQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn within(bbox: BoundingBox) -> Self {
        Self {
            bbox: Some(bbox),
            category: None,
        }
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = Some(category);
        self
    }

    /// Check a feature against the category restriction.
    pub fn accepts(&self, feature: &SpatialFeature) -> bool {
        self.category
            .as_ref()
            .map_or(true, |filter| filter.matches(&feature.category))
    }
}

/// Read access to the spatial feature store.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    async fn fetch_features(&self, query: &FeatureQuery) -> Result<Vec<SpatialFeature>>;
}

/// Read access to the trip log.
#[async_trait]
pub trait TripSource: Send + Sync {
    /// Fetch trips, optionally only those with the given status.
    async fn fetch_trips(&self, status: Option<TripStatus>) -> Result<Vec<Trip>>;
}

/// Write access to the trip log.
#[async_trait]
pub trait TripSink: Send + Sync {
    /// Persist a trip, returning the stored record.
    ///
    /// A rejection by the store carries its message in
    /// [`DashboardError::Rejected`](crate::DashboardError::Rejected).
    async fn create_trip(&self, trip: &NewTrip) -> Result<Trip>;
}

/// Source of the user's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Fails with `UnsupportedCapability` when no provider exists and
    /// `PermissionDenied` when the user refuses access.
    async fn current_position(&self) -> Result<Coordinate>;
}

#[async_trait]
impl FeatureSource for FeatureIndex {
    async fn fetch_features(&self, query: &FeatureQuery) -> Result<Vec<SpatialFeature>> {
        let candidates: Vec<&SpatialFeature> = match &query.bbox {
            Some(bbox) => self.within(bbox),
            None => self.features().iter().collect(),
        };
        Ok(candidates
            .into_iter()
            .filter(|f| query.accepts(f))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl<S: FeatureSource + ?Sized> FeatureSource for Arc<S> {
    async fn fetch_features(&self, query: &FeatureQuery) -> Result<Vec<SpatialFeature>> {
        (**self).fetch_features(query).await
    }
}

#[async_trait]
impl<T: TripSource + ?Sized> TripSource for Arc<T> {
    async fn fetch_trips(&self, status: Option<TripStatus>) -> Result<Vec<Trip>> {
        (**self).fetch_trips(status).await
    }
}

#[async_trait]
impl<T: TripSink + ?Sized> TripSink for Arc<T> {
    async fn create_trip(&self, trip: &NewTrip) -> Result<Trip> {
        (**self).create_trip(trip).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feature_index_as_source() {
        let index = FeatureIndex::new(vec![
            SpatialFeature::new("Near", "food", Coordinate::new(0.0, 0.001)),
            SpatialFeature::new("Far", "food", Coordinate::new(5.0, 5.0)),
        ]);

        let all = index.fetch_features(&FeatureQuery::all()).await.unwrap();
        assert_eq!(all.len(), 2);

        let bbox = crate::geo_utils::bounding_box(&Coordinate::new(0.0, 0.0), 3000.0).unwrap();
        let near = index.fetch_features(&FeatureQuery::within(bbox)).await.unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].site_name, "Near");

        let hotels = index
            .fetch_features(&FeatureQuery::all().with_category(CategoryFilter::single("hotel")))
            .await
            .unwrap();
        assert!(hotels.is_empty());
    }

    #[tokio::test]
    async fn test_shared_source() {
        let index = Arc::new(FeatureIndex::new(vec![SpatialFeature::new(
            "Near",
            "food",
            Coordinate::new(0.0, 0.001),
        )]));
        let shared: Arc<dyn FeatureSource> = index.clone();

        assert_eq!(shared.fetch_features(&FeatureQuery::all()).await.unwrap().len(), 1);
        assert_eq!(index.fetch_features(&FeatureQuery::all()).await.unwrap().len(), 1);
    }
}
