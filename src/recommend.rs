//! Nearby recommendations around the user's position.
//!
//! One feature query is issued per category, all at once, and the
//! aggregate is ready only when every query has finished. A failing
//! category degrades to the [`UNAVAILABLE_PLACEHOLDER`](crate::UNAVAILABLE_PLACEHOLDER)
//! without affecting the others.

use std::time::Instant;

use futures::future::join_all;
use log::{debug, info, warn};

use crate::geo_utils::bounding_box;
use crate::source::{FeatureQuery, FeatureSource, LocationProvider};
use crate::spatial::{nearest, CategoryFilter};
use crate::{BoundingBox, Coordinate, DashboardConfig, Recommendation, Result};

pub const HOTEL: &str = "hotel";
pub const FOOD: &str = "food";
pub const TOURIST_PLACES: &str = "tourist_places";

/// Recommendations for every requested category, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationSet {
    pub origin: Coordinate,
    pub recommendations: Vec<Recommendation>,
}

impl RecommendationSet {
    /// Look up a category's recommendation by name.
    pub fn get(&self, category: &str) -> Option<&Recommendation> {
        self.recommendations.iter().find(|r| r.category == category)
    }

    /// True when at least one category fell back to the placeholder.
    pub fn is_degraded(&self) -> bool {
        self.recommendations.iter().any(Recommendation::is_unavailable)
    }
}

/// Runs concurrent nearest-K queries for a fixed list of categories.
pub struct RecommendationAggregator<S: FeatureSource> {
    source: S,
    categories: Vec<CategoryFilter>,
    radius_meters: f64,
    per_category: usize,
}

impl<S: FeatureSource> RecommendationAggregator<S> {
    /// Create an aggregator for hotels, food and tourist places.
    pub fn new(source: S, config: &DashboardConfig) -> Self {
        Self {
            source,
            categories: vec![
                CategoryFilter::single(HOTEL),
                CategoryFilter::single(FOOD),
                CategoryFilter::group(TOURIST_PLACES, &config.tourist_categories[..]),
            ],
            radius_meters: config.search_radius_meters,
            per_category: config.recommendations_per_category,
        }
    }

    /// Replace the category list.
    pub fn with_categories(mut self, categories: Vec<CategoryFilter>) -> Self {
        self.categories = categories;
        self
    }

    pub fn categories(&self) -> &[CategoryFilter] {
        &self.categories
    }

    /// Recommend the nearest places in each category around `origin`.
    ///
    /// # Errors
    ///
    /// Only an origin that cannot carry a search box (out of range, or at a
    /// pole) fails the whole call. Feature store failures are absorbed per
    /// category.
    pub async fn recommend(&self, origin: &Coordinate) -> Result<RecommendationSet> {
        let bbox = bounding_box(origin, self.radius_meters)?;
        let start = Instant::now();

        let queries = self
            .categories
            .iter()
            .map(|filter| self.recommend_category(origin, bbox, filter));
        let recommendations = join_all(queries).await;

        let set = RecommendationSet {
            origin: *origin,
            recommendations,
        };

        info!(
            "[Recommendations] {} categories around ({:.4}, {:.4}) in {:?}{}",
            set.recommendations.len(),
            origin.latitude,
            origin.longitude,
            start.elapsed(),
            if set.is_degraded() { " (degraded)" } else { "" }
        );

        Ok(set)
    }

    /// Ask `provider` for the current position, then recommend around it.
    ///
    /// Location failures (no provider, permission denied) are returned to
    /// the caller, which owns the user-facing message.
    pub async fn recommend_from(&self, provider: &dyn LocationProvider) -> Result<RecommendationSet> {
        let origin = provider.current_position().await?;
        self.recommend(&origin).await
    }

    async fn recommend_category(
        &self,
        origin: &Coordinate,
        bbox: BoundingBox,
        filter: &CategoryFilter,
    ) -> Recommendation {
        let query = FeatureQuery::within(bbox).with_category(filter.clone());

        match self.source.fetch_features(&query).await {
            Ok(features) => {
                let names = nearest(&features, origin, filter, self.per_category);
                debug!(
                    "[Recommendations] {}: {} candidates -> {:?}",
                    filter.name(),
                    features.len(),
                    names
                );
                Recommendation::new(filter.name(), names)
            }
            Err(e) => {
                warn!("[Recommendations] {} unavailable: {}", filter.name(), e);
                Recommendation::unavailable(filter.name())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FeatureSource;
    use crate::spatial::FeatureIndex;
    use crate::{DashboardError, SpatialFeature};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn place(name: &str, layer: &str, lat: f64, lng: f64) -> SpatialFeature {
        SpatialFeature::new(name, layer, Coordinate::new(lat, lng))
    }

    fn ahmedabad_index() -> FeatureIndex {
        FeatureIndex::new(vec![
            place("Hyatt", "hotel", 23.0300, 72.5714),
            place("Lemon Tree", "hotel", 23.0250, 72.5714),
            place("House of MG", "hotel", 23.0240, 72.5714),
            place("Agashiye", "food", 23.0230, 72.5714),
            place("Manek Chowk", "food", 23.0400, 72.5714),
            place("Sidi Saiyyed Mosque", "Heritage_Gems", 23.0260, 72.5714),
            place("Calico Museum", "museum", 23.0235, 72.5714),
            place("Far Museum", "museum", 23.5000, 72.5714),
        ])
    }

    /// Fails every query for one category and counts calls.
    struct FailingCategory {
        inner: FeatureIndex,
        failing: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeatureSource for FailingCategory {
        async fn fetch_features(&self, query: &FeatureQuery) -> Result<Vec<SpatialFeature>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &query.category {
                Some(filter) if filter.name() == self.failing => {
                    Err(DashboardError::network("HTTP 503"))
                }
                _ => self.inner.fetch_features(query).await,
            }
        }
    }

    struct DeniedLocation;

    #[async_trait]
    impl LocationProvider for DeniedLocation {
        async fn current_position(&self) -> Result<Coordinate> {
            Err(DashboardError::PermissionDenied)
        }
    }

    struct FixedLocation(Coordinate);

    #[async_trait]
    impl LocationProvider for FixedLocation {
        async fn current_position(&self) -> Result<Coordinate> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_recommend_all_categories() {
        let aggregator = RecommendationAggregator::new(ahmedabad_index(), &DashboardConfig::default());
        let set = aggregator.recommend(&Coordinate::new(23.0225, 72.5714)).await.unwrap();

        let categories: Vec<&str> = set.recommendations.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec![HOTEL, FOOD, TOURIST_PLACES]);

        assert_eq!(set.get(HOTEL).unwrap().names, vec!["House of MG", "Lemon Tree"]);
        assert_eq!(set.get(FOOD).unwrap().names, vec!["Agashiye", "Manek Chowk"]);
        assert_eq!(
            set.get(TOURIST_PLACES).unwrap().names,
            vec!["Calico Museum", "Sidi Saiyyed Mosque"]
        );
        assert!(!set.is_degraded());
    }

    #[tokio::test]
    async fn test_failed_category_degrades_alone() {
        let source = FailingCategory {
            inner: ahmedabad_index(),
            failing: FOOD,
            calls: AtomicUsize::new(0),
        };
        let aggregator = RecommendationAggregator::new(source, &DashboardConfig::default());
        let set = aggregator.recommend(&Coordinate::new(23.0225, 72.5714)).await.unwrap();

        assert!(set.is_degraded());
        assert_eq!(set.get(FOOD).unwrap().names, vec!["Unable to load places"]);
        assert_eq!(set.get(HOTEL).unwrap().names.len(), 2);
        assert!(!set.get(TOURIST_PLACES).unwrap().is_unavailable());
        assert_eq!(aggregator.source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_area_gives_empty_lists() {
        let aggregator = RecommendationAggregator::new(ahmedabad_index(), &DashboardConfig::default());
        let set = aggregator.recommend(&Coordinate::new(-33.8688, 151.2093)).await.unwrap();
        assert!(set.recommendations.iter().all(|r| r.names.is_empty()));
        assert!(!set.is_degraded());
    }

    #[tokio::test]
    async fn test_pole_origin_rejected() {
        let aggregator = RecommendationAggregator::new(ahmedabad_index(), &DashboardConfig::default());
        let result = aggregator.recommend(&Coordinate::new(90.0, 0.0)).await;
        assert!(matches!(result, Err(DashboardError::InvalidCoordinate { .. })));
    }

    #[tokio::test]
    async fn test_location_errors_propagate() {
        let aggregator = RecommendationAggregator::new(ahmedabad_index(), &DashboardConfig::default());
        let result = aggregator.recommend_from(&DeniedLocation).await;
        assert_eq!(result, Err(DashboardError::PermissionDenied));

        let set = aggregator
            .recommend_from(&FixedLocation(Coordinate::new(23.0225, 72.5714)))
            .await
            .unwrap();
        assert_eq!(set.origin, Coordinate::new(23.0225, 72.5714));
    }

    #[tokio::test]
    async fn test_custom_categories() {
        let aggregator = RecommendationAggregator::new(ahmedabad_index(), &DashboardConfig::default())
            .with_categories(vec![CategoryFilter::single("museum")]);
        let set = aggregator.recommend(&Coordinate::new(23.0225, 72.5714)).await.unwrap();
        assert_eq!(set.recommendations.len(), 1);
        // "Far Museum" is outside the 3 km box
        assert_eq!(set.get("museum").unwrap().names, vec!["Calico Museum"]);
    }
}
