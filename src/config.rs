//! Dashboard configuration.
//!
//! Every field has a default matching a local GeoServer + trip API
//! deployment, so a partial document (or none at all) is enough.

use serde::{Deserialize, Serialize};

use crate::matcher::CollisionPolicy;

/// Basic-auth credentials for the feature store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Configuration for the recommendation and analytics pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// GeoServer base URL (the WFS endpoint is `{geoserver_url}/wfs`).
    /// Default: http://localhost:8080/geoserver
    pub geoserver_url: String,

    /// WFS feature type holding the points of interest.
    /// Default: routing:ahm_point
    pub feature_type_name: String,

    /// Trip log collection endpoint.
    /// Default: http://localhost:3000/api/trips
    pub trips_api_url: String,

    /// Base of the trip log's aggregate endpoints (`/emissions`, `/ecoscore`, ...).
    /// Default: http://localhost:3000/api
    pub insights_api_url: String,

    /// Radius of the recommendation search box in meters.
    /// Default: 3000.0
    pub search_radius_meters: f64,

    /// Nearest places kept per recommendation category.
    /// Default: 2
    pub recommendations_per_category: usize,

    /// Entries in the top places list.
    /// Default: 5
    pub top_places_limit: usize,

    /// Layers grouped under the `tourist_places` category.
    pub tourist_categories: Vec<String>,

    /// Which feature wins when several share a normalized name.
    /// Default: HighestRating
    pub collision_policy: CollisionPolicy,

    /// Per-request timeout for the HTTP clients.
    /// Default: 30 seconds
    pub request_timeout_secs: u64,

    pub geoserver_credentials: Option<Credentials>,

    /// Default: 300 seconds
    pub recommendation_refresh_secs: u64,

    /// Default: 10 seconds
    pub counts_refresh_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            geoserver_url: "http://localhost:8080/geoserver".to_string(),
            feature_type_name: "routing:ahm_point".to_string(),
            trips_api_url: "http://localhost:3000/api/trips".to_string(),
            insights_api_url: "http://localhost:3000/api".to_string(),
            search_radius_meters: 3000.0,
            recommendations_per_category: 2,
            top_places_limit: 5,
            tourist_categories: [
                "Heritage_Gems",
                "museum",
                "Temples and Religious Sites",
                "Parks",
                "Public_Structure",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            collision_policy: CollisionPolicy::HighestRating,
            request_timeout_secs: 30,
            geoserver_credentials: None,
            recommendation_refresh_secs: 300,
            counts_refresh_secs: 10,
        }
    }
}

impl DashboardConfig {
    pub fn wfs_url(&self) -> String {
        format!("{}/wfs", self.geoserver_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.search_radius_meters, 3000.0);
        assert_eq!(config.recommendations_per_category, 2);
        assert_eq!(config.top_places_limit, 5);
        assert_eq!(config.tourist_categories.len(), 5);
        assert_eq!(config.wfs_url(), "http://localhost:8080/geoserver/wfs");
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: DashboardConfig = serde_json::from_str(
            r#"{"search_radius_meters": 1500.0, "collision_policy": "first_in_input"}"#,
        )
        .unwrap();
        assert_eq!(config.search_radius_meters, 1500.0);
        assert_eq!(config.collision_policy, CollisionPolicy::FirstInInput);
        assert_eq!(config.top_places_limit, 5);
        assert!(config.geoserver_credentials.is_none());
    }
}
