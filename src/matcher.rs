//! Join between rated features and visited localities.
//!
//! Both sides are keyed by [`normalize_name`]; a locality with no feature
//! under its key is dropped. The emitted display name is always the
//! locality's own spelling, never the feature store's.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_name;
use crate::{MatchedPlace, SpatialFeature, VisitedLocality};

/// Which feature wins when several share a normalized name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The first colliding feature in input order
    FirstInInput,
    /// The highest-rated colliding feature; equal ratings fall back to input order
    #[default]
    HighestRating,
}

/// Match visited localities against features by normalized name.
///
/// Output order follows `visited`. Features and localities whose name
/// normalizes to the empty string never match. Unrated features match with
/// a rating of 0 unless the caller filtered them out beforehand.
///
/// # Example
///
/// ```rust
/// use trip_insights::{match_places, CollisionPolicy, Coordinate, SpatialFeature, VisitedLocality};
///
/// let features = vec![
///     SpatialFeature::new("Red Fort", "Heritage_Gems", Coordinate::new(28.6562, 77.2410))
///         .with_rating(4.5),
/// ];
/// let visited = vec![VisitedLocality::new("red   fort", 3)];
///
/// let matched = match_places(&features, &visited, CollisionPolicy::FirstInInput);
/// assert_eq!(matched.len(), 1);
/// assert_eq!(matched[0].display_name, "red   fort");
/// assert_eq!(matched[0].rating, 4.5);
/// assert_eq!(matched[0].visit_count, 3);
/// ```
pub fn match_places(
    features: &[SpatialFeature],
    visited: &[VisitedLocality],
    policy: CollisionPolicy,
) -> Vec<MatchedPlace> {
    if features.is_empty() || visited.is_empty() {
        return Vec::new();
    }

    let by_key = index_features(features, policy);

    visited
        .iter()
        .filter_map(|locality| {
            let key = normalize_name(Some(&locality.display_name));
            if key.is_empty() {
                return None;
            }
            match by_key.get(&key) {
                Some(&idx) => Some(MatchedPlace {
                    display_name: locality.display_name.clone(),
                    rating: features[idx].rating_value(),
                    visit_count: locality.visit_count,
                }),
                None => {
                    debug!("[PlaceMatcher] No feature for '{}'", locality.display_name);
                    None
                }
            }
        })
        .collect()
}

/// Map each normalized site name to the index of the feature that represents it.
fn index_features(features: &[SpatialFeature], policy: CollisionPolicy) -> HashMap<String, usize> {
    let mut by_key: HashMap<String, usize> = HashMap::with_capacity(features.len());

    for (idx, feature) in features.iter().enumerate() {
        let key = normalize_name(Some(&feature.site_name));
        if key.is_empty() {
            continue;
        }

        match by_key.get(&key).copied() {
            None => {
                by_key.insert(key, idx);
            }
            Some(current) => {
                debug!(
                    "[PlaceMatcher] '{}' collides with '{}'",
                    feature.site_name, features[current].site_name
                );
                if policy == CollisionPolicy::HighestRating
                    && feature.rating_value() > features[current].rating_value()
                {
                    by_key.insert(key, idx);
                }
            }
        }
    }

    by_key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    fn site(name: &str, rating: f64) -> SpatialFeature {
        SpatialFeature::new(name, "Heritage_Gems", Coordinate::new(23.0, 72.5)).with_rating(rating)
    }

    #[test]
    fn test_match_keeps_locality_display_name() {
        let features = vec![site("Red Fort", 4.5)];
        let visited = vec![VisitedLocality::new("red   fort", 3)];

        let matched = match_places(&features, &visited, CollisionPolicy::default());
        assert_eq!(
            matched,
            vec![MatchedPlace { display_name: "red   fort".to_string(), rating: 4.5, visit_count: 3 }]
        );
    }

    #[test]
    fn test_disjoint_names_match_nothing() {
        let features = vec![site("Red Fort", 4.5), site("Qutub Minar", 4.7)];
        let visited = vec![VisitedLocality::new("Lotus Temple", 2)];
        assert!(match_places(&features, &visited, CollisionPolicy::default()).is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(match_places(&[], &[VisitedLocality::new("Red Fort", 1)], CollisionPolicy::default()).is_empty());
        assert!(match_places(&[site("Red Fort", 4.5)], &[], CollisionPolicy::default()).is_empty());
    }

    #[test]
    fn test_unmatched_localities_dropped_order_kept() {
        let features = vec![site("Adalaj Stepwell", 4.6), site("Kankaria Lake", 4.2)];
        let visited = vec![
            VisitedLocality::new("Kankaria Lake", 5),
            VisitedLocality::new("Unknown Place", 9),
            VisitedLocality::new("adalaj stepwell", 1),
        ];

        let matched = match_places(&features, &visited, CollisionPolicy::default());
        let names: Vec<&str> = matched.iter().map(|m| m.display_name.as_str()).collect();
        assert_eq!(names, vec!["Kankaria Lake", "adalaj stepwell"]);
    }

    #[test]
    fn test_collision_first_in_input() {
        let features = vec![site("Jama Masjid", 3.9), site("JAMA  MASJID", 4.8)];
        let visited = vec![VisitedLocality::new("Jama Masjid", 2)];

        let matched = match_places(&features, &visited, CollisionPolicy::FirstInInput);
        assert_eq!(matched[0].rating, 3.9);
    }

    #[test]
    fn test_collision_highest_rating() {
        let features = vec![site("Jama Masjid", 3.9), site("JAMA  MASJID", 4.8), site("jama masjid", 4.8)];
        let visited = vec![VisitedLocality::new("Jama Masjid", 2)];

        let matched = match_places(&features, &visited, CollisionPolicy::HighestRating);
        assert_eq!(matched[0].rating, 4.8);
    }

    #[test]
    fn test_unrated_feature_matches_with_zero() {
        let features = vec![SpatialFeature::new("Law Garden", "Parks", Coordinate::new(23.0, 72.5))];
        let visited = vec![VisitedLocality::new("Law Garden", 1)];

        let matched = match_places(&features, &visited, CollisionPolicy::default());
        assert_eq!(matched[0].rating, 0.0);
    }

    #[test]
    fn test_blank_names_never_match() {
        let features = vec![site("   ", 4.0)];
        let visited = vec![VisitedLocality::new("", 1)];
        assert!(match_places(&features, &visited, CollisionPolicy::default()).is_empty());
    }
}
