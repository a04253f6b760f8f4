//! Nearest-feature selection by category.
//!
//! [`nearest`] ranks candidate features by haversine distance from an
//! origin. It does not narrow candidates geographically; callers first
//! restrict the set to a search box, either through the feature store's
//! `bbox` query or locally with a [`FeatureIndex`].

use geo::Point;
use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::haversine_km;
use crate::{BoundingBox, Coordinate, SpatialFeature};

/// Which feature categories a query accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryFilter {
    /// Features whose category equals this value
    Single(String),
    /// A named group accepting any of its member categories
    Group { name: String, members: Vec<String> },
}

impl CategoryFilter {
    pub fn single(category: &str) -> Self {
        CategoryFilter::Single(category.to_string())
    }

    pub fn group<S: AsRef<str>>(name: &str, members: &[S]) -> Self {
        CategoryFilter::Group {
            name: name.to_string(),
            members: members.iter().map(|m| m.as_ref().to_string()).collect(),
        }
    }

    /// Name the results are reported under.
    pub fn name(&self) -> &str {
        match self {
            CategoryFilter::Single(category) => category,
            CategoryFilter::Group { name, .. } => name,
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::Single(wanted) => wanted == category,
            CategoryFilter::Group { members, .. } => members.iter().any(|m| m == category),
        }
    }
}

/// Return the site names of the `k` features nearest to `origin` that pass `filter`.
///
/// Ties in distance keep their input order, so repeated queries over the
/// same input give the same answer. Fewer than `k` survivors are returned
/// as-is. Features with coordinates that produce a non-finite distance are
/// skipped.
///
/// # Example
///
/// ```rust
/// use trip_insights::{Coordinate, SpatialFeature, CategoryFilter, nearest};
///
/// let origin = Coordinate::new(0.0, 0.0);
/// let features = vec![
///     SpatialFeature::new("Far", "food", Coordinate::new(0.0, 0.02)),
///     SpatialFeature::new("Near", "food", Coordinate::new(0.0, 0.01)),
///     SpatialFeature::new("Inn", "hotel", Coordinate::new(0.0, 0.001)),
/// ];
///
/// assert_eq!(nearest(&features, &origin, &CategoryFilter::single("food"), 5), vec!["Near", "Far"]);
/// ```
pub fn nearest(
    features: &[SpatialFeature],
    origin: &Coordinate,
    filter: &CategoryFilter,
    k: usize,
) -> Vec<String> {
    if k == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<(&SpatialFeature, f64)> = features
        .iter()
        .filter(|f| filter.matches(&f.category))
        .map(|f| (f, haversine_km(origin, &f.coordinate)))
        .filter(|(_, d)| d.is_finite())
        .collect();

    // sort_by is stable
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

    candidates
        .into_iter()
        .take(k)
        .map(|(f, _)| f.site_name.clone())
        .collect()
}

// =============================================================================
// R-tree Feature Index for Bounding Box Queries
// =============================================================================

/// A feature position with its index into the owning snapshot.
#[derive(Debug, Clone, Copy)]
struct IndexedFeature {
    idx: usize,
    position: Point<f64>,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.position.x(), self.position.y()])
    }
}

/// An in-memory snapshot of features with a spatial index.
///
/// Answers the same bounding box queries a WFS `bbox` parameter would,
/// returning features in their original order.
#[derive(Debug)]
pub struct FeatureIndex {
    features: Vec<SpatialFeature>,
    tree: RTree<IndexedFeature>,
}

impl FeatureIndex {
    /// Build an index over `features`. Features with invalid coordinates are
    /// kept in the snapshot but never returned by box queries.
    pub fn new(features: Vec<SpatialFeature>) -> Self {
        let indexed: Vec<IndexedFeature> = features
            .iter()
            .enumerate()
            .filter(|(_, f)| f.coordinate.is_valid())
            .map(|(i, f)| IndexedFeature {
                idx: i,
                position: f.coordinate.into(),
            })
            .collect();

        Self {
            features,
            tree: RTree::bulk_load(indexed),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// All features in the snapshot, in input order.
    pub fn features(&self) -> &[SpatialFeature] {
        &self.features
    }

    /// Features inside `bbox` (edges included), in input order.
    pub fn within(&self, bbox: &BoundingBox) -> Vec<&SpatialFeature> {
        let rect = bbox.as_rect();
        let envelope = AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|p| p.idx)
            .collect();
        hits.sort_unstable();

        hits.into_iter().map(|i| &self.features[i]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::bounding_box;

    fn museum(name: &str, lat: f64, lng: f64) -> SpatialFeature {
        SpatialFeature::new(name, "museum", Coordinate::new(lat, lng))
    }

    fn five_museums() -> Vec<SpatialFeature> {
        // Roughly 5, 1, 4, 2, 3 km east of the origin
        vec![
            museum("Five", 0.0, 0.045),
            museum("One", 0.0, 0.009),
            museum("Four", 0.0, 0.036),
            museum("Two", 0.0, 0.018),
            museum("Three", 0.0, 0.027),
        ]
    }

    #[test]
    fn test_nearest_two_museums() {
        let origin = Coordinate::new(0.0, 0.0);
        let names = nearest(&five_museums(), &origin, &CategoryFilter::single("museum"), 2);
        assert_eq!(names, vec!["One", "Two"]);
    }

    #[test]
    fn test_nearest_empty_input() {
        let origin = Coordinate::new(0.0, 0.0);
        assert!(nearest(&[], &origin, &CategoryFilter::single("museum"), 2).is_empty());
    }

    #[test]
    fn test_nearest_fewer_than_k() {
        let origin = Coordinate::new(0.0, 0.0);
        let features = vec![museum("Only", 0.0, 0.01)];
        assert_eq!(nearest(&features, &origin, &CategoryFilter::single("museum"), 2), vec!["Only"]);
        assert!(nearest(&features, &origin, &CategoryFilter::single("museum"), 0).is_empty());
    }

    #[test]
    fn test_nearest_ties_keep_input_order() {
        let origin = Coordinate::new(0.0, 0.0);
        // Same distance north, east, south
        let features = vec![
            museum("North", 0.01, 0.0),
            museum("East", 0.0, 0.01),
            museum("South", -0.01, 0.0),
        ];
        let filter = CategoryFilter::single("museum");
        assert_eq!(nearest(&features, &origin, &filter, 2), vec!["North", "East"]);
        assert_eq!(nearest(&features, &origin, &filter, 3), vec!["North", "East", "South"]);

        let twins = vec![museum("A", 0.0, 0.01), museum("B", 0.0, 0.01), museum("C", 0.0, 0.01)];
        assert_eq!(nearest(&twins, &origin, &filter, 3), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_nearest_category_filtering() {
        let origin = Coordinate::new(0.0, 0.0);
        let features = vec![
            SpatialFeature::new("Inn", "hotel", Coordinate::new(0.0, 0.001)),
            SpatialFeature::new("Dhaba", "food", Coordinate::new(0.0, 0.002)),
            SpatialFeature::new("Fort", "Heritage_Gems", Coordinate::new(0.0, 0.003)),
            SpatialFeature::new("Garden", "Parks", Coordinate::new(0.0, 0.004)),
        ];

        assert_eq!(nearest(&features, &origin, &CategoryFilter::single("hotel"), 2), vec!["Inn"]);

        let tourist = CategoryFilter::group("tourist_places", &["Heritage_Gems", "museum", "Parks"]);
        assert_eq!(tourist.name(), "tourist_places");
        assert_eq!(nearest(&features, &origin, &tourist, 2), vec!["Fort", "Garden"]);
    }

    #[test]
    fn test_nearest_skips_non_finite_distance() {
        let origin = Coordinate::new(0.0, 0.0);
        let features = vec![museum("Broken", f64::NAN, 0.0), museum("Fine", 0.0, 0.01)];
        assert_eq!(nearest(&features, &origin, &CategoryFilter::single("museum"), 2), vec!["Fine"]);
    }

    #[test]
    fn test_index_within_bbox_keeps_input_order() {
        let index = FeatureIndex::new(five_museums());
        assert_eq!(index.len(), 5);

        // 3 km reaches 0.02695 deg east, just short of "Three"
        let bbox = bounding_box(&Coordinate::new(0.0, 0.0), 3000.0).unwrap();
        let names: Vec<&str> = index.within(&bbox).iter().map(|f| f.site_name.as_str()).collect();
        assert_eq!(names, vec!["One", "Two"]);

        let wide = bounding_box(&Coordinate::new(0.0, 0.0), 10_000.0).unwrap();
        let names: Vec<&str> = index.within(&wide).iter().map(|f| f.site_name.as_str()).collect();
        assert_eq!(names, vec!["Five", "One", "Four", "Two", "Three"]);
    }

    #[test]
    fn test_index_skips_invalid_coordinates() {
        let index = FeatureIndex::new(vec![museum("Nowhere", 95.0, 0.0), museum("Here", 0.0, 0.0)]);
        let bbox = BoundingBox { min_lon: -180.0, min_lat: -90.0, max_lon: 180.0, max_lat: 90.0 };
        let names: Vec<&str> = index.within(&bbox).iter().map(|f| f.site_name.as_str()).collect();
        assert_eq!(names, vec!["Here"]);
        assert_eq!(index.features().len(), 2);
    }
}
