//! Trip analytics: top-rated visited places and trip summaries.
//!
//! The top places list joins the trip log with the feature store:
//!
//! 1. trips are grouped by normalized location name into visit counts
//!    ([`group_visits`])
//! 2. the groups are matched against rated features
//!    ([`match_places`](crate::match_places))
//! 3. matches are ranked by rating, highest first, and cut to `n`
//!    ([`top_places`])
//!
//! [`AnalyticsAggregator`] runs the pipeline against live collaborators and
//! turns their failures into a [`TopPlacesOutcome`] instead of an error.

use std::collections::HashMap;

use futures::future::join;
use log::{debug, info, warn};

use crate::emissions::{self, EcoscorePoint, EmissionsSummary, ModeEmissions};
use crate::matcher::{match_places, CollisionPolicy};
use crate::normalize::normalize_name;
use crate::source::{FeatureQuery, FeatureSource, TripSource};
use crate::{DashboardConfig, DashboardError, MatchedPlace, Result, SpatialFeature, Trip, TripStatus, VisitedLocality};

/// Group trips into visited localities.
///
/// Trips are grouped by normalized location name; the first spelling seen
/// in each group is kept for display. Trips with a blank location are
/// ignored. The result is ordered by visit count, most visited first, with
/// ties in first-seen order.
pub fn group_visits(trips: &[Trip]) -> Vec<VisitedLocality> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut localities: Vec<VisitedLocality> = Vec::new();

    for trip in trips {
        let key = normalize_name(Some(&trip.location_name));
        if key.is_empty() {
            continue;
        }
        match slots.get(&key) {
            Some(&slot) => localities[slot].visit_count += 1,
            None => {
                slots.insert(key, localities.len());
                localities.push(VisitedLocality::new(&trip.location_name, 1));
            }
        }
    }

    localities.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    localities
}

/// Rank visited places by the rating of their matching feature.
///
/// Returns at most `n` places, highest rating first. Equal ratings keep
/// the order produced by [`group_visits`].
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use trip_insights::{top_places, CollisionPolicy, Coordinate, SpatialFeature, Trip, TripStatus};
///
/// let c = Coordinate::new(28.6, 77.2);
/// let features = vec![
///     SpatialFeature::new("Red Fort", "Heritage_Gems", c).with_rating(4.0),
///     SpatialFeature::new("Qutub Minar", "Heritage_Gems", c).with_rating(4.8),
/// ];
/// let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
/// let trips = vec![
///     Trip::new("1", "Red Fort", TripStatus::Completed, day),
///     Trip::new("2", "qutub minar", TripStatus::Completed, day),
/// ];
///
/// let top = top_places(&features, &trips, 5, CollisionPolicy::HighestRating);
/// assert_eq!(top[0].display_name, "qutub minar");
/// assert_eq!(top[1].display_name, "Red Fort");
/// ```
pub fn top_places(
    features: &[SpatialFeature],
    trips: &[Trip],
    n: usize,
    policy: CollisionPolicy,
) -> Vec<MatchedPlace> {
    let visited = group_visits(trips);
    let mut matched = match_places(features, &visited, policy);

    debug!(
        "[Analytics] {} trips -> {} localities -> {} matched",
        trips.len(),
        visited.len(),
        matched.len()
    );

    // sort_by is stable
    matched.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    matched.truncate(n);
    matched
}

/// Keep only named features with a positive rating.
pub fn rated_sites(features: Vec<SpatialFeature>) -> Vec<SpatialFeature> {
    features
        .into_iter()
        .filter(|f| f.is_rated() && !f.site_name.trim().is_empty())
        .collect()
}

// ============================================================================
// Trip Summaries
// ============================================================================

/// Number of trips in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TripCounts {
    pub pending: u32,
    pub completed: u32,
}

impl TripCounts {
    pub fn from_trips(trips: &[Trip]) -> Self {
        trips.iter().fold(Self::default(), |mut counts, trip| {
            match trip.status {
                TripStatus::Pending => counts.pending += 1,
                TripStatus::Completed => counts.completed += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> u32 {
        self.pending + self.completed
    }
}

/// Sum of recorded trip distances in kilometers.
///
/// Trips without a distance, or with a negative or non-finite one, add nothing.
pub fn total_distance_km(trips: &[Trip]) -> f64 {
    trips
        .iter()
        .filter_map(|t| t.distance_km)
        .filter(|d| d.is_finite() && *d >= 0.0)
        .sum()
}

// ============================================================================
// Aggregator
// ============================================================================

/// Result of a top places refresh, ready for a chart.
#[derive(Debug, Clone, PartialEq)]
pub enum TopPlacesOutcome {
    /// At least one visited place matched a rated feature
    Ranked(Vec<MatchedPlace>),
    /// Both sources answered but nothing matched
    NoMatches,
    /// A source failed; the message is for logs, not for display
    Unavailable { message: String },
}

impl TopPlacesOutcome {
    /// Ranked places, empty unless [`TopPlacesOutcome::Ranked`].
    pub fn places(&self) -> &[MatchedPlace] {
        match self {
            TopPlacesOutcome::Ranked(places) => places,
            _ => &[],
        }
    }

    /// Empty-state text for the chart, if any.
    pub fn empty_state(&self) -> Option<&'static str> {
        match self {
            TopPlacesOutcome::Ranked(_) => None,
            TopPlacesOutcome::NoMatches => Some("No matching places found"),
            TopPlacesOutcome::Unavailable { .. } => Some("Error updating data"),
        }
    }
}

/// Fetches features and trips and produces the analytics views.
pub struct AnalyticsAggregator<F: FeatureSource, T: TripSource> {
    features: F,
    trips: T,
    limit: usize,
    policy: CollisionPolicy,
}

impl<F: FeatureSource, T: TripSource> AnalyticsAggregator<F, T> {
    pub fn new(features: F, trips: T, config: &DashboardConfig) -> Self {
        Self {
            features,
            trips,
            limit: config.top_places_limit,
            policy: config.collision_policy,
        }
    }

    /// Fetch both sources concurrently and rank the visited places.
    ///
    /// # Errors
    ///
    /// Collaborator failures are returned as-is. An empty join is
    /// [`DashboardError::NoMatch`].
    pub async fn try_top_places(&self) -> Result<Vec<MatchedPlace>> {
        let all = FeatureQuery::all();
        let (features, trips) = join(
            self.features.fetch_features(&all),
            self.trips.fetch_trips(None),
        )
        .await;
        let (features, trips) = (features?, trips?);

        let sites = rated_sites(features);
        let ranked = top_places(&sites, &trips, self.limit, self.policy);

        info!(
            "[Analytics] {} rated sites, {} trips -> {} top places",
            sites.len(),
            trips.len(),
            ranked.len()
        );

        if ranked.is_empty() {
            Err(DashboardError::NoMatch)
        } else {
            Ok(ranked)
        }
    }

    /// Like [`try_top_places`](Self::try_top_places), with failures folded
    /// into the chart's empty states.
    pub async fn top_places(&self) -> TopPlacesOutcome {
        match self.try_top_places().await {
            Ok(ranked) => TopPlacesOutcome::Ranked(ranked),
            Err(DashboardError::NoMatch) => TopPlacesOutcome::NoMatches,
            Err(e) => {
                warn!("[Analytics] Top places unavailable: {}", e);
                TopPlacesOutcome::Unavailable {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Count trips by status.
    pub async fn trip_counts(&self) -> Result<TripCounts> {
        let trips = self.trips.fetch_trips(None).await?;
        Ok(TripCounts::from_trips(&trips))
    }

    /// Total recorded distance over all trips, in kilometers.
    pub async fn total_distance_km(&self) -> Result<f64> {
        let trips = self.trips.fetch_trips(None).await?;
        Ok(total_distance_km(&trips))
    }

    /// Completed trips only, for placing visit markers.
    pub async fn completed_trips(&self) -> Result<Vec<Trip>> {
        self.trips.fetch_trips(Some(TripStatus::Completed)).await
    }

    /// Saved and net emissions over all trips.
    pub async fn emissions_summary(&self) -> Result<EmissionsSummary> {
        let trips = self.trips.fetch_trips(None).await?;
        Ok(EmissionsSummary::from_trips(&trips))
    }

    /// Mean ecoscore over all trips with emissions.
    pub async fn average_ecoscore(&self) -> Result<f64> {
        let trips = self.trips.fetch_trips(None).await?;
        Ok(emissions::average_ecoscore(&trips))
    }

    pub async fn emissions_by_mode(&self) -> Result<Vec<ModeEmissions>> {
        let trips = self.trips.fetch_trips(None).await?;
        Ok(emissions::emissions_by_mode(&trips))
    }

    /// Mean ecoscore per visit date, oldest first.
    pub async fn ecoscore_timeline(&self) -> Result<Vec<EcoscorePoint>> {
        let trips = self.trips.fetch_trips(None).await?;
        Ok(emissions::ecoscore_timeline(&trips))
    }
}
