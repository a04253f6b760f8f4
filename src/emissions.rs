//! Carbon accounting for trips.
//!
//! Every trip with a transport mode and a positive distance carries three
//! numbers:
//!
//! - `actual`: the mode's emission factor times the distance
//! - `saved`: how far below the per-km threshold the trip stayed, times the
//!   distance, never negative
//! - `ecoscore`: 0 to 100, where 100 emits nothing and 0 emits as much as
//!   the same distance by bus
//!
//! The trip log stores these when a trip is created. The summaries here
//! prefer the stored values and compute them when the log did not report
//! them.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{DashboardError, Result, TransportMode, Trip};

/// Emissions per km below which a trip counts as saving carbon.
pub const THRESHOLD_EMISSIONS_PER_KM: f64 = 113.0;

impl TransportMode {
    /// Emissions per km for this mode.
    pub fn emission_factor(&self) -> f64 {
        match self {
            TransportMode::Car => 223.6,
            TransportMode::Bus => 515.2,
            TransportMode::Ev => 0.0,
            TransportMode::Bike => 26.6,
            TransportMode::Walk => 0.0,
        }
    }
}

/// Emissions of a single trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripEmissions {
    pub actual: f64,
    pub saved: f64,
    pub ecoscore: f64,
}

/// Compute the emissions of travelling `distance_km` by `mode`.
///
/// # Errors
///
/// [`DashboardError::Validation`] when the distance is not a positive
/// finite number. The trip log refuses such trips for the same reason.
///
/// # Example
///
/// ```rust
/// use trip_insights::{trip_emissions, TransportMode};
///
/// let bike = trip_emissions(TransportMode::Bike, 10.0).unwrap();
/// assert!((bike.actual - 266.0).abs() < 1e-9);
/// assert!((bike.saved - 864.0).abs() < 1e-9);
///
/// let bus = trip_emissions(TransportMode::Bus, 10.0).unwrap();
/// assert_eq!(bus.saved, 0.0);
/// assert_eq!(bus.ecoscore, 0.0);
/// ```
pub fn trip_emissions(mode: TransportMode, distance_km: f64) -> Result<TripEmissions> {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return Err(DashboardError::validation(format!(
            "Invalid distance or transport mode: {}, {}",
            distance_km,
            mode.as_str()
        )));
    }

    let factor = mode.emission_factor();
    let actual = factor * distance_km;
    let reference = TransportMode::Bus.emission_factor() * distance_km;

    Ok(TripEmissions {
        actual,
        saved: ((THRESHOLD_EMISSIONS_PER_KM - factor) * distance_km).max(0.0),
        ecoscore: (100.0 - actual / reference * 100.0).clamp(0.0, 100.0),
    })
}

/// Stored emissions of `trip`, or computed ones when it has a mode and a
/// usable distance.
pub fn emissions_of(trip: &Trip) -> Option<TripEmissions> {
    trip.emissions.or_else(|| {
        let mode = trip.transport_mode?;
        trip_emissions(mode, trip.distance_km?).ok()
    })
}

// ============================================================================
// Summaries
// ============================================================================

/// Totals over the trip log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionsSummary {
    /// Total emissions saved
    pub saved: f64,
    /// Saved minus actual emissions; negative when trips emitted more than
    /// they saved
    pub net: f64,
}

impl EmissionsSummary {
    pub fn from_trips(trips: &[Trip]) -> Self {
        trips
            .iter()
            .filter_map(emissions_of)
            .fold(Self::default(), |mut summary, e| {
                summary.saved += e.saved;
                summary.net += e.saved - e.actual;
                summary
            })
    }
}

/// Mean ecoscore over trips with emissions, 0 when there are none.
pub fn average_ecoscore(trips: &[Trip]) -> f64 {
    let (sum, count) = trips
        .iter()
        .filter_map(emissions_of)
        .fold((0.0, 0usize), |(sum, count), e| (sum + e.ecoscore, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Emission totals for one transport mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeEmissions {
    pub transport_mode: TransportMode,
    pub actual_emissions: f64,
    pub saved_emissions: f64,
}

/// Emission totals per transport mode, in order of first appearance.
pub fn emissions_by_mode(trips: &[Trip]) -> Vec<ModeEmissions> {
    let mut slots: HashMap<TransportMode, usize> = HashMap::new();
    let mut totals: Vec<ModeEmissions> = Vec::new();

    for trip in trips {
        let (Some(mode), Some(e)) = (trip.transport_mode, emissions_of(trip)) else {
            continue;
        };
        let slot = *slots.entry(mode).or_insert_with(|| {
            totals.push(ModeEmissions {
                transport_mode: mode,
                actual_emissions: 0.0,
                saved_emissions: 0.0,
            });
            totals.len() - 1
        });
        totals[slot].actual_emissions += e.actual;
        totals[slot].saved_emissions += e.saved;
    }

    totals
}

/// Mean ecoscore of the trips on one visit date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoscorePoint {
    pub visit_date: NaiveDate,
    pub ecoscore: f64,
}

/// Mean ecoscore per visit date, oldest first.
pub fn ecoscore_timeline(trips: &[Trip]) -> Vec<EcoscorePoint> {
    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for trip in trips {
        if let Some(e) = emissions_of(trip) {
            let entry = by_date.entry(trip.visit_date).or_insert((0.0, 0));
            entry.0 += e.ecoscore;
            entry.1 += 1;
        }
    }

    by_date
        .into_iter()
        .map(|(visit_date, (sum, count))| EcoscorePoint {
            visit_date,
            ecoscore: sum / count as f64,
        })
        .collect()
}
