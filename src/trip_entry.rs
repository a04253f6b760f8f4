//! Trip submission: validate a draft, enrich it with distance, submit it.
//!
//! The user's position is an explicit argument. When it is unknown, or the
//! chosen destination has no coordinate, the trip is still submitted, just
//! without a distance.

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_km;
use crate::source::TripSink;
use crate::{Coordinate, DashboardError, Result, TransportMode, Trip, TripStatus};

/// A destination picked from the location list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub coordinate: Option<Coordinate>,
}

impl Destination {
    pub fn new(name: &str, coordinate: Option<Coordinate>) -> Self {
        Self {
            name: name.to_string(),
            coordinate,
        }
    }
}

/// Raw trip form input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripDraft {
    pub category: String,
    pub destination: Option<Destination>,
    /// `YYYY-MM-DD`, optionally followed by a time part
    pub visit_date: String,
    /// Empty means the default mode (bus)
    pub transport_mode: String,
}

/// A validated trip ready for the trip log's create endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub category: String,
    pub location: String,
    pub visit_date: NaiveDate,
    pub transport_mode: TransportMode,
    pub status: TripStatus,
    #[serde(rename = "distance", skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Parse a form date, accepting a trailing time part (`2024-03-15T10:00:00Z`).
pub fn parse_visit_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| DashboardError::validation(format!("invalid visit date '{}': {}", raw, e)))
}

/// Round a distance to two decimals, as stored by the trip log.
fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Validate `draft` and turn it into a [`NewTrip`].
///
/// Trips dated before `today` are recorded as completed, others as pending.
///
/// # Errors
///
/// [`DashboardError::Validation`] when a required field is missing or the
/// date or transport mode cannot be parsed.
pub fn prepare_trip(
    draft: &TripDraft,
    origin: Option<&Coordinate>,
    today: NaiveDate,
) -> Result<NewTrip> {
    let category = draft.category.trim();
    let destination = draft.destination.as_ref().filter(|d| !d.name.trim().is_empty());

    let (category, destination) = match (category.is_empty(), destination) {
        (false, Some(destination)) if !draft.visit_date.trim().is_empty() => (category, destination),
        _ => return Err(DashboardError::validation("Please fill all fields")),
    };

    let visit_date = parse_visit_date(&draft.visit_date)?;
    let transport_mode = if draft.transport_mode.trim().is_empty() {
        TransportMode::default()
    } else {
        draft.transport_mode.parse()?
    };

    let target = destination.coordinate.filter(Coordinate::is_valid);
    let distance_km = match (origin.filter(|o| o.is_valid()), target) {
        (Some(origin), Some(target)) => Some(round_km(haversine_km(origin, &target))),
        (None, _) => {
            debug!("[TripEntry] No user position, submitting without distance");
            None
        }
        (_, None) => {
            debug!("[TripEntry] '{}' has no coordinate, submitting without distance", destination.name);
            None
        }
    };

    let status = TripStatus::for_visit_date(visit_date, today);

    Ok(NewTrip {
        category: category.to_string(),
        location: destination.name.trim().to_string(),
        visit_date,
        transport_mode,
        status,
        distance_km,
        latitude: target.map(|c| c.latitude),
        longitude: target.map(|c| c.longitude),
    })
}

/// Validate, enrich and submit a draft through `sink`.
///
/// The draft is only borrowed, so on any error the caller still holds the
/// form state and can retry.
pub async fn submit_trip(
    sink: &dyn TripSink,
    draft: &TripDraft,
    origin: Option<&Coordinate>,
    today: NaiveDate,
) -> Result<Trip> {
    let trip = prepare_trip(draft, origin, today)?;

    match sink.create_trip(&trip).await {
        Ok(saved) => {
            info!(
                "[TripEntry] Saved trip {} to '{}' ({}, {})",
                saved.id,
                saved.location_name,
                saved.status,
                trip.distance_km.map_or_else(|| "no distance".to_string(), |d| format!("{:.2} km", d))
            );
            Ok(saved)
        }
        Err(e) => {
            warn!("[TripEntry] Failed to save trip to '{}': {}", trip.location, e);
            Err(e)
        }
    }
}
