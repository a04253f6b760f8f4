//! HTTP clients for the WFS feature store and the trip log API.
//!
//! This module provides:
//! - [`WfsClient`]: GeoJSON `GetFeature` requests with an optional `bbox`
//! - [`TripApiClient`]: trip listing and creation, plus the trip log's
//!   aggregates (counts, distance, emissions, ecoscore)
//!
//! Records that cannot be used (a feature without a name or coordinates, a
//! trip without a location) are skipped with a warning rather than failing the whole response. No
//! retries are attempted; a failed request is returned to the caller.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::analytics::TripCounts;
use crate::emissions::{EcoscorePoint, EmissionsSummary, ModeEmissions, TripEmissions};
use crate::source::{FeatureQuery, FeatureSource, TripSink, TripSource};
use crate::trip_entry::{parse_visit_date, NewTrip};
use crate::{
    Coordinate, DashboardConfig, DashboardError, Result, SpatialFeature, TransportMode, Trip,
    TripStatus,
};

const MAX_IDLE_PER_HOST: usize = 8;

fn build_client(config: &DashboardConfig) -> Result<Client> {
    Client::builder()
        .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Duration::from_secs(60))
        .tcp_keepalive(Duration::from_secs(30))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| DashboardError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Read a number that may arrive as a JSON number or a numeric string.
fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn text(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Read a `[lon, lat]` pair.
fn lon_lat(value: Option<&Value>) -> Option<Coordinate> {
    let pair = value?.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    let c: Coordinate = geo::Point::new(number(pair.first())?, number(pair.get(1))?).into();
    c.is_valid().then_some(c)
}

fn ensure_success(response: Response, service: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(DashboardError::network(format!("{} error: {}", service, status)))
    }
}

// ============================================================================
// WFS Feature Store
// ============================================================================

/// Parse a GeoJSON feature collection returned by WFS `GetFeature`.
///
/// Reads `site_name`, `layer`, `latitude`, `longitude` and `rating` from
/// each feature's properties, falling back to a point geometry when the
/// coordinate properties are missing. Features without a name or a valid
/// coordinate are skipped.
pub fn parse_feature_collection(body: &Value) -> Result<Vec<SpatialFeature>> {
    let features = body
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| DashboardError::malformed("feature collection has no 'features' array"))?;

    let parsed: Vec<SpatialFeature> = features.iter().filter_map(parse_feature).collect();

    let skipped = features.len() - parsed.len();
    if skipped > 0 {
        warn!("[WfsClient] Skipped {} of {} features without a name or coordinates", skipped, features.len());
    }

    Ok(parsed)
}

fn parse_feature(feature: &Value) -> Option<SpatialFeature> {
    let props = feature.get("properties")?;
    let name = text(props.get("site_name"))?;

    let from_props = match (number(props.get("latitude")), number(props.get("longitude"))) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)).filter(Coordinate::is_valid),
        _ => None,
    };
    let coordinate = from_props.or_else(|| {
        let geometry = feature.get("geometry")?;
        match geometry.get("type").and_then(Value::as_str) {
            Some("Point") => lon_lat(geometry.get("coordinates")),
            _ => None,
        }
    })?;

    Some(SpatialFeature {
        site_name: name.to_string(),
        category: props.get("layer").and_then(Value::as_str).unwrap_or_default().to_string(),
        coordinate,
        rating: number(props.get("rating")),
    })
}

/// Client for a GeoServer WFS endpoint.
pub struct WfsClient {
    client: Client,
    wfs_url: String,
    type_name: String,
    auth_header: Option<String>,
}

impl WfsClient {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let auth_header = config.geoserver_credentials.as_ref().map(|c| {
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", c.username, c.password));
            format!("Basic {}", token)
        });

        Ok(Self {
            client: build_client(config)?,
            wfs_url: config.wfs_url(),
            type_name: config.feature_type_name.clone(),
            auth_header,
        })
    }

    fn query_params(&self, query: &FeatureQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("service", "WFS".to_string()),
            ("version", "1.0.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", self.type_name.clone()),
            ("outputFormat", "application/json".to_string()),
        ];
        if let Some(bbox) = &query.bbox {
            let [min_lon, min_lat, max_lon, max_lat] = bbox.to_array();
            params.push((
                "bbox",
                format!("{},{},{},{},EPSG:4326", min_lon, min_lat, max_lon, max_lat),
            ));
        }
        params
    }
}

#[async_trait]
impl FeatureSource for WfsClient {
    async fn fetch_features(&self, query: &FeatureQuery) -> Result<Vec<SpatialFeature>> {
        let start = Instant::now();

        let mut request = self.client.get(&self.wfs_url).query(&self.query_params(query));
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = ensure_success(request.send().await?, "Geoserver")?;
        let body: Value = response.json().await?;
        let features: Vec<SpatialFeature> = parse_feature_collection(&body)?
            .into_iter()
            .filter(|f| query.accepts(f))
            .collect();

        info!(
            "[WfsClient] {} features ({}) in {:?}",
            features.len(),
            query.category.as_ref().map_or("all layers", |c| c.name()),
            start.elapsed()
        );

        Ok(features)
    }
}

// ============================================================================
// Trip Log API
// ============================================================================

/// Parse a trip list response. A non-array body is malformed.
///
/// `today` stands in for missing or unparsable visit dates.
pub fn parse_trips(body: &Value, today: NaiveDate) -> Result<Vec<Trip>> {
    let records = body
        .as_array()
        .ok_or_else(|| DashboardError::malformed("Expected array of trips"))?;

    let trips: Vec<Trip> = records.iter().filter_map(|r| parse_trip(r, today)).collect();

    let skipped = records.len() - trips.len();
    if skipped > 0 {
        warn!("[TripApiClient] Skipped {} of {} trip records without a location", skipped, records.len());
    }

    Ok(trips)
}

/// Parse one trip record.
///
/// Accepts `visitDate` or `visitdate`, and a location given either as a
/// string or as `{name, coordinates: [lon, lat]}`. Only the location name
/// is required: a missing or unparsable date becomes `today`, and a
/// missing or unknown status is derived from the visit date.
pub fn parse_trip(record: &Value, today: NaiveDate) -> Option<Trip> {
    let id = match record.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    };

    let (location_name, mut coordinate) = match record.get("location")? {
        Value::String(name) => (name.trim().to_string(), None),
        location @ Value::Object(_) => (
            text(location.get("name")).unwrap_or_default().to_string(),
            lon_lat(location.get("coordinates")),
        ),
        _ => return None,
    };
    if location_name.is_empty() {
        debug!("[TripApiClient] Trip '{}' has no location name", id);
        return None;
    }
    if coordinate.is_none() {
        if let (Some(lat), Some(lng)) = (number(record.get("latitude")), number(record.get("longitude"))) {
            coordinate = Some(Coordinate::new(lat, lng)).filter(Coordinate::is_valid);
        }
    }

    let raw_date = text(record.get("visitDate")).or_else(|| text(record.get("visitdate")));
    let visit_date = match raw_date.map(parse_visit_date) {
        Some(Ok(date)) => date,
        Some(Err(e)) => {
            debug!("[TripApiClient] Trip '{}': {}, using {}", id, e, today);
            today
        }
        None => {
            debug!("[TripApiClient] Trip '{}' has no visit date, using {}", id, today);
            today
        }
    };

    let status = match text(record.get("status")) {
        Some("completed") => TripStatus::Completed,
        Some("pending") => TripStatus::Pending,
        _ => TripStatus::for_visit_date(visit_date, today),
    };

    let transport_mode = text(record.get("transportMode"))
        .or_else(|| text(record.get("transportmode")))
        .and_then(|m| m.parse::<TransportMode>().ok());

    let emissions = match (
        number(record.get("actual_emissions")),
        number(record.get("saved_emissions")),
        number(record.get("ecoscore")),
    ) {
        (Some(actual), Some(saved), Some(ecoscore)) => Some(TripEmissions { actual, saved, ecoscore }),
        _ => None,
    };

    Some(Trip {
        id,
        location_name,
        coordinate,
        status,
        visit_date,
        distance_km: number(record.get("distance")).filter(|d| *d >= 0.0),
        transport_mode,
        category: text(record.get("category")).map(str::to_string),
        emissions,
    })
}

/// Parse the `{saved, net}` emissions totals.
pub fn parse_emissions_summary(body: &Value) -> Result<EmissionsSummary> {
    match (number(body.get("saved")), number(body.get("net"))) {
        (Some(saved), Some(net)) => Ok(EmissionsSummary { saved, net }),
        _ => Err(DashboardError::malformed("emissions response needs numeric 'saved' and 'net'")),
    }
}

/// Parse the `{ecoscore}` average. A null average means no scored trips.
pub fn parse_ecoscore(body: &Value) -> Result<f64> {
    match body.get("ecoscore") {
        Some(Value::Null) => Ok(0.0),
        value => number(value).ok_or_else(|| DashboardError::malformed("ecoscore response needs a numeric 'ecoscore'")),
    }
}

/// Parse per-mode emission totals. Rows with an unknown mode are skipped.
pub fn parse_emissions_by_mode(body: &Value) -> Result<Vec<ModeEmissions>> {
    let rows = body
        .as_array()
        .ok_or_else(|| DashboardError::malformed("Expected array of emissions by mode"))?;

    let parsed: Vec<ModeEmissions> = rows
        .iter()
        .filter_map(|row| {
            let mode = text(row.get("transportmode"))
                .or_else(|| text(row.get("transportMode")))?
                .parse::<TransportMode>()
                .ok()?;
            Some(ModeEmissions {
                transport_mode: mode,
                actual_emissions: number(row.get("actual_emissions")).unwrap_or(0.0),
                saved_emissions: number(row.get("saved_emissions")).unwrap_or(0.0),
            })
        })
        .collect();

    if parsed.len() < rows.len() {
        warn!("[TripApiClient] Skipped {} emission rows with an unknown mode", rows.len() - parsed.len());
    }
    Ok(parsed)
}

/// Parse the per-date ecoscore series. Rows without a date or score are skipped.
pub fn parse_ecoscore_timeline(body: &Value) -> Result<Vec<EcoscorePoint>> {
    let rows = body
        .as_array()
        .ok_or_else(|| DashboardError::malformed("Expected array of ecoscore points"))?;

    let mut points: Vec<EcoscorePoint> = rows
        .iter()
        .filter_map(|row| {
            let raw = text(row.get("visitdate")).or_else(|| text(row.get("visitDate")))?;
            Some(EcoscorePoint {
                visit_date: parse_visit_date(raw).ok()?,
                ecoscore: number(row.get("ecoscore"))?,
            })
        })
        .collect();
    points.sort_by_key(|p| p.visit_date);

    if points.len() < rows.len() {
        warn!("[TripApiClient] Skipped {} unusable ecoscore rows", rows.len() - points.len());
    }
    Ok(points)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalDistanceResponse {
    total_distance: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

/// Client for the trip log REST API.
pub struct TripApiClient {
    client: Client,
    trips_url: String,
    insights_url: String,
}

impl TripApiClient {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            trips_url: config.trips_api_url.trim_end_matches('/').to_string(),
            insights_url: config.insights_api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_insight(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.insights_url, path);
        let response = ensure_success(self.client.get(&url).send().await?, "Trips API")?;
        Ok(response.json().await?)
    }

    /// Saved and net emissions, as computed by the trip log.
    pub async fn fetch_emissions(&self) -> Result<EmissionsSummary> {
        parse_emissions_summary(&self.get_insight("emissions").await?)
    }

    /// Mean ecoscore over all trips, as computed by the trip log.
    pub async fn fetch_ecoscore(&self) -> Result<f64> {
        parse_ecoscore(&self.get_insight("ecoscore").await?)
    }

    pub async fn fetch_emissions_by_mode(&self) -> Result<Vec<ModeEmissions>> {
        parse_emissions_by_mode(&self.get_insight("emissions-by-mode").await?)
    }

    /// Mean ecoscore per visit date, oldest first.
    pub async fn fetch_ecoscore_timeline(&self) -> Result<Vec<EcoscorePoint>> {
        parse_ecoscore_timeline(&self.get_insight("line-chart-data").await?)
    }

    /// Trip counts by status, as computed by the trip log.
    pub async fn fetch_counts(&self) -> Result<TripCounts> {
        let url = format!("{}/counts", self.trips_url);
        let response = ensure_success(self.client.get(&url).send().await?, "Trips API")?;
        Ok(response.json::<TripCounts>().await?)
    }

    /// Total recorded distance in kilometers, as computed by the trip log.
    pub async fn fetch_total_distance(&self) -> Result<f64> {
        let url = format!("{}/total-distance", self.trips_url);
        let response = ensure_success(self.client.get(&url).send().await?, "Trips API")?;
        Ok(response.json::<TotalDistanceResponse>().await?.total_distance)
    }
}

#[async_trait]
impl TripSource for TripApiClient {
    async fn fetch_trips(&self, status: Option<TripStatus>) -> Result<Vec<Trip>> {
        let start = Instant::now();

        let mut request = self.client.get(&self.trips_url);
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }

        let response = ensure_success(request.send().await?, "Trips API")?;
        let body: Value = response.json().await?;
        let trips = parse_trips(&body, today())?;

        info!("[TripApiClient] {} trips in {:?}", trips.len(), start.elapsed());
        Ok(trips)
    }
}

#[async_trait]
impl TripSink for TripApiClient {
    async fn create_trip(&self, trip: &NewTrip) -> Result<Trip> {
        let response = self.client.post(&self.trips_url).json(trip).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("Failed to save trip ({})", status));
            return Err(DashboardError::Rejected { message });
        }

        let body: Value = response.json().await?;
        parse_trip(&body, today()).ok_or_else(|| DashboardError::malformed("created trip record is incomplete"))
    }
}
