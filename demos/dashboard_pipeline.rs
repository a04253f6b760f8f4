//! End-to-end dashboard pipeline over in-memory data.
//!
//! Run with: cargo run --example dashboard_pipeline

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use trip_insights::{
    submit_trip, AnalyticsAggregator, Coordinate, DashboardConfig, DashboardError, Destination, FeatureIndex,
    NewTrip, RecommendationAggregator, Result, SpatialFeature, Trip, TripDraft, TripSink,
    TripSource, TripStatus,
};

fn ahmedabad_sites() -> FeatureIndex {
    let site = |name: &str, layer: &str, lat: f64, lng: f64| {
        SpatialFeature::new(name, layer, Coordinate::new(lat, lng))
    };
    FeatureIndex::new(vec![
        site("Hyatt Regency", "hotel", 23.0395, 72.5660),
        site("House of MG", "hotel", 23.0240, 72.5800),
        site("Agashiye", "food", 23.0241, 72.5801),
        site("Manek Chowk", "food", 23.0240, 72.5880),
        site("Sidi Saiyyed Mosque", "Heritage_Gems", 23.0266, 72.5809).with_rating(4.6),
        site("Calico Museum", "museum", 23.0490, 72.6050).with_rating(4.4),
        site("Kankaria Lake", "Parks", 23.0063, 72.6012).with_rating(4.3),
        site("Bhadra Fort", "Heritage_Gems", 23.0244, 72.5806).with_rating(4.1),
    ])
}

/// Trip log kept in memory.
struct MemoryTrips {
    trips: Mutex<Vec<Trip>>,
}

#[async_trait]
impl TripSource for MemoryTrips {
    async fn fetch_trips(&self, status: Option<TripStatus>) -> Result<Vec<Trip>> {
        let trips = self.trips.lock().map_err(|_| DashboardError::network("lock poisoned"))?;
        Ok(trips
            .iter()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TripSink for MemoryTrips {
    async fn create_trip(&self, trip: &NewTrip) -> Result<Trip> {
        let mut trips = self.trips.lock().map_err(|_| DashboardError::network("lock poisoned"))?;
        let mut saved = Trip::new(&(trips.len() + 1).to_string(), &trip.location, trip.status, trip.visit_date);
        saved.distance_km = trip.distance_km;
        saved.transport_mode = Some(trip.transport_mode);
        trips.push(saved.clone());
        Ok(saved)
    }
}

#[tokio::main]
async fn main() {
    let config = DashboardConfig::default();
    let here = Coordinate::new(23.0225, 72.5714);
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

    println!("Trip Insights Pipeline\n");

    // 1. Recommendations around the user
    let recommender = RecommendationAggregator::new(ahmedabad_sites(), &config);
    let set = recommender.recommend(&here).await.unwrap();
    println!("1. Nearby ({}m radius):", config.search_radius_meters);
    for rec in &set.recommendations {
        println!("   {:<15} {}", rec.category, rec.names.join(", "));
    }

    // 2. Log a few trips
    let log = Arc::new(MemoryTrips {
        trips: Mutex::new(Vec::new()),
    });
    let visits = [
        ("sidi saiyyed  mosque", 23.0266, 72.5809, "2024-03-01", "walk"),
        ("Kankaria Lake", 23.0063, 72.6012, "2024-03-02", "bike"),
        ("Sidi Saiyyed Mosque", 23.0266, 72.5809, "2024-03-09", "bus"),
        ("Calico Museum", 23.0490, 72.6050, "2024-04-20", "car"),
    ];
    println!("\n2. Submitting trips:");
    for (name, lat, lng, date, mode) in visits {
        let draft = TripDraft {
            category: "tourist".to_string(),
            destination: Some(Destination::new(name, Some(Coordinate::new(lat, lng)))),
            visit_date: date.to_string(),
            transport_mode: mode.to_string(),
        };
        match submit_trip(&*log, &draft, Some(&here), today).await {
            Ok(trip) => println!(
                "   #{} {} ({}, {:.2} km)",
                trip.id,
                trip.location_name,
                trip.status,
                trip.distance_km.unwrap_or(0.0)
            ),
            Err(e) => println!("   {}", e),
        }
    }

    // 3. Analytics over the log
    let analytics = AnalyticsAggregator::new(ahmedabad_sites(), log.clone(), &config);
    let counts = analytics.trip_counts().await.unwrap();
    println!("\n3. Trips: {} pending, {} completed", counts.pending, counts.completed);
    println!("   Distance: {:.2} km", analytics.total_distance_km().await.unwrap());
    let emissions = analytics.emissions_summary().await.unwrap();
    println!(
        "   Emissions: {:.1} saved, {:.1} net, ecoscore {:.0}",
        emissions.saved,
        emissions.net,
        analytics.average_ecoscore().await.unwrap()
    );

    let outcome = analytics.top_places().await;
    match outcome.empty_state() {
        Some(message) => println!("   {}", message),
        None => {
            println!("   Top places:");
            for place in outcome.places() {
                println!("     {} ({:.1}, {} visits)", place.display_name, place.rating, place.visit_count);
            }
        }
    }
}
