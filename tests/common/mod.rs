//! Common test utilities

#![allow(dead_code)]

use std::time::Duration;

use poidata::apify::{ApifyClient, ClientConfig};
use serde_json::{json, Value};

pub const API_KEY: &str = "test-key";
pub const EXTRACTOR_TASK: &str = "extractor-task";
pub const SCRAPER_TASK: &str = "scraper-task";

/// Client pointed at a mock server, polling every 10ms
pub fn client_for(base_url: &str) -> ApifyClient {
    let config = ClientConfig::new(API_KEY, EXTRACTOR_TASK, SCRAPER_TASK)
        .with_base_url(base_url)
        .with_poll_interval(Duration::from_millis(10))
        .with_request_timeout(Duration::from_secs(5));
    ApifyClient::new(config).unwrap()
}

/// Run envelope as the provider returns it
pub fn run_body(run_id: &str, status: &str) -> Value {
    json!({
        "data": {
            "id": run_id,
            "actId": "act-1",
            "actorTaskId": EXTRACTOR_TASK,
            "status": status,
            "defaultDatasetId": format!("ds-{run_id}"),
        }
    })
}

/// Google Maps extractor record
pub fn extractor_place(place_id: &str, lat: f64, lng: f64, category: &str) -> Value {
    json!({
        "type": "",
        "kgmid": format!("/g/{place_id}"),
        "searchString": "coffee",
        "placeId": place_id,
        "title": format!("Place {place_id}"),
        "categoryName": category,
        "categories": [category],
        "location": {"lat": lat, "lng": lng},
        "totalScore": 4.5,
        "reviewsCount": 12,
        "scrapedAt": "2024-05-01T10:00:00.000Z",
        "googleFoodUrl": "https://food.google.com/x",
    })
}

/// Google Maps scraper record
pub fn scraper_place(place_id: &str, lat: f64, lng: f64, category: &str) -> Value {
    json!({
        "searchString": "all_places_no_search",
        "kgmid": format!("/g/{place_id}"),
        "placeId": place_id,
        "title": format!("Scraped {place_id}"),
        "categoryName": category,
        "location": {"lat": lat, "lng": lng},
        "scrapedAt": "2024-05-01T10:00:00Z",
    })
}

/// TripAdvisor hotel record
pub fn hotel(id: &str, lat: f64, lng: f64) -> Value {
    json!({
        "type": "HOTEL",
        "kgmid": "",
        "id": id,
        "name": format!("Hotel {id}"),
        "category": "hotel",
        "latitude": lat,
        "longitude": lng,
        "rating": 4.0,
        "priceRange": "$$",
        "hotelClass": "4.0",
    })
}

pub fn dataset(items: &[Value]) -> Vec<u8> {
    serde_json::to_vec(items).unwrap()
}
