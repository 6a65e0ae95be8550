//! Google Maps records
//!
//! Two engines scrape Google Maps: the extractor emits [`Place`], the richer
//! scraper emits [`PlaceScraper`]. Fields the rest of the system does not
//! interpret (opening hours, review tags, hotel ads, ...) are kept as raw
//! JSON values and forwarded verbatim.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::nullable;
use crate::geo::Coordinate;

/// Latitude/longitude as emitted by the Google engines
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "nullable")]
    pub lat: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub lng: f64,
}

impl From<Location> for Coordinate {
    fn from(location: Location) -> Self {
        Coordinate::new(location.lat, location.lng)
    }
}

/// One Google Maps extractor record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Place {
    pub additional_info: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub address: String,
    #[serde(deserialize_with = "nullable")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub category_name: String,
    #[serde(deserialize_with = "nullable")]
    pub cid: String,
    #[serde(deserialize_with = "nullable")]
    pub city: String,
    #[serde(deserialize_with = "nullable")]
    pub claim_this_business: bool,
    #[serde(deserialize_with = "nullable")]
    pub country_code: String,
    #[serde(deserialize_with = "nullable")]
    pub fid: String,
    pub gas_prices: Option<Value>,
    pub google_food_url: Option<String>,
    pub hotel_ads: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub image_categories: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub image_url: String,
    #[serde(deserialize_with = "nullable")]
    pub images_count: i32,
    #[serde(deserialize_with = "nullable")]
    pub is_advertisement: bool,
    #[serde(deserialize_with = "nullable")]
    pub kgmid: String,
    #[serde(deserialize_with = "nullable")]
    pub location: Location,
    pub neighborhood: Option<String>,
    pub opening_hours: Option<Value>,
    pub people_also_search: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub permanently_closed: bool,
    pub phone: Option<String>,
    pub phone_unformatted: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub place_id: String,
    pub places_tags: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub postal_code: String,
    pub price: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub rank: i32,
    #[serde(deserialize_with = "nullable")]
    pub reviews_count: i32,
    pub reviews_tags: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub scraped_at: String,
    #[serde(deserialize_with = "nullable")]
    pub search_page_url: String,
    #[serde(deserialize_with = "nullable")]
    pub search_string: String,
    pub state: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub street: String,
    #[serde(deserialize_with = "nullable")]
    pub sub_title: String,
    #[serde(deserialize_with = "nullable")]
    pub temporarily_closed: bool,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub total_score: f64,
    #[serde(deserialize_with = "nullable")]
    pub url: String,
    pub website: Option<String>,
}

/// Occupancy sample inside the popular-times histogram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PopularTimes {
    #[serde(deserialize_with = "nullable")]
    pub day: String,
    #[serde(deserialize_with = "nullable")]
    pub hour: i32,
    #[serde(deserialize_with = "nullable")]
    pub occupancy_percent: i32,
}

/// Star-rating breakdown of a place's reviews
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewDistribution {
    #[serde(deserialize_with = "nullable")]
    pub one_star: i32,
    #[serde(deserialize_with = "nullable")]
    pub two_star: i32,
    #[serde(deserialize_with = "nullable")]
    pub three_star: i32,
    #[serde(deserialize_with = "nullable")]
    pub four_star: i32,
    #[serde(deserialize_with = "nullable")]
    pub five_star: i32,
}

/// One Google Maps scraper record
///
/// Carries everything [`Place`] has, with a few fields relaxed to optional,
/// plus hotel, popular-times and review detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaceScraper {
    #[serde(deserialize_with = "nullable")]
    pub search_string: String,
    #[serde(deserialize_with = "nullable")]
    pub rank: i32,
    #[serde(deserialize_with = "nullable")]
    pub search_page_url: String,
    pub search_page_loaded_url: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub is_advertisement: bool,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    pub sub_title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub category_name: String,
    #[serde(deserialize_with = "nullable")]
    pub address: String,
    pub neighborhood: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub street: String,
    #[serde(deserialize_with = "nullable")]
    pub city: String,
    #[serde(deserialize_with = "nullable")]
    pub postal_code: String,
    pub state: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub country_code: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub phone_unformatted: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub claim_this_business: bool,
    #[serde(deserialize_with = "nullable")]
    pub location: Location,
    pub located_in: Option<String>,
    pub plus_code: Option<String>,
    pub menu: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub total_score: f64,
    #[serde(deserialize_with = "nullable")]
    pub permanently_closed: bool,
    #[serde(deserialize_with = "nullable")]
    pub temporarily_closed: bool,
    #[serde(deserialize_with = "nullable")]
    pub place_id: String,
    #[serde(deserialize_with = "nullable")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub fid: String,
    #[serde(deserialize_with = "nullable")]
    pub cid: String,
    #[serde(deserialize_with = "nullable")]
    pub reviews_count: i32,
    #[serde(deserialize_with = "nullable")]
    pub reviews_distribution: ReviewDistribution,
    #[serde(deserialize_with = "nullable")]
    pub images_count: i32,
    #[serde(deserialize_with = "nullable")]
    pub image_categories: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub scraped_at: String,
    pub reserve_table_url: Option<String>,
    pub google_food_url: Option<String>,
    pub hotel_stars: Option<String>,
    pub hotel_description: Option<String>,
    pub check_in_date: Option<String>,
    pub check_out_date: Option<String>,
    pub similar_hotels_nearby: Option<Value>,
    pub hotel_review_summary: Option<Value>,
    pub hotel_ads: Option<Value>,
    pub popular_times_live_text: Option<String>,
    pub popular_times_live_percent: Option<i32>,
    pub popular_times_histogram: Option<HashMap<String, Vec<PopularTimes>>>,
    pub opening_hours: Option<Value>,
    pub people_also_search: Option<Value>,
    pub places_tags: Option<Value>,
    pub reviews_tags: Option<Value>,
    pub additional_info: Option<Value>,
    pub gas_prices: Option<Value>,
    pub questions_and_answers: Option<Value>,
    pub updates_from_customers: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub url: String,
    #[serde(deserialize_with = "nullable")]
    pub image_url: String,
    #[serde(deserialize_with = "nullable")]
    pub kgmid: String,
    pub web_results: Option<Value>,
    pub parent_place_url: Option<String>,
    pub table_reservation_links: Option<Value>,
    pub booking_links: Option<Value>,
    pub order_by: Option<Value>,
    pub images: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub image_urls: Vec<String>,
    pub reviews: Option<Value>,
    pub user_place_note: Option<Value>,
    pub restaurant_data: Option<Value>,
    pub owner_updates: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_tolerates_nulls() {
        let json = r#"{
            "title": "Feskekôrka",
            "placeId": "ChIJ-abc",
            "kgmid": "/g/11b",
            "address": null,
            "categories": null,
            "location": {"lat": 57.701, "lng": 11.958},
            "phone": null,
            "totalScore": 4.4,
            "reviewsCount": 1200,
            "openingHours": [{"day": "Monday", "hours": "10 AM to 6 PM"}]
        }"#;

        let place: Place = serde_json::from_str(json).unwrap();
        assert_eq!(place.title, "Feskekôrka");
        assert_eq!(place.address, "");
        assert!(place.categories.is_empty());
        assert!(place.phone.is_none());
        assert_eq!(place.location.lat, 57.701);
        assert!(place.opening_hours.unwrap().is_array());
    }

    #[test]
    fn test_place_rejects_wrong_types() {
        let json = r#"{"placeId": "x", "reviewsCount": "many"}"#;
        assert!(serde_json::from_str::<Place>(json).is_err());
    }

    #[test]
    fn test_scraper_popular_times() {
        let json = r#"{
            "placeId": "p",
            "searchString": "all_places_no_search",
            "popularTimesLivePercent": 35,
            "popularTimesHistogram": {
                "Mo": [{"day": "Mo", "hour": 9, "occupancyPercent": 20}]
            },
            "reviewsDistribution": {"oneStar": 1, "fiveStar": 9}
        }"#;

        let place: PlaceScraper = serde_json::from_str(json).unwrap();
        assert_eq!(place.popular_times_live_percent, Some(35));
        let histogram = place.popular_times_histogram.unwrap();
        assert_eq!(histogram["Mo"][0].occupancy_percent, 20);
        assert_eq!(place.reviews_distribution.five_star, 9);
        assert_eq!(place.reviews_distribution.two_star, 0);
    }
}
