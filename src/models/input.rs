//! Input payloads submitted to the remote scrape tasks
//!
//! Empty and zero values are omitted from the serialized body so that the
//! remote task falls back to its own defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Input of the Google Maps extractor task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputPayloadMaps {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_strings_array: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location_query: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_crawled_places_per_search: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub country_code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub postal_code: String,
    #[serde(skip_serializing_if = "is_false")]
    pub skip_closed_places: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub place_minimum_stars: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub start_urls: Vec<UrlItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_geolocation: Option<Value>,
}

/// Input of the Google Maps scraper task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScraperInputPayloadMaps {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_strings_array: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location_query: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_crawled_places_per_search: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_images: u32,
    #[serde(skip_serializing_if = "is_false")]
    pub scrape_image_authors: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub only_data_from_search_page: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub include_web_results: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub scrape_directories: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub scrape_table_reservation_provider: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_reviews: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reviews_start_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reviews_sort: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reviews_filter_string: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reviews_origin: String,
    #[serde(skip_serializing_if = "is_false")]
    pub scrape_reviews_personal_data: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_questions: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub zoom: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub country_code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub county: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_geolocation: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub category_filter_words: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub search_matching: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub place_minimum_stars: String,
    #[serde(skip_serializing_if = "is_false")]
    pub skip_closed_places: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub website: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub start_urls: Vec<UrlItem>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub all_places_no_search_action: String,
}

/// Input of the TripAdvisor task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TripAdvisorInput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub start_urls: Vec<UrlItem>,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_items_per_query: u32,
    #[serde(skip_serializing_if = "is_false")]
    pub include_tags: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub include_nearby_results: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub include_attractions: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub include_restaurants: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub include_hotels: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub include_vacation_rentals: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub check_in_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub check_out_date: String,
    #[serde(skip_serializing_if = "is_false")]
    pub include_price_offers: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub include_ai_reviews_summary: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub currency: String,
}

/// A single start URL entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlItem {
    pub url: String,
}
