//! Search requests and their translation into task input payloads

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{InputPayloadMaps, ScraperInputPayloadMaps, TripAdvisorInput, UrlItem};

// ============================================================================
// Custom Geolocation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Closed ring of points
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(default)]
    pub coordinates: Vec<GeoPoint>,
}

/// Search area made of one or more polygons
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomGeolocation {
    #[serde(default)]
    pub polygons: Vec<Polygon>,
}

impl CustomGeolocation {
    /// GeoJSON `MultiPolygon` with `[lng, lat]` positions, one ring per polygon
    ///
    /// Returns `None` when there are no polygons.
    pub fn to_geojson(&self) -> Option<Value> {
        if self.polygons.is_empty() {
            return None;
        }

        let coordinates: Vec<Vec<Vec<[f64; 2]>>> = self
            .polygons
            .iter()
            .map(|polygon| {
                let ring = polygon
                    .coordinates
                    .iter()
                    .map(|p| [p.longitude, p.latitude])
                    .collect();
                vec![ring]
            })
            .collect();

        Some(json!({
            "type": "MultiPolygon",
            "coordinates": coordinates,
        }))
    }
}

fn geolocation_payload(geolocation: Option<&CustomGeolocation>) -> Option<Value> {
    geolocation.and_then(CustomGeolocation::to_geojson)
}

fn url_items(urls: &[String]) -> Vec<UrlItem> {
    urls.iter().map(|url| UrlItem { url: url.clone() }).collect()
}

// ============================================================================
// Google Maps Extractor
// ============================================================================

/// Search through the Google Maps extractor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub search_strings_array: Vec<String>,
    pub location_query: String,
    pub max_crawled_places_per_search: u32,
    pub language: String,
    pub country_code: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub skip_closed_places: bool,
    pub places_minimum_stars: String,
    pub start_urls: Vec<String>,
    pub custom_geolocation: Option<CustomGeolocation>,
    /// Cap on dataset items for the run
    pub number_of_results: u32,
}

impl From<&SearchRequest> for InputPayloadMaps {
    fn from(request: &SearchRequest) -> Self {
        Self {
            search_strings_array: request.search_strings_array.clone(),
            location_query: request.location_query.clone(),
            max_crawled_places_per_search: request.max_crawled_places_per_search,
            language: request.language.clone(),
            country_code: request.country_code.clone(),
            city: request.city.clone(),
            state: request.state.clone(),
            postal_code: request.postal_code.clone(),
            skip_closed_places: request.skip_closed_places,
            place_minimum_stars: request.places_minimum_stars.clone(),
            start_urls: url_items(&request.start_urls),
            custom_geolocation: geolocation_payload(request.custom_geolocation.as_ref()),
        }
    }
}

// ============================================================================
// Google Maps Scraper
// ============================================================================

/// What the scraper does when crawling an area without a search term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllPlacesNoSearchAction {
    AllPlacesNoSearchOcr,
    AllPlacesNoSearchMouse,
}

impl AllPlacesNoSearchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllPlacesNoSearchAction::AllPlacesNoSearchOcr => "all_places_no_search_ocr",
            AllPlacesNoSearchAction::AllPlacesNoSearchMouse => "all_places_no_search_mouse",
        }
    }
}

/// Search through the Google Maps scraper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperRequest {
    pub search_strings_array: Vec<String>,
    pub location_query: String,
    pub max_crawled_places_per_search: u32,
    pub language: String,
    pub max_images: u32,
    pub scrape_image_authors: bool,
    pub only_data_from_search_page: bool,
    pub include_web_results: bool,
    pub scrape_directories: bool,
    pub scrape_table_reservation_provider: bool,
    pub max_reviews: u32,
    pub reviews_start_date: String,
    pub reviews_sort: String,
    pub reviews_filter_string: String,
    pub reviews_origin: String,
    pub scrape_reviews_personal_data: bool,
    pub max_questions: u32,
    pub zoom: u32,
    pub country_code: String,
    pub city: String,
    pub state: String,
    pub county: String,
    pub postal_code: String,
    pub custom_geolocation: Option<CustomGeolocation>,
    pub category_filter_words: Vec<String>,
    pub search_matching: String,
    pub place_minimum_stars: String,
    pub skip_closed_places: bool,
    pub website: String,
    pub start_urls: Vec<String>,
    pub all_places_no_search_action: Option<AllPlacesNoSearchAction>,
}

impl From<&ScraperRequest> for ScraperInputPayloadMaps {
    fn from(request: &ScraperRequest) -> Self {
        Self {
            search_strings_array: request.search_strings_array.clone(),
            location_query: request.location_query.clone(),
            max_crawled_places_per_search: request.max_crawled_places_per_search,
            language: request.language.clone(),
            max_images: request.max_images,
            scrape_image_authors: request.scrape_image_authors,
            only_data_from_search_page: request.only_data_from_search_page,
            include_web_results: request.include_web_results,
            scrape_directories: request.scrape_directories,
            scrape_table_reservation_provider: request.scrape_table_reservation_provider,
            max_reviews: request.max_reviews,
            reviews_start_date: request.reviews_start_date.clone(),
            reviews_sort: request.reviews_sort.clone(),
            reviews_filter_string: request.reviews_filter_string.clone(),
            reviews_origin: request.reviews_origin.clone(),
            scrape_reviews_personal_data: request.scrape_reviews_personal_data,
            max_questions: request.max_questions,
            zoom: request.zoom,
            country_code: request.country_code.clone(),
            city: request.city.clone(),
            state: request.state.clone(),
            county: request.county.clone(),
            postal_code: request.postal_code.clone(),
            custom_geolocation: geolocation_payload(request.custom_geolocation.as_ref()),
            category_filter_words: request.category_filter_words.clone(),
            search_matching: request.search_matching.clone(),
            place_minimum_stars: request.place_minimum_stars.clone(),
            skip_closed_places: request.skip_closed_places,
            website: request.website.clone(),
            start_urls: url_items(&request.start_urls),
            all_places_no_search_action: request
                .all_places_no_search_action
                .map(|action| action.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

// ============================================================================
// TripAdvisor
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripadvisorRequest {
    pub query: String,
    pub start_urls: Vec<String>,
    pub max_items_per_query: u32,
    pub include_tags: bool,
    pub include_nearby_results: bool,
    pub include_attractions: bool,
    pub include_restaurants: bool,
    pub include_hotels: bool,
    pub include_vacation_rentals: bool,
    pub check_in_date: String,
    pub check_out_date: String,
    pub include_price_offers: bool,
    pub include_ai_reviews_summary: bool,
    pub language: String,
    pub currency: String,
    /// Cap on dataset items for the run
    pub number_of_results: u32,
}

impl From<&TripadvisorRequest> for TripAdvisorInput {
    fn from(request: &TripadvisorRequest) -> Self {
        Self {
            query: request.query.clone(),
            start_urls: url_items(&request.start_urls),
            max_items_per_query: request.max_items_per_query,
            include_tags: request.include_tags,
            include_nearby_results: request.include_nearby_results,
            include_attractions: request.include_attractions,
            include_restaurants: request.include_restaurants,
            include_hotels: request.include_hotels,
            include_vacation_rentals: request.include_vacation_rentals,
            check_in_date: request.check_in_date.clone(),
            check_out_date: request.check_out_date.clone(),
            include_price_offers: request.include_price_offers,
            include_ai_reviews_summary: request.include_ai_reviews_summary,
            language: request.language.clone(),
            currency: request.currency.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lat: f64, lng: f64) -> Polygon {
        Polygon {
            coordinates: vec![
                GeoPoint { latitude: lat, longitude: lng },
                GeoPoint { latitude: lat + 0.1, longitude: lng },
                GeoPoint { latitude: lat + 0.1, longitude: lng + 0.1 },
                GeoPoint { latitude: lat, longitude: lng },
            ],
        }
    }

    #[test]
    fn test_geolocation_is_lng_lat_multipolygon() {
        let geolocation = CustomGeolocation {
            polygons: vec![square(57.7, 11.9), square(59.3, 18.0)],
        };

        let geojson = geolocation.to_geojson().unwrap();
        assert_eq!(geojson["type"], "MultiPolygon");
        // polygon 0, ring 0, point 0
        assert_eq!(geojson["coordinates"][0][0][0], json!([11.9, 57.7]));
        assert_eq!(geojson["coordinates"][1][0][0], json!([18.0, 59.3]));
        assert_eq!(geojson["coordinates"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_geolocation_is_omitted() {
        let request = SearchRequest {
            search_strings_array: vec!["coffee".to_string()],
            custom_geolocation: Some(CustomGeolocation::default()),
            ..Default::default()
        };

        let payload = InputPayloadMaps::from(&request);
        assert!(payload.custom_geolocation.is_none());
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("customGeolocation").is_none());
    }

    #[test]
    fn test_scraper_action_is_lowercase() {
        let request: ScraperRequest = serde_json::from_str(
            r#"{"search_strings_array": [], "all_places_no_search_action": "all_places_no_search_ocr"}"#,
        )
        .unwrap();

        let payload = ScraperInputPayloadMaps::from(&request);
        assert_eq!(payload.all_places_no_search_action, "all_places_no_search_ocr");

        let none = ScraperInputPayloadMaps::from(&ScraperRequest::default());
        assert_eq!(none.all_places_no_search_action, "");
    }

    #[test]
    fn test_tripadvisor_start_urls() {
        let request = TripadvisorRequest {
            query: "Gothenburg".to_string(),
            start_urls: vec!["https://www.tripadvisor.com/Tourism-g189894".to_string()],
            include_hotels: true,
            ..Default::default()
        };

        let input = TripAdvisorInput::from(&request);
        assert_eq!(input.start_urls.len(), 1);
        assert!(input.include_hotels);
        assert_eq!(input.query, "Gothenburg");
    }
}
