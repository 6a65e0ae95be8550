//! Translation of decoded POIs into persisted rows

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::geo::GeoIndexer;
use crate::models::{Place, PlaceScraper, Poi, TripadvisorPoi};
use crate::storage::PoiRow;

/// Opaque payloads shared by both Google Maps engines
const PLACE_ATTRIBUTES: &[&str] = &[
    "additionalInfo",
    "gasPrices",
    "hotelAds",
    "openingHours",
    "peopleAlsoSearch",
    "placesTags",
    "reviewsTags",
];

const SCRAPER_ATTRIBUTES: &[&str] = &[
    "reviewsDistribution",
    "similarHotelsNearby",
    "hotelReviewSummary",
    "popularTimesHistogram",
    "questionsAndAnswers",
    "updatesFromCustomers",
    "webResults",
    "tableReservationLinks",
    "bookingLinks",
    "orderBy",
    "reviews",
    "userPlaceNote",
    "restaurantData",
    "ownerUpdates",
];

const TRIPADVISOR_ATTRIBUTES: &[&str] = &[
    "type",
    "rankingPosition",
    "rankingString",
    "rankingDenominator",
    "rawRanking",
    "addressObj",
    "localName",
    "localAddress",
    "localLangCode",
    "email",
    "locationString",
    "neighborhoodLocations",
    "nearestMetroStations",
    "ancestorLocations",
    "ratingHistogram",
    "booking",
    "offerGroup",
    "subtype",
    "photos",
    "travelerChoiceAward",
    "reviewTags",
    "isNearbyResult",
    "openNowText",
    "hours",
    "menuWebUrl",
    "ownersTopReasons",
];

const HOTEL_ATTRIBUTES: &[&str] = &["hotelClass", "numberOfRooms", "amenities", "priceRange", "roomTips"];

const RESTAURANT_ATTRIBUTES: &[&str] = &[
    "cuisines",
    "dietaryRestrictions",
    "establishmentTypes",
    "features",
    "mealTypes",
    "priceRange",
    "isClaimedIcon",
    "isClaimedText",
    "orderOnline",
];

/// Build the row for a POI, computing its cell on the way
///
/// A coordinate the indexer rejects leaves `h3_index` empty.
pub fn poi_to_row(poi: &Poi, indexer: &GeoIndexer) -> Result<PoiRow, serde_json::Error> {
    let mut row = match poi {
        Poi::GooglePlaceExtractor(place) => place_row(place)?,
        Poi::GooglePlaceScraper(place) => scraper_row(place)?,
        Poi::Hotel(hotel) => {
            let mut row = tripadvisor_row(&hotel.base, hotel, HOTEL_ATTRIBUTES)?;
            row.price = hotel.price_level.clone().unwrap_or_default();
            row.check_in_date = hotel.check_in_date.clone().unwrap_or_default();
            row.check_out_date = hotel.check_out_date.clone().unwrap_or_default();
            row.hotel_stars = hotel.hotel_class.clone().unwrap_or_default();
            row
        }
        Poi::Restaurant(restaurant) => {
            let mut row = tripadvisor_row(&restaurant.base, restaurant, RESTAURANT_ATTRIBUTES)?;
            row.price = restaurant.price_level.clone().unwrap_or_default();
            row
        }
        Poi::Attraction(attraction) => tripadvisor_row(&attraction.base, attraction, &[])?,
    };

    row.kind = poi.kind();
    row.h3_index = indexer.assign_or_log(row.location_lat, row.location_lng);
    Ok(row)
}

/// Parse an RFC 3339 scrape timestamp, falling back to now
pub fn parse_scraped_at(raw: &str, place_id: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => t.with_timezone(&Utc),
        Err(e) => {
            warn!(place_id, scraped_at = raw, error = %e, "Failed to parse scrape time; using now");
            Utc::now()
        }
    }
}

/// Pick the listed non-null keys of a record's wire form
fn attributes_of<T: Serialize>(
    record: &T,
    key_sets: &[&[&str]],
) -> Result<Map<String, Value>, serde_json::Error> {
    let Value::Object(mut wire) = serde_json::to_value(record)? else {
        return Ok(Map::new());
    };

    let mut attributes = Map::new();
    for key in key_sets.iter().flat_map(|keys| keys.iter()) {
        if let Some(value) = wire.remove(*key) {
            if !value.is_null() {
                attributes.insert((*key).to_string(), value);
            }
        }
    }
    Ok(attributes)
}

fn place_row(p: &Place) -> Result<PoiRow, serde_json::Error> {
    Ok(PoiRow {
        place_id: p.place_id.clone(),
        search_string: p.search_string.clone(),
        rank: p.rank,
        search_page_url: p.search_page_url.clone(),
        is_advertisement: p.is_advertisement,
        title: p.title.clone(),
        sub_title: p.sub_title.clone(),
        price: p.price.clone().unwrap_or_default(),
        category_name: p.category_name.clone(),
        categories: p.categories.clone(),
        address: p.address.clone(),
        neighborhood: p.neighborhood.clone().unwrap_or_default(),
        street: p.street.clone(),
        city: p.city.clone(),
        postal_code: p.postal_code.clone(),
        state: p.state.clone().unwrap_or_default(),
        country_code: p.country_code.clone(),
        website: p.website.clone().unwrap_or_default(),
        phone: p.phone.clone().unwrap_or_default(),
        phone_unformatted: p.phone_unformatted.clone().unwrap_or_default(),
        claim_this_business: p.claim_this_business,
        location_lat: p.location.lat,
        location_lng: p.location.lng,
        total_score: p.total_score,
        permanently_closed: p.permanently_closed,
        temporarily_closed: p.temporarily_closed,
        reviews_count: p.reviews_count,
        images_count: p.images_count,
        image_categories: p.image_categories.clone(),
        scraped_at: parse_scraped_at(&p.scraped_at, &p.place_id),
        google_food_url: None,
        url: p.url.clone(),
        image_url: p.image_url.clone(),
        kgmid: p.kgmid.clone(),
        fid: p.fid.clone(),
        cid: p.cid.clone(),
        attributes: attributes_of(p, &[PLACE_ATTRIBUTES])?,
        ..Default::default()
    })
}

fn scraper_row(p: &PlaceScraper) -> Result<PoiRow, serde_json::Error> {
    Ok(PoiRow {
        place_id: p.place_id.clone(),
        search_string: p.search_string.clone(),
        rank: p.rank,
        search_page_url: p.search_page_url.clone(),
        search_page_loaded_url: p.search_page_loaded_url.clone().unwrap_or_default(),
        is_advertisement: p.is_advertisement,
        title: p.title.clone(),
        sub_title: p.sub_title.clone().unwrap_or_default(),
        description: p.description.clone().unwrap_or_default(),
        price: p.price.clone().unwrap_or_default(),
        category_name: p.category_name.clone(),
        categories: p.categories.clone(),
        address: p.address.clone(),
        neighborhood: p.neighborhood.clone().unwrap_or_default(),
        street: p.street.clone(),
        city: p.city.clone(),
        postal_code: p.postal_code.clone(),
        state: p.state.clone().unwrap_or_default(),
        country_code: p.country_code.clone(),
        located_in: p.located_in.clone().unwrap_or_default(),
        plus_code: p.plus_code.clone().unwrap_or_default(),
        website: p.website.clone().unwrap_or_default(),
        phone: p.phone.clone().unwrap_or_default(),
        phone_unformatted: p.phone_unformatted.clone().unwrap_or_default(),
        claim_this_business: p.claim_this_business,
        location_lat: p.location.lat,
        location_lng: p.location.lng,
        total_score: p.total_score,
        permanently_closed: p.permanently_closed,
        temporarily_closed: p.temporarily_closed,
        reviews_count: p.reviews_count,
        images_count: p.images_count,
        image_categories: p.image_categories.clone(),
        scraped_at: parse_scraped_at(&p.scraped_at, &p.place_id),
        google_food_url: None,
        url: p.url.clone(),
        image_url: p.image_url.clone(),
        image_urls: p.image_urls.clone(),
        images: p.images.clone().unwrap_or_default(),
        kgmid: p.kgmid.clone(),
        fid: p.fid.clone(),
        cid: p.cid.clone(),
        menu: p.menu.clone().unwrap_or_default(),
        reserve_table_url: p.reserve_table_url.clone().unwrap_or_default(),
        hotel_stars: p.hotel_stars.clone().unwrap_or_default(),
        hotel_description: p.hotel_description.clone().unwrap_or_default(),
        check_in_date: p.check_in_date.clone().unwrap_or_default(),
        check_out_date: p.check_out_date.clone().unwrap_or_default(),
        popular_times_live_text: p.popular_times_live_text.clone().unwrap_or_default(),
        popular_times_live_percent: p.popular_times_live_percent.unwrap_or_default(),
        parent_place_url: p.parent_place_url.clone().unwrap_or_default(),
        attributes: attributes_of(p, &[PLACE_ATTRIBUTES, SCRAPER_ATTRIBUTES])?,
        ..Default::default()
    })
}

fn tripadvisor_row<T: Serialize>(
    base: &TripadvisorPoi,
    record: &T,
    extra_attributes: &[&str],
) -> Result<PoiRow, serde_json::Error> {
    let address = base.address_obj.clone().unwrap_or_default();

    Ok(PoiRow {
        place_id: base.id.clone(),
        search_string: base.input.clone().unwrap_or_default(),
        title: base.name.clone(),
        description: base.description.clone().unwrap_or_default(),
        category_name: base.category.clone(),
        categories: base.subcategories.clone(),
        address: base.address.clone().unwrap_or_default(),
        street: address.street(),
        city: address.city.unwrap_or_default(),
        postal_code: address.postalcode.unwrap_or_default(),
        state: address.state.unwrap_or_default(),
        website: base.website.clone().unwrap_or_default(),
        phone: base.phone.clone().unwrap_or_default(),
        location_lat: base.latitude,
        location_lng: base.longitude,
        total_score: base.rating.unwrap_or_default(),
        permanently_closed: base.is_long_closed,
        temporarily_closed: base.is_closed,
        images_count: base.photo_count.unwrap_or_default(),
        scraped_at: Utc::now(),
        google_food_url: None,
        url: base.web_url.clone().unwrap_or_default(),
        image_url: base.image.clone().unwrap_or_default(),
        image_urls: base.photos.clone(),
        menu: base.menu_web_url.clone().unwrap_or_default(),
        attributes: attributes_of(record, &[TRIPADVISOR_ATTRIBUTES, extra_attributes])?,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Hotel, Location, PoiKind, PopularTimes};
    use std::collections::HashMap;

    #[test]
    fn test_place_row_flattens_optionals() {
        let place = Place {
            place_id: "p1".to_string(),
            title: "Da Matteo".to_string(),
            phone: None,
            website: Some("https://damatteo.se".to_string()),
            google_food_url: Some("https://food.google.com/x".to_string()),
            location: Location { lat: 57.70, lng: 11.97 },
            scraped_at: "2024-03-01T10:00:00Z".to_string(),
            opening_hours: Some(serde_json::json!([{"day": "Monday"}])),
            ..Default::default()
        };

        let row = poi_to_row(&Poi::GooglePlaceExtractor(place), &GeoIndexer::new()).unwrap();

        assert_eq!(row.kind, PoiKind::GooglePlaceExtractor);
        assert_eq!(row.phone, "");
        assert_eq!(row.website, "https://damatteo.se");
        // Always dropped, whatever the input says
        assert_eq!(row.google_food_url, None);
        assert_eq!(row.scraped_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert!(row.h3_index.is_some());
        assert!(row.attributes["openingHours"].is_array());
        assert!(!row.attributes.contains_key("hotelAds"));
    }

    #[test]
    fn test_bad_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let parsed = parse_scraped_at("yesterday-ish", "p1");
        assert!(parsed >= before);
    }

    #[test]
    fn test_invalid_coordinate_leaves_cell_empty() {
        let place = Place {
            place_id: "p2".to_string(),
            location: Location { lat: 123.0, lng: 11.97 },
            ..Default::default()
        };

        let row = poi_to_row(&Poi::GooglePlaceExtractor(place), &GeoIndexer::new()).unwrap();
        assert_eq!(row.place_id, "p2");
        assert!(row.h3_index.is_none());
    }

    #[test]
    fn test_scraper_histogram_goes_to_attributes() {
        let mut histogram = HashMap::new();
        histogram.insert(
            "Mo".to_string(),
            vec![PopularTimes {
                day: "Mo".to_string(),
                hour: 9,
                occupancy_percent: 40,
            }],
        );
        let place = PlaceScraper {
            place_id: "s1".to_string(),
            popular_times_histogram: Some(histogram),
            popular_times_live_percent: Some(55),
            ..Default::default()
        };

        let row = poi_to_row(&Poi::GooglePlaceScraper(place), &GeoIndexer::new()).unwrap();
        assert_eq!(row.popular_times_live_percent, 55);
        assert_eq!(
            row.attributes["popularTimesHistogram"]["Mo"][0]["occupancyPercent"],
            40
        );
    }

    #[test]
    fn test_hotel_row() {
        let json = r#"{
            "id": "206127",
            "type": "HOTEL",
            "name": "Hotel Pigalle",
            "category": "hotel",
            "latitude": 57.7062,
            "longitude": 11.9660,
            "rating": 4.5,
            "addressObj": {"street1": "Södra Hamngatan 2", "city": "Gothenburg", "postalcode": "411 06"},
            "hotelClass": "4.0",
            "amenities": ["Bar"],
            "ratingHistogram": {"count1": 3}
        }"#;
        let hotel: Hotel = serde_json::from_str(json).unwrap();

        let row = poi_to_row(&Poi::Hotel(hotel), &GeoIndexer::new()).unwrap();
        assert_eq!(row.kind, PoiKind::Hotel);
        assert_eq!(row.place_id, "206127");
        assert_eq!(row.title, "Hotel Pigalle");
        assert_eq!(row.street, "Södra Hamngatan 2");
        assert_eq!(row.city, "Gothenburg");
        assert_eq!(row.total_score, 4.5);
        assert_eq!(row.hotel_stars, "4.0");
        assert_eq!(row.attributes["type"], "HOTEL");
        assert_eq!(row.attributes["amenities"][0], "Bar");
        assert_eq!(row.attributes["ratingHistogram"]["count1"], 3);
    }
}
