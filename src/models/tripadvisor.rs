//! TripAdvisor records
//!
//! Hotels, restaurants and attractions share a common base that is flattened
//! into each variant. Nested structures that are only ever forwarded (hours,
//! offers, ancestor locations, ...) stay as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::nullable;
use crate::geo::Coordinate;

/// Fields common to every TripAdvisor location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TripadvisorPoi {
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,
    #[serde(deserialize_with = "nullable")]
    pub category: String,
    #[serde(deserialize_with = "nullable")]
    pub subcategories: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub photo_count: Option<i32>,

    pub ranking_position: Option<i32>,
    pub ranking_string: Option<String>,
    pub ranking_denominator: Option<String>,
    pub rating: Option<f64>,
    pub raw_ranking: Option<f64>,

    pub phone: Option<String>,
    pub address: Option<String>,
    pub address_obj: Option<AddressObj>,
    pub local_name: Option<String>,
    pub local_address: Option<String>,
    pub local_lang_code: Option<String>,
    pub email: Option<String>,

    #[serde(deserialize_with = "nullable")]
    pub latitude: f64,
    #[serde(deserialize_with = "nullable")]
    pub longitude: f64,
    pub location_string: Option<String>,

    pub web_url: Option<String>,
    pub website: Option<String>,

    pub neighborhood_locations: Option<Value>,
    pub nearest_metro_stations: Option<Value>,
    pub ancestor_locations: Option<Value>,
    pub rating_histogram: Option<Value>,
    pub booking: Option<Value>,
    pub offer_group: Option<Value>,
    #[serde(deserialize_with = "nullable")]
    pub subtype: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub photos: Vec<String>,
    pub traveler_choice_award: Option<String>,
    pub input: Option<String>,
    pub review_tags: Option<Value>,

    #[serde(deserialize_with = "nullable")]
    pub is_nearby_result: bool,
    #[serde(deserialize_with = "nullable")]
    pub is_closed: bool,
    #[serde(deserialize_with = "nullable")]
    pub is_long_closed: bool,
    pub open_now_text: Option<String>,

    pub hours: Option<Value>,
    pub menu_web_url: Option<String>,
    pub owners_top_reasons: Option<Value>,
}

impl TripadvisorPoi {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Structured postal address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressObj {
    pub street1: Option<String>,
    pub street2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postalcode: Option<String>,
}

impl AddressObj {
    /// Street lines joined with a space, skipping blanks
    pub fn street(&self) -> String {
        [self.street1.as_deref(), self.street2.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Hotel {
    #[serde(flatten)]
    pub base: TripadvisorPoi,

    pub hotel_class: Option<String>,
    pub number_of_rooms: Option<i32>,
    #[serde(deserialize_with = "nullable")]
    pub amenities: Vec<String>,
    pub price_level: Option<String>,
    pub price_range: Option<String>,
    pub check_in_date: Option<String>,
    pub check_out_date: Option<String>,
    pub room_tips: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Restaurant {
    #[serde(flatten)]
    pub base: TripadvisorPoi,

    #[serde(deserialize_with = "nullable")]
    pub cuisines: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub dietary_restrictions: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub establishment_types: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub features: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub meal_types: Vec<String>,
    pub price_level: Option<String>,
    pub price_range: Option<String>,
    pub is_claimed_icon: Option<bool>,
    pub is_claimed_text: Option<String>,
    pub order_online: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    #[serde(flatten)]
    pub base: TripadvisorPoi,
}
