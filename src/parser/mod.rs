//! Dataset record parsing
//!
//! A dataset is a JSON array of records produced by one of several scrape
//! engines. Records carry no explicit type tag, so each one is classified by
//! three structural discriminators before being decoded in full:
//!
//! 1. `searchString` equal to [`ALL_PLACES_SENTINEL`] (any case) selects the
//!    Google Maps scraper record, whatever else is set.
//! 2. A non-empty `type` with an empty `kgmid` selects a TripAdvisor record
//!    (`HOTEL`, `RESTAURANT`, `ATTRACTION`); other types are skipped.
//! 3. An empty `type` with a non-empty `kgmid` selects the Google Maps
//!    extractor record.
//! 4. Anything else is dropped.
//!
//! An unreadable array or a record that fails its full decode aborts the
//! whole parse.
//!
//! # Example
//!
//! ```
//! use poidata::parser::parse_pois;
//! use poidata::models::PoiKind;
//!
//! let data = br#"[{"type": "", "kgmid": "/g/123", "placeId": "p1"}]"#;
//! let pois = parse_pois(data).unwrap();
//! assert_eq!(pois.len(), 1);
//! assert_eq!(pois[0].kind(), PoiKind::GooglePlaceExtractor);
//! ```

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::{Attraction, Hotel, Place, PlaceScraper, Poi, PoiKind, Restaurant};

/// `searchString` value the scraper emits when crawling every place in an area
pub const ALL_PLACES_SENTINEL: &str = "all_places_no_search";

// ============================================================================
// Errors
// ============================================================================

/// Errors that abort parsing of a dataset
#[derive(Error, Debug)]
pub enum ParseError {
    /// Dataset is not a JSON array
    #[error("Invalid dataset array: {0}")]
    InvalidArray(#[source] serde_json::Error),

    /// Discriminator fields of a record could not be read
    #[error("Invalid discriminator fields in item {index}: {source}")]
    InvalidDiscriminator {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Record failed to decode as the variant its discriminators selected
    #[error("Failed to decode item {index} as {kind}: {source}")]
    InvalidItem {
        index: usize,
        kind: PoiKind,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// Discriminators
// ============================================================================

/// The three fields read before a record is decoded
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Discriminator {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub kgmid: Option<String>,
    pub search_string: Option<String>,
}

/// Outcome of classifying one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Decode the record as this variant
    Decode(PoiKind),
    /// TripAdvisor record with a type this system does not model
    UnknownType(String),
    /// Neither discriminator rule matched
    Drop,
}

impl Discriminator {
    pub fn new(kind: &str, kgmid: &str, search_string: &str) -> Self {
        Self {
            kind: Some(kind.to_string()),
            kgmid: Some(kgmid.to_string()),
            search_string: Some(search_string.to_string()),
        }
    }

    /// Classify a record; rule order matters
    pub fn route(&self) -> Route {
        let kind = self.kind.as_deref().unwrap_or_default();
        let kgmid = self.kgmid.as_deref().unwrap_or_default();
        let search_string = self.search_string.as_deref().unwrap_or_default();

        if search_string.eq_ignore_ascii_case(ALL_PLACES_SENTINEL) {
            return Route::Decode(PoiKind::GooglePlaceScraper);
        }

        match (kind.is_empty(), kgmid.is_empty()) {
            (false, true) => match kind {
                "HOTEL" => Route::Decode(PoiKind::Hotel),
                "RESTAURANT" => Route::Decode(PoiKind::Restaurant),
                "ATTRACTION" => Route::Decode(PoiKind::Attraction),
                other => Route::UnknownType(other.to_string()),
            },
            (true, false) => Route::Decode(PoiKind::GooglePlaceExtractor),
            _ => Route::Drop,
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a dataset into typed POIs
///
/// # Errors
///
/// Returns [`ParseError`] when the dataset is not an array or when any
/// selected record fails to decode. Skipped and dropped records are not
/// errors.
pub fn parse_pois(data: &[u8]) -> Result<Vec<Poi>, ParseError> {
    let items: Vec<Value> = serde_json::from_slice(data).map_err(ParseError::InvalidArray)?;
    let total = items.len();
    let mut pois = Vec::with_capacity(total);

    for (index, item) in items.into_iter().enumerate() {
        // A bare null carries no discriminators at all
        if item.is_null() {
            debug!(index, "Dropping null item");
            continue;
        }

        let discriminator = Discriminator::deserialize(&item)
            .map_err(|source| ParseError::InvalidDiscriminator { index, source })?;

        match discriminator.route() {
            Route::Decode(kind) => {
                let poi = decode(kind, item)
                    .map_err(|source| ParseError::InvalidItem { index, kind, source })?;
                pois.push(poi);
            }
            Route::UnknownType(kind) => {
                debug!(index, kind = %kind, "Skipping unrecognized item type");
            }
            Route::Drop => {
                debug!(index, "Dropping item without usable discriminators");
            }
        }
    }

    debug!(total, parsed = pois.len(), "Parsed dataset");
    Ok(pois)
}

fn decode(kind: PoiKind, item: Value) -> Result<Poi, serde_json::Error> {
    Ok(match kind {
        PoiKind::GooglePlaceExtractor => Poi::GooglePlaceExtractor(Place::deserialize(item)?),
        PoiKind::GooglePlaceScraper => Poi::GooglePlaceScraper(PlaceScraper::deserialize(item)?),
        PoiKind::Hotel => Poi::Hotel(Hotel::deserialize(item)?),
        PoiKind::Restaurant => Poi::Restaurant(Restaurant::deserialize(item)?),
        PoiKind::Attraction => Poi::Attraction(Attraction::deserialize(item)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_priority() {
        // Sentinel wins even when the TripAdvisor rule would also match
        assert_eq!(
            Discriminator::new("HOTEL", "", "ALL_PLACES_NO_SEARCH").route(),
            Route::Decode(PoiKind::GooglePlaceScraper)
        );
        assert_eq!(
            Discriminator::new("RESTAURANT", "", "pizza").route(),
            Route::Decode(PoiKind::Restaurant)
        );
        assert_eq!(
            Discriminator::new("", "/g/1", "pizza").route(),
            Route::Decode(PoiKind::GooglePlaceExtractor)
        );
        assert_eq!(
            Discriminator::new("VACATION_RENTAL", "", "").route(),
            Route::UnknownType("VACATION_RENTAL".to_string())
        );
        assert_eq!(Discriminator::new("HOTEL", "/g/1", "").route(), Route::Drop);
        assert_eq!(Discriminator::default().route(), Route::Drop);
    }

    #[test]
    fn test_type_match_is_case_sensitive() {
        assert_eq!(
            Discriminator::new("hotel", "", "").route(),
            Route::UnknownType("hotel".to_string())
        );
    }

    #[test]
    fn test_parse_hotel() {
        let data = br#"[{"type": "HOTEL", "kgmid": "", "id": "h1", "name": "Pigalle"}]"#;
        let pois = parse_pois(data).unwrap();

        assert_eq!(pois.len(), 1);
        assert_eq!(pois[0].kind(), PoiKind::Hotel);
        assert_eq!(pois[0].id(), "h1");
    }

    #[test]
    fn test_parse_extractor_place() {
        let data = br#"[{"type": "", "kgmid": "g123"}]"#;
        let pois = parse_pois(data).unwrap();

        match &pois[..] {
            [Poi::GooglePlaceExtractor(place)] => assert_eq!(place.kgmid, "g123"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_skips_and_drops() {
        let data = br#"[
            {"type": "VACATION_RENTAL"},
            {"type": "HOTEL", "kgmid": "/g/1"},
            {},
            null,
            {"kgmid": "/g/2", "placeId": "kept"}
        ]"#;
        let pois = parse_pois(data).unwrap();

        assert_eq!(pois.len(), 1);
        assert_eq!(pois[0].id(), "kept");
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_pois(br#"{"type": "HOTEL"}"#),
            Err(ParseError::InvalidArray(_))
        ));
        assert!(matches!(
            parse_pois(b"not json"),
            Err(ParseError::InvalidArray(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_object_item() {
        assert!(matches!(
            parse_pois(b"[42]"),
            Err(ParseError::InvalidDiscriminator { index: 0, .. })
        ));
    }

    #[test]
    fn test_parse_aborts_on_bad_item() {
        let data = br#"[
            {"kgmid": "/g/1", "placeId": "ok"},
            {"kgmid": "/g/2", "reviewsCount": "lots"}
        ]"#;

        match parse_pois(data) {
            Err(ParseError::InvalidItem { index, kind, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(kind, PoiKind::GooglePlaceExtractor);
            }
            other => panic!("expected item error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_pois(b"[]").unwrap().is_empty());
    }
}
