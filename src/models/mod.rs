//! Point-of-interest data model
//!
//! Scraped records arrive from three engines that share no wire-level type
//! tag. Each engine gets its own record type, and [`Poi`] closes over all of
//! them so that downstream code can match exhaustively on the variant.
//!
//! ```text
//!                 ┌────────────────────────────┐
//!                 │            Poi             │
//!                 └────────────────────────────┘
//!       ┌──────────────┬──────────┼───────────┬──────────────┐
//!       ▼              ▼          ▼           ▼              ▼
//!  GooglePlace-   GooglePlace-   Hotel    Restaurant    Attraction
//!   Extractor      Scraper      (TripAdvisor variants, shared base)
//!   (Place)     (PlaceScraper)
//! ```

pub mod input;
pub mod place;
pub mod tripadvisor;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::Coordinate;

pub use input::{InputPayloadMaps, ScraperInputPayloadMaps, TripAdvisorInput, UrlItem};
pub use place::{Location, Place, PlaceScraper, PopularTimes, ReviewDistribution};
pub use tripadvisor::{AddressObj, Attraction, Hotel, Restaurant, TripadvisorPoi};

// ============================================================================
// Variant Kind
// ============================================================================

/// Discriminant of [`Poi`], also persisted alongside each row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    #[default]
    GooglePlaceExtractor,
    GooglePlaceScraper,
    Hotel,
    Restaurant,
    Attraction,
}

impl PoiKind {
    /// All kinds in declaration order
    pub const ALL: [PoiKind; 5] = [
        PoiKind::GooglePlaceExtractor,
        PoiKind::GooglePlaceScraper,
        PoiKind::Hotel,
        PoiKind::Restaurant,
        PoiKind::Attraction,
    ];

    /// Stable identifier used in storage
    pub fn as_str(&self) -> &'static str {
        match self {
            PoiKind::GooglePlaceExtractor => "google_place_extractor",
            PoiKind::GooglePlaceScraper => "google_place_scraper",
            PoiKind::Hotel => "hotel",
            PoiKind::Restaurant => "restaurant",
            PoiKind::Attraction => "attraction",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            PoiKind::GooglePlaceExtractor => "Google Place Extractor",
            PoiKind::GooglePlaceScraper => "Google Place Scraper",
            PoiKind::Hotel => "TripAdvisor Hotel",
            PoiKind::Restaurant => "TripAdvisor Restaurant",
            PoiKind::Attraction => "TripAdvisor Attraction",
        }
    }

    /// Whether this kind comes from the TripAdvisor engine
    pub fn is_tripadvisor(&self) -> bool {
        matches!(
            self,
            PoiKind::Hotel | PoiKind::Restaurant | PoiKind::Attraction
        )
    }
}

impl fmt::Display for PoiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PoiKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoiKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown POI kind: {s}"))
    }
}

// ============================================================================
// Canonical POI
// ============================================================================

/// A decoded point of interest, tagged by the engine that produced it
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum Poi {
    GooglePlaceExtractor(Place),
    GooglePlaceScraper(PlaceScraper),
    Hotel(Hotel),
    Restaurant(Restaurant),
    Attraction(Attraction),
}

impl Poi {
    pub fn kind(&self) -> PoiKind {
        match self {
            Poi::GooglePlaceExtractor(_) => PoiKind::GooglePlaceExtractor,
            Poi::GooglePlaceScraper(_) => PoiKind::GooglePlaceScraper,
            Poi::Hotel(_) => PoiKind::Hotel,
            Poi::Restaurant(_) => PoiKind::Restaurant,
            Poi::Attraction(_) => PoiKind::Attraction,
        }
    }

    /// Natural identifier: the Google place id or the TripAdvisor location id
    pub fn id(&self) -> &str {
        match self {
            Poi::GooglePlaceExtractor(p) => &p.place_id,
            Poi::GooglePlaceScraper(p) => &p.place_id,
            Poi::Hotel(h) => &h.base.id,
            Poi::Restaurant(r) => &r.base.id,
            Poi::Attraction(a) => &a.base.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Poi::GooglePlaceExtractor(p) => &p.title,
            Poi::GooglePlaceScraper(p) => &p.title,
            Poi::Hotel(h) => &h.base.name,
            Poi::Restaurant(r) => &r.base.name,
            Poi::Attraction(a) => &a.base.name,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        match self {
            Poi::GooglePlaceExtractor(p) => p.location.into(),
            Poi::GooglePlaceScraper(p) => p.location.into(),
            Poi::Hotel(h) => h.base.coordinate(),
            Poi::Restaurant(r) => r.base.coordinate(),
            Poi::Attraction(a) => a.base.coordinate(),
        }
    }

    pub fn category(&self) -> &str {
        match self {
            Poi::GooglePlaceExtractor(p) => &p.category_name,
            Poi::GooglePlaceScraper(p) => &p.category_name,
            Poi::Hotel(h) => &h.base.category,
            Poi::Restaurant(r) => &r.base.category,
            Poi::Attraction(a) => &a.base.category,
        }
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

/// Treat an explicit JSON `null` like a missing field
///
/// Upstream datasets emit `null` for plain strings, numbers and lists about
/// as often as they omit them.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
