//! PostgreSQL/PostGIS repository
//!
//! Requires the `postgis` and `h3` (h3-pg) extensions. The geography column is
//! generated from the stored longitude/latitude, so rows never carry a
//! geometry that disagrees with their coordinate.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{
    Config as PoolConfig, ManagerConfig, Pool, PoolConfig as PoolSizeConfig, RecyclingMethod,
    Runtime,
};
use h3o::CellIndex;
use serde_json::Value;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};

use super::{InsertOutcome, PoiRepository, PoiRow, StorageError};
use crate::geo::{BoundingBox, RouteBuffer};
use crate::models::PoiKind;

// ============================================================================
// Configuration
// ============================================================================

/// PostgreSQL connection settings
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Connection URL
    pub database_url: String,

    /// Maximum number of pooled connections
    pub pool_size: usize,

    /// Wait limit for a pooled connection
    pub connect_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: "postgresql://localhost/poidata".to_string(),
            pool_size: 10,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl PostgresConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }
}

// ============================================================================
// Schema and Statements
// ============================================================================

const SCHEMA: &str = r#"
CREATE EXTENSION IF NOT EXISTS postgis;
CREATE EXTENSION IF NOT EXISTS h3;

CREATE TABLE IF NOT EXISTS pois (
    id BIGSERIAL PRIMARY KEY,
    place_id TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    search_string TEXT NOT NULL DEFAULT '',
    rank INTEGER NOT NULL DEFAULT 0,
    search_page_url TEXT NOT NULL DEFAULT '',
    search_page_loaded_url TEXT NOT NULL DEFAULT '',
    is_advertisement BOOLEAN NOT NULL DEFAULT FALSE,
    title TEXT NOT NULL DEFAULT '',
    sub_title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    price TEXT NOT NULL DEFAULT '',
    category_name TEXT NOT NULL DEFAULT '',
    categories TEXT[] NOT NULL DEFAULT '{}',
    address TEXT NOT NULL DEFAULT '',
    neighborhood TEXT NOT NULL DEFAULT '',
    street TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    postal_code TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT '',
    country_code TEXT NOT NULL DEFAULT '',
    located_in TEXT NOT NULL DEFAULT '',
    plus_code TEXT NOT NULL DEFAULT '',
    website TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT '',
    phone_unformatted TEXT NOT NULL DEFAULT '',
    claim_this_business BOOLEAN NOT NULL DEFAULT FALSE,
    location_lat DOUBLE PRECISION NOT NULL,
    location_lng DOUBLE PRECISION NOT NULL,
    geom GEOGRAPHY(Point, 4326) GENERATED ALWAYS AS
        (ST_SetSRID(ST_MakePoint(location_lng, location_lat), 4326)::geography) STORED,
    h3_index TEXT,
    total_score DOUBLE PRECISION NOT NULL DEFAULT 0,
    permanently_closed BOOLEAN NOT NULL DEFAULT FALSE,
    temporarily_closed BOOLEAN NOT NULL DEFAULT FALSE,
    reviews_count INTEGER NOT NULL DEFAULT 0,
    images_count INTEGER NOT NULL DEFAULT 0,
    image_categories TEXT[] NOT NULL DEFAULT '{}',
    scraped_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    google_food_url TEXT,
    url TEXT NOT NULL DEFAULT '',
    image_url TEXT NOT NULL DEFAULT '',
    image_urls TEXT[] NOT NULL DEFAULT '{}',
    images TEXT NOT NULL DEFAULT '',
    kgmid TEXT NOT NULL DEFAULT '',
    fid TEXT NOT NULL DEFAULT '',
    cid TEXT NOT NULL DEFAULT '',
    menu TEXT NOT NULL DEFAULT '',
    reserve_table_url TEXT NOT NULL DEFAULT '',
    hotel_stars TEXT NOT NULL DEFAULT '',
    hotel_description TEXT NOT NULL DEFAULT '',
    check_in_date TEXT NOT NULL DEFAULT '',
    check_out_date TEXT NOT NULL DEFAULT '',
    popular_times_live_text TEXT NOT NULL DEFAULT '',
    popular_times_live_percent INTEGER NOT NULL DEFAULT 0,
    parent_place_url TEXT NOT NULL DEFAULT '',
    attributes JSONB NOT NULL DEFAULT '{}'::jsonb
);

CREATE INDEX IF NOT EXISTS idx_pois_geom ON pois USING GIST (geom);
CREATE INDEX IF NOT EXISTS idx_pois_h3_index ON pois (h3_index);
CREATE INDEX IF NOT EXISTS idx_pois_category_name ON pois (category_name);
"#;

/// Insertable columns, in bind order
const POI_COLUMNS: &[&str] = &[
    "place_id",
    "kind",
    "search_string",
    "rank",
    "search_page_url",
    "search_page_loaded_url",
    "is_advertisement",
    "title",
    "sub_title",
    "description",
    "price",
    "category_name",
    "categories",
    "address",
    "neighborhood",
    "street",
    "city",
    "postal_code",
    "state",
    "country_code",
    "located_in",
    "plus_code",
    "website",
    "phone",
    "phone_unformatted",
    "claim_this_business",
    "location_lat",
    "location_lng",
    "h3_index",
    "total_score",
    "permanently_closed",
    "temporarily_closed",
    "reviews_count",
    "images_count",
    "image_categories",
    "scraped_at",
    "google_food_url",
    "url",
    "image_url",
    "image_urls",
    "images",
    "kgmid",
    "fid",
    "cid",
    "menu",
    "reserve_table_url",
    "hotel_stars",
    "hotel_description",
    "check_in_date",
    "check_out_date",
    "popular_times_live_text",
    "popular_times_live_percent",
    "parent_place_url",
    "attributes",
];

fn select_columns() -> String {
    format!("id, {}", POI_COLUMNS.join(", "))
}

fn insert_statement() -> String {
    let placeholders: Vec<String> = (1..=POI_COLUMNS.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO pois ({}) VALUES ({}) RETURNING id",
        POI_COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

/// `$n::text IS NULL OR category_name ILIKE $n` with `$n` the escaped pattern
fn category_clause(param: usize) -> String {
    format!("(${param}::text IS NULL OR category_name ILIKE ${param} ESCAPE '\\')")
}

/// Wrap a substring in `%` after escaping LIKE metacharacters
fn like_pattern(substring: &str) -> String {
    let mut pattern = String::with_capacity(substring.len() + 2);
    pattern.push('%');
    for c in substring.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn insert_params<'a>(
    row: &'a PoiRow,
    kind: &'a String,
    attributes: &'a Value,
) -> Vec<&'a (dyn ToSql + Sync)> {
    vec![
        &row.place_id as &(dyn ToSql + Sync),
        kind,
        &row.search_string,
        &row.rank,
        &row.search_page_url,
        &row.search_page_loaded_url,
        &row.is_advertisement,
        &row.title,
        &row.sub_title,
        &row.description,
        &row.price,
        &row.category_name,
        &row.categories,
        &row.address,
        &row.neighborhood,
        &row.street,
        &row.city,
        &row.postal_code,
        &row.state,
        &row.country_code,
        &row.located_in,
        &row.plus_code,
        &row.website,
        &row.phone,
        &row.phone_unformatted,
        &row.claim_this_business,
        &row.location_lat,
        &row.location_lng,
        &row.h3_index,
        &row.total_score,
        &row.permanently_closed,
        &row.temporarily_closed,
        &row.reviews_count,
        &row.images_count,
        &row.image_categories,
        &row.scraped_at,
        &row.google_food_url,
        &row.url,
        &row.image_url,
        &row.image_urls,
        &row.images,
        &row.kgmid,
        &row.fid,
        &row.cid,
        &row.menu,
        &row.reserve_table_url,
        &row.hotel_stars,
        &row.hotel_description,
        &row.check_in_date,
        &row.check_out_date,
        &row.popular_times_live_text,
        &row.popular_times_live_percent,
        &row.parent_place_url,
        attributes,
    ]
}

fn row_to_poi(row: &Row) -> Result<PoiRow, StorageError> {
    let kind: String = row.try_get("kind")?;
    let kind = kind
        .parse::<PoiKind>()
        .map_err(|reason| StorageError::InvalidRow {
            column: "kind",
            reason,
        })?;

    let attributes = match row.try_get::<_, Value>("attributes")? {
        Value::Object(map) => map,
        other => {
            return Err(StorageError::InvalidRow {
                column: "attributes",
                reason: format!("expected a JSON object, got {other}"),
            })
        }
    };

    Ok(PoiRow {
        id: Some(row.try_get("id")?),
        place_id: row.try_get("place_id")?,
        kind,
        search_string: row.try_get("search_string")?,
        rank: row.try_get("rank")?,
        search_page_url: row.try_get("search_page_url")?,
        search_page_loaded_url: row.try_get("search_page_loaded_url")?,
        is_advertisement: row.try_get("is_advertisement")?,
        title: row.try_get("title")?,
        sub_title: row.try_get("sub_title")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        category_name: row.try_get("category_name")?,
        categories: row.try_get("categories")?,
        address: row.try_get("address")?,
        neighborhood: row.try_get("neighborhood")?,
        street: row.try_get("street")?,
        city: row.try_get("city")?,
        postal_code: row.try_get("postal_code")?,
        state: row.try_get("state")?,
        country_code: row.try_get("country_code")?,
        located_in: row.try_get("located_in")?,
        plus_code: row.try_get("plus_code")?,
        website: row.try_get("website")?,
        phone: row.try_get("phone")?,
        phone_unformatted: row.try_get("phone_unformatted")?,
        claim_this_business: row.try_get("claim_this_business")?,
        location_lat: row.try_get("location_lat")?,
        location_lng: row.try_get("location_lng")?,
        h3_index: row.try_get("h3_index")?,
        total_score: row.try_get("total_score")?,
        permanently_closed: row.try_get("permanently_closed")?,
        temporarily_closed: row.try_get("temporarily_closed")?,
        reviews_count: row.try_get("reviews_count")?,
        images_count: row.try_get("images_count")?,
        image_categories: row.try_get("image_categories")?,
        scraped_at: row.try_get("scraped_at")?,
        google_food_url: row.try_get("google_food_url")?,
        url: row.try_get("url")?,
        image_url: row.try_get("image_url")?,
        image_urls: row.try_get("image_urls")?,
        images: row.try_get("images")?,
        kgmid: row.try_get("kgmid")?,
        fid: row.try_get("fid")?,
        cid: row.try_get("cid")?,
        menu: row.try_get("menu")?,
        reserve_table_url: row.try_get("reserve_table_url")?,
        hotel_stars: row.try_get("hotel_stars")?,
        hotel_description: row.try_get("hotel_description")?,
        check_in_date: row.try_get("check_in_date")?,
        check_out_date: row.try_get("check_out_date")?,
        popular_times_live_text: row.try_get("popular_times_live_text")?,
        popular_times_live_percent: row.try_get("popular_times_live_percent")?,
        parent_place_url: row.try_get("parent_place_url")?,
        attributes,
    })
}

// ============================================================================
// Repository
// ============================================================================

/// PostgreSQL-backed [`PoiRepository`]
pub struct PostgresPoiRepository {
    pool: Pool,
}

impl PostgresPoiRepository {
    /// Create the connection pool and check that the server answers
    pub async fn connect(config: PostgresConfig) -> Result<Self, StorageError> {
        let mut pool_config = PoolConfig::new();
        pool_config.url = Some(config.database_url.clone());
        pool_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let mut size = PoolSizeConfig::new(config.pool_size);
        size.timeouts.wait = Some(config.connect_timeout);
        pool_config.pool = Some(size);

        let pool = pool_config.create_pool(Some(Runtime::Tokio1), NoTls)?;

        // Test connection
        let client = pool.get().await?;
        client.simple_query("SELECT 1").await?;

        info!(pool_size = config.pool_size, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create extensions, table and indexes if missing
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;

        info!("POI schema initialized");
        Ok(())
    }

    async fn select(
        &self,
        predicate: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<PoiRow>, StorageError> {
        let sql = format!(
            "SELECT {} FROM pois WHERE {predicate} ORDER BY id",
            select_columns()
        );
        let client = self.pool.get().await?;
        let rows = client.query(&sql, params).await?;
        rows.iter().map(row_to_poi).collect()
    }
}

#[async_trait]
impl PoiRepository for PostgresPoiRepository {
    async fn insert(&self, row: &PoiRow) -> Result<InsertOutcome, StorageError> {
        let kind = row.kind.as_str().to_string();
        let attributes = Value::Object(row.attributes.clone());
        let params = insert_params(row, &kind, &attributes);

        let client = self.pool.get().await?;
        match client.query_opt(&insert_statement(), &params).await {
            Ok(Some(_)) => Ok(InsertOutcome::Inserted),
            Ok(None) => Ok(InsertOutcome::NoRow),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                debug!(place_id = %row.place_id, "POI already stored");
                Ok(InsertOutcome::AlreadyPresent)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_by_cells(
        &self,
        cells: &[CellIndex],
        category: Option<&str>,
    ) -> Result<Vec<PoiRow>, StorageError> {
        let cells: Vec<String> = cells.iter().map(ToString::to_string).collect();
        let pattern = category.map(like_pattern);
        let predicate = format!(
            "h3_index IS NOT NULL AND EXISTS (\
                SELECT 1 FROM unnest($1::text[]) AS q(cell) \
                WHERE h3_cell_to_parent(h3_index::h3index, h3_get_resolution(q.cell::h3index))::text = q.cell\
            ) AND {}",
            category_clause(2)
        );
        self.select(&predicate, &[&cells, &pattern]).await
    }

    async fn list_in_box(
        &self,
        bbox: &BoundingBox,
        category: Option<&str>,
    ) -> Result<Vec<PoiRow>, StorageError> {
        let pattern = category.map(like_pattern);
        let predicate = format!(
            "ST_Covers(ST_MakeEnvelope($1, $2, $3, $4, 4326), geom::geometry) AND {}",
            category_clause(5)
        );
        self.select(
            &predicate,
            &[&bbox.min_x, &bbox.min_y, &bbox.max_x, &bbox.max_y, &pattern],
        )
        .await
    }

    async fn list_along_route(
        &self,
        route: &RouteBuffer,
        category: Option<&str>,
    ) -> Result<Vec<PoiRow>, StorageError> {
        let pattern = category.map(like_pattern);
        let predicate = format!(
            "ST_DWithin(geom, ST_SetSRID(ST_MakeLine(ST_MakePoint($2, $1), ST_MakePoint($4, $3)), 4326)::geography, $5) AND {}",
            category_clause(6)
        );
        self.select(
            &predicate,
            &[
                &route.a.lat,
                &route.a.lng,
                &route.b.lat,
                &route.b.lng,
                &route.buffer_m,
                &pattern,
            ],
        )
        .await
    }

    async fn count(&self) -> Result<usize, StorageError> {
        let client = self.pool.get().await?;
        let row = client.query_one("SELECT COUNT(*) FROM pois", &[]).await?;
        let count: i64 = row.try_get(0)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_binds_every_column() {
        let row = PoiRow::default();
        let kind = row.kind.as_str().to_string();
        let attributes = Value::Object(row.attributes.clone());

        assert_eq!(
            insert_params(&row, &kind, &attributes).len(),
            POI_COLUMNS.len()
        );
        let sql = insert_statement();
        assert!(sql.contains(&format!("${}", POI_COLUMNS.len())));
        assert!(sql.ends_with("RETURNING id"));
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("cafe"), "%cafe%");
        assert_eq!(like_pattern("100%_fun"), "%100\\%\\_fun%");
        assert_eq!(like_pattern(""), "%%");
    }

    #[test]
    fn test_category_clause_reuses_parameter() {
        assert_eq!(
            category_clause(5),
            "($5::text IS NULL OR category_name ILIKE $5 ESCAPE '\\')"
        );
    }

    #[test]
    fn test_select_lists_id_first() {
        assert!(select_columns().starts_with("id, place_id, kind"));
    }
}
