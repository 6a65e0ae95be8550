//! In-process repository
//!
//! Same contract as the PostgreSQL repository, with the spatial predicates
//! evaluated by the shapes in [`crate::geo`].

use std::collections::HashMap;

use async_trait::async_trait;
use h3o::CellIndex;
use tokio::sync::RwLock;

use super::{InsertOutcome, PoiRepository, PoiRow, StorageError};
use crate::geo::{cell_within_any, BoundingBox, RouteBuffer};

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<PoiRow>,
    by_place_id: HashMap<String, usize>,
}

/// In-memory [`PoiRepository`]
#[derive(Debug, Default)]
pub struct MemoryPoiRepository {
    inner: RwLock<Inner>,
}

impl MemoryPoiRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored row in insertion order
    pub async fn rows(&self) -> Vec<PoiRow> {
        self.inner.read().await.rows.clone()
    }

    /// Look up a row by place id
    pub async fn get(&self, place_id: &str) -> Option<PoiRow> {
        let inner = self.inner.read().await;
        inner
            .by_place_id
            .get(place_id)
            .and_then(|&i| inner.rows.get(i))
            .cloned()
    }

    async fn filter<F>(&self, category: Option<&str>, predicate: F) -> Vec<PoiRow>
    where
        F: Fn(&PoiRow) -> bool,
    {
        let inner = self.inner.read().await;
        inner
            .rows
            .iter()
            .filter(|row| category.map_or(true, |c| row.category_matches(c)))
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PoiRepository for MemoryPoiRepository {
    async fn insert(&self, row: &PoiRow) -> Result<InsertOutcome, StorageError> {
        let mut inner = self.inner.write().await;
        if inner.by_place_id.contains_key(&row.place_id) {
            return Ok(InsertOutcome::AlreadyPresent);
        }

        let index = inner.rows.len();
        let mut stored = row.clone();
        stored.id = Some(index as i64 + 1);
        inner.rows.push(stored);
        inner.by_place_id.insert(row.place_id.clone(), index);
        Ok(InsertOutcome::Inserted)
    }

    async fn list_by_cells(
        &self,
        cells: &[CellIndex],
        category: Option<&str>,
    ) -> Result<Vec<PoiRow>, StorageError> {
        Ok(self
            .filter(category, |row| {
                row.h3_index
                    .as_deref()
                    .is_some_and(|cell| cell_within_any(cell, cells))
            })
            .await)
    }

    async fn list_in_box(
        &self,
        bbox: &BoundingBox,
        category: Option<&str>,
    ) -> Result<Vec<PoiRow>, StorageError> {
        Ok(self
            .filter(category, |row| bbox.contains(row.coordinate()))
            .await)
    }

    async fn list_along_route(
        &self,
        route: &RouteBuffer,
        category: Option<&str>,
    ) -> Result<Vec<PoiRow>, StorageError> {
        Ok(self
            .filter(category, |row| route.contains(row.coordinate()))
            .await)
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.inner.read().await.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Coordinate, GeoIndexer};

    fn row(place_id: &str, lat: f64, lng: f64, category: &str) -> PoiRow {
        PoiRow {
            place_id: place_id.to_string(),
            location_lat: lat,
            location_lng: lng,
            category_name: category.to_string(),
            h3_index: GeoIndexer::new().assign(lat, lng).ok(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let repo = MemoryPoiRepository::new();
        let first = row("p1", 57.70, 11.97, "Cafe");

        assert_eq!(repo.insert(&first).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            repo.insert(&first).await.unwrap(),
            InsertOutcome::AlreadyPresent
        );
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get("p1").await.unwrap().id, Some(1));
    }

    #[tokio::test]
    async fn test_box_with_category() {
        let repo = MemoryPoiRepository::new();
        repo.insert(&row("in-cafe", 57.70, 11.97, "Cafe")).await.unwrap();
        repo.insert(&row("in-bar", 57.71, 11.96, "Cocktail bar")).await.unwrap();
        repo.insert(&row("out", 59.33, 18.06, "Cafe")).await.unwrap();

        let bbox = BoundingBox::new(11.9, 57.6, 12.1, 57.8);
        let all = repo.list_in_box(&bbox, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let cafes = repo.list_in_box(&bbox, Some("CAFE")).await.unwrap();
        assert_eq!(cafes.len(), 1);
        assert_eq!(cafes[0].place_id, "in-cafe");
    }

    #[tokio::test]
    async fn test_route_buffer() {
        let repo = MemoryPoiRepository::new();
        // Roughly 110 m north of the segment midpoint
        repo.insert(&row("near", 57.701, 11.95, "Cafe")).await.unwrap();
        repo.insert(&row("far", 57.72, 11.95, "Cafe")).await.unwrap();

        let route = RouteBuffer::new(
            Coordinate::new(57.70, 11.90),
            Coordinate::new(57.70, 12.00),
            500.0,
        );
        let found = repo.list_along_route(&route, None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].place_id, "near");
    }

    #[tokio::test]
    async fn test_cells_skip_rows_without_cell() {
        let repo = MemoryPoiRepository::new();
        let mut missing = row("no-cell", 57.70, 11.97, "Cafe");
        missing.h3_index = None;
        repo.insert(&missing).await.unwrap();
        repo.insert(&row("with-cell", 57.70, 11.97, "Cafe")).await.unwrap();

        let stored: CellIndex = GeoIndexer::new().assign(57.70, 11.97).unwrap().parse().unwrap();
        let parent = stored.parent(h3o::Resolution::Seven).unwrap();

        let found = repo.list_by_cells(&[parent], None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].place_id, "with-cell");
    }
}
