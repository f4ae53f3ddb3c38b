use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::{GalleryImage, NewGalleryImage};
use crate::database::store::ImageStore;
use crate::gallery::{self, Page, PageRequest, Placement};

/// Process-local store, used when no DATABASE_URL is configured and in tests.
///
/// Rows are kept sorted by display_order; the write lock plays the role of
/// the Postgres advisory lock.
#[derive(Default)]
pub struct MemoryImageStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    rows: Vec<GalleryImage>,
}

impl MemoryState {
    fn ordered_ids(&self) -> Vec<i64> {
        self.rows.iter().map(|r| r.id).collect()
    }

    fn apply(&mut self, placements: &[Placement]) {
        let now = Utc::now();
        for placement in placements {
            if let Some(row) = self.rows.iter_mut().find(|r| r.id == placement.id) {
                if row.display_order != placement.display_order {
                    row.display_order = placement.display_order;
                    row.updated_at = now;
                }
            }
        }
        self.rows.sort_by_key(|r| r.display_order);
    }
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn page(&self, request: &PageRequest) -> Result<Page<GalleryImage>, DatabaseError> {
        let state = self.state.read().await;
        let rows: Vec<GalleryImage> = state
            .rows
            .iter()
            .filter(|r| request.cursor.map_or(true, |cursor| r.display_order > cursor))
            .take(request.fetch_limit() as usize)
            .cloned()
            .collect();
        Ok(Page::from_overfetch(rows, request.limit, state.rows.len() as i64))
    }

    async fn list_all(&self) -> Result<Vec<GalleryImage>, DatabaseError> {
        Ok(self.state.read().await.rows.clone())
    }

    async fn get(&self, id: i64) -> Result<Option<GalleryImage>, DatabaseError> {
        Ok(self.state.read().await.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<GalleryImage>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .rows
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn insert_many(&self, images: &[NewGalleryImage]) -> Result<Vec<GalleryImage>, DatabaseError> {
        let mut state = self.state.write().await;
        let max_order = state.rows.iter().map(|r| r.display_order).max();
        let positions = gallery::append_positions(max_order, images.len());
        let now = Utc::now();

        let mut created = Vec::with_capacity(images.len());
        for (image, position) in images.iter().zip(positions) {
            state.next_id += 1;
            let row = GalleryImage {
                id: state.next_id,
                image_url: image.image_url.clone(),
                caption: image.caption.clone(),
                display_order: position,
                created_at: now,
                updated_at: now,
            };
            state.rows.push(row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn update_caption(
        &self,
        id: i64,
        caption: Option<String>,
    ) -> Result<Option<GalleryImage>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state.rows.iter_mut().find(|r| r.id == id).map(|row| {
            row.caption = caption;
            row.updated_at = Utc::now();
            row.clone()
        }))
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<Vec<i64>, DatabaseError> {
        let mut state = self.state.write().await;
        let mut deleted = Vec::new();
        state.rows.retain(|r| {
            if ids.contains(&r.id) {
                deleted.push(r.id);
                false
            } else {
                true
            }
        });

        if !deleted.is_empty() {
            let remaining = state.ordered_ids();
            state.apply(&gallery::compact(&remaining));
        }
        Ok(deleted)
    }

    async fn reorder(&self, ids: &[i64]) -> Result<usize, DatabaseError> {
        let mut state = self.state.write().await;
        let plan = gallery::plan_reorder(ids, &state.ordered_ids())?;
        state.apply(&plan);
        Ok(ids.len())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::OrderingError;

    fn new_image(n: usize) -> NewGalleryImage {
        NewGalleryImage {
            image_url: format!("https://res.cloudinary.com/demo/image/upload/gallery/{}.webp", n),
            caption: None,
        }
    }

    async fn seeded(count: usize) -> MemoryImageStore {
        let store = MemoryImageStore::new();
        let batch: Vec<_> = (0..count).map(new_image).collect();
        store.insert_many(&batch).await.unwrap();
        store
    }

    fn positions(rows: &[GalleryImage]) -> Vec<(i64, i32)> {
        rows.iter().map(|r| (r.id, r.display_order)).collect()
    }

    #[tokio::test]
    async fn inserts_append_dense_positions() {
        let store = seeded(3).await;
        store.insert_many(&[new_image(9)]).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert_eq!(positions(&all), vec![(1, 0), (2, 1), (3, 2), (4, 3)]);
    }

    #[tokio::test]
    async fn delete_compacts_remaining_positions() {
        let store = seeded(5).await;
        let deleted = store.delete_many(&[2, 4, 99]).await.unwrap();
        assert_eq!(deleted, vec![2, 4]);
        let all = store.list_all().await.unwrap();
        assert_eq!(positions(&all), vec![(1, 0), (3, 1), (5, 2)]);
    }

    #[tokio::test]
    async fn reorder_subset_moves_to_front() {
        let store = seeded(4).await;
        assert_eq!(store.reorder(&[3, 1]).await.unwrap(), 2);
        let all = store.list_all().await.unwrap();
        assert_eq!(positions(&all), vec![(3, 0), (1, 1), (2, 2), (4, 3)]);
    }

    #[tokio::test]
    async fn reorder_unknown_id_leaves_order_untouched() {
        let store = seeded(2).await;
        let err = store.reorder(&[2, 42]).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Ordering(OrderingError::UnknownIds(ref ids)) if ids == &vec![42]));
        let all = store.list_all().await.unwrap();
        assert_eq!(positions(&all), vec![(1, 0), (2, 1)]);
    }

    #[tokio::test]
    async fn pages_walk_the_collection() {
        let store = seeded(5).await;

        let first = store.page(&PageRequest::new(2, None, 100).unwrap()).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.has_more);
        assert_eq!(first.next_cursor, Some(1));
        assert_eq!(first.total_count, 5);

        let second = store.page(&PageRequest::new(2, first.next_cursor, 100).unwrap()).await.unwrap();
        assert_eq!(positions(&second.items), vec![(3, 2), (4, 3)]);

        let last = store.page(&PageRequest::new(2, second.next_cursor, 100).unwrap()).await.unwrap();
        assert_eq!(positions(&last.items), vec![(5, 4)]);
        assert!(!last.has_more);
        assert_eq!(last.next_cursor, None);
    }

    #[tokio::test]
    async fn concurrent_mutations_keep_positions_dense() {
        let store = std::sync::Arc::new(seeded(6).await);

        let mut handles = Vec::new();
        for round in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                match round % 3 {
                    0 => {
                        store.insert_many(&[new_image(100 + round)]).await.unwrap();
                    }
                    1 => {
                        let ids = store.list_all().await.unwrap();
                        if let Some(last) = ids.last() {
                            let _ = store.reorder(&[last.id]).await;
                        }
                    }
                    _ => {
                        let ids = store.list_all().await.unwrap();
                        if let Some(first) = ids.first() {
                            store.delete_many(&[first.id]).await.unwrap();
                        }
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let all = store.list_all().await.unwrap();
        let orders: Vec<i32> = all.iter().map(|r| r.display_order).collect();
        let expected: Vec<i32> = (0..all.len() as i32).collect();
        assert_eq!(orders, expected);
    }
}
