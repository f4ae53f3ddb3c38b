use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{GalleryImage, NewGalleryImage};
use crate::gallery::{Page, PageRequest};

/// Persistence for the gallery collection.
///
/// Mutations serialise on one collection-wide lock so that positions stay
/// dense (`0..n`) whatever mix of insert, delete and reorder runs concurrently.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Cursor page ordered by display_order, with the total row count
    async fn page(&self, request: &PageRequest) -> Result<Page<GalleryImage>, DatabaseError>;

    /// Whole collection ordered by display_order
    async fn list_all(&self) -> Result<Vec<GalleryImage>, DatabaseError>;

    async fn get(&self, id: i64) -> Result<Option<GalleryImage>, DatabaseError>;

    /// Found subset of `ids`, ordered by display_order
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<GalleryImage>, DatabaseError>;

    /// Append images at the end of the collection in one transaction
    async fn insert_many(&self, images: &[NewGalleryImage]) -> Result<Vec<GalleryImage>, DatabaseError>;

    async fn update_caption(
        &self,
        id: i64,
        caption: Option<String>,
    ) -> Result<Option<GalleryImage>, DatabaseError>;

    /// Delete rows and close the gaps they leave; returns the ids actually deleted
    async fn delete_many(&self, ids: &[i64]) -> Result<Vec<i64>, DatabaseError>;

    /// Move `ids` to the front in the given order; returns how many were requested
    async fn reorder(&self, ids: &[i64]) -> Result<usize, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Short backend name for health output
    fn backend(&self) -> &'static str;
}
