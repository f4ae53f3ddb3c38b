use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{GalleryImage, NewGalleryImage};
use crate::database::store::ImageStore;
use crate::gallery::{self, Page, PageRequest, Placement};

const COLUMNS: &str = "id, cloudinary_url, caption, display_order, created_at, updated_at";

/// Key for `pg_advisory_xact_lock`; every ordering mutation takes it first.
const ORDER_LOCK_KEY: i64 = 0x6761_6c6c_6572_79; // "gallery"

/// Postgres-backed gallery store
#[derive(Clone)]
pub struct PgImageStore {
    pool: PgPool,
}

impl PgImageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a transaction holding the collection-wide ordering lock
    async fn begin_locked(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ORDER_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    async fn ordered_ids(tx: &mut Transaction<'static, Postgres>) -> Result<Vec<i64>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM gallery_images ORDER BY display_order ASC, id ASC",
        )
        .fetch_all(&mut **tx)
        .await?;
        Ok(ids)
    }

    /// Write a batch of positions in one statement, touching only rows that move
    async fn apply_placements(
        tx: &mut Transaction<'static, Postgres>,
        placements: &[Placement],
    ) -> Result<u64, DatabaseError> {
        if placements.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = placements.iter().map(|p| p.id).collect();
        let positions: Vec<i32> = placements.iter().map(|p| p.display_order).collect();

        let result = sqlx::query(
            r#"
            UPDATE gallery_images AS g
            SET display_order = v.pos, updated_at = now()
            FROM UNNEST($1::int8[], $2::int4[]) AS v(id, pos)
            WHERE g.id = v.id AND g.display_order <> v.pos
            "#,
        )
        .bind(&ids)
        .bind(&positions)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ImageStore for PgImageStore {
    async fn page(&self, request: &PageRequest) -> Result<Page<GalleryImage>, DatabaseError> {
        let rows = sqlx::query_as::<_, GalleryImage>(&format!(
            "SELECT {COLUMNS} FROM gallery_images
             WHERE ($1::int4 IS NULL OR display_order > $1)
             ORDER BY display_order ASC
             LIMIT $2"
        ))
        .bind(request.cursor)
        .bind(request.fetch_limit())
        .fetch_all(&self.pool)
        .await?;

        let total_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM gallery_images")
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::from_overfetch(rows, request.limit, total_count))
    }

    async fn list_all(&self) -> Result<Vec<GalleryImage>, DatabaseError> {
        let rows = sqlx::query_as::<_, GalleryImage>(&format!(
            "SELECT {COLUMNS} FROM gallery_images ORDER BY display_order ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get(&self, id: i64) -> Result<Option<GalleryImage>, DatabaseError> {
        let row = sqlx::query_as::<_, GalleryImage>(&format!(
            "SELECT {COLUMNS} FROM gallery_images WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<GalleryImage>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, GalleryImage>(&format!(
            "SELECT {COLUMNS} FROM gallery_images WHERE id = ANY($1) ORDER BY display_order ASC"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_many(&self, images: &[NewGalleryImage]) -> Result<Vec<GalleryImage>, DatabaseError> {
        if images.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self.begin_locked().await?;

        let max_order = sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(display_order) FROM gallery_images")
            .fetch_one(&mut *tx)
            .await?;
        let positions = gallery::append_positions(max_order, images.len());

        let mut created = Vec::with_capacity(images.len());
        for (image, position) in images.iter().zip(positions) {
            let row = sqlx::query_as::<_, GalleryImage>(&format!(
                "INSERT INTO gallery_images (cloudinary_url, caption, display_order)
                 VALUES ($1, $2, $3)
                 RETURNING {COLUMNS}"
            ))
            .bind(&image.image_url)
            .bind(&image.caption)
            .bind(position)
            .fetch_one(&mut *tx)
            .await?;
            debug!("Inserted gallery image {} at position {}", row.id, row.display_order);
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update_caption(
        &self,
        id: i64,
        caption: Option<String>,
    ) -> Result<Option<GalleryImage>, DatabaseError> {
        let row = sqlx::query_as::<_, GalleryImage>(&format!(
            "UPDATE gallery_images SET caption = $2, updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(caption)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<Vec<i64>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self.begin_locked().await?;

        let deleted = sqlx::query_scalar::<_, i64>("DELETE FROM gallery_images WHERE id = ANY($1) RETURNING id")
            .bind(ids)
            .fetch_all(&mut *tx)
            .await?;

        if !deleted.is_empty() {
            let remaining = Self::ordered_ids(&mut tx).await?;
            let moved = Self::apply_placements(&mut tx, &gallery::compact(&remaining)).await?;
            debug!("Compacted display order after delete ({} rows moved)", moved);
        }

        tx.commit().await?;
        Ok(deleted)
    }

    async fn reorder(&self, ids: &[i64]) -> Result<usize, DatabaseError> {
        let mut tx = self.begin_locked().await?;

        let current = Self::ordered_ids(&mut tx).await?;
        let plan = gallery::plan_reorder(ids, &current)?;
        let moved = Self::apply_placements(&mut tx, &plan).await?;

        tx.commit().await?;
        debug!("Reorder of {} ids moved {} rows", ids.len(), moved);
        Ok(ids.len())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
