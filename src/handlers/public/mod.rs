// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Route Prefix: /, /health/*, /api/gallery-images

pub mod gallery;
pub mod health;

pub use gallery::gallery_images;
pub use health::{health, health_cdn, health_db, root};
