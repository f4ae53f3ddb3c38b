pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryImageStore;
pub use models::{GalleryImage, NewGalleryImage, PublicGalleryImage};
pub use repository::PgImageStore;
pub use store::ImageStore;
