pub mod gallery_image;

pub use gallery_image::{normalize_caption, GalleryImage, NewGalleryImage, PublicGalleryImage};
