// handlers/cms/mod.rs - CMS handlers (admin authentication required)
//
// Security Level: cms_token cookie, Bearer JWT, or X-CMS-Password header
// Route Prefix: /api/cms/*
// Middleware: cms_auth_middleware on everything except login

pub mod bulk;
pub mod images;
pub mod reorder;
pub mod session;
pub mod upload;

pub use bulk::bulk_delete_images;
pub use images::{delete_image, list_images, update_image};
pub use reorder::reorder_images;
pub use session::{login, logout, session};
pub use upload::upload_images;
