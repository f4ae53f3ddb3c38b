pub mod app;
pub mod auth;
pub mod cdn;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod gallery;
pub mod handlers;
pub mod imaging;
pub mod middleware;

pub use app::{router, AppState};
