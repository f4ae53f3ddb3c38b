pub mod auth;
pub mod rate_limit;
pub mod response;

pub use auth::{cms_auth_middleware, AuthAdmin, AuthMethod};
pub use rate_limit::{Bucket, ClientAddr, RateLimiter};
pub use response::{ApiResponse, ApiResult};
