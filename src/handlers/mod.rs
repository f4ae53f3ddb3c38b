// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → CMS (cookie, bearer token or password header)
pub mod cms; // Tier 2: /api/cms/* behind cms_auth_middleware (login excepted)
pub mod public; // Tier 1: health checks and the read-only gallery
