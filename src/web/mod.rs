//! JSON API for Cabinet.
//!
//! Token-authenticated endpoints for browsing, uploading and managing a
//! per-user storage tree, plus registration and login.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::JwtState;
pub use router::create_router;
pub use server::WebServer;
