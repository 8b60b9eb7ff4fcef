//! Web server module
//!
//! Exposes the search service over a small JSON API.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
