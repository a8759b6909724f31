use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use claims::Claims;

/// Public login/registration routes.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Routes for any authenticated user.
pub fn protected_router() -> Router<AppState> {
    handlers::me_routes()
}
