//! Route definitions for the `/animations` resource.
//!
//! All endpoints require authentication.

use axum::routing::get;
use axum::Router;

use crate::handlers::animations;
use crate::state::AppState;

/// Routes mounted at `/animations`.
///
/// ```text
/// GET    /                -> list_animations
/// POST   /                -> generate_animation
/// GET    /{id}            -> get_animation
/// GET    /{id}/status     -> get_animation_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(animations::list_animations).post(animations::generate_animation),
        )
        .route("/{id}", get(animations::get_animation))
        .route("/{id}/status", get(animations::get_animation_status))
}
