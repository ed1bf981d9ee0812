//! Route definitions for `/render`.

use axum::routing::post;
use axum::Router;

use crate::handlers::{callbacks, render};
use crate::state::AppState;

/// Routes mounted at `/render`.
///
/// ```text
/// POST   /                -> start_render (auth)
/// POST   /callback        -> render_callback (webhook secret, optional)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(render::start_render))
        .route("/callback", post(callbacks::render_callback))
}
