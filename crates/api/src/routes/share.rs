use axum::routing::get;
use axum::Router;

use crate::handlers::share;
use crate::state::AppState;

/// Routes mounted at `/share`. Public.
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(share::get_shared))
}
