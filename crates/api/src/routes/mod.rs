pub mod account;
pub mod animations;
pub mod health;
pub mod render;
pub mod share;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /animations                      generate (POST), list (GET)
/// /animations/{id}                 get
/// /animations/{id}/status          status snapshot
///
/// /render                          start render (POST)
/// /render/callback                 execution service callback (no auth)
///
/// /share/{id}                      public view of a finished animation
///
/// /account                         delete account data (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/animations", animations::router())
        .nest("/render", render::router())
        .nest("/share", share::router())
        .nest("/account", account::router())
}
