use axum::routing::delete;
use axum::Router;

use crate::handlers::account;
use crate::state::AppState;

/// Routes mounted at `/account`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", delete(account::delete_account))
}
