use axum::Router;
use axum::routing::any;
use tower_http::trace::TraceLayer;

use crate::handlers::list_migrations;
use crate::state::SharedState;

/// Every method on every path reaches the listing handler.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", any(list_migrations))
        .fallback(list_migrations)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
