use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::state::SharedState;

/// Serve the migration listing. Method, path, query and body are ignored.
pub async fn list_migrations(State(state): State<SharedState>, request: Request) -> Response {
    if state.log_requests {
        info!(
            method = %request.method(),
            uri = %request.uri(),
            version = ?request.version(),
            headers = ?request.headers(),
            "listing request"
        );
    }

    (
        state.status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        state.body.clone(),
    )
        .into_response()
}
