use axum::{extract::DefaultBodyLimit, routing::delete, routing::get, routing::post, Router};

use crate::http::handlers;
use crate::http::upload::MULTIPART_OVERHEAD_BYTES;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

/// The upload route gets a body limit a little above `upload_max_bytes`; the
/// exact per-file ceiling is enforced while reading the image field.
pub fn conversions(upload_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/convert",
            post(handlers::convert_image).layer(DefaultBodyLimit::max(
                upload_max_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
            )),
        )
        .route("/api/history", get(handlers::history))
        .route("/api/images/:id", delete(handlers::delete_image))
}
