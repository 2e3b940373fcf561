use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::AppState;

mod error;
mod handlers;
mod routes;
pub mod upload;

pub use error::AppError;
pub use handlers::{ConvertResponse, DeleteResponse};

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_allowed_origins);
    let uploads = ServeDir::new(state.uploads.root());

    Router::new()
        .merge(routes::health())
        .merge(routes::conversions(state.upload_max_bytes))
        .nest_service("/uploads", uploads)
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer.allow_origin(origins)
}
