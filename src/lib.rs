pub mod app;
pub mod client;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::infra::{store::ConversionStore, uploads::UploadsDir};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConversionStore>,
    pub uploads: UploadsDir,
    pub upload_max_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
}
