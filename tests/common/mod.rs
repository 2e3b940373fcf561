#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use image_converter::domain::conversion::{Conversion, NewConversion, TargetFormat};
use image_converter::infra::store::ConversionStore;
use image_converter::infra::uploads::UploadsDir;
use image_converter::AppState;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const BOUNDARY: &str = "----converter-test-boundary";

// ---------------------------------------------------------------------------
// MemoryStore: ConversionStore backed by a Vec, with switchable failures
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Conversion>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<Conversion> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Insert a fully specified record, bypassing the conversion flow.
    pub fn seed(&self, record: Conversion) {
        self.records.lock().unwrap().push(record);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversionStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn insert(&self, new: NewConversion) -> Result<Conversion> {
        self.check()?;
        let record = Conversion {
            id: Uuid::new_v4(),
            original_name: new.original_name,
            converted_name: new.converted_name,
            format: new.format,
            size: new.size,
            created_at: OffsetDateTime::now_utc(),
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Conversion>> {
        self.check()?;
        let mut records = self.records();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Conversion>> {
        self.check()?;
        Ok(self.records().into_iter().find(|record| record.id == id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok(records.len() < before)
    }
}

// ---------------------------------------------------------------------------
// TestApp: router over a MemoryStore and a temporary uploads directory
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    _uploads_tmp: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

/// One multipart part for [`TestApp::post_multipart`].
pub enum FormPart<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

pub async fn app() -> TestApp {
    TestApp::setup().await
}

impl TestApp {
    async fn setup() -> Self {
        let uploads_tmp = tempfile::tempdir().expect("failed to create temp dir");
        let uploads = UploadsDir::ensure(uploads_tmp.path().join("uploads"))
            .await
            .expect("failed to create uploads dir");
        let store = Arc::new(MemoryStore::default());

        let state = AppState {
            store: store.clone(),
            uploads,
            upload_max_bytes: MAX_UPLOAD_BYTES,
            cors_allowed_origins: vec!["*".to_string()],
        };

        let router = image_converter::http::router(state.clone());

        TestApp {
            router,
            state,
            store,
            _uploads_tmp: uploads_tmp,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve the router on an ephemeral local port; returns its base URL.
    pub async fn spawn_server(&self) -> String {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("no local addr");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server failed");
        });
        format!("http://{}", addr)
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.request(request).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.request(request).await
    }

    pub async fn post_multipart(&self, path: &str, parts: &[FormPart<'_>]) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.request(request).await
    }

    /// POST an `image` file plus `targetFormat`.
    pub async fn convert(
        &self,
        file_name: &str,
        content_type: &str,
        data: &[u8],
        target_format: &str,
    ) -> TestResponse {
        self.post_multipart(
            "/api/convert",
            &[
                FormPart::File {
                    name: "image",
                    file_name,
                    content_type,
                    data,
                },
                FormPart::Text {
                    name: "targetFormat",
                    value: target_format,
                },
            ],
        )
        .await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Files currently in the uploads directory.
    pub fn uploaded_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.state.uploads.root())
            .expect("cannot read uploads dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Seed a record created at `created_at`, with no backing file.
    pub fn seed_record(&self, original_name: &str, created_at: OffsetDateTime) -> Conversion {
        let record = Conversion {
            id: Uuid::new_v4(),
            original_name: original_name.to_string(),
            converted_name: format!("converted-{}.png", created_at.unix_timestamp()),
            format: TargetFormat::Png,
            size: 1024,
            created_at,
        };
        self.store.seed(record.clone());
        record
    }
}

pub fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A small gradient image encoded as `format`.
pub fn sample_image(format: ImageFormat) -> Vec<u8> {
    sample_image_sized(format, 96, 64)
}

pub fn sample_image_sized(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 2) as u8, (y * 3) as u8, 90]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, format)
        .expect("failed to encode sample image");
    out.into_inner()
}
