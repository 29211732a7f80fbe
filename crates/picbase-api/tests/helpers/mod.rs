//! Shared setup for picbase-api integration tests.
//!
//! Each test app owns a temporary directory with its own SQLite file and
//! asset store, and is driven in-process with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use picbase_api::{build_router, AppState, ServerConfig};
use picbase_core::ImageAnnotator;
use picbase_crypto::PasswordParams;
use picbase_db::{Database, FilesystemBackend, PoolConfig};

pub const PASSWORD: &str = "Secret123";
const BOUNDARY: &str = "picbase-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub asset_root: PathBuf,
    _dir: TempDir,
}

/// Options for [`spawn_with`].
pub struct AppOptions {
    pub annotator: Option<Arc<dyn ImageAnnotator>>,
    pub max_upload_bytes: u64,
    pub login_rate_limit_per_minute: u32,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            annotator: None,
            max_upload_bytes: 10 * 1024 * 1024,
            login_rate_limit_per_minute: 0,
        }
    }
}

pub async fn spawn() -> TestApp {
    spawn_with(AppOptions::default()).await
}

pub async fn spawn_with_annotator(annotator: Arc<dyn ImageAnnotator>) -> TestApp {
    spawn_with(AppOptions {
        annotator: Some(annotator),
        ..Default::default()
    })
    .await
}

pub async fn spawn_with(options: AppOptions) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let asset_root = dir.path().join("uploads");
    let url = format!("sqlite://{}", dir.path().join("api.db").display());

    let db = Database::connect_with_config(
        &url,
        PoolConfig::new().max_connections(2),
        Arc::new(FilesystemBackend::new(&asset_root)),
    )
    .await
    .expect("Failed to create test database");
    db.migrate().await.expect("Failed to run migrations");

    let config = ServerConfig {
        database_url: url,
        asset_storage_path: asset_root.clone(),
        max_upload_bytes: options.max_upload_bytes,
        login_rate_limit_per_minute: options.login_rate_limit_per_minute,
        password_params: PasswordParams::insecure_fast(),
        ..Default::default()
    };

    let state = AppState::new(db.clone(), options.annotator, config);
    TestApp {
        router: build_router(state),
        db,
        asset_root,
        _dir: dir,
    }
}

/// A decoded response.
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or_else(|e| {
            panic!(
                "response is not JSON ({e}): {}",
                String::from_utf8_lossy(&self.bytes)
            )
        })
    }

    pub fn error(&self) -> String {
        self.json()["error"]
            .as_str()
            .expect("error field")
            .to_string()
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();
        TestResponse {
            status,
            content_type,
            bytes,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, token).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.send(
            request(Method::DELETE, uri, Some(token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(json_request(Method::POST, uri, token, body)).await
    }

    pub async fn patch_json(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(json_request(Method::PATCH, uri, Some(token), body))
            .await
    }

    pub async fn post_multipart(&self, uri: &str, token: &str, form: Multipart) -> TestResponse {
        self.send(
            request(Method::POST, uri, Some(token))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(form.finish()))
                .unwrap(),
        )
        .await
    }

    /// Sign up `username` with the shared test password.
    pub async fn signup(&self, username: &str) -> Value {
        let res = self
            .post_json(
                "/api/v1/auth/signup",
                None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "full_name": format!("{} Tester", username),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "signup failed: {:?}", res.json());
        res.json()
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/v1/auth/login",
            None,
            serde_json::json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Sign up and log in; returns the bearer token.
    pub async fn user_token(&self, username: &str) -> String {
        self.signup(username).await;
        let res = self.login(username, PASSWORD).await;
        assert_eq!(res.status, StatusCode::OK);
        res.json()["token"].as_str().expect("token").to_string()
    }

    /// Upload a small PNG with the given form fields; returns the response.
    pub async fn upload(&self, token: &str, fields: &[(&str, &str)]) -> TestResponse {
        let mut form = Multipart::new().file("file", "photo.png", "image/png", &png(4, 3));
        for (name, value) in fields {
            form = form.text(name, value);
        }
        self.post_multipart("/api/v1/entries", token, form).await
    }

    /// Upload and return the created entry JSON.
    pub async fn create_entry(&self, token: &str, fields: &[(&str, &str)]) -> Value {
        let res = self.upload(token, fields).await;
        assert_eq!(res.status, StatusCode::CREATED, "upload failed: {:?}", res.json());
        res.json()["entry"].clone()
    }

    /// Number of files under the asset store.
    pub fn asset_file_count(&self) -> usize {
        count_files(&self.asset_root.join("assets"))
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|e| {
            let path = e.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    request(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

/// Encode a solid-colour PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 40]))
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}
