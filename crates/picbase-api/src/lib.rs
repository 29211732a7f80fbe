//! # picbase-api
//!
//! HTTP API for the picbase image catalog.
//!
//! The binary in `main.rs` reads [`ServerConfig`], opens the database, builds
//! the optional AI annotator and serves [`build_router`]. Integration tests
//! drive the same router in-process.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, Method};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::Router;
use governor::{Quota, RateLimiter};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use picbase_core::ImageAnnotator;
use picbase_db::Database;

pub use auth::RequireAuth;
pub use config::ServerConfig;
pub use error::ApiError;

/// Extra room above the image limit for the text fields of a multipart form.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Login rate limiter type (direct quota, no keyed bucketing).
pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// AI annotator (None when no provider is configured).
    pub annotator: Option<Arc<dyn ImageAnnotator>>,
    /// Limiter for login attempts (None if disabled).
    pub login_limiter: Option<Arc<GlobalRateLimiter>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        db: Database,
        annotator: Option<Arc<dyn ImageAnnotator>>,
        config: ServerConfig,
    ) -> Self {
        let login_limiter = NonZeroU32::new(config.login_rate_limit_per_minute)
            .map(|per_minute| Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))));
        Self {
            db,
            annotator,
            login_limiter,
            config: Arc::new(config),
        }
    }

    pub fn annotator(&self) -> Option<&dyn ImageAnnotator> {
        self.annotator.as_deref()
    }
}

// =============================================================================
// OPENAPI
// =============================================================================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "picbase API",
        description = "Personal image catalog with AI-suggested descriptions and labels"
    ),
    paths(
        handlers::health::health_check,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::entries::list_entries,
        handlers::entries::create_entry,
        handlers::entries::get_entry,
        handlers::entries::update_entry,
        handlers::entries::delete_entry,
        handlers::entries::get_entry_image,
        handlers::entries::archive_entry,
        handlers::entries::unarchive_entry,
        handlers::entries::bulk_entries,
        handlers::labels::list_categories,
        handlers::labels::list_tags,
        handlers::labels::rename_category,
        handlers::labels::rename_tag,
        handlers::labels::delete_category,
        handlers::labels::delete_tag,
        handlers::stats::get_stats,
        handlers::ai::ai_status,
        handlers::ai::analyze_image,
    ),
    components(schemas(
        picbase_core::User,
        picbase_core::Entry,
        picbase_core::EntryPage,
        picbase_core::EntryUpdate,
        picbase_core::LabelCount,
        picbase_core::CatalogStats,
        picbase_core::BulkAction,
        picbase_core::BulkResult,
        picbase_core::AiSuggestion,
        picbase_core::SortKey,
        picbase_core::SortOrder,
        services::AiStatus,
        services::AiOutcome,
        services::CreatedEntry,
        services::Analysis,
        handlers::ErrorBody,
        handlers::health::HealthResponse,
        handlers::auth::SignupRequest,
        handlers::auth::LoginRequest,
        handlers::auth::LoginResponse,
        handlers::entries::EntryUploadForm,
        handlers::entries::BulkRequest,
        handlers::labels::RenameLabelRequest,
        handlers::labels::LabelChange,
        handlers::ai::AiStatusResponse,
        handlers::ai::AnalyzeForm,
    )),
    tags(
        (name = "System", description = "Health"),
        (name = "Auth", description = "Accounts and sessions"),
        (name = "Entries", description = "Image entries"),
        (name = "Labels", description = "Categories and tags"),
        (name = "AI", description = "AI annotation"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer session scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Reject login attempts once the global quota is used up.
async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(limiter) = &state.login_limiter {
        if limiter.check().is_err() {
            tracing::warn!(subsystem = "auth", "Login rate limit exceeded");
            return Err(ApiError::TooManyRequests(
                "Too many login attempts. Please wait before retrying.".to_string(),
            ));
        }
    }
    Ok(next.run(request).await)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.cors_origins()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    use handlers::{ai, auth, entries, health, labels, stats};

    let upload_limit = DefaultBodyLimit::max(
        usize::try_from(
            state
                .config
                .max_upload_bytes
                .saturating_add(MULTIPART_OVERHEAD_BYTES),
        )
        .unwrap_or(usize::MAX),
    );

    Router::new()
        .route("/health", get(health::health_check))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Accounts
        .route("/api/v1/auth/signup", post(auth::signup))
        .route(
            "/api/v1/auth/login",
            post(auth::login).layer(axum::middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            )),
        )
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me))
        // Entries
        .route(
            "/api/v1/entries",
            get(entries::list_entries).merge(post(entries::create_entry).layer(upload_limit)),
        )
        .route("/api/v1/entries/bulk", post(entries::bulk_entries))
        .route(
            "/api/v1/entries/:id",
            get(entries::get_entry)
                .patch(entries::update_entry)
                .delete(entries::delete_entry),
        )
        .route("/api/v1/entries/:id/image", get(entries::get_entry_image))
        .route("/api/v1/entries/:id/archive", post(entries::archive_entry))
        .route("/api/v1/entries/:id/unarchive", post(entries::unarchive_entry))
        // Labels
        .route("/api/v1/categories", get(labels::list_categories))
        .route(
            "/api/v1/categories/:name",
            patch(labels::rename_category).delete(labels::delete_category),
        )
        .route("/api/v1/tags", get(labels::list_tags))
        .route(
            "/api/v1/tags/:name",
            patch(labels::rename_tag).delete(labels::delete_tag),
        )
        .route("/api/v1/stats", get(stats::get_stats))
        // AI
        .route("/api/v1/ai/status", get(ai::ai_status))
        .route(
            "/api/v1/ai/analyze",
            post(ai::analyze_image).layer(upload_limit),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(&state.config))
        .with_state(state)
}
