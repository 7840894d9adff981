//! Micro Social - a small social network backed by flat JSON files
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Auth endpoints (signup, login)                           │
//! │  - Post, comment, like and share endpoints                  │
//! │  - User directory and follow endpoints                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Validation and authorization rules                       │
//! │  - One load-modify-write cycle per mutation                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - users.json / posts.json (whole-file JSON arrays)         │
//! │  - Uploaded media on local disk                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and DTOs
//! - `service`: Business logic layer
//! - `data`: Records and the flat-file store
//! - `storage`: Local media storage
//! - `auth`: Bearer tokens, password hashing, signup/login
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// users.json
    pub users: Arc<data::JsonStore<data::User>>,

    /// posts.json
    pub posts: Arc<data::JsonStore<data::Post>>,

    /// Uploaded media on disk
    pub media: Arc<storage::MediaStorage>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Open (or create) the user and post collections
    /// 2. Create the uploads directory
    /// 3. Check both collections parse, persist ids for records stored
    ///    without one, and report follow edges stored on one side only
    ///
    /// # Errors
    /// Returns error if a directory cannot be created or a collection
    /// file is not valid JSON
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Open collections
        let users = data::JsonStore::open(config.storage.users_path(), "users").await?;
        let posts = data::JsonStore::open(config.storage.posts_path(), "posts").await?;
        tracing::info!(
            data_dir = %config.storage.data_dir.display(),
            "Collections opened"
        );

        // 2. Media storage
        let media = storage::MediaStorage::new(
            &config.storage.uploads_dir,
            config.storage.max_upload_bytes,
        )
        .await?;
        tracing::info!(
            uploads_dir = %config.storage.uploads_dir.display(),
            "Media storage initialized"
        );

        let state = Self {
            config: Arc::new(config),
            users: Arc::new(users),
            posts: Arc::new(posts),
            media: Arc::new(media),
        };

        // 3. Startup checks
        let user_service =
            service::UserService::new(state.users.clone(), state.config.feed.clone());
        let post_service = service::PostService::new(
            state.posts.clone(),
            state.media.clone(),
            state.config.feed.clone(),
        );

        let user_count = user_service.count().await?;
        let post_count = post_service.count().await?;
        metrics::USERS_TOTAL.set(user_count as i64);
        metrics::POSTS_TOTAL.set(post_count as i64);

        user_service.assign_missing_ids().await?;
        post_service.assign_missing_comment_ids().await?;

        let asymmetric = user_service.find_asymmetric_edges().await?;
        if !asymmetric.is_empty() {
            tracing::warn!(
                count = asymmetric.len(),
                "Follow edges recorded on one side only; follow/unfollow will repair them"
            );
        }

        tracing::info!(
            users = user_count,
            posts = post_count,
            "Application state initialized successfully"
        );

        Ok(state)
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower_http::{
        cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
    };

    let max_body_bytes = state.config.storage.max_upload_bytes;
    let uploads = ServeDir::new(state.media.root());

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .nest("/posts", api::posts_router())
        .nest("/users", api::users_router())
        .nest_service(storage::UPLOADS_URL_PREFIX, uploads)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::map_response(json_payload_too_large))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}

/// `RequestBodyLimitLayer` rejects a declared oversized body with a
/// plain-text 413 before any handler runs; answer it like every other error.
async fn json_payload_too_large(response: axum::response::Response) -> axum::response::Response {
    use axum::http::{StatusCode, header::CONTENT_TYPE};
    use axum::response::IntoResponse;

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return error::AppError::PayloadTooLarge("Request body too large".to_string())
            .into_response();
    }
    response
}
