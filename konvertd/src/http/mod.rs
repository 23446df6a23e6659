// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

//! HTTP front end.
//!
//! ```text
//!   POST /api/convert ──► rate limiter ──► uploads/ ──► WorkerPool ──► downloads/
//!   POST /api/zip     ──────────────────────────────► WorkerPool ──► downloads/
//!   GET  /api/stats   ──► WorkerPool::total_completed_count
//!   GET  /downloads/* ──► downloads/
//!   GET  /*           ──► www root (index.html, 404.html)
//! ```

pub mod convert;
pub mod error;
pub mod stats;
pub mod zip;

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::ServiceConfig;
use crate::job_engine::WorkerPool;
use crate::rate_limiter::RateLimiter;

pub use error::ApiError;

/// Room for multipart boundaries and the small text fields next to the file.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<WorkerPool>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<ServiceConfig>,
}

pub fn router(state: AppState) -> Router {
    let www_root: &Path = &state.config.www_root;
    let static_files = ServeDir::new(www_root)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(www_root.join("404.html")));
    let downloads = ServeDir::new(&state.config.downloads_dir);
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/api/convert", post(convert::convert))
        .route("/api/zip", post(zip::create_zip))
        .route("/api/stats", get(stats::stats))
        .nest_service("/downloads", downloads)
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_STORE),
        ))
        .with_state(state)
}
