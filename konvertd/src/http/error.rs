// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;

use crate::job_engine::SubmitError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Rate limit exceeded. Maximum {capacity} conversions per {window_minutes} minutes.")]
    RateLimited {
        capacity: usize,
        window_minutes: u64,
        remaining: usize,
    },
    #[error("{0}")]
    BadRequest(String),
    #[error("File too large. Maximum size: {}MB", .0 / (1024 * 1024))]
    TooLarge(u64),
    #[error("Server busy: {0}")]
    Unavailable(#[from] SubmitError),
    #[error("{0}")]
    Failed(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct RateLimitBody {
    status: &'static str,
    error: String,
    remaining: usize,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Failed(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a broken multipart stream, keeping the 413 axum reports for oversized bodies.
    pub fn from_multipart(err: MultipartError, max_upload_bytes: u64) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::TooLarge(max_upload_bytes),
            _ => ApiError::BadRequest(err.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::RateLimited { remaining, .. } => {
                let body = RateLimitBody {
                    status: "error",
                    error: self.to_string(),
                    remaining,
                };
                (status, Json(body)).into_response()
            }
            ApiError::Internal(err) => {
                error!("request failed: {err:#}");
                (status, "Internal server error").into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}
