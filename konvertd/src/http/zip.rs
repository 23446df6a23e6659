// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use log::{info, warn};
use serde::Deserialize;
use uuid::Uuid;

use super::convert::{remove_quietly, DownloadResponse};
use super::{ApiError, AppState};
use crate::conversion::{select_zip_inputs, zip_args};

#[derive(Debug, Deserialize)]
pub struct ZipRequest {
    #[serde(default)]
    pub files: Vec<String>,
}

pub async fn create_zip(
    State(state): State<AppState>,
    request: Result<Json<ZipRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let Json(request) = request.map_err(|rejection| {
        warn!("rejecting zip request: {rejection}");
        ApiError::BadRequest("Invalid JSON".to_string())
    })?;
    if request.files.is_empty() {
        return Err(ApiError::BadRequest("Files list required".to_string()));
    }

    let downloads = state.config.downloads_dir.clone();
    let requested = request.files;
    let inputs = tokio::task::spawn_blocking(move || select_zip_inputs(&downloads, &requested))
        .await
        .map_err(anyhow::Error::from)?;
    if inputs.is_empty() {
        return Err(ApiError::BadRequest("No valid files to zip".to_string()));
    }

    let archive_name = format!("batch_{}.zip", Uuid::new_v4());
    let archive = state.config.downloads_dir.join(&archive_name);
    let args = zip_args(&archive, &inputs);

    let (id, outcome) = state.pool.submit_with_receiver(args, "", &archive)?;
    info!("{id}: zipping {} files into {archive_name}", inputs.len());

    // a half-written archive is removed even if the client hangs up
    let success = tokio::spawn(async move {
        let success = outcome.await.unwrap_or(false);
        if !success {
            remove_quietly(&archive).await;
        }
        success
    })
    .await
    .map_err(|err| anyhow::Error::from(err).context("zip task"))?;

    if !success {
        return Err(ApiError::Failed("Zip creation failed"));
    }
    Ok(Json(DownloadResponse::success(&archive_name)))
}
