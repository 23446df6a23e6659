// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::extract::multipart::Field;
use axum::extract::{ConnectInfo, Multipart, State};
use axum::Json;
use futures::channel::oneshot;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{ApiError, AppState};
use crate::conversion::{ffmpeg_args, published_name, sanitize_filename, Quality, TargetFormat};
use crate::job_engine::JobId;

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub status: &'static str,
    pub download_url: String,
}

impl DownloadResponse {
    pub fn success(published: &str) -> Self {
        Self {
            status: "success",
            download_url: format!("/downloads/{published}"),
        }
    }
}

/// What the multipart body carried, with the file already on disk.
struct Upload {
    path: PathBuf,
    safe_name: String,
    format: Option<String>,
    quality: Option<String>,
}

pub async fn convert(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    multipart: Multipart,
) -> Result<Json<DownloadResponse>, ApiError> {
    let client = peer.ip().to_string();
    if !state.limiter.is_allowed(&client) {
        let limits = state.limiter.config();
        warn!("rate limit hit for {client}");
        return Err(ApiError::RateLimited {
            capacity: limits.capacity,
            window_minutes: limits.window.as_secs() / 60,
            remaining: state.limiter.remaining(&client),
        });
    }

    let job_uuid = Uuid::new_v4().to_string();
    let upload = receive_upload(&state, &job_uuid, multipart).await?;

    let format = match upload.format.as_deref() {
        None | Some("") => TargetFormat::default(),
        Some(raw) => match raw.parse::<TargetFormat>() {
            Ok(format) => format,
            Err(err) => {
                remove_quietly(&upload.path).await;
                return Err(ApiError::BadRequest(err.to_string()));
            }
        },
    };
    let quality = upload
        .quality
        .as_deref()
        .map(Quality::parse_or_default)
        .unwrap_or_default();

    let output = state
        .config
        .uploads_dir
        .join(format!("{job_uuid}.{}", format.extension()));
    let args = ffmpeg_args(&upload.path, &output, format, quality);

    let (id, outcome) = match state
        .pool
        .submit_with_receiver(args, &upload.path, &output)
    {
        Ok(submitted) => submitted,
        Err(err) => {
            remove_quietly(&upload.path).await;
            return Err(err.into());
        }
    };
    info!("{id}: converting {} to {format} ({quality:?})", upload.safe_name);

    let published = published_name(&job_uuid, &upload.safe_name, format.extension());
    let finished = Finished {
        id,
        input: upload.path,
        output,
        target: state.config.downloads_dir.join(&published),
    };
    // the client may hang up, the files still have to be dealt with
    tokio::spawn(finished.settle(outcome))
        .await
        .map_err(|err| anyhow::Error::from(err).context("conversion task"))??;

    info!("{id}: published {published}");
    Ok(Json(DownloadResponse::success(&published)))
}

/// A submitted conversion, and where its result goes once the worker reports back.
struct Finished {
    id: JobId,
    input: PathBuf,
    output: PathBuf,
    target: PathBuf,
}

impl Finished {
    async fn settle(self, outcome: oneshot::Receiver<bool>) -> Result<(), ApiError> {
        // a dropped sender means the job never reported back
        let success = outcome.await.unwrap_or(false);
        let result = if !success {
            remove_quietly(&self.output).await;
            Err(ApiError::Failed("Conversion failed"))
        } else if let Err(err) = publish(&self.output, &self.target).await {
            warn!("{}: could not publish {}: {err}", self.id, self.target.display());
            remove_quietly(&self.output).await;
            Err(ApiError::Failed("File operation failed"))
        } else {
            Ok(())
        };
        remove_quietly(&self.input).await;
        result
    }
}

async fn receive_upload(
    state: &AppState,
    job_uuid: &str,
    mut multipart: Multipart,
) -> Result<Upload, ApiError> {
    let max_bytes = state.config.max_upload_bytes;
    let mut file: Option<(PathBuf, String)> = None;
    let mut format = None;
    let mut quality = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                if let Some((path, _)) = &file {
                    remove_quietly(path).await;
                }
                return Err(ApiError::from_multipart(err, max_bytes));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let safe_name = field.file_name().map(sanitize_filename);
        let result = match (name.as_str(), safe_name) {
            (_, Some(safe_name)) if file.is_none() => {
                let path = state
                    .config
                    .uploads_dir
                    .join(format!("{job_uuid}_{safe_name}"));
                let stored = store_field(field, &path, max_bytes).await;
                file = Some((path, safe_name));
                stored
            }
            ("format", None) => field
                .text()
                .await
                .map(|text| format = Some(text.trim().to_string()))
                .map_err(|err| ApiError::from_multipart(err, max_bytes)),
            ("quality", None) => field
                .text()
                .await
                .map(|text| quality = Some(text.trim().to_string()))
                .map_err(|err| ApiError::from_multipart(err, max_bytes)),
            _ => {
                debug!("ignoring multipart field {name:?}");
                Ok(())
            }
        };

        if let Err(err) = result {
            if let Some((path, _)) = &file {
                remove_quietly(path).await;
            }
            return Err(err);
        }
    }

    match file {
        Some((path, safe_name)) => Ok(Upload {
            path,
            safe_name,
            format,
            quality,
        }),
        None => Err(ApiError::BadRequest("No file uploaded".to_string())),
    }
}

/// Streams one file field to disk, refusing anything above `max_bytes`.
async fn store_field(mut field: Field<'_>, path: &Path, max_bytes: u64) -> Result<(), ApiError> {
    let mut out = fs::File::create(path)
        .await
        .with_context(|| format!("creating {}", path.display()))?;
    let mut written: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| ApiError::from_multipart(err, max_bytes))?
    {
        written += chunk.len() as u64;
        if written > max_bytes {
            return Err(ApiError::TooLarge(max_bytes));
        }
        out.write_all(&chunk)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
    }
    out.flush()
        .await
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

/// Moves a finished artifact into the downloads directory.
async fn publish(output: &Path, target: &Path) -> io::Result<()> {
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir).await?;
    }
    if fs::rename(output, target).await.is_ok() {
        return Ok(());
    }
    // uploads and downloads may live on different filesystems
    fs::copy(output, target).await?;
    fs::remove_file(output).await
}

pub(crate) async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!("could not remove {}: {err}", path.display()),
    }
}
