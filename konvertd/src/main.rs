// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;
use tokio::signal;

use konvertd::config::{Args, ServiceConfig};
use konvertd::http::{self, AppState};
use konvertd::job_engine::WorkerPool;
use konvertd::process_tools::ProcessExecutor;
use konvertd::rate_limiter::RateLimiter;
use konvertd::retention::RetentionSweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServiceConfig::from(Args::parse());
    for dir in [&config.www_root, &config.uploads_dir, &config.downloads_dir] {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    info!("Starting konvertd with config: {:?}", config);

    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    let executor = Arc::new(ProcessExecutor::new().with_timeout(config.job_timeout));
    let pool = Arc::new(
        WorkerPool::new(executor, config.queue_capacity).context("starting worker pool")?,
    );
    let mut sweeper = RetentionSweeper::new(config.sweep_interval, config.retention_targets())
        .spawn()
        .context("starting retention sweeper")?;

    let listen = config.listen;
    let state = AppState {
        pool: pool.clone(),
        limiter,
        config: Arc::new(config),
    };
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("binding {listen}"))?;
    info!("Listening on http://{}", listen);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Stopping konvertd");
    sweeper.shutdown();
    // queued conversions still run to completion
    let draining = pool.clone();
    tokio::task::spawn_blocking(move || draining.shutdown()).await?;
    info!(
        "Worker pool drained after {} conversions",
        pool.total_completed_count()
    );

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown requested");
}
