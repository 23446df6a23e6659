// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct Stats {
    pub total_conversions: u64,
}

pub async fn stats(State(state): State<AppState>) -> Json<Stats> {
    Json(Stats {
        total_conversions: state.pool.total_completed_count(),
    })
}
