use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::time::UNIX_EPOCH;

use crate::admin::AdminState;
use crate::health::report::{OutboundDetail, OutboundReport};
use crate::health::HealthError;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub running: bool,
    pub tracked_outbounds: usize,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub tag: String,
    pub delay: u16,
}

#[derive(Serialize)]
pub struct HistoryEntry {
    pub tag: String,
    /// Unix time of the probe in ms.
    pub time_ms: u64,
    /// Latency in ms, 0 for a failed probe.
    pub delay: u16,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        running: state.checker.is_running(),
        tracked_outbounds: state.checker.storage().list().len(),
    })
}

pub async fn list_outbounds(State(state): State<AdminState>) -> Json<Vec<OutboundReport>> {
    Json(state.checker.storage().report())
}

pub async fn get_outbound(
    State(state): State<AdminState>,
    Path(tag): Path<String>,
) -> Result<Json<OutboundDetail>, StatusCode> {
    state
        .checker
        .storage()
        .detail(&tag)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn check_all(State(state): State<AdminState>) -> Json<Vec<OutboundReport>> {
    state.checker.check_all().await;
    Json(state.checker.storage().report())
}

pub async fn check_provider(
    State(state): State<AdminState>,
    Path(tag): Path<String>,
) -> Json<Vec<OutboundReport>> {
    state.checker.check_provider(&tag).await;
    Json(state.checker.storage().report())
}

pub async fn check_outbound(
    State(state): State<AdminState>,
    Path(tag): Path<String>,
) -> Result<Json<CheckResult>, (StatusCode, Json<ErrorBody>)> {
    match state.checker.check_outbound(&tag).await {
        Ok(delay) => Ok(Json(CheckResult { tag, delay })),
        Err(e) => {
            let status = match e {
                HealthError::OutboundNotFound(_) => StatusCode::NOT_FOUND,
                HealthError::NoNetwork => StatusCode::SERVICE_UNAVAILABLE,
                HealthError::TooDeepNesting | HealthError::Probe(_) => StatusCode::BAD_GATEWAY,
            };
            Err((status, Json(ErrorBody { error: e.to_string() })))
        }
    }
}

pub async fn list_history(State(state): State<AdminState>) -> Json<Vec<HistoryEntry>> {
    let mut entries: Vec<HistoryEntry> = state
        .history
        .iter()
        .flat_map(|history| history.snapshot())
        .map(|(tag, history)| HistoryEntry {
            tag,
            time_ms: history
                .time
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
            delay: history.delay,
        })
        .collect();
    entries.sort_by(|a, b| a.tag.cmp(&b.tag));
    Json(entries)
}
