//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::AppState;
use solaris_core::store::LedgerStore;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// IANA timezone month ids and period ranges are computed in.
    pub ledger_timezone: String,
    /// Whether a change-event dispatcher is attached to this process.
    pub dispatcher: bool,
}

async fn health_check<S: LedgerStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ledger_timezone: state.calendar().timezone().name().to_string(),
        dispatcher: state.dispatcher.is_some(),
    })
}

/// Creates the health route.
pub fn routes<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new().route("/health", get(health_check::<S>))
}
