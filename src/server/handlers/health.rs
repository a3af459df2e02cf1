use crate::server::state::AppState;
use axum::{Json, extract::State};
use serde_json::{Value, json};

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "tracks": state.playlist.len(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}
