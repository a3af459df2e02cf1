use super::M3U_CONTENT_TYPE;
use crate::{
    error::{ProxyError, Result},
    metrics,
    server::state::AppState,
};
use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::io::ErrorKind;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Serve the proxied M3U file written at startup
pub async fn serve_m3u(
    Query(credentials): Query<Credentials>,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();

    if !state.authorized(&credentials.username, &credentials.password) {
        metrics::record_request("m3u", 401);
        return Err(ProxyError::Unauthorized);
    }

    let path = &state.config.proxied_m3u_path;
    let content = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ProxyError::NotFound("no playlist available".to_string()),
        _ => ProxyError::FileSystem {
            path: path.clone(),
            source: e,
        },
    })?;

    info!("Serving proxied playlist ({} bytes)", content.len());
    metrics::record_request("m3u", 200);
    metrics::record_duration("m3u", start);

    let disposition = format!("attachment; filename=\"{}\"", state.config.m3u_file_name);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, M3U_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}
