//! Xtream-compatible endpoints.
//!
//! Clients authenticate with the proxy credentials; the origin is always
//! called with the Xtream credentials. Playlist URLs are rewritten in
//! [`RewriteMode::Xtream`], which keeps the Xtream path layout, so the
//! rewritten URLs land on the stream routes below.

use super::{M3U_CONTENT_TYPE, playlist::Credentials, stream::proxy_origin};
use crate::{
    error::{ProxyError, Result},
    http_retry::{RetryConfig, fetch_with_retry},
    metrics,
    playlist::{marshal::marshal_into, parser::parse_m3u},
    rewrite::{RewriteMode, path_escape},
    server::state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Instant;
use tracing::info;
use url::Url;

#[derive(Debug, Deserialize)]
pub struct GetPhpQuery {
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(rename = "type")]
    pub list_type: Option<String>,
    pub output: Option<String>,
}

/// `get.php`: the origin M3U with every URL moved onto the proxy.
pub async fn serve_get_php(
    Query(query): Query<GetPhpQuery>,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();

    if !state.authorized(&query.credentials.username, &query.credentials.password) {
        metrics::record_request("get_php", 401);
        return Err(ProxyError::Unauthorized);
    }

    let origin = origin_get_php_url(&state, &query)?;
    info!("Fetching Xtream playlist from {}", origin.path());

    let content = fetch_with_retry(&state.http_client, origin.as_str(), &RetryConfig::default())
        .await
        .inspect_err(|_| metrics::record_origin_error())?
        .text()
        .await?;

    let mut playlist = parse_m3u(&content)?;
    let mut body = Vec::with_capacity(content.len());
    let written = marshal_into(&mut playlist, &state.rewriter, RewriteMode::Xtream, &mut body)
        .map_err(|e| ProxyError::Internal(format!("Failed to render playlist: {}", e)))?;

    info!("Rewrote {} Xtream tracks", written);
    metrics::record_request("get_php", 200);
    metrics::record_duration("get_php", start);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, M3U_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"playlist.m3u\"",
            ),
        ],
        body,
    )
        .into_response())
}

fn origin_get_php_url(state: &AppState, query: &GetPhpQuery) -> Result<Url> {
    let base = state.config.xtream_base_url.trim_end_matches('/');
    let mut url = Url::parse(&format!("{}/get.php", base))
        .map_err(|e| ProxyError::Config(format!("invalid XTREAM_BASE_URL: {}", e)))?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("username", &state.config.xtream_user)
            .append_pair("password", &state.config.xtream_password)
            .append_pair("type", query.list_type.as_deref().unwrap_or("m3u_plus"));
        if let Some(output) = &query.output {
            pairs.append_pair("output", output);
        }
    }

    Ok(url)
}

pub async fn serve_live(
    Path((user, password, id)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> Result<Response> {
    serve_stream(&state, "live", &user, &password, &id).await
}

pub async fn serve_movie(
    Path((user, password, id)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> Result<Response> {
    serve_stream(&state, "movie", &user, &password, &id).await
}

pub async fn serve_series(
    Path((user, password, id)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> Result<Response> {
    serve_stream(&state, "series", &user, &password, &id).await
}

async fn serve_stream(
    state: &AppState,
    kind: &'static str,
    user: &str,
    password: &str,
    id: &str,
) -> Result<Response> {
    let start = Instant::now();

    if !state.authorized(user, password) {
        metrics::record_request(kind, 401);
        return Err(ProxyError::Unauthorized);
    }

    let url = format!(
        "{}/{}/{}/{}/{}",
        state.config.xtream_base_url.trim_end_matches('/'),
        kind,
        path_escape(&state.config.xtream_user),
        path_escape(&state.config.xtream_password),
        path_escape(id)
    );

    info!("Serving Xtream {} stream {}", kind, id);
    let result = proxy_origin(state, &url).await;

    metrics::record_request(kind, if result.is_ok() { 200 } else { 502 });
    metrics::record_duration(kind, start);

    result
}
