use super::HLS_CONTENT_TYPE;
use crate::{
    error::{ProxyError, Result},
    hls::{
        clean_filename,
        parser::{parse_hls_playlist, serialize_playlist},
    },
    http_retry::{RetryConfig, fetch_with_retry},
    metrics,
    server::state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct TrackPath {
    pub user: String,
    pub password: String,
    pub index: usize,
    pub basename: String,
}

/// Serve the track at `index` of the proxied playlist.
///
/// The index is the track's position among the tracks that survived
/// rewriting, so it maps straight back to `state.playlist`.
pub async fn serve_track(
    Path(params): Path<TrackPath>,
    State(state): State<AppState>,
) -> Result<Response> {
    let start = Instant::now();

    if !state.authorized(&params.user, &params.password) {
        metrics::record_request("track", 401);
        return Err(ProxyError::Unauthorized);
    }

    let track = state.playlist.get(params.index).ok_or_else(|| {
        metrics::record_request("track", 404);
        ProxyError::NotFound(format!("track {}", params.index))
    })?;

    info!(
        "Serving track {} ({}) as {}",
        params.index, track.name, params.basename
    );

    let result = proxy_origin(&state, &track.uri).await;

    metrics::record_request("track", if result.is_ok() { 200 } else { 502 });
    metrics::record_duration("track", start);

    result
}

/// Proxy an origin resource, caching segments when it is an HLS playlist.
pub(crate) async fn proxy_origin(state: &AppState, url: &str) -> Result<Response> {
    if is_hls(url) {
        proxy_hls(state, url).await
    } else {
        proxy_stream(state, url).await
    }
}

fn is_hls(url: &str) -> bool {
    clean_filename(url).to_ascii_lowercase().ends_with(".m3u8")
}

/// Fetch an origin media playlist, cache its segments and return the
/// playlist pointing at the local copies.
async fn proxy_hls(state: &AppState, url: &str) -> Result<Response> {
    info!("Fetching HLS playlist from origin: {}", url);

    let response = fetch_with_retry(&state.http_client, url, &RetryConfig::default())
        .await
        .inspect_err(|_| metrics::record_origin_error())?;

    // Final URL after redirects, used to resolve relative segment URIs
    let playlist_url = response.url().clone();
    let content = response.text().await?;

    let playlist = parse_hls_playlist(&content)?;
    let playlist = state
        .downloader
        .download_segments_from_playlist(playlist, Some(&playlist_url))
        .await;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, HLS_CONTENT_TYPE)],
        serialize_playlist(&playlist)?,
    )
        .into_response())
}

/// Stream an origin resource through without buffering it.
async fn proxy_stream(state: &AppState, url: &str) -> Result<Response> {
    info!("Streaming from origin: {}", url);

    let response = state
        .http_client
        .get(url)
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .inspect_err(|_| metrics::record_origin_error())?;

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("video/MP2T")
        .to_string();

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(response.bytes_stream()),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_hls_urls() {
        assert!(is_hls("http://cdn.example/live/index.m3u8"));
        assert!(is_hls("http://cdn.example/live/INDEX.M3U8?token=1"));
        assert!(!is_hls("http://cdn.example/live/stream.ts"));
        assert!(!is_hls("http://cdn.example/get?file=x.m3u8"));
    }
}
