pub mod handlers;
pub mod state;

use crate::config::Config;
use crate::hls::DOWNLOAD_ROUTE;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;
use state::AppState;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info};

/// Build the router for an initialized state.
///
/// Everything except the segment cache is nested under the custom endpoint
/// prefix, if one is configured. Cached segments are referenced by absolute
/// `/hlsdownloads/...` paths and so are always served from the root.
pub fn build_router(state: AppState) -> Router {
    let mut routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            &format!("/{}", state.config.m3u_file_name),
            get(handlers::playlist::serve_m3u).post(handlers::playlist::serve_m3u),
        )
        .route(
            &format!(
                "/{}/{{user}}/{{password}}/{{index}}/{{basename}}",
                state.rewriter.anti_collision_token()
            ),
            get(handlers::stream::serve_track),
        );

    if state.config.xtream_enabled() {
        routes = routes
            .route("/get.php", get(handlers::xtream::serve_get_php))
            .route(
                "/live/{user}/{password}/{id}",
                get(handlers::xtream::serve_live),
            )
            .route(
                "/movie/{user}/{password}/{id}",
                get(handlers::xtream::serve_movie),
            )
            .route(
                "/series/{user}/{password}/{id}",
                get(handlers::xtream::serve_series),
            );
    }

    if let Some(handle) = state.metrics.clone() {
        routes = routes.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }

    let prefix = state.rewriter.endpoint_prefix().to_string();
    let routes = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&prefix, routes)
    };

    let cache_dir = state.downloader.cache().dir().to_path_buf();

    routes
        .nest_service(DOWNLOAD_ROUTE, ServeDir::new(cache_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initialize the playlist and start the Axum HTTP server
pub async fn start(
    config: Config,
    metrics: Option<PrometheusHandle>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    let mut state = AppState::initialize(config).await?;
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    info!(
        "Serving {} tracks, playlist at /{}",
        state.playlist.len(),
        state.config.m3u_file_name
    );

    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
