use crate::{
    config::Config,
    error::Result,
    hls::{SegmentCache, SegmentDownloader},
    playlist::{Playlist, loader, marshal::initialize_playlist},
    rewrite::UrlRewriter,
};
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Shared HTTP client for connection pooling
    pub http_client: Client,
    /// Origin to proxy URL rewriter, fixed for the process lifetime
    pub rewriter: Arc<UrlRewriter>,
    /// Tracks that survived rewriting, indexed by their proxied track index
    pub playlist: Arc<Playlist>,
    /// Segment cache pipeline for HLS tracks
    pub downloader: SegmentDownloader,
    /// Prometheus handle, `None` when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    /// Load the source playlist and write the proxied M3U file.
    ///
    /// Any failure here is fatal: the proxy cannot serve without its playlist.
    pub async fn initialize(config: Config) -> Result<Self> {
        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;

        let rewriter = UrlRewriter::new(&config);

        let mut playlist = loader::load(&http_client, &config.m3u_url).await?;
        initialize_playlist(&mut playlist, &rewriter, &config.proxied_m3u_path)?;

        let downloader = SegmentDownloader::new(
            http_client.clone(),
            SegmentCache::new(&config.download_dir),
            config.max_concurrent_downloads,
        );

        Ok(Self {
            config: Arc::new(config),
            http_client,
            rewriter: Arc::new(rewriter),
            playlist: Arc::new(playlist),
            downloader,
            metrics: None,
            started_at: Instant::now(),
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Compare against the proxy-facing credentials.
    pub fn authorized(&self, user: &str, password: &str) -> bool {
        user == self.config.user && password == self.config.password
    }
}
