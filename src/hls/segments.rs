//! Concurrent download of the segments referenced by an HLS media playlist.
//!
//! One task is spawned per unique segment URI. Tasks run independently to
//! completion; successful ones report back over a channel that is only
//! drained after every task has finished. Completions are matched to the
//! ordered mapping list by exact URI equality, so completion order does not
//! affect the resulting playlist.

use super::cache::SegmentCache;
use crate::error::Result;
use crate::metrics;
use m3u8_rs::{MediaPlaylist, Playlist};
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use url::Url;

/// Origin segment URI and, once downloaded, its local cache reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentMapping {
    pub original_uri: String,
    pub downloaded_uri: Option<String>,
    /// Absolute origin URL when `original_uri` is relative. Written back
    /// instead of the relative form if the download fails.
    pub origin_url: Option<String>,
}

impl SegmentMapping {
    pub fn new(original_uri: impl Into<String>) -> Self {
        Self {
            original_uri: original_uri.into(),
            downloaded_uri: None,
            origin_url: None,
        }
    }

    /// URI the playlist should carry for this segment, if it changes.
    fn replacement(&self) -> Option<&str> {
        self.downloaded_uri.as_deref().or(self.origin_url.as_deref())
    }
}

#[derive(Clone, Debug)]
pub struct SegmentDownloader {
    client: Client,
    cache: SegmentCache,
    /// `None` means unbounded fan-out
    limit: Option<Arc<Semaphore>>,
}

impl SegmentDownloader {
    /// `max_concurrent` of 0 spawns every download at once.
    pub fn new(client: Client, cache: SegmentCache, max_concurrent: usize) -> Self {
        let limit = (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent)));
        Self {
            client,
            cache,
            limit,
        }
    }

    pub fn cache(&self) -> &SegmentCache {
        &self.cache
    }

    /// Download every segment of a media playlist and point its URIs at the
    /// local cache.
    ///
    /// Master playlists are returned unmodified. `playlist_url` resolves
    /// relative segment URIs; the URIs written back are keyed on the
    /// original strings either way.
    pub async fn download_segments_from_playlist(
        &self,
        playlist: Playlist,
        playlist_url: Option<&Url>,
    ) -> Playlist {
        let mut media = match playlist {
            Playlist::MediaPlaylist(media) => media,
            other => {
                warn!("Only MEDIA playlists can be cached, returning playlist unmodified");
                return other;
            }
        };

        let uris = media.segments.iter().map(|segment| segment.uri.clone());
        let mappings = self.download_segments(uris, playlist_url).await;
        apply_mappings(&mut media, &mappings);

        Playlist::MediaPlaylist(media)
    }

    /// Fetch a batch of segment URIs into the cache.
    ///
    /// Returns one mapping per unique URI in first-seen order. Failed
    /// downloads keep `downloaded_uri == None`.
    pub async fn download_segments<I>(
        &self,
        uris: I,
        base: Option<&Url>,
    ) -> Vec<SegmentMapping>
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let mut mappings: Vec<SegmentMapping> = uris
            .into_iter()
            .filter(|uri| seen.insert(uri.clone()))
            .map(SegmentMapping::new)
            .collect();

        if mappings.is_empty() {
            return mappings;
        }

        let start = Instant::now();
        let (tx, mut rx) = mpsc::channel(mappings.len());
        let tracker = TaskTracker::new();

        for mapping in &mut mappings {
            let fetch_url = match resolve_segment_url(base, &mapping.original_uri) {
                Ok(url) => url,
                Err(e) => {
                    warn!(uri = %mapping.original_uri, "Cannot resolve segment URL: {}", e);
                    metrics::record_segment_download(false);
                    continue;
                }
            };
            if Url::parse(&mapping.original_uri).is_err() {
                mapping.origin_url = Some(fetch_url.to_string());
            }

            let task = DownloadTask {
                client: self.client.clone(),
                cache: self.cache.clone(),
                limit: self.limit.clone(),
                mapping: mapping.clone(),
                fetch_url,
            };
            let tx = tx.clone();

            tracker.spawn(async move {
                if let Some(done) = task.run().await {
                    // capacity covers every mapping, never blocks
                    let _ = tx.send(done).await;
                }
            });
        }

        drop(tx);
        tracker.close();
        tracker.wait().await;

        let mut completed = 0;
        while let Ok(done) = rx.try_recv() {
            if let Some(mapping) = mappings
                .iter_mut()
                .find(|m| m.original_uri == done.original_uri)
            {
                mapping.downloaded_uri = done.downloaded_uri;
                completed += 1;
            }
        }

        info!(
            "Cached {}/{} segments in {}ms",
            completed,
            mappings.len(),
            start.elapsed().as_millis()
        );
        metrics::record_segment_batch(mappings.len(), start);

        mappings
    }
}

/// Point every successfully downloaded segment at its cache reference.
///
/// Segments without a completed download keep their origin URI, made
/// absolute when it was relative so clients do not resolve it against the
/// proxy.
pub fn apply_mappings(playlist: &mut MediaPlaylist, mappings: &[SegmentMapping]) {
    let resolved: HashMap<&str, &str> = mappings
        .iter()
        .filter_map(|m| m.replacement().map(|uri| (m.original_uri.as_str(), uri)))
        .collect();

    for segment in &mut playlist.segments {
        if let Some(local) = resolved.get(segment.uri.as_str()) {
            segment.uri = local.to_string();
        }
    }
}

fn resolve_segment_url(base: Option<&Url>, uri: &str) -> std::result::Result<Url, url::ParseError> {
    match base {
        Some(base) => base.join(uri),
        None => Url::parse(uri),
    }
}

/// State owned by a single download task.
struct DownloadTask {
    client: Client,
    cache: SegmentCache,
    limit: Option<Arc<Semaphore>>,
    mapping: SegmentMapping,
    fetch_url: Url,
}

impl DownloadTask {
    async fn run(mut self) -> Option<SegmentMapping> {
        let _permit = match &self.limit {
            Some(limit) => limit.clone().acquire_owned().await.ok(),
            None => None,
        };

        match self.fetch().await {
            Ok(local) => {
                debug!("Downloaded {} -> {}", self.mapping.original_uri, local);
                metrics::record_segment_download(true);
                self.mapping.downloaded_uri = Some(local);
                Some(self.mapping)
            }
            Err(e) => {
                warn!(uri = %self.mapping.original_uri, "Segment download failed: {}", e);
                metrics::record_segment_download(false);
                None
            }
        }
    }

    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(self.fetch_url.clone())
            .send()
            .await?
            .error_for_status()?;

        self.cache
            .store(&self.mapping.original_uri, response.bytes_stream())
            .await
    }
}
