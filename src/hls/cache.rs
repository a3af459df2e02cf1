//! On-disk cache for downloaded HLS segments.
//!
//! Segments are stored flat under one directory by their origin basename.
//! Two origins sharing a basename overwrite each other; the last write wins.

use crate::error::{ProxyError, Result};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Route under which cached segments are served.
pub const DOWNLOAD_ROUTE: &str = "/hlsdownloads";

/// Final path component of `uri`, without query string.
pub fn clean_filename(uri: &str) -> &str {
    let without_query = uri.split('?').next().unwrap_or(uri);
    without_query.rsplit('/').next().unwrap_or(without_query)
}

#[derive(Clone, Debug)]
pub struct SegmentCache {
    dir: PathBuf,
}

impl SegmentCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `body` to the cache under the basename of `origin_uri`.
    ///
    /// Returns the local reference `/hlsdownloads/<name>`. A partially
    /// written file is removed when the body stream fails.
    pub async fn store<S, E>(&self, origin_uri: &str, body: S) -> Result<String>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        ProxyError: From<E>,
    {
        let name = clean_filename(origin_uri);
        if matches!(name, "" | "." | "..") {
            return Err(ProxyError::FileSystem {
                path: self.dir.join(name),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("no usable file name in {}", origin_uri),
                ),
            });
        }

        // Idempotent, concurrent callers may race here
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ProxyError::FileSystem {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.dir.join(name);
        if let Err(e) = write_stream(&path, body).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        debug!("Cached {} as {}", origin_uri, path.display());
        Ok(format!("{}/{}", DOWNLOAD_ROUTE, name))
    }
}

async fn write_stream<S, E>(path: &Path, body: S) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    ProxyError: From<E>,
{
    let fs_err = |source: io::Error| ProxyError::FileSystem {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::create(path).await.map_err(fs_err)?;
    let mut body = std::pin::pin!(body);

    while let Some(chunk) = body.next().await {
        file.write_all(&chunk?).await.map_err(fs_err)?;
    }

    file.flush().await.map_err(fs_err)?;
    Ok(())
}
