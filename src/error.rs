use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::error;

/// Failure to load the remote playlist at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch playlist: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("failed to read playlist file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid m3u file format, expected #EXTM3U header")]
    MissingHeader,

    #[error("invalid #EXTINF on line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// Failure to map one origin URI onto a proxy URI.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("malformed origin URI {uri}: {source}")]
    MalformedUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("composed proxy URI {uri} is invalid: {source}")]
    ComposeFailure {
        uri: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("failed to write proxied playlist {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("origin request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("cache file system error on {path}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse HLS playlist: {0}")]
    PlaylistParse(String),

    #[error("failed to serialize HLS playlist: {0}")]
    PlaylistSerialize(String),

    #[error("invalid credentials")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::Network(_) | ProxyError::PlaylistParse(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("{}", self);
        }

        (status, self.to_string()).into_response()
    }
}
