use super::{Playlist, parser::parse_m3u};
use crate::error::LoadError;
use crate::http_retry::{RetryConfig, fetch_with_retry};
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;

/// Fetch and parse the source playlist.
///
/// `source` is either an `http(s)://` URL or a local file path. An empty
/// source yields an empty playlist.
pub async fn load(client: &Client, source: &str) -> Result<Playlist, LoadError> {
    if source.is_empty() {
        info!("No M3U source configured, starting with an empty playlist");
        return Ok(Playlist::default());
    }

    let content = if source.starts_with("http://") || source.starts_with("https://") {
        info!("Fetching M3U playlist from {}", source);
        fetch_with_retry(client, source, &RetryConfig::default())
            .await?
            .text()
            .await?
    } else {
        info!("Reading M3U playlist from {}", source);
        tokio::fs::read_to_string(source)
            .await
            .map_err(|source_err| LoadError::Read {
                path: PathBuf::from(source),
                source: source_err,
            })?
    };

    let playlist = parse_m3u(&content)?;
    info!("Loaded {} tracks", playlist.len());

    Ok(playlist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn empty_source_is_empty_playlist() {
        let playlist = load(&Client::new(), "").await.unwrap();
        assert!(playlist.is_empty());
    }

    #[tokio::test]
    async fn loads_remote_playlist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.m3u"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("#EXTM3U\n#EXTINF:-1,One\nhttp://a.example/1.ts\n"),
            )
            .mount(&server)
            .await;

        let playlist = load(&Client::new(), &format!("{}/list.m3u", server.uri()))
            .await
            .unwrap();
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.tracks[0].name, "One");
    }

    #[tokio::test]
    async fn remote_failure_is_load_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let err = load(&client, &format!("{}/missing.m3u", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Fetch(_)));
    }

    #[tokio::test]
    async fn loads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("local.m3u");
        std::fs::write(&file, "#EXTM3U\n#EXTINF:10,Clip\n/media/clip.mp4\n").unwrap();

        let playlist = load(&Client::new(), file.to_str().unwrap()).await.unwrap();
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.tracks[0].uri, "/media/clip.mp4");
    }

    #[tokio::test]
    async fn missing_local_file_is_read_error() {
        let err = load(&Client::new(), "/definitely/not/here.m3u")
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }
}
