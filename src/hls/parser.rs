use crate::error::{ProxyError, Result};
use m3u8_rs::{Playlist, parse_playlist_res};
use tracing::debug;

/// Parse HLS playlist from string content
pub fn parse_hls_playlist(content: &str) -> Result<Playlist> {
    match parse_playlist_res(content.as_bytes()) {
        Ok(playlist) => {
            debug!(
                "Parsed {} playlist",
                match playlist {
                    Playlist::MasterPlaylist(_) => "master",
                    Playlist::MediaPlaylist(_) => "media",
                }
            );
            Ok(playlist)
        }
        Err(e) => Err(ProxyError::PlaylistParse(format!("{:?}", e))),
    }
}

/// Serialize a playlist back to M3U8 text
pub fn serialize_playlist(playlist: &Playlist) -> Result<String> {
    let mut output = Vec::new();
    playlist
        .write_to(&mut output)
        .map_err(|e| ProxyError::PlaylistSerialize(format!("Failed to write playlist: {}", e)))?;

    String::from_utf8(output).map_err(|e| {
        ProxyError::PlaylistSerialize(format!("Playlist is not valid UTF-8: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEDIA: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-TARGETDURATION:6\n\
#EXT-X-MEDIA-SEQUENCE:100\n\
#EXTINF:6.0,\n\
http://cdn.example/live/seg100.ts\n\
#EXTINF:6.0,\n\
http://cdn.example/live/seg101.ts\n";

    #[test]
    fn parses_media_playlist() {
        match parse_hls_playlist(MEDIA).unwrap() {
            Playlist::MediaPlaylist(media) => {
                assert_eq!(media.media_sequence, 100);
                assert_eq!(media.segments.len(), 2);
                assert_eq!(media.segments[0].uri, "http://cdn.example/live/seg100.ts");
            }
            Playlist::MasterPlaylist(_) => panic!("expected media playlist"),
        }
    }

    #[test]
    fn parses_master_playlist() {
        let master = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=1280000\n\
low/index.m3u8\n";
        assert!(matches!(
            parse_hls_playlist(master).unwrap(),
            Playlist::MasterPlaylist(_)
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_hls_playlist("this is not a playlist"),
            Err(ProxyError::PlaylistParse(_))
        ));
    }

    #[test]
    fn serialize_keeps_segments() {
        let playlist = parse_hls_playlist(MEDIA).unwrap();
        let text = serialize_playlist(&playlist).unwrap();
        assert!(text.starts_with("#EXTM3U"));
        assert!(text.contains("http://cdn.example/live/seg101.ts"));
        assert!(text.contains("#EXT-X-MEDIA-SEQUENCE:100"));
    }
}
