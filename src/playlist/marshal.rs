//! Serialization of the rewritten playlist.

use super::{Playlist, Track};
use crate::error::{ProxyError, Result};
use crate::metrics;
use crate::rewrite::{RewriteMode, UrlRewriter};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Write `playlist` as M3U with every track URI rewritten.
///
/// Tracks whose URI cannot be rewritten are skipped and removed from
/// `playlist`, and do not consume an index: surviving tracks are numbered
/// `0..n` without gaps. Returns the number of tracks written.
pub fn marshal_into<W: Write>(
    playlist: &mut Playlist,
    rewriter: &UrlRewriter,
    mode: RewriteMode,
    into: &mut W,
) -> io::Result<usize> {
    let tracks = std::mem::take(&mut playlist.tracks);
    let mut kept = Vec::with_capacity(tracks.len());

    into.write_all(b"#EXTM3U\n")?;

    for track in tracks {
        let uri = match rewriter.rewrite(&track.uri, kept.len(), mode) {
            Ok(uri) => uri,
            Err(e) => {
                warn!(track = %track.name, "Dropping track: {}", e);
                metrics::record_track_dropped();
                continue;
            }
        };

        writeln!(into, "{}, {}", info_line(&track), track.name)?;
        writeln!(into, "{}", uri)?;

        kept.push(track);
    }

    playlist.tracks = kept;
    Ok(playlist.tracks.len())
}

/// `#EXTINF:<length> k="v" ...` without the trailing name.
fn info_line(track: &Track) -> String {
    let tags = track
        .tags
        .iter()
        .map(|tag| format!("{}={:?}", tag.name, tag.value))
        .collect::<Vec<_>>()
        .join(" ");

    format!("#EXTINF:{} {}", track.length, tags)
}

/// Write the proxied playlist file at startup.
///
/// An empty playlist is a no-op and creates no file.
pub fn initialize_playlist(
    playlist: &mut Playlist,
    rewriter: &UrlRewriter,
    path: &Path,
) -> Result<()> {
    if playlist.is_empty() {
        info!("Playlist is empty, skipping {}", path.display());
        return Ok(());
    }

    let write_err = |source: io::Error| ProxyError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let written =
        marshal_into(playlist, rewriter, RewriteMode::Plain, &mut writer).map_err(write_err)?;

    let file = writer.into_inner().map_err(|e| write_err(e.into_error()))?;
    file.sync_all().map_err(write_err)?;

    info!("Wrote {} tracks to {}", written, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::playlist::Tag;

    fn rewriter() -> UrlRewriter {
        UrlRewriter::new(&Config {
            hostname: "proxy.local".to_string(),
            advertised_port: 8080,
            user: "u1".to_string(),
            password: "p1".to_string(),
            ..Config::default()
        })
    }

    fn track(name: &str, uri: &str) -> Track {
        Track {
            name: name.to_string(),
            length: -1.0,
            tags: Vec::new(),
            uri: uri.to_string(),
        }
    }

    #[test]
    fn writes_header_info_and_uri_lines() {
        let mut playlist = Playlist {
            tracks: vec![Track {
                tags: vec![
                    Tag {
                        name: "tvg-id".to_string(),
                        value: "news.uk".to_string(),
                    },
                    Tag {
                        name: "group-title".to_string(),
                        value: "News".to_string(),
                    },
                ],
                ..track("News One", "http://origin.example/live/news1.ts")
            }],
        };

        let mut out = Vec::new();
        let written =
            marshal_into(&mut playlist, &rewriter(), RewriteMode::Plain, &mut out).unwrap();

        assert_eq!(written, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "#EXTM3U\n\
             #EXTINF:-1 tvg-id=\"news.uk\" group-title=\"News\", News One\n\
             http://proxy.local:8080/a6d7e846/u1/p1/0/news1.ts\n"
        );
    }

    #[test]
    fn failed_tracks_do_not_consume_an_index() {
        let mut playlist = Playlist {
            tracks: vec![
                track("zero", "http://origin.example/a/zero.ts"),
                track("broken", "not a url"),
                track("two", "http://origin.example/b/two.ts"),
            ],
        };

        let mut out = Vec::new();
        marshal_into(&mut playlist, &rewriter(), RewriteMode::Plain, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("/a6d7e846/u1/p1/0/zero.ts"));
        assert!(text.contains("/a6d7e846/u1/p1/1/two.ts"));
        assert!(!text.contains("broken"));

        let names: Vec<&str> = playlist.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zero", "two"]);
    }

    #[test]
    fn fractional_length_is_kept() {
        let mut playlist = Playlist {
            tracks: vec![Track {
                length: 12.5,
                ..track("clip", "http://origin.example/clip.mp4")
            }],
        };

        let mut out = Vec::new();
        marshal_into(&mut playlist, &rewriter(), RewriteMode::Plain, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("#EXTINF:12.5 , clip\n"));
    }

    #[test]
    fn empty_playlist_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxied.m3u");

        initialize_playlist(&mut Playlist::default(), &rewriter(), &path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn initialize_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxied.m3u");
        let mut playlist = Playlist {
            tracks: vec![track("one", "http://origin.example/one.ts")],
        };

        initialize_playlist(&mut playlist, &rewriter(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#EXTM3U\n"));
        assert!(content.ends_with("http://proxy.local:8080/a6d7e846/u1/p1/0/one.ts\n"));
    }

    #[test]
    fn unwritable_path_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("proxied.m3u");
        let mut playlist = Playlist {
            tracks: vec![track("one", "http://origin.example/one.ts")],
        };

        let err = initialize_playlist(&mut playlist, &rewriter(), &path).unwrap_err();
        assert!(matches!(err, ProxyError::Write { .. }));
    }
}
