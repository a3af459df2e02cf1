//! Extended M3U text parser.

use super::{Playlist, Tag, Track};
use crate::error::LoadError;

const HEADER: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF:";

/// Parse extended M3U text into a [`Playlist`].
///
/// A URI line takes the attributes of the closest preceding `#EXTINF`.
/// URIs without one become tracks with length `-1`, no tags and no name.
pub fn parse_m3u(content: &str) -> Result<Playlist, LoadError> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(n, line)| (n + 1, line.trim_start_matches('\u{feff}').trim()))
        .filter(|(_, line)| !line.is_empty());

    match lines.next() {
        Some((_, first)) if first.starts_with(HEADER) => {}
        _ => return Err(LoadError::MissingHeader),
    }

    let mut tracks = Vec::new();
    let mut pending: Option<Track> = None;

    for (line_no, line) in lines {
        if let Some(info) = line.strip_prefix(EXTINF) {
            pending = Some(parse_extinf(info, line_no)?);
        } else if line.starts_with('#') {
            continue;
        } else {
            let mut track = pending.take().unwrap_or_else(|| Track {
                name: String::new(),
                length: -1.0,
                tags: Vec::new(),
                uri: String::new(),
            });
            track.uri = line.to_string();
            tracks.push(track);
        }
    }

    Ok(Playlist { tracks })
}

fn parse_extinf(info: &str, line: usize) -> Result<Track, LoadError> {
    let (head, name) = split_name(info);
    let head = head.trim();

    let (length, attrs) = match head.find(char::is_whitespace) {
        Some(end) => (&head[..end], &head[end..]),
        None => (head, ""),
    };

    let length = length.parse::<f64>().map_err(|e| LoadError::Parse {
        line,
        reason: format!("invalid length {:?}: {}", length, e),
    })?;

    Ok(Track {
        name: name.trim().to_string(),
        length,
        tags: parse_tags(attrs),
        uri: String::new(),
    })
}

/// Split at the first comma that is not inside a quoted value.
fn split_name(info: &str) -> (&str, &str) {
    let mut in_quotes = false;
    for (i, c) in info.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return (&info[..i], &info[i + 1..]),
            _ => {}
        }
    }
    (info, "")
}

fn parse_tags(input: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut rest = input.trim_start();

    while let Some(eq) = rest.find('=') {
        // key is the last word before '='
        let key = rest[..eq]
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or_default();
        let after = &rest[eq + 1..];

        let (value, remaining) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => match after.find(char::is_whitespace) {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            },
        };

        if !key.is_empty() {
            tags.push(Tag {
                name: key.to_string(),
                value: value.to_string(),
            });
        }
        rest = remaining.trim_start();
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "#EXTM3U x-tvg-url=\"http://epg.example/guide.xml\"\n\
#EXTINF:-1 tvg-id=\"news.uk\" tvg-name=\"News, UK\" group-title=\"News\",News One\n\
http://origin.example/live/news1.ts\n\
\n\
#EXTVLCOPT:http-user-agent=test\n\
#EXTINF:120.5,Movie Trailer\n\
http://origin.example/vod/trailer.mp4\n";

    #[test]
    fn parses_tracks_in_order() {
        let playlist = parse_m3u(SAMPLE).unwrap();
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.tracks[0].uri, "http://origin.example/live/news1.ts");
        assert_eq!(playlist.tracks[1].uri, "http://origin.example/vod/trailer.mp4");
    }

    #[test]
    fn keeps_tag_order_and_quoted_commas() {
        let playlist = parse_m3u(SAMPLE).unwrap();
        let track = &playlist.tracks[0];
        assert_eq!(track.length, -1.0);
        assert_eq!(track.name, "News One");
        let names: Vec<&str> = track.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["tvg-id", "tvg-name", "group-title"]);
        assert_eq!(track.tags[1].value, "News, UK");
    }

    #[test]
    fn parses_fractional_length_without_tags() {
        let playlist = parse_m3u(SAMPLE).unwrap();
        let track = &playlist.tracks[1];
        assert_eq!(track.length, 120.5);
        assert!(track.tags.is_empty());
        assert_eq!(track.name, "Movie Trailer");
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = parse_m3u("#EXTINF:-1,Foo\nhttp://a/b.ts\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingHeader));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(parse_m3u(""), Err(LoadError::MissingHeader)));
    }

    #[test]
    fn invalid_length_reports_line() {
        let err = parse_m3u("#EXTM3U\n#EXTINF:abc,Foo\nhttp://a/b.ts\n").unwrap_err();
        match err {
            LoadError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bare_uri_becomes_untagged_track() {
        let playlist = parse_m3u("#EXTM3U\nhttp://a/b.ts\n").unwrap();
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist.tracks[0].length, -1.0);
        assert_eq!(playlist.tracks[0].name, "");
    }

    #[test]
    fn header_only_is_empty_playlist() {
        let playlist = parse_m3u("\u{feff}#EXTM3U\n").unwrap();
        assert!(playlist.is_empty());
    }
}
