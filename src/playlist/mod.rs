//! M3U playlist model, loading and proxied-file marshalling.

pub mod loader;
pub mod marshal;
pub mod parser;

/// `key="value"` attribute from an `#EXTINF` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// A single playlist entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub name: String,
    /// `#EXTINF` duration in seconds, `-1` for live streams
    pub length: f64,
    pub tags: Vec<Tag>,
    pub uri: String,
}

/// Ordered list of tracks. Positions are significant: the marshaller
/// derives track indices from them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Playlist {
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }
}
