pub mod health;
pub mod playlist;
pub mod stream;
pub mod xtream;

/// Content type for HLS playlists
pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Content type for plain M3U playlists
pub const M3U_CONTENT_TYPE: &str = "audio/x-mpegurl";
