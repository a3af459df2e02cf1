//! Reverse proxy for M3U and Xtream IPTV sources.
//!
//! At startup the source playlist is loaded, every track URL is rewritten to
//! point at this proxy and the result is written to disk. Live HLS tracks are
//! served by downloading their segments into a local cache and handing the
//! client a playlist that references the cached copies.

pub mod config;
pub mod error;
pub mod hls;
pub mod http_retry;
pub mod metrics;
pub mod playlist;
pub mod rewrite;
pub mod server;
