//! HLS media playlist handling: parsing, segment download and local caching.

pub mod cache;
pub mod parser;
pub mod segments;

pub use cache::{DOWNLOAD_ROUTE, SegmentCache, clean_filename};
pub use segments::{SegmentDownloader, SegmentMapping, apply_mappings};
