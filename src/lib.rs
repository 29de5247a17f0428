//! # vidresolve - embed page to playable link resolver
//!
//! Resolves catalog titles and video-host embed pages down to directly
//! playable media URLs.
//!
//! ## Features
//!
//! - Host decoders for Kodik, Aniboom, Sibnet, CSST, Mp4upload, Filemoon and Uppod
//! - Dean Edwards packer unpacking and the hosts' string ciphers
//! - Lazy five-stage pipeline from search results to videos
//! - Blocking and async APIs over one caller-owned session
//!
//! ## Example
//!
//! ```rust,no_run
//! use vidresolve::{AsyncSession, HttpClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = AsyncSession::new(HttpClientConfig::default())?;
//!     let videos = session
//!         .resolve_videos("https://kodik.info/seria/1/abc/720p")
//!         .await?;
//!     for video in videos {
//!         println!("{} {} {}", video.quality, video.kind, video.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod decoders;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::{
    dedup_videos, select_video, walk, walk_async, Entry, Episode, Extractor, Listing,
    ListingKind, Provider, Quality, QualitySelector, Source, Title, Video, VideoType, Walk,
    WalkItem,
};
pub use crate::decoders::{Decoder, Registry};
pub use crate::error::ResolveError;
pub use crate::platform::{AsyncSession, HttpClientConfig, Session};

/// Result type alias for vidresolve operations
pub type Result<T> = std::result::Result<T, ResolveError>;
