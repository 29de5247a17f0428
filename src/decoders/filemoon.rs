//! Filemoon embeds
//!
//! The HLS master playlist is set up by a packed script on the embed page.

use super::{fetch_page, fetch_page_async, search_packed, Decoder, GoneSignals, Page};
use crate::core::video::{Quality, Video, VideoType};
use crate::error::ResolveError;
use crate::platform::client::{AsyncTransport, HttpRequest, Transport};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?filemoon\.(?:sx|to|in)/[ed]/\w+")
        .expect("filemoon pattern is valid")
});

static FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"file\s*:\s*"([^"]+)""#).expect("file pattern is valid"));

const UNAVAILABLE: GoneSignals =
    GoneSignals::markers(&["Page not found", "This video has been deleted"]);

const SAMPLES: &[&str] = &[
    "https://filemoon.sx/e/ed0p89ndlpl6?t=4xnZDvwlDV0JxQ%3D%3D&autostart=true",
    "https://filemoon.to/e/k1x2y3z4w5v6",
];

fn extract(embed_url: &str, page: &str) -> Result<Vec<Video>, ResolveError> {
    let src = search_packed(page, &FILE)
        .ok_or_else(|| ResolveError::extraction("filemoon", "packed player source"))?;
    Ok(vec![
        Video::new(VideoType::M3u8, Quality::UNKNOWN, src).with_header("Referer", embed_url)
    ])
}

/// Filemoon decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct FilemoonDecoder;

impl FilemoonDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Decoder for FilemoonDecoder {
    fn name(&self) -> &'static str {
        "filemoon"
    }

    fn pattern(&self) -> &Regex {
        &PATTERN
    }

    fn samples(&self) -> &'static [&'static str] {
        SAMPLES
    }

    fn parse(&self, http: &dyn Transport, url: &str) -> Result<Vec<Video>, ResolveError> {
        self.check(url)?;
        match fetch_page(http, &HttpRequest::get(url), &UNAVAILABLE)? {
            Page::Body(body) => extract(url, &body),
            Page::Unavailable(reason) => {
                warn!("filemoon: {} ({})", reason, url);
                Ok(Vec::new())
            }
        }
    }

    async fn parse_async(
        &self,
        http: &dyn AsyncTransport,
        url: &str,
    ) -> Result<Vec<Video>, ResolveError> {
        self.check(url)?;
        match fetch_page_async(http, &HttpRequest::get(url), &UNAVAILABLE).await? {
            Page::Body(body) => extract(url, &body),
            Page::Unavailable(reason) => {
                warn!("filemoon: {} ({})", reason, url);
                Ok(Vec::new())
            }
        }
    }
}
