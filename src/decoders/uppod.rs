//! Uppod player embeds
//!
//! The player's `file` option is salted: `#0` marks one substitution round,
//! `#1` an extra letter rotation on top of it. The decoded value is either a
//! single link or a `[720p]link,[480p]link` playlist.

use super::{fetch_page, fetch_page_async, Decoder, GoneSignals, Page};
use crate::core::video::{Quality, Video};
use crate::error::ResolveError;
use crate::platform::cipher::{decode_salted, parse_quality_playlist};
use crate::platform::client::{AsyncTransport, HttpRequest, Transport};
use crate::utils::mime::video_type_from_url;
use crate::utils::url::{ensure_scheme, origin_of};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:[\w-]+\.)*uppod\.\w+/(?:embed|video)/[\w-]+")
        .expect("uppod pattern is valid")
});

static FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"file\s*:\s*"([^"]+)""#).expect("file pattern is valid"));

const UNAVAILABLE: GoneSignals = GoneSignals::markers(&["Видео не найдено", "Video not found"]);

const SAMPLES: &[&str] = &[
    "https://player.uppod.tv/embed/f7a9c2",
    "https://uppod.ru/video/ep-01",
];

fn referer(embed_url: &str) -> Result<String, ResolveError> {
    origin_of(embed_url)
        .map(|origin| format!("{}/", origin))
        .ok_or_else(|| ResolveError::extraction("uppod", "embed origin"))
}

fn extract(embed_url: &str, page: &str) -> Result<Vec<Video>, ResolveError> {
    let file = FILE
        .captures(page)
        .ok_or_else(|| ResolveError::extraction("uppod", "player file"))?;
    let decoded = decode_salted(&file[1])?;
    debug!("uppod file decoded to {}", decoded);

    let entries = if decoded.contains('[') {
        parse_quality_playlist(&decoded)
    } else {
        vec![(Quality::UNKNOWN, decoded.trim().to_string())]
    };

    let referer = referer(embed_url)?;
    let videos: Vec<Video> = entries
        .into_iter()
        .filter(|(_, link)| !link.is_empty())
        .map(|(quality, link)| {
            let url = ensure_scheme(&link);
            Video::new(video_type_from_url(&url), quality, url).with_header("Referer", &referer)
        })
        .collect();

    if videos.is_empty() {
        return Err(ResolveError::extraction("uppod", "playable link"));
    }
    Ok(videos)
}

/// Uppod decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct UppodDecoder;

impl UppodDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Decoder for UppodDecoder {
    fn name(&self) -> &'static str {
        "uppod"
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
                warn!("uppod: {} ({})", reason, url);
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
                warn!("uppod: {} ({})", reason, url);
                Ok(Vec::new())
            }
        }
    }
}
