//! Mp4upload embeds, whose player setup is a packed script

use super::{fetch_page, fetch_page_async, search_packed, Decoder, GoneSignals, Page};
use crate::core::video::{Quality, Video, VideoType};
use crate::error::ResolveError;
use crate::platform::client::{AsyncTransport, HttpRequest, Transport};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?mp4upload\.com/embed-\w+\.html")
        .expect("mp4upload pattern is valid")
});

/// `player.src("…")` or `player.src({type: …, src: "…"})`
static PLAYER_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"player\.src\(\s*(?:\{[^}]*?src\s*:\s*)?"([^"]+)""#)
        .expect("player.src pattern is valid")
});

const REFERER: &str = "https://www.mp4upload.com/";

const UNAVAILABLE: GoneSignals = GoneSignals::markers(&["File was deleted", "File Not Found"]);

const SAMPLES: &[&str] = &["https://www.mp4upload.com/embed-9ld3qgxjxqg1.html"];

fn page_request(url: &str) -> HttpRequest {
    HttpRequest::get(url).header("Referer", REFERER)
}

fn extract(page: &str) -> Result<Vec<Video>, ResolveError> {
    let src = search_packed(page, &PLAYER_SRC)
        .ok_or_else(|| ResolveError::extraction("mp4upload", "player source"))?;
    Ok(vec![
        Video::new(VideoType::Mp4, Quality::UNKNOWN, src).with_header("Referer", REFERER)
    ])
}

/// Mp4upload decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp4uploadDecoder;

impl Mp4uploadDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Decoder for Mp4uploadDecoder {
    fn name(&self) -> &'static str {
        "mp4upload"
    }

    fn pattern(&self) -> &Regex {
        &PATTERN
    }

    fn samples(&self) -> &'static [&'static str] {
        SAMPLES
    }

    fn parse(&self, http: &dyn Transport, url: &str) -> Result<Vec<Video>, ResolveError> {
        self.check(url)?;
        match fetch_page(http, &page_request(url), &UNAVAILABLE)? {
            Page::Body(body) => extract(&body),
            Page::Unavailable(reason) => {
                warn!("mp4upload: {} ({})", reason, url);
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
        match fetch_page_async(http, &page_request(url), &UNAVAILABLE).await? {
            Page::Body(body) => extract(&body),
            Page::Unavailable(reason) => {
                warn!("mp4upload: {} ({})", reason, url);
                Ok(Vec::new())
            }
        }
    }
}
