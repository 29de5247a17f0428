//! Aniboom player
//!
//! The embed page keeps both manifests in the `data-parameters` attribute of
//! the player element, as JSON whose `dash` and `hls` fields are themselves
//! JSON strings. The CDN checks the playback headers.

use super::{fetch_page, fetch_page_async, Decoder, GoneSignals, Page};
use crate::core::video::{Quality, Video, VideoType};
use crate::error::ResolveError;
use crate::platform::client::{AsyncTransport, HttpRequest, Transport, DEFAULT_USER_AGENT};
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::warn;

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?aniboom\.one/embed/[\w-]+").expect("aniboom pattern is valid")
});

const REFERER: &str = "https://aniboom.one/";
const ORIGIN: &str = "https://aniboom.one";
const PAGE_REFERER: &str = "https://animego.org/";

const UNAVAILABLE: GoneSignals = GoneSignals {
    statuses: &[404, 410],
    markers: &["Видео недоступно", "Video is not available", "Video not found"],
};

const SAMPLES: &[&str] = &[
    "https://aniboom.one/embed/N9QdKm4Mwz1?episode=1&translation=2",
    "https://aniboom.one/embed/6BmMbB7MxWO",
];

#[derive(Debug, Deserialize)]
struct PlayerParameters {
    #[serde(default)]
    dash: Option<String>,
    #[serde(default)]
    hls: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    src: String,
}

fn page_request(url: &str) -> HttpRequest {
    HttpRequest::get(url)
        .header("Referer", PAGE_REFERER)
        .header("Accept-Language", "ru-RU")
}

/// Headers the CDN requires for playback
fn playback(video: Video) -> Video {
    video
        .with_header("Referer", REFERER)
        .with_header("Accept-Language", "ru-RU")
        .with_header("Origin", ORIGIN)
        .with_header("User-Agent", DEFAULT_USER_AGENT)
}

fn player_parameters(page: &str) -> Result<String, ResolveError> {
    let document = Html::parse_document(page);
    let selector = Selector::parse("div#video[data-parameters]")
        .map_err(|e| ResolveError::extraction("aniboom", format!("player selector: {}", e)))?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("data-parameters"))
        .map(str::to_string)
        .ok_or_else(|| ResolveError::extraction("aniboom", "player data-parameters"))
}

fn manifest_src(field: Option<&str>) -> Result<Option<String>, ResolveError> {
    match field {
        Some(raw) if !raw.trim().is_empty() => {
            let manifest: Manifest = serde_json::from_str(raw)
                .map_err(|e| ResolveError::corruption(format!("aniboom manifest: {}", e)))?;
            Ok(Some(manifest.src))
        }
        _ => Ok(None),
    }
}

/// Videos described by the embed page, DASH first
fn extract(page: &str) -> Result<Vec<Video>, ResolveError> {
    let parameters: PlayerParameters = serde_json::from_str(&player_parameters(page)?)
        .map_err(|e| ResolveError::corruption(format!("aniboom player parameters: {}", e)))?;

    let mut videos = Vec::new();
    if let Some(src) = manifest_src(parameters.dash.as_deref())? {
        videos.push(playback(Video::new(VideoType::Mpd, Quality::Q1080, src)));
    }
    if let Some(src) = manifest_src(parameters.hls.as_deref())? {
        videos.push(playback(Video::new(VideoType::M3u8, Quality::Q1080, src)));
    }

    if videos.is_empty() {
        return Err(ResolveError::extraction("aniboom", "dash or hls manifest"));
    }
    Ok(videos)
}

/// Aniboom decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct AniboomDecoder;

impl AniboomDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Decoder for AniboomDecoder {
    fn name(&self) -> &'static str {
        "aniboom"
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
                warn!("aniboom: {} ({})", reason, url);
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
                warn!("aniboom: {} ({})", reason, url);
                Ok(Vec::new())
            }
        }
    }
}
