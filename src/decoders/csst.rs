//! CSST (PlayerJS) embeds
//!
//! The player config's `file` is either a plain quality playlist or a
//! `#`-prefixed base64 blob split over several concatenated string literals
//! and salted with separator markers.

use super::{fetch_page, fetch_page_async, Decoder, GoneSignals, Page};
use crate::core::video::Video;
use crate::error::ResolveError;
use crate::platform::cipher::{decode_playlist_file, parse_quality_playlist};
use crate::platform::client::{AsyncTransport, HttpRequest, Transport};
use crate::utils::mime::video_type_from_url;
use crate::utils::url::ensure_scheme;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?csst\.online/embed/\d+").expect("csst pattern is valid")
});

static FILE_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"file\s*:\s*((?:"[^"]*"\s*\+\s*)*"[^"]*")"#).expect("file pattern is valid")
});

static STRING_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("string literal pattern is valid"));

const REFERER: &str = "https://csst.online/";

/// Separator markers the player strips before decoding
const TRASH_MARKERS: &[&str] = &["@@!!", "#$^^", "$$!!", "@#!@", "^^#@"];

const UNAVAILABLE: GoneSignals = GoneSignals::markers(&["Видео не найдено", "File not found"]);

const SAMPLES: &[&str] = &["https://csst.online/embed/385126"];

/// String literals of the `file:` expression, in order
fn file_fragments(page: &str) -> Result<Vec<String>, ResolveError> {
    let expr = FILE_EXPR
        .captures(page)
        .ok_or_else(|| ResolveError::extraction("csst", "player file"))?;
    Ok(STRING_LITERAL
        .captures_iter(&expr[1])
        .map(|caps| caps[1].to_string())
        .collect())
}

fn extract(page: &str) -> Result<Vec<Video>, ResolveError> {
    let fragments = file_fragments(page)?;

    let playlist = if fragments.first().is_some_and(|f| f.starts_with('#')) {
        let parts: Vec<&str> = fragments.iter().map(String::as_str).collect();
        decode_playlist_file(&parts, TRASH_MARKERS)?
    } else {
        fragments.concat()
    };

    let videos: Vec<Video> = parse_quality_playlist(&playlist)
        .into_iter()
        .map(|(quality, link)| {
            let url = ensure_scheme(&link);
            Video::new(video_type_from_url(&url), quality, url).with_header("Referer", REFERER)
        })
        .collect();

    if videos.is_empty() {
        return Err(ResolveError::extraction("csst", "playlist entries"));
    }
    Ok(videos)
}

/// CSST decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct CsstDecoder;

impl CsstDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Decoder for CsstDecoder {
    fn name(&self) -> &'static str {
        "csst"
    }

    fn pattern(&self) -> &Regex {
        &PATTERN
    }

    fn samples(&self) -> &'static [&'static str] {
        SAMPLES
    }

    fn parse(&self, http: &dyn Transport, url: &str) -> Result<Vec<Video>, ResolveError> {
        self.check(url)?;
        let request = HttpRequest::get(url).header("Referer", REFERER);
        match fetch_page(http, &request, &UNAVAILABLE)? {
            Page::Body(body) => extract(&body),
            Page::Unavailable(reason) => {
                warn!("csst: {} ({})", reason, url);
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
        let request = HttpRequest::get(url).header("Referer", REFERER);
        match fetch_page_async(http, &request, &UNAVAILABLE).await? {
            Page::Body(body) => extract(&body),
            Page::Unavailable(reason) => {
                warn!("csst: {} ({})", reason, url);
                Ok(Vec::new())
            }
        }
    }
}
