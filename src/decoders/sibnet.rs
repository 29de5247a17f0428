//! Sibnet video shell pages

use super::{fetch_page, fetch_page_async, Decoder, GoneSignals, Page};
use crate::core::video::{Quality, Video, VideoType};
use crate::error::ResolveError;
use crate::platform::client::{AsyncTransport, HttpRequest, Transport};
use crate::utils::url::absolutize;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://video\.sibnet\.ru/shell\.php\?videoid=\d+")
        .expect("sibnet pattern is valid")
});

static PLAYER_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"player\.src\(\[\{\s*src:\s*"([^"]+)""#).expect("player.src pattern is valid")
});

const UNAVAILABLE: GoneSignals = GoneSignals::markers(&[
    "Видео недоступно",
    "Видео не существует",
    "Видео удалено",
    "Video not found",
]);

const SAMPLES: &[&str] = &["https://video.sibnet.ru/shell.php?videoid=4320487"];

fn extract(embed_url: &str, page: &str) -> Result<Vec<Video>, ResolveError> {
    let src = PLAYER_SRC
        .captures(page)
        .ok_or_else(|| ResolveError::extraction("sibnet", "player source"))?;
    let url = absolutize(embed_url, &src[1])?;

    Ok(vec![Video::new(VideoType::Mp4, Quality::Q480, url).with_header("Referer", embed_url)])
}

/// Sibnet decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct SibnetDecoder;

impl SibnetDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Decoder for SibnetDecoder {
    fn name(&self) -> &'static str {
        "sibnet"
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
                warn!("sibnet: {} ({})", reason, url);
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
                warn!("sibnet: {} ({})", reason, url);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::StubTransport;

    const EMBED: &str = "https://video.sibnet.ru/shell.php?videoid=4320487";

    const PAGE: &str = r#"<script type="text/javascript">
var player = videojs('video_html5_wrapper', {autoplay: false});
player.src([{src: "/v/2c7a0c1d09b1ffb1b6f2d3e4a5b6c7d8/4320487.mp4", type: "video/mp4"},]);
</script>"#;

    #[test]
    fn test_pattern() {
        let decoder = SibnetDecoder::new();
        assert!(decoder.matches(EMBED));
        assert!(!decoder.matches("https://video.sibnet.ru/video4320487"));
        assert!(!decoder.matches("https://sibnet.ru/shell.php?videoid=1"));
    }

    #[test]
    fn test_extract() {
        let videos = extract(EMBED, PAGE).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(
            videos[0].url,
            "https://video.sibnet.ru/v/2c7a0c1d09b1ffb1b6f2d3e4a5b6c7d8/4320487.mp4"
        );
        assert_eq!(videos[0].kind, VideoType::Mp4);
        assert_eq!(videos[0].quality, Quality::Q480);
        assert_eq!(videos[0].headers["Referer"], EMBED);
    }

    #[test]
    fn test_unavailable_marker() {
        let http = StubTransport::new().get(EMBED, "<div>Видео недоступно</div>");
        assert!(SibnetDecoder::new().parse(&http, EMBED).unwrap().is_empty());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let http = StubTransport::new().get(EMBED, "<html></html>");
        let err = SibnetDecoder::new().parse(&http, EMBED).unwrap_err();
        assert!(matches!(err, ResolveError::ExtractionFailure { .. }));
    }

    #[tokio::test]
    async fn test_parse_async() {
        let http = StubTransport::new().get(EMBED, PAGE);
        let videos = SibnetDecoder::new().parse_async(&http, EMBED).await.unwrap();
        assert_eq!(videos, extract(EMBED, PAGE).unwrap());
    }
}
