//! Kodik player (kodik / aniqit / anivod mirrors)
//!
//! The embed page carries signed request parameters; the player script
//! carries the base64-encoded path of the link API. The API answers with a
//! per-quality table of ROT13 + base64 encoded HLS links.

use super::{fetch_page, fetch_page_async, Decoder, GoneSignals, Page};
use crate::core::video::{Quality, Video};
use crate::error::ResolveError;
use crate::platform::cipher::decode_rot13_base64;
use crate::platform::client::{AsyncTransport, HttpRequest, Transport};
use crate::utils::mime::{video_type_from_mime, video_type_from_url};
use crate::utils::url::{absolutize, ensure_scheme, has_scheme, origin_of};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?:)?//(?:www\.)?(?:kodik|aniqit|anivod)\.(?:info|biz|cc|com)/(?:seria|video|serial)/\d+/[0-9a-zA-Z]+/\d+p",
    )
    .expect("kodik pattern is valid")
});

static URL_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"urlParams\s*=\s*'([^']+)'").expect("urlParams pattern is valid")
});

static VIDEO_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"videoInfo\.(type|hash|id)\s*=\s*['"]([^'"]*)['"]"#)
        .expect("videoInfo pattern is valid")
});

static PLAYER_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"src="(/assets/js/app\.(?:player_single|serial|player)[\w.]*\.js)""#)
        .expect("player script pattern is valid")
});

static API_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"atob\("([A-Za-z0-9+/=]+)"\)"#).expect("atob pattern is valid")
});

const UNAVAILABLE: GoneSignals = GoneSignals::markers(&[
    "Видео не найдено",
    "Video not found",
    "Видео заблокировано",
    "недоступно в вашей стране",
]);

const SAMPLES: &[&str] = &[
    "https://kodik.info/seria/1133512/04d5f7824ba3563bd78e44a22451bb45/720p",
    "//aniqit.com/video/91587/e3e0e9a4c2f4a4b6ec4f7ef9f9c0f4a1/720p",
    "https://anivod.com/serial/45211/3ad4b1e2a9f8c7d6e5f4a3b2c1d0e9f8/720p",
];

/// Signed parameters scraped from the embed page
#[derive(Debug, Clone, PartialEq, Eq)]
struct EmbedParams {
    url_params: BTreeMap<String, String>,
    video_type: String,
    hash: String,
    id: String,
    script_path: String,
}

impl EmbedParams {
    fn extract(page: &str) -> Result<Self, ResolveError> {
        let raw = URL_PARAMS
            .captures(page)
            .ok_or_else(|| ResolveError::extraction("kodik", "urlParams"))?;
        let json: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&raw[1])?;
        let url_params = json
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();

        let mut info: BTreeMap<String, String> = BTreeMap::new();
        for caps in VIDEO_INFO.captures_iter(page) {
            info.entry(caps[1].to_string())
                .or_insert_with(|| caps[2].to_string());
        }
        let mut take = |field: &str| {
            info.remove(field)
                .ok_or_else(|| ResolveError::extraction("kodik", format!("videoInfo.{}", field)))
        };
        let video_type = take("type")?;
        let hash = take("hash")?;
        let id = take("id")?;

        let script_path = PLAYER_SCRIPT
            .captures(page)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| ResolveError::extraction("kodik", "player script"))?;

        Ok(Self {
            url_params,
            video_type,
            hash,
            id,
            script_path,
        })
    }

    fn param(&self, key: &str) -> String {
        self.url_params.get(key).cloned().unwrap_or_default()
    }

    /// The link API call, signed with the embed page parameters
    fn api_request(&self, embed_url: &str, api_url: &str) -> HttpRequest {
        let mut request = HttpRequest::post(api_url)
            .header("Referer", embed_url)
            .header("X-Requested-With", "XMLHttpRequest")
            .form_field("hash", &self.hash)
            .form_field("id", &self.id)
            .form_field("type", &self.video_type);
        if let Some(origin) = origin_of(embed_url) {
            request = request.header("Origin", origin);
        }
        for key in ["d", "d_sign", "pd", "pd_sign", "ref", "ref_sign"] {
            request = request.form_field(key, self.param(key));
        }
        request
            .form_field("bad_user", "true")
            .form_field("cdn_is_working", "true")
            .form_field("info", "{}")
    }
}

/// Decode the API path hidden in the player script
fn api_path(script: &str) -> Result<String, ResolveError> {
    let encoded = API_PATH
        .captures(script)
        .ok_or_else(|| ResolveError::extraction("kodik", "link API path"))?;
    let bytes = STANDARD
        .decode(&encoded[1])
        .map_err(|e| ResolveError::corruption(format!("kodik API path: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ResolveError::corruption(format!("kodik API path is not UTF-8: {}", e)))
}

#[derive(Debug, Deserialize)]
struct LinksResponse {
    links: BTreeMap<String, Vec<Link>>,
}

#[derive(Debug, Deserialize)]
struct Link {
    src: String,
    #[serde(default, rename = "type")]
    mime: Option<String>,
}

/// Turn the API's link table into videos, lowest quality first
fn videos_from_links(body: &str) -> Result<Vec<Video>, ResolveError> {
    let response: LinksResponse = serde_json::from_str(body)
        .map_err(|e| ResolveError::corruption(format!("kodik link table: {}", e)))?;

    let mut entries: Vec<(Quality, Link)> = response
        .links
        .into_iter()
        .filter_map(|(label, links)| {
            let quality = Quality::from_label(&label)?;
            links.into_iter().next().map(|link| (quality, link))
        })
        .collect();
    entries.sort_by_key(|(quality, _)| *quality);
    if entries.is_empty() {
        return Err(ResolveError::extraction("kodik", "link table entries"));
    }

    entries
        .into_iter()
        .map(|(quality, link)| -> Result<Video, ResolveError> {
            let src = if has_scheme(&link.src) || link.src.starts_with("//") {
                link.src
            } else {
                decode_rot13_base64(&link.src)?
            };
            let mut url = ensure_scheme(&src);
            // The 720 entry points at the 480 rendition
            if quality == Quality::Q720 {
                url = url.replace("480.mp4", "720.mp4");
            }

            let kind = link
                .mime
                .as_deref()
                .and_then(video_type_from_mime)
                .unwrap_or_else(|| video_type_from_url(&url));
            debug!("kodik {} -> {}", quality, url);
            Ok(Video::new(kind, quality, url))
        })
        .collect()
}

fn require_origin(embed_url: &str) -> Result<(), ResolveError> {
    origin_of(embed_url)
        .map(|_| ())
        .ok_or_else(|| ResolveError::extraction("kodik", "embed origin"))
}

/// Kodik decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct KodikDecoder;

impl KodikDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Decoder for KodikDecoder {
    fn name(&self) -> &'static str {
        "kodik"
    }

    fn pattern(&self) -> &Regex {
        &PATTERN
    }

    fn samples(&self) -> &'static [&'static str] {
        SAMPLES
    }

    fn parse(&self, http: &dyn Transport, url: &str) -> Result<Vec<Video>, ResolveError> {
        self.check(url)?;
        let embed_url = ensure_scheme(url);
        require_origin(&embed_url)?;

        let page = match fetch_page(http, &HttpRequest::get(&embed_url), &UNAVAILABLE)? {
            Page::Body(body) => body,
            Page::Unavailable(reason) => {
                warn!("kodik: {} ({})", reason, embed_url);
                return Ok(Vec::new());
            }
        };
        let params = EmbedParams::extract(&page)?;

        let script_url = absolutize(&embed_url, &params.script_path)?;
        let script = http
            .execute(&HttpRequest::get(script_url).header("Referer", &embed_url))?
            .ensure_success()?;
        let api_url = absolutize(&embed_url, &api_path(script.text())?)?;

        let links = http
            .execute(&params.api_request(&embed_url, &api_url))?
            .ensure_success()?;
        videos_from_links(links.text())
    }

    async fn parse_async(
        &self,
        http: &dyn AsyncTransport,
        url: &str,
    ) -> Result<Vec<Video>, ResolveError> {
        self.check(url)?;
        let embed_url = ensure_scheme(url);
        require_origin(&embed_url)?;

        let page = match fetch_page_async(http, &HttpRequest::get(&embed_url), &UNAVAILABLE).await? {
            Page::Body(body) => body,
            Page::Unavailable(reason) => {
                warn!("kodik: {} ({})", reason, embed_url);
                return Ok(Vec::new());
            }
        };
        let params = EmbedParams::extract(&page)?;

        let script_url = absolutize(&embed_url, &params.script_path)?;
        let script = http
            .execute(&HttpRequest::get(script_url).header("Referer", &embed_url))
            .await?
            .ensure_success()?;
        let api_url = absolutize(&embed_url, &api_path(script.text())?)?;

        let links = http
            .execute(&params.api_request(&embed_url, &api_url))
            .await?
            .ensure_success()?;
        videos_from_links(links.text())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::video::VideoType;
    use crate::platform::client::Method;
    use crate::utils::testing::StubTransport;

    pub(crate) const EMBED: &str = "https://kodik.info/seria/1133512/04d5f7824ba3563bd78e44a22451bb45/720p";
    const SCRIPT: &str = "https://kodik.info/assets/js/app.player_single.0a1b2c3d.js";
    const API: &str = "https://kodik.info/ftor";

    pub(crate) const PAGE: &str = r#"<html><head>
<script>
  var domain = "animego.org";
  var urlParams = '{"d":"animego.org","d_sign":"a1b2","pd":"kodik.info","pd_sign":"c3d4","ref":"https%3A%2F%2Fanimego.org%2F","ref_sign":"e5f6","advert_debug":false,"min_age":16,"first_url":false}';
</script>
<script src="/assets/js/app.player_single.0a1b2c3d.js"></script>
</head><body>
<script>
  videoInfo.type = 'seria';
  videoInfo.hash = '04d5f7824ba3563bd78e44a22451bb45';
  videoInfo.id = '1133512';
</script>
</body></html>"#;

    pub(crate) const PLAYER: &str = r#"!function(){var e=this;$.ajax({type:"POST",url:atob("L2Z0b3I="),cache:!1,data:t,dataType:"json"})}();"#;

    pub(crate) const LINKS: &str = r#"{"advert_script":"","domain":"animego.org","default":360,"links":{
"360":[{"src":"Yl9woT91MP5eo2Ecnl1mqT9lLJqyYzAioF91p2IlqKOfo2Sxpl81MwqwZJDlMF8mLGyvYmZ2ZP5gpQD6nTkmBz1uozyzMKA0Yz0mqGt","type":"application/x-mpegURL"}],
"480":[{"src":"Yl9woT91MP5eo2Ecnl1mqT9lLJqyYzAioF91p2IlqKOfo2Sxpl81MwqwZJDlMF8mLGyvYmD4ZP5gpQD6nTkmBz1uozyzMKA0Yz0mqGt","type":"application/x-mpegURL"}],
"720":[{"src":"Yl9woT91MP5eo2Ecnl1mqT9lLJqyYzAioF91p2IlqKOfo2Sxpl81MwqwZJDlMF8mLGyvYmD4ZP5gpQD6nTkmBz1uozyzMKA0Yz0mqGt","type":"application/x-mpegURL"}]
},"ip":"127.0.0.1"}"#;

    pub(crate) fn stub() -> StubTransport {
        StubTransport::new()
            .get(EMBED, PAGE)
            .get(SCRIPT, PLAYER)
            .post(API, LINKS)
    }

    fn expected() -> Vec<String> {
        ["360", "480", "720"]
            .iter()
            .map(|q| {
                format!(
                    "https://cloud.kodik-storage.com/useruploads/5f7c1d2e/3a9b/{}.mp4:hls:manifest.m3u8",
                    q
                )
            })
            .collect()
    }

    #[test]
    fn test_pattern() {
        let decoder = KodikDecoder::new();
        for sample in SAMPLES {
            assert!(decoder.matches(sample), "{}", sample);
        }
        assert!(!decoder.matches("https://kodik.info/about"));
        assert!(!decoder.matches("https://kodik.org/seria/1/abc/720p"));
        assert!(!decoder.matches("https://aniboom.one/embed/abc"));
    }

    #[test]
    fn test_extract_embed_params() {
        let params = EmbedParams::extract(PAGE).unwrap();
        assert_eq!(params.video_type, "seria");
        assert_eq!(params.hash, "04d5f7824ba3563bd78e44a22451bb45");
        assert_eq!(params.id, "1133512");
        assert_eq!(params.script_path, "/assets/js/app.player_single.0a1b2c3d.js");
        assert_eq!(params.param("d_sign"), "a1b2");
        assert_eq!(params.param("advert_debug"), "false");
        assert_eq!(params.param("missing"), "");
    }

    #[test]
    fn test_extract_embed_params_missing() {
        let err = EmbedParams::extract("<html></html>").unwrap_err();
        assert!(matches!(err, ResolveError::ExtractionFailure { .. }));
    }

    #[test]
    fn test_api_path() {
        assert_eq!(api_path(PLAYER).unwrap(), "/ftor");
        assert!(api_path("var x = 1;").is_err());
    }

    #[test]
    fn test_api_request_form() {
        let params = EmbedParams::extract(PAGE).unwrap();
        let request = params.api_request(EMBED, API);
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.header_value("Referer"), Some(EMBED));
        assert_eq!(request.header_value("Origin"), Some("https://kodik.info"));

        let form: BTreeMap<_, _> = request.form.iter().cloned().collect();
        assert_eq!(form["hash"], "04d5f7824ba3563bd78e44a22451bb45");
        assert_eq!(form["id"], "1133512");
        assert_eq!(form["type"], "seria");
        assert_eq!(form["pd_sign"], "c3d4");
        assert_eq!(form["bad_user"], "true");
        assert_eq!(form["cdn_is_working"], "true");
        assert_eq!(form["info"], "{}");
    }

    #[test]
    fn test_end_to_end() {
        let http = stub();
        let videos = KodikDecoder::new().parse(&http, EMBED).unwrap();

        let urls: Vec<String> = videos.iter().map(|v| v.url.clone()).collect();
        assert_eq!(urls, expected());
        assert!(videos.iter().all(|v| v.kind == VideoType::M3u8));
        assert!(videos.iter().all(|v| v.url.starts_with("https://")));
        assert_eq!(
            videos.iter().map(|v| v.quality).collect::<Vec<_>>(),
            vec![Quality::Q360, Quality::Q480, Quality::Q720]
        );
        assert_eq!(http.calls(), 3);

        let methods: Vec<Method> = http.requests().iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![Method::Get, Method::Get, Method::Post]);
    }

    #[test]
    fn test_scheme_relative_embed() {
        let http = stub();
        let videos = KodikDecoder::new()
            .parse(&http, EMBED.trim_start_matches("https:"))
            .unwrap();
        assert_eq!(videos.len(), 3);
    }

    #[tokio::test]
    async fn test_sync_async_equivalence() {
        let blocking = stub();
        let sync_videos = KodikDecoder::new().parse(&blocking, EMBED).unwrap();

        let concurrent = stub();
        let async_videos = KodikDecoder::new()
            .parse_async(&concurrent, EMBED)
            .await
            .unwrap();

        assert_eq!(sync_videos, async_videos);
        assert_eq!(
            sync_videos.iter().map(|v| &v.url).collect::<Vec<_>>(),
            async_videos.iter().map(|v| &v.url).collect::<Vec<_>>()
        );
        assert_eq!(blocking.requests(), concurrent.requests());
    }

    #[test]
    fn test_not_found_page() {
        let http = StubTransport::new().get(EMBED, "<div class=\"message\">Видео не найдено</div>");
        let videos = KodikDecoder::new().parse(&http, EMBED).unwrap();
        assert!(videos.is_empty());
        assert_eq!(http.calls(), 1);
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let http = StubTransport::new();
        let err = KodikDecoder::new().parse(&http, EMBED).unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(http.calls(), 1);
    }

    #[test]
    fn test_url_mismatch() {
        let http = StubTransport::new();
        let err = KodikDecoder::new()
            .parse(&http, "https://video.sibnet.ru/shell.php?videoid=1")
            .unwrap_err();
        assert!(matches!(err, ResolveError::UrlMismatch { decoder: "kodik", .. }));
        assert_eq!(http.calls(), 0);
    }

    #[test]
    fn test_plain_links_pass_through() {
        let body = r#"{"links":{"480":[{"src":"//cdn.example/480.mp4:hls:manifest.m3u8"}]}}"#;
        let videos = videos_from_links(body).unwrap();
        assert_eq!(videos[0].url, "https://cdn.example/480.mp4:hls:manifest.m3u8");
        assert_eq!(videos[0].kind, VideoType::M3u8);
    }

    #[test]
    fn test_empty_link_table() {
        for body in [r#"{"links":{}}"#, r#"{"links":{"hd":[{"src":"x"}]}}"#] {
            let err = videos_from_links(body).unwrap_err();
            assert!(matches!(err, ResolveError::ExtractionFailure { ref context, .. } if context == "kodik"));
        }
    }

    #[test]
    fn test_malformed_link_table() {
        let err = videos_from_links("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, ResolveError::DecodeCorruption(_)));
    }
}
