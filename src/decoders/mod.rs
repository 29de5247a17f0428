//! Host decoders: turn an embed page URL into playable [`Video`] records
//!
//! Every decoder issues the same requests in the same order in its blocking
//! and async forms and feeds the responses to shared extraction functions, so
//! both forms return identical results for identical remote state.

use crate::core::video::Video;
use crate::error::ResolveError;
use crate::platform::client::{AsyncTransport, HttpRequest, HttpResponse, Transport};
use crate::platform::packer;
use async_trait::async_trait;
use regex::Regex;

pub mod aniboom;
pub mod csst;
pub mod filemoon;
pub mod kodik;
pub mod mp4upload;
pub mod registry;
pub mod sibnet;
pub mod uppod;

pub use aniboom::AniboomDecoder;
pub use csst::CsstDecoder;
pub use filemoon::FilemoonDecoder;
pub use kodik::KodikDecoder;
pub use mp4upload::Mp4uploadDecoder;
pub use registry::Registry;
pub use sibnet::SibnetDecoder;
pub use uppod::UppodDecoder;

/// A host-specific video link extractor
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Short identifier used in logs and `--list-decoders`
    fn name(&self) -> &'static str;

    /// Embed URL pattern this decoder handles
    fn pattern(&self) -> &Regex;

    fn matches(&self, url: &str) -> bool {
        self.pattern().is_match(url)
    }

    /// Known embed URLs, used to flag overlapping patterns at registration
    fn samples(&self) -> &'static [&'static str] {
        &[]
    }

    /// Reject URLs outside the decoder's pattern
    fn check(&self, url: &str) -> Result<(), ResolveError> {
        if self.matches(url) {
            Ok(())
        } else {
            Err(ResolveError::UrlMismatch {
                decoder: self.name(),
                url: url.to_string(),
            })
        }
    }

    /// Resolve with a blocking transport
    fn parse(&self, http: &dyn Transport, url: &str) -> Result<Vec<Video>, ResolveError>;

    /// Resolve with an async transport
    async fn parse_async(
        &self,
        http: &dyn AsyncTransport,
        url: &str,
    ) -> Result<Vec<Video>, ResolveError>;
}

/// Outcome of looking at a fetched embed page
pub(crate) enum Page {
    /// The host says the video is gone or blocked
    Unavailable(&'static str),
    Body(String),
}

/// How a host reports that a video is gone
pub(crate) struct GoneSignals {
    /// HTTP statuses meaning "gone" rather than a broken request
    pub statuses: &'static [u16],
    /// Page texts shown instead of the player
    pub markers: &'static [&'static str],
}

impl GoneSignals {
    pub(crate) const fn markers(markers: &'static [&'static str]) -> Self {
        Self {
            statuses: &[],
            markers,
        }
    }
}

/// Classify a response: the host's own "gone" signals are recoverable, any
/// other non-2xx status is an error.
pub(crate) fn classify(response: HttpResponse, gone: &GoneSignals) -> Result<Page, ResolveError> {
    if gone.statuses.contains(&response.status) {
        return Ok(Page::Unavailable("page not found"));
    }
    let response = response.ensure_success()?;
    if let Some(marker) = gone.markers.iter().find(|m| response.body.contains(**m)) {
        return Ok(Page::Unavailable(*marker));
    }
    Ok(Page::Body(response.body))
}

/// Blocking GET followed by [`classify`]
pub(crate) fn fetch_page(
    http: &dyn Transport,
    request: &HttpRequest,
    gone: &GoneSignals,
) -> Result<Page, ResolveError> {
    classify(http.execute(request)?, gone)
}

/// Async GET followed by [`classify`]
pub(crate) async fn fetch_page_async(
    http: &dyn AsyncTransport,
    request: &HttpRequest,
    gone: &GoneSignals,
) -> Result<Page, ResolveError> {
    classify(http.execute(request).await?, gone)
}

/// First capture of `pattern` inside any packed script of the page
pub(crate) fn search_packed(page: &str, pattern: &Regex) -> Option<String> {
    packer::unpack_all(page).iter().find_map(|script| {
        pattern
            .captures(script)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}
