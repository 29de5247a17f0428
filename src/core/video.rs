//! Playable video records and quality selection

use crate::utils::mime::video_type_from_url;
use crate::utils::url::host_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Container/streaming kind of a playable link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Mp4,
    M3u8,
    Mpd,
    Audio,
    Webm,
}

impl VideoType {
    /// Lowercase name as used in the JSON record
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoType::Mp4 => "mp4",
            VideoType::M3u8 => "m3u8",
            VideoType::Mpd => "mpd",
            VideoType::Audio => "audio",
            VideoType::Webm => "webm",
        }
    }
}

impl fmt::Display for VideoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Coarse vertical-resolution bucket, or a provider-specific integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(pub u16);

impl Quality {
    pub const UNKNOWN: Quality = Quality(0);
    pub const Q144: Quality = Quality(144);
    pub const Q240: Quality = Quality(240);
    pub const Q360: Quality = Quality(360);
    pub const Q480: Quality = Quality(480);
    pub const Q720: Quality = Quality(720);
    pub const Q1080: Quality = Quality(1080);

    /// Parse labels such as `720`, `720p` or `[720p]`
    pub fn from_label(label: &str) -> Option<Quality> {
        let digits: String = label
            .trim()
            .trim_start_matches('[')
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok().map(Quality)
    }

    /// Check if this is one of the standard buckets
    pub fn is_standard(&self) -> bool {
        matches!(self.0, 0 | 144 | 240 | 360 | 480 | 720 | 1080)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            f.write_str("unknown")
        } else {
            write!(f, "{}p", self.0)
        }
    }
}

/// A directly playable link together with the headers the CDN requires.
///
/// Equality and hashing only look at the type, the quality and the host of
/// the URL with edge-node numbers removed: two sessions of the same stream
/// served by different edges are the same video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    #[serde(rename = "type")]
    pub kind: VideoType,
    pub quality: Quality,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Video {
    /// Create a new Video without headers
    pub fn new(kind: VideoType, quality: Quality, url: impl Into<String>) -> Self {
        Self {
            kind,
            quality,
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Treat an arbitrary link as already playable
    pub fn direct(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(video_type_from_url(&url), Quality::UNKNOWN, url)
    }

    /// Add a header required for playback
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Replace all playback headers
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Key the equality law is defined over
    pub fn identity(&self) -> (VideoType, Quality, String) {
        (self.kind, self.quality, host_key(&self.url))
    }
}

impl PartialEq for Video {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Video {}

impl Hash for Video {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Drop videos equal to an earlier one, keeping the first occurrence
pub fn dedup_videos(videos: Vec<Video>) -> Vec<Video> {
    let mut seen = std::collections::HashSet::new();
    videos
        .into_iter()
        .filter(|video| seen.insert(video.identity()))
        .collect()
}

/// Quality selection criteria
#[derive(Debug, Clone, PartialEq)]
pub enum QualitySelector {
    /// Highest quality available
    Best,
    /// Lowest quality available
    Worst,
    /// Exact quality
    Exact(u16),
    /// Quality less than or equal to
    AtMost(u16),
    /// Quality greater than or equal to
    AtLeast(u16),
}

impl QualitySelector {
    /// Parse quality selector from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        let s = s.trim().to_lowercase();

        match s.as_str() {
            "best" => Ok(QualitySelector::Best),
            "worst" => Ok(QualitySelector::Worst),
            _ => {
                let (ctor, rest): (fn(u16) -> QualitySelector, &str) =
                    if let Some(rest) = s.strip_prefix("<=") {
                        (QualitySelector::AtMost, rest)
                    } else if let Some(rest) = s.strip_prefix(">=") {
                        (QualitySelector::AtLeast, rest)
                    } else {
                        (QualitySelector::Exact, s.as_str())
                    };
                let quality = Quality::from_label(rest)
                    .filter(|q| rest.trim().trim_end_matches('p').len() == q.0.to_string().len())
                    .ok_or_else(|| format!("Unknown quality selector: {}", s))?;
                Ok(ctor(quality.0))
            }
        }
    }
}

/// Pick a video according to the selector.
///
/// Among equal qualities the first listed video wins, so decoders control
/// preference by ordering.
pub fn select_video<'a>(videos: &'a [Video], selector: &QualitySelector) -> Option<&'a Video> {
    let best_of = |candidates: Vec<&'a Video>| {
        candidates
            .into_iter()
            .rev()
            .max_by_key(|video| video.quality)
    };

    match selector {
        QualitySelector::Best => best_of(videos.iter().collect()),
        QualitySelector::Worst => videos.iter().min_by_key(|video| video.quality),
        QualitySelector::Exact(target) => videos.iter().find(|video| video.quality.0 == *target),
        QualitySelector::AtMost(limit) => {
            best_of(videos.iter().filter(|video| video.quality.0 <= *limit).collect())
        }
        QualitySelector::AtLeast(limit) => videos
            .iter()
            .filter(|video| video.quality.0 >= *limit)
            .min_by_key(|video| video.quality),
    }
}
