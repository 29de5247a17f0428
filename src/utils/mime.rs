//! MIME type and extension utilities for classifying media links

use crate::core::video::VideoType;
use url::Url;

/// Map a MIME type reported by a player config to a video type
pub fn video_type_from_mime(mime_type: &str) -> Option<VideoType> {
    let mime = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "video/mp4" | "video/x-m4v" => Some(VideoType::Mp4),
        "video/webm" => Some(VideoType::Webm),
        "application/x-mpegurl" | "application/vnd.apple.mpegurl" | "audio/mpegurl" => {
            Some(VideoType::M3u8)
        }
        "application/dash+xml" => Some(VideoType::Mpd),
        m if m.starts_with("audio/") => Some(VideoType::Audio),
        _ => None,
    }
}

/// Map a file extension to a video type
pub fn video_type_from_ext(extension: &str) -> Option<VideoType> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => Some(VideoType::Mp4),
        "m3u8" | "m3u" => Some(VideoType::M3u8),
        "mpd" => Some(VideoType::Mpd),
        "webm" => Some(VideoType::Webm),
        "mp3" | "m4a" | "aac" | "ogg" | "opus" | "flac" | "wav" => Some(VideoType::Audio),
        _ => None,
    }
}

/// Guess the video type of a media link.
///
/// Hosts often append the real container after the file name
/// (`720.mp4:hls:manifest.m3u8`), so the last recognised extension of the
/// path wins. Unrecognised links are treated as progressive mp4.
pub fn video_type_from_url(url: &str) -> VideoType {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    path.rsplit(['.', ':'])
        .find_map(|segment| {
            let ext: String = segment
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            video_type_from_ext(&ext)
        })
        .unwrap_or(VideoType::Mp4)
}
