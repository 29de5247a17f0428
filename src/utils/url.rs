//! URL utilities shared by decoders, the video record and the pipeline

use crate::error::ResolveError;
use url::{Host, Url};

/// Lowercased host of an absolute URL
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.to_ascii_lowercase()))
}

/// Host with its digits removed.
///
/// CDN edge nodes differ only by their numbering (`s1.cdn`, `s2.cdn`), so
/// this is the key videos are compared by. IP literals are kept whole and
/// links without a host key on the whole string.
pub fn host_key(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    match parsed.host() {
        Some(Host::Domain(domain)) => domain
            .chars()
            .filter(|c| !c.is_ascii_digit())
            .map(|c| c.to_ascii_lowercase())
            .collect(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => url.to_string(),
    }
}

/// Check whether the string starts with a URL scheme (`https:`, `http:`, ...)
pub fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// Prefix `https:` to scheme-less links such as `//cdn.example/v.m3u8`
pub fn ensure_scheme(url: &str) -> String {
    if has_scheme(url) {
        url.to_string()
    } else if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        format!("https://{}", url)
    }
}

/// Resolve a possibly relative link against the page it was found on
pub fn absolutize(base: &str, link: &str) -> Result<String, ResolveError> {
    if has_scheme(link) {
        return Ok(link.to_string());
    }
    let base = Url::parse(&ensure_scheme(base))?;
    Ok(base.join(link)?.to_string())
}

/// `scheme://host[:port]` of an absolute URL
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://Cloud.Kodik-Storage.com/useruploads/x"),
            Some("cloud.kodik-storage.com".to_string())
        );
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn test_host_key_strips_edge_numbers() {
        assert_eq!(host_key("https://a.cdn1.example/x"), "a.cdn.example");
        assert_eq!(
            host_key("https://a.cdn1.example/x"),
            host_key("https://a.cdn2.example/y")
        );
        assert_ne!(
            host_key("https://a.cdn1.example/x"),
            host_key("https://b.cdn1.example/x")
        );
    }

    #[test]
    fn test_host_key_keeps_ip_literals() {
        assert_eq!(host_key("http://10.0.0.1/a"), "10.0.0.1");
        assert_ne!(host_key("http://10.0.0.1/a"), host_key("http://192.168.7.42/b"));
        assert_eq!(host_key("http://[::1]:8080/a"), "::1");
    }

    #[test]
    fn test_host_key_of_unparsable_link() {
        assert_eq!(host_key("not a url"), "not a url");
        assert_ne!(host_key("/v/1.mp4"), host_key("/v/2.mp4"));
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://example.com"));
        assert!(has_scheme("http://example.com"));
        assert!(!has_scheme("//example.com/v.m3u8"));
        assert!(!has_scheme("/v/123.mp4"));
        assert!(!has_scheme("1:2"));
    }

    #[test]
    fn test_ensure_scheme() {
        assert_eq!(
            ensure_scheme("//cloud.kodik-storage.com/720.mp4"),
            "https://cloud.kodik-storage.com/720.mp4"
        );
        assert_eq!(ensure_scheme("http://a.b/c"), "http://a.b/c");
        assert_eq!(ensure_scheme("a.b/c"), "https://a.b/c");
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("https://video.sibnet.ru/shell.php?videoid=1", "/v/abc/1.mp4").unwrap(),
            "https://video.sibnet.ru/v/abc/1.mp4"
        );
        assert_eq!(
            absolutize("https://kodik.info/seria/1/h/720p", "https://other.host/x").unwrap(),
            "https://other.host/x"
        );
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://aniboom.one/embed/abc?episode=1"),
            Some("https://aniboom.one".to_string())
        );
        assert_eq!(
            origin_of("http://127.0.0.1:8080/x"),
            Some("http://127.0.0.1:8080".to_string())
        );
    }
}
