//! Link ciphers used by video hosts to hide CDN URLs
//!
//! Two unrelated families live here:
//!
//! - the shift + base64 scheme (ROT13 over a base64 string with its padding
//!   stripped), and
//! - the "salt" substitution cipher of Uppod-style players: a base64-like
//!   alphabet with an explicit padding sentinel, optionally preceded by a
//!   letter rotation ("pepper") whose offset is derived from a bit-pattern
//!   constant ("sugar").
//!
//! The playlist helpers at the bottom undo the separator markers PlayerJS
//! style players sprinkle into their base64 `file` blobs.

use crate::core::video::Quality;
use crate::error::ResolveError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use std::sync::LazyLock;

/// Base64 alphabet with the padding sentinel at index 64
const SALT_ALPHABET: &[u8; 65] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

const SALT_PADDING: u8 = 64;

/// Letters rotated by the pepper step
const PEPPER_ALPHABET: &[u8; 52] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Bit pattern the rotation offset is derived from (`x` = 1)
pub const SUGAR_PATTERN: &str = "xx??xx=xx???x=";

/// Separator PlayerJS puts in front of every base64-encoded trash marker
const PLAYLIST_SEPARATOR: &str = "//_//";

/// Caesar shift by 13, preserving case and leaving non-letters untouched
pub fn rot13(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
            _ => c,
        })
        .collect()
}

/// Undo the shift + base64 scheme
pub fn decode_rot13_base64(input: &str) -> Result<String, ResolveError> {
    let mut shifted = rot13(input.trim());
    while shifted.len() % 4 != 0 {
        shifted.push('=');
    }

    let bytes = STANDARD
        .decode(shifted.as_bytes())
        .map_err(|e| ResolveError::corruption(format!("rot13 base64 payload: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ResolveError::corruption(format!("rot13 base64 payload is not UTF-8: {}", e)))
}

/// Apply the shift + base64 scheme
pub fn encode_rot13_base64(input: &str) -> String {
    let encoded = STANDARD.encode(input.as_bytes());
    rot13(encoded.trim_end_matches('='))
}

/// Decode one round of the salt cipher.
///
/// Characters outside the alphabet are skipped. Every group of four symbols
/// yields one to three bytes; the second and third byte are only emitted
/// when the third and fourth symbol are not the padding sentinel. The byte
/// stream must be valid UTF-8.
pub fn salt_decode(input: &str) -> Result<String, ResolveError> {
    let indices: Vec<u8> = input
        .bytes()
        .filter_map(|b| SALT_ALPHABET.iter().position(|&s| s == b).map(|i| i as u8))
        .collect();

    if indices.len() % 4 != 0 {
        return Err(ResolveError::corruption(format!(
            "salt cipher input has {} symbols, expected a multiple of 4",
            indices.len()
        )));
    }

    let mut bytes = Vec::with_capacity(indices.len() / 4 * 3);
    for group in indices.chunks_exact(4) {
        let (s, o, u, a) = (group[0], group[1], group[2], group[3]);
        if s == SALT_PADDING || o == SALT_PADDING {
            return Err(ResolveError::corruption("salt cipher padding in a leading position"));
        }

        bytes.push((s << 2) | (o >> 4));
        if u != SALT_PADDING {
            bytes.push(((o & 15) << 4) | (u >> 2));
        }
        if a != SALT_PADDING {
            bytes.push(((u & 3) << 6) | a);
        }
    }

    String::from_utf8(bytes)
        .map_err(|e| ResolveError::corruption(format!("salt cipher output is not UTF-8: {}", e)))
}

/// Encode one round of the salt cipher
pub fn salt_encode(input: &str) -> String {
    STANDARD.encode(input.as_bytes())
}

/// Decode a bit-pattern constant into its character string.
///
/// Groups are separated by `=`; within a group `x` is a one bit and anything
/// else a zero bit. Every group becomes one character and the final one is
/// dropped.
pub fn sugar(pattern: &str) -> String {
    let mut decoded: String = pattern
        .split('=')
        .map(|group| {
            let code = group
                .chars()
                .fold(0u32, |acc, c| (acc << 1) | u32::from(c == 'x'));
            char::from_u32(code).unwrap_or('\0')
        })
        .collect();
    decoded.pop();
    decoded
}

/// Rotation offset the second salt round uses
pub fn pepper_offset() -> Result<i64, ResolveError> {
    let digits = sugar(SUGAR_PATTERN);
    digits
        .parse()
        .map_err(|_| ResolveError::corruption(format!("sugar pattern decodes to {:?}", digits)))
}

/// Rotate ASCII letters across `A-Za-z` by `offset * direction` positions
pub fn pepper(input: &str, direction: i64) -> Result<String, ResolveError> {
    let shift = pepper_offset()? * direction;
    let len = PEPPER_ALPHABET.len() as i64;

    Ok(input
        .chars()
        .map(|c| {
            match PEPPER_ALPHABET.iter().position(|&l| c.is_ascii() && l == c as u8) {
                Some(index) => {
                    PEPPER_ALPHABET[(index as i64 + shift).rem_euclid(len) as usize] as char
                }
                None => c,
            }
        })
        .collect())
}

/// Decode a salted value according to its two-character mode prefix.
///
/// `#0` is a single salt round, `#1` first reverts the pepper rotation.
/// Values without a prefix are returned unchanged.
pub fn decode_salted(input: &str) -> Result<String, ResolveError> {
    if let Some(body) = input.strip_prefix("#1") {
        salt_decode(&pepper(body, -1)?)
    } else if let Some(body) = input.strip_prefix("#0") {
        salt_decode(body)
    } else {
        Ok(input.to_string())
    }
}

/// Produce a salted value with one (`#0`) or two (`#1`) rounds
pub fn encode_salted(input: &str, rounds: u8) -> Result<String, ResolveError> {
    let encoded = salt_encode(input);
    if rounds >= 2 {
        Ok(format!("#1{}", pepper(&encoded, 1)?))
    } else {
        Ok(format!("#0{}", encoded))
    }
}

/// Rebuild a PlayerJS `file` blob and return the playlist it hides.
///
/// The fragments are concatenated in order, the `#<digit>` mode prefix is
/// dropped, every `//_//` + base64(marker) separator is removed, and the
/// remaining base64 is decoded and URL-decoded.
pub fn decode_playlist_file(fragments: &[&str], markers: &[&str]) -> Result<String, ResolveError> {
    let mut blob = fragments.concat();

    let mut chars = blob.chars();
    if chars.next() == Some('#') && chars.next().is_some_and(|c| c.is_ascii_digit()) {
        blob.drain(..2);
    }

    for marker in markers {
        let separator = format!("{}{}", PLAYLIST_SEPARATOR, STANDARD.encode(marker.as_bytes()));
        blob = blob.replace(&separator, "");
    }

    if blob.contains(PLAYLIST_SEPARATOR) {
        return Err(ResolveError::corruption(
            "playlist blob still contains an unknown separator marker",
        ));
    }

    let bytes = STANDARD
        .decode(blob.as_bytes())
        .map_err(|e| ResolveError::corruption(format!("playlist base64: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ResolveError::corruption(format!("playlist is not UTF-8: {}", e)))?;
    let decoded = urlencoding::decode(&text)
        .map_err(|e| ResolveError::corruption(format!("playlist URL encoding: {}", e)))?;
    Ok(decoded.into_owned())
}

/// Split a `[720p]url or mirror,[480p]url` playlist into per-quality links.
///
/// The first alternative of every entry wins. A playlist without labels
/// yields its comma-separated links with an unknown quality.
pub fn parse_quality_playlist(playlist: &str) -> Vec<(Quality, String)> {
    static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\[(\d+)p?\]([^\[]+)").expect("quality entry pattern is valid")
    });

    let first_alternative = |links: &str| {
        links
            .split(" or ")
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches(',')
            .trim()
            .to_string()
    };

    if !playlist.contains('[') {
        return playlist
            .split(',')
            .map(first_alternative)
            .filter(|link| !link.is_empty())
            .map(|link| (Quality::UNKNOWN, link))
            .collect();
    }

    ENTRY
        .captures_iter(playlist)
        .filter_map(|caps| {
            let quality = caps[1].parse().ok().map(Quality)?;
            let link = first_alternative(&caps[2]);
            (!link.is_empty()).then_some((quality, link))
        })
        .collect()
}
