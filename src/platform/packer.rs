//! Unpacker for `eval(function(p,a,c,k,e,d){...})` packed JavaScript
//!
//! Packed scripts carry a payload where every identifier was replaced by its
//! index in a word dictionary, written in the packer's radix. Unpacking
//! rebuilds that index-to-word table and substitutes every word-character
//! run of the payload through it.

use crate::error::ResolveError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static PACKED_ARGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\}\('(.*?)',\s*(\d+),\s*(\d+),\s*'(.*?)'\.split\('\|'\)")
        .expect("packed arguments pattern is valid")
});

static PACKED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"eval\s*\(\s*function\s*\(\s*p\s*,\s*a\s*,\s*c\s*,\s*k\s*,\s*e\s*,")
        .expect("packed header pattern is valid")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Arguments of a packed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedScript {
    pub payload: String,
    pub radix: u32,
    pub count: usize,
    pub words: Vec<String>,
}

impl PackedScript {
    /// Locate and parse the packer arguments inside a page or script
    pub fn parse(source: &str) -> Result<Self, ResolveError> {
        let caps = PACKED_ARGS
            .captures(source)
            .ok_or_else(|| ResolveError::extraction("packer", "packed arguments"))?;

        let radix: u32 = caps[2]
            .parse()
            .map_err(|_| ResolveError::extraction("packer", "radix"))?;
        let count: usize = caps[3]
            .parse()
            .map_err(|_| ResolveError::extraction("packer", "word count"))?;

        if !(2..=62).contains(&radix) {
            return Err(ResolveError::corruption(format!(
                "unsupported packer radix {}",
                radix
            )));
        }

        Ok(Self {
            payload: caps[1].replace(r"\\", r"\").replace(r"\'", "'"),
            radix,
            count,
            words: caps[4].split('|').map(str::to_string).collect(),
        })
    }

    /// Substitute every dictionary key in the payload
    pub fn unpack(&self) -> String {
        let table = self.table();
        WORD.replace_all(&self.payload, |caps: &regex::Captures| {
            let word = &caps[0];
            table.get(word).cloned().unwrap_or_else(|| word.to_string())
        })
        .into_owned()
    }

    /// Index-to-word table; empty dictionary slots map to their own key.
    ///
    /// Keys past the end of the dictionary are left out, [`Self::unpack`]
    /// already keeps unknown words as they are.
    fn table(&self) -> HashMap<String, String> {
        let size = self.count.min(self.words.len());
        let mut table = HashMap::with_capacity(size);
        for index in (0..size).rev() {
            let key = encode_index(index, self.radix);
            let word = match self.words.get(index) {
                Some(word) if !word.is_empty() => word.clone(),
                _ => key.clone(),
            };
            table.insert(key, word);
        }
        table
    }
}

/// Render an index the way the packer's `e(c)` helper does.
///
/// Digits below 36 are `0-9a-z`, higher digits are `String.fromCharCode(d + 29)`
/// which puts them on `A-Z` for radix 62.
pub fn encode_index(mut index: usize, radix: u32) -> String {
    let radix = radix.max(2) as usize;
    let mut digits = Vec::new();
    loop {
        let digit = index % radix;
        let c = if digit > 35 {
            char::from_u32(digit as u32 + 29).unwrap_or('?')
        } else {
            DIGITS[digit] as char
        };
        digits.push(c);
        index /= radix;
        if index == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

/// Whether the text contains a packed call
pub fn detect(source: &str) -> bool {
    PACKED_HEADER.is_match(source)
}

/// Unpack the first packed call found in the source
pub fn unpack(source: &str) -> Result<String, ResolveError> {
    Ok(PackedScript::parse(source)?.unpack())
}

/// Unpack every packed call in a page, skipping the ones that do not parse
pub fn unpack_all(source: &str) -> Vec<String> {
    let starts: Vec<usize> = PACKED_HEADER.find_iter(source).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(source.len());
            unpack(&source[start..end]).ok()
        })
        .collect()
}
