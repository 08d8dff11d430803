//! URL parameter extraction.
//!
//! JSONP endpoints carry the callback name in the query string, but ad
//! servers are not consistent about it: some use `?`, some use matrix-style
//! `;` parameters. Everything after the first `?` or `;` is treated as the
//! parameter string.

use crate::result::{StubError, StubResult};
use std::collections::HashMap;

/// Decoded parameters of a URL, keyed by raw (undecoded) name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    values: HashMap<String, String>,
}

impl UrlParams {
    /// Parse the parameters of `url`
    ///
    /// # Errors
    ///
    /// Returns [`StubError::MalformedParameter`] if a value is not valid
    /// percent-encoding.
    pub fn parse(url: &str) -> StubResult<Self> {
        let Some(start) = url.find(['?', ';']) else {
            return Ok(Self::default());
        };
        let param_string = &url[start + 1..];

        let mut values = HashMap::new();
        for pair in param_string.split('&').filter(|p| !p.is_empty()) {
            let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(raw).map_err(|reason| StubError::MalformedParameter {
                key: key.to_string(),
                value: raw.to_string(),
                reason: reason.to_string(),
            })?;
            values.insert(key.to_string(), value);
        }

        Ok(Self { values })
    }

    /// Get a decoded value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Get a value only if it is present and non-empty
    #[must_use]
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Number of distinct parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no parameters were found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume into the underlying map
    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        self.values
    }
}

/// Extract the decoded parameters of `url` as a plain map
pub fn extract_params(url: &str) -> StubResult<HashMap<String, String>> {
    UrlParams::parse(url).map(UrlParams::into_map)
}

/// Percent-decode with `decodeURIComponent` semantics.
///
/// `+` is left alone and every escaped byte sequence must form valid UTF-8.
pub fn decode_component(src: &str) -> Result<String, &'static str> {
    const MALFORMED: &str = "malformed URI sequence";

    let bytes = src.as_bytes();
    let mut out = String::with_capacity(src.len());
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            let ch = src[i..].chars().next().ok_or(MALFORMED)?;
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }

        let first = percent_byte(bytes, i).ok_or(MALFORMED)?;
        if first < 0x80 {
            out.push(char::from(first));
            i += 3;
            continue;
        }

        let len = utf8_sequence_len(first).ok_or(MALFORMED)?;
        let mut chunk = Vec::with_capacity(len);
        chunk.push(first);
        let mut end = i + 3;
        for _ in 1..len {
            chunk.push(percent_byte(bytes, end).ok_or(MALFORMED)?);
            end += 3;
        }
        out.push_str(std::str::from_utf8(&chunk).map_err(|_| MALFORMED)?);
        i = end;
    }

    Ok(out)
}

fn percent_byte(bytes: &[u8], at: usize) -> Option<u8> {
    if bytes.get(at) != Some(&b'%') {
        return None;
    }
    let hi = hex_value(*bytes.get(at + 1)?)?;
    let lo = hex_value(*bytes.get(at + 2)?)?;
    Some((hi << 4) | lo)
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

const fn utf8_sequence_len(first: u8) -> Option<usize> {
    match first {
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_query_params() {
            let params = UrlParams::parse("ad.js?zone=1&cbfn=myCb").unwrap();
            assert_eq!(params.len(), 2);
            assert_eq!(params.get("zone"), Some("1"));
            assert_eq!(params.get("cbfn"), Some("myCb"));
        }

        #[test]
        fn test_semicolon_separator() {
            let params = UrlParams::parse("https://ads.example/x;sz=300x250&cb=fill").unwrap();
            assert_eq!(params.get("sz"), Some("300x250"));
            assert_eq!(params.get("cb"), Some("fill"));
        }

        #[test]
        fn test_first_separator_wins() {
            let params = UrlParams::parse("a;b=1?c=2").unwrap();
            assert_eq!(params.get("b"), Some("1?c=2"));
        }

        #[test]
        fn test_no_separator() {
            assert!(UrlParams::parse("https://ads.example/ad.js").unwrap().is_empty());
        }

        #[test]
        fn test_empty_param_string() {
            assert!(UrlParams::parse("ad.js?").unwrap().is_empty());
        }

        #[test]
        fn test_decodes_values() {
            let params = UrlParams::parse("x.js?name=hello%20world").unwrap();
            assert_eq!(params.get("name"), Some("hello world"));
        }

        #[test]
        fn test_keys_not_decoded() {
            let params = UrlParams::parse("x.js?a%20b=1").unwrap();
            assert_eq!(params.get("a%20b"), Some("1"));
            assert_eq!(params.get("a b"), None);
        }

        #[test]
        fn test_duplicate_keys_last_wins() {
            let params = UrlParams::parse("x.js?cb=first&cb=second").unwrap();
            assert_eq!(params.get("cb"), Some("second"));
        }

        #[test]
        fn test_value_keeps_later_equals() {
            let params = UrlParams::parse("x.js?q=a=b").unwrap();
            assert_eq!(params.get("q"), Some("a=b"));
        }

        #[test]
        fn test_key_without_value() {
            let params = UrlParams::parse("x.js?flag&cb=x").unwrap();
            assert_eq!(params.get("flag"), Some(""));
            assert_eq!(params.non_empty("flag"), None);
            assert_eq!(params.non_empty("cb"), Some("x"));
        }

        #[test]
        fn test_empty_segments_skipped() {
            let params = UrlParams::parse("x.js?a=1&&b=2").unwrap();
            assert_eq!(params.len(), 2);
        }

        #[test]
        fn test_malformed_propagates() {
            let err = UrlParams::parse("x.js?zone=1&cb=%E0%A4%A").unwrap_err();
            match err {
                StubError::MalformedParameter { key, value, .. } => {
                    assert_eq!(key, "cb");
                    assert_eq!(value, "%E0%A4%A");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_extract_params_map() {
            let map = extract_params("ad.js?zone=1&cbfn=myCb").unwrap();
            assert_eq!(map.get("zone").map(String::as_str), Some("1"));
            assert_eq!(map.get("cbfn").map(String::as_str), Some("myCb"));
        }
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn test_plus_is_literal() {
            assert_eq!(decode_component("a+b").unwrap(), "a+b");
        }

        #[test]
        fn test_multibyte() {
            assert_eq!(decode_component("%E2%82%AC").unwrap(), "€");
            assert_eq!(decode_component("caf%C3%A9").unwrap(), "café");
        }

        #[test]
        fn test_raw_unicode_passthrough() {
            assert_eq!(decode_component("naïve").unwrap(), "naïve");
        }

        #[test]
        fn test_bad_hex() {
            assert!(decode_component("%zz").is_err());
        }

        #[test]
        fn test_truncated_escape() {
            assert!(decode_component("%4").is_err());
            assert!(decode_component("%").is_err());
        }

        #[test]
        fn test_invalid_utf8() {
            assert!(decode_component("%C3").is_err());
            assert!(decode_component("%FF").is_err());
            assert!(decode_component("%C3%28").is_err());
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn encode(src: &str) -> String {
            src.bytes().map(|b| format!("%{:02X}", b)).collect()
        }

        proptest! {
            #[test]
            fn fully_escaped_strings_decode_back(s in ".*") {
                prop_assert_eq!(decode_component(&encode(&s)).unwrap(), s);
            }

            #[test]
            fn unescaped_values_are_untouched(s in "[A-Za-z0-9_.~+-]*") {
                prop_assert_eq!(decode_component(&s).unwrap(), s);
            }

            #[test]
            fn urls_without_separator_have_no_params(s in "[^?;]*") {
                prop_assert!(UrlParams::parse(&s).unwrap().is_empty());
            }
        }
    }
}
