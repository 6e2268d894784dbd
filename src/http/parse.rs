use crate::http::mash::Mash;
use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;

static COOKIE_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[;,] *").unwrap());

// space is kept here and turned into '+' afterwards
const COOKIE_VALUE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b'_')
    .remove(b'.')
    .remove(b'-');

/// Escapes a value the way form query values are escaped.
pub fn escape(s: &str) -> String {
    utf8_percent_encode(s, COOKIE_VALUE_ENCODE_SET)
        .to_string()
        .replace(' ', "+")
}

pub fn unescape(s: &str) -> String {
    percent_decode_str(&s.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Splits a `Cookie` request header into name/value pairs.
pub fn parse_cookie_header(header: &str) -> Mash<String> {
    COOKIE_SEPARATOR_RE
        .split(header)
        .filter(|piece| !piece.trim_ascii().is_empty())
        .map(|piece| {
            let piece = unescape(piece.trim_ascii_start());
            match piece.split_once('=') {
                Some((k, v)) => (k.trim_ascii().to_string(), v.to_string()),
                None => (piece.trim_ascii().to_string(), String::new()),
            }
        })
        .collect()
}
