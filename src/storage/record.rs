//! The captured request record and its stored text encodings.
//!
//! A [`Record`] lives only for the duration of one request: the capture
//! handler builds it, hands it to the store once, and drops it.

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Version tag written into every serialized header set.
pub const HEADER_FORMAT_VERSION: u32 = 1;

/// One captured HTTP request, ready for a single insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// HTTP verb, `None` when the request carried an empty method.
    pub method: Option<String>,
    /// URL path component.
    pub path: String,
    /// Output of [`SerializedHeaders::encode`].
    pub headers: String,
    /// Output of [`canonical_query`].
    pub query: String,
    /// Raw body bytes, stored verbatim as text.
    pub body: Bytes,
}

impl Record {
    pub fn new(method: &str, path: &str, headers: String, query: String, body: Bytes) -> Self {
        Self {
            method: (!method.is_empty()).then(|| method.to_string()),
            path: path.to_string(),
            headers,
            query,
            body,
        }
    }
}

/// A single header name with every value it was sent with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub values: Vec<String>,
}

/// Versioned, ordered header encoding stored in the `headers` column.
///
/// ```text
/// {"version":1,"headers":[{"name":"x-signature","values":["a","b"]}]}
/// ```
///
/// Names appear in first-seen order and values in arrival order, so repeated
/// headers survive the round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedHeaders {
    pub version: u32,
    pub headers: Vec<HeaderEntry>,
}

impl SerializedHeaders {
    /// Collect every header in `map`. Non-UTF-8 values are converted lossily.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let headers = map
            .keys()
            .map(|name| HeaderEntry {
                name: name.as_str().to_string(),
                values: map
                    .get_all(name)
                    .iter()
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                    .collect(),
            })
            .collect();

        Self {
            version: HEADER_FORMAT_VERSION,
            headers,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// All values recorded for `name` (case-insensitive).
    pub fn get_all(&self, name: &str) -> &[String] {
        self.headers
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.values.as_slice())
            .unwrap_or(&[])
    }
}

/// Bytes left unescaped in query keys and values; space is written as `+`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-decode a request path. Invalid escapes are kept literally and
/// non-UTF-8 results are converted lossily.
pub fn decoded_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Re-encode a raw query string in canonical form.
///
/// Pairs are split on `&` and decoded with form rules (`+` is a space).
/// Pairs containing `;` or a malformed `%` escape are dropped. The rest are
/// grouped by key, keys sorted, values kept in arrival order within each key.
pub fn canonical_query(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pair in raw.split('&').filter(|p| !p.is_empty() && !p.contains(';')) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let (Some(key), Some(value)) = (unescape_component(key), unescape_component(value)) else {
            continue;
        };
        grouped.entry(key).or_default().push(value);
    }

    let mut encoded = String::new();
    for (key, values) in &grouped {
        for value in values {
            if !encoded.is_empty() {
                encoded.push('&');
            }
            encoded.push_str(&escape_component(key));
            encoded.push('=');
            encoded.push_str(&escape_component(value));
        }
    }
    encoded
}

fn unescape_component(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, b)| {
        *b != b'%'
            || (bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return None;
    }

    let spaced = text.replace('+', " ");
    Some(percent_decode_str(&spaced).decode_utf8_lossy().into_owned())
}

fn escape_component(text: &str) -> String {
    // `%` itself is escaped, so every `%20` in the output came from a space.
    utf8_percent_encode(text, QUERY_VALUE)
        .to_string()
        .replace("%20", "+")
}
