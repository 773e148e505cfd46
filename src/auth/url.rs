//! Percent-encoding and redirect-callback parsing.
//!
//! Two encode sets mirror what browsers do: [`encode_component`] escapes
//! everything except the unreserved marks, [`encode_uri`] additionally leaves
//! URI delimiters intact so a whole URL can be compared prefix-wise.

use std::collections::HashMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const URI: &AsciiSet = &COMPONENT
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

/// Encode a single query value or path segment.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Encode a full URL, preserving its structure.
pub fn encode_uri(value: &str) -> String {
    utf8_percent_encode(value, URI).to_string()
}

/// Percent-decode; invalid UTF-8 sequences are replaced rather than rejected.
pub fn decode_component(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Build `base?k1=v1&k2=v2`, encoding each value.
pub fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", encode_component(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

/// Flatten a URL's query string into a key/value map.
///
/// Everything after the first `?` (or the whole input, if there is none) is
/// split on `&` and then on the first `=`. Values are percent-decoded; a
/// fragment, if any, is ignored. Later duplicates win.
pub fn parse_url_params_to_object(url: &str) -> HashMap<String, String> {
    let query = match url.find('?') {
        Some(idx) => &url[idx + 1..],
        None => url,
    };
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), decode_component(value)),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}
