//! NVP Codec
//!
//! The provider speaks name-value pairs: `KEY=value&KEY=value`, form encoded
//! on the way out and percent-escaped on the way back (`TIMESTAMP=2009%2d12%2d12T05%3a00%3a39Z`).

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::error::{CheckoutError, Result};

/// Decoded NVP fields, ordered by name
pub type Fields = BTreeMap<String, String>;

/// Encode fields as an `application/x-www-form-urlencoded` body
pub fn encode(fields: &Fields) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields.iter())
        .finish()
}

/// Decode an NVP response body
///
/// Each pair is split on its first `=`, so escaped or literal `=` inside a
/// value survive. Empty bodies and pairs without a separator are rejected.
pub fn decode(body: &str) -> Result<Fields> {
    let body = body.trim_end_matches(['\r', '\n']);
    if body.is_empty() {
        return Err(CheckoutError::MalformedResponse("empty body".into()));
    }

    body.split('&')
        .map(|pair| {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                CheckoutError::MalformedResponse(format!("pair without '=': {pair:?}"))
            })?;
            Ok((unescape(key), unescape(value)))
        })
        .collect()
}

fn unescape(raw: &str) -> String {
    // The provider escapes a literal plus as `%2b`, so a bare `+` only shows
    // up in form-style input, where it means a space.
    let raw = raw.replace('+', " ");
    percent_decode_str(&raw).decode_utf8_lossy().into_owned()
}
