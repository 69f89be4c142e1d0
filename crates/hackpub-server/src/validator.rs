//! Publish request validation.
//!
//! Classifies a raw publish body into a [`Submission`] or a [`Rejection`].
//! Checks run in a fixed order: transport shape first (length, size, form
//! encoding), then content (`json`, then `html`). The first failing check
//! decides the outcome.

use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hackpub_store::ContentType;
use percent_encoding::percent_decode;
use serde::de::IgnoredAny;

/// Form field holding JSON content.
pub const JSON_FIELD: &str = "json";
/// Form field holding HTML content.
pub const HTML_FIELD: &str = "html";
/// Form field holding the caller's source URL.
pub const ORIGINAL_URL_FIELD: &str = "original-url";

const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Why a publish request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("request body is missing")]
    LengthRequired,
    #[error("request body exceeds the payload limit")]
    PayloadTooLarge,
    #[error("request body is not form encoded")]
    MalformedBody,
    #[error("json field is not valid JSON")]
    BadJson,
    #[error("no publishable content")]
    UnrecognizedContent,
}

impl Rejection {
    pub fn status(self) -> StatusCode {
        match self {
            Self::LengthRequired => StatusCode::LENGTH_REQUIRED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MalformedBody | Self::BadJson | Self::UnrecognizedContent => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Plain-text response body; empty for transport-level refusals.
    pub fn body(self) -> &'static str {
        match self {
            Self::LengthRequired | Self::PayloadTooLarge => "",
            Self::BadJson => "Malformed JSON.",
            Self::MalformedBody | Self::UnrecognizedContent => "Unrecognized content.",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self.body() {
            "" => self.status().into_response(),
            body => (self.status(), body).into_response(),
        }
    }
}

/// Accepted publish content, ready for storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    /// Exact bytes to store.
    pub content: Vec<u8>,
    pub content_type: ContentType,
    pub original_url: Option<String>,
}

/// Validate a publish request body.
///
/// `content_type` is the raw `Content-Type` header, if any; a missing
/// header is treated as form encoding. It is only inspected after the
/// length and size checks have passed.
pub fn validate(
    content_type: Option<&[u8]>,
    body: &[u8],
    max_payload_size: usize,
) -> Result<Submission, Rejection> {
    if body.is_empty() {
        return Err(Rejection::LengthRequired);
    }
    if body.len() > max_payload_size {
        return Err(Rejection::PayloadTooLarge);
    }
    if !content_type.map_or(true, is_form_media_type) {
        return Err(Rejection::MalformedBody);
    }
    let fields = parse_form(body).ok_or(Rejection::MalformedBody)?;

    let original_url = field(&fields, ORIGINAL_URL_FIELD).map(str::to_owned);

    if let Some(json) = field(&fields, JSON_FIELD) {
        serde_json::from_str::<IgnoredAny>(json).map_err(|_| Rejection::BadJson)?;
        return Ok(Submission {
            content: json.as_bytes().to_vec(),
            content_type: ContentType::Json,
            original_url,
        });
    }

    match field(&fields, HTML_FIELD) {
        Some(html) if !html.trim().is_empty() => Ok(Submission {
            content: html.as_bytes().to_vec(),
            content_type: ContentType::Html,
            original_url,
        }),
        _ => Err(Rejection::UnrecognizedContent),
    }
}

fn is_form_media_type(header: &[u8]) -> bool {
    header
        .split(|&b| b == b';')
        .next()
        .is_some_and(|essence| {
            essence
                .trim_ascii()
                .eq_ignore_ascii_case(FORM_MEDIA_TYPE.as_bytes())
        })
}

/// Last value submitted under `name`.
fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .rev()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Strictly parse `application/x-www-form-urlencoded`.
///
/// Every pair needs a `=` and a non-empty name, every `%` must start a
/// two-digit hex escape, and decoded text must be UTF-8. Empty pairs
/// (`a=1&&b=2`) are skipped.
fn parse_form(body: &[u8]) -> Option<Vec<(String, String)>> {
    let mut fields = Vec::new();
    for pair in body.split(|&b| b == b'&').filter(|p| !p.is_empty()) {
        let eq = pair.iter().position(|&b| b == b'=')?;
        let (name, value) = (&pair[..eq], &pair[eq + 1..]);
        if name.is_empty() {
            return None;
        }
        fields.push((decode_component(name)?, decode_component(value)?));
    }
    if fields.is_empty() {
        return None;
    }
    Some(fields)
}

fn decode_component(raw: &[u8]) -> Option<String> {
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let escape = raw.get(i + 1..i + 3)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}
