//! Token metadata: decoding on-chain data URIs and fetching hosted JSON.

use crate::chain::{ChainError, TokenReader};
use crate::debug::{self, cat};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Prefix of a self-describing base64 JSON token URI.
pub const DATA_URI_PREFIX: &str = "data:application/json;base64,";

pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenAttribute {
    #[serde(default, deserialize_with = "lenient_string")]
    pub trait_type: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: String,
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub animation_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_attributes")]
    pub attributes: Vec<TokenAttribute>,
}

// Contracts in the wild emit `null`, numbers and bools where text is
// expected. None of that should cost the rest of the record.

fn text_of(v: Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(text_of(Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(text_of(Value::deserialize(d)?).filter(|s| !s.is_empty()))
}

/// Non-array `attributes` read as empty; entries that are not objects are skipped.
fn lenient_attributes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<TokenAttribute>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Decode a `data:application/json;base64,` URI.
///
/// Anything else (plain URLs, bad base64, invalid UTF-8, non-object JSON)
/// yields `None`: malformed token data shows up as "no metadata".
pub fn decode(data_uri: &str) -> Option<TokenMetadata> {
    if !data_uri.starts_with(DATA_URI_PREFIX) {
        return None;
    }
    let (_, payload) = data_uri.split_once(',')?;
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = match STANDARD.decode(compact.as_bytes()) {
        Ok(b) => b,
        Err(e) => {
            debug::log(cat::META, format!("data uri base64: {e}"));
            return None;
        }
    };
    // Rebuild the text as UTF-8 so multi-byte names survive.
    let text = match String::from_utf8(bytes) {
        Ok(t) => t,
        Err(e) => {
            debug::log(cat::META, format!("data uri utf-8: {e}"));
            return None;
        }
    };
    let value: Value = serde_json::from_str(&text).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Map `ipfs://` URIs onto an HTTP gateway; everything else passes through.
pub fn resolve_media_uri(uri: &str, gateway: &str) -> String {
    match uri.strip_prefix("ipfs://") {
        Some(rest) => {
            let rest = rest.strip_prefix("ipfs/").unwrap_or(rest);
            format!("{}/ipfs/{}", gateway.trim_end_matches('/'), rest)
        }
        None => uri.to_string(),
    }
}

impl TokenMetadata {
    /// Rewrite `image`/`animation_url` through the gateway for display.
    pub fn with_gateway(mut self, gateway: &str) -> Self {
        self.image = resolve_media_uri(&self.image, gateway);
        self.animation_url = self
            .animation_url
            .map(|u| resolve_media_uri(&u, gateway));
        self
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("metadata request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("metadata endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("metadata is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// GET a hosted metadata document.
pub async fn fetch_metadata(http: &reqwest::Client, url: &str) -> Result<TokenMetadata, FetchError> {
    debug::log(cat::META, format!("GET {url}"));
    let res = http.get(url).send().await?;
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Read a token's URI from chain and turn it into metadata.
///
/// Data URIs are decoded locally (`Ok(None)` when they do not decode);
/// HTTP and IPFS URIs are fetched through `gateway`.
pub async fn load_token_metadata<R: TokenReader + ?Sized>(
    reader: &R,
    http: &reqwest::Client,
    gateway: &str,
    token_id: u64,
) -> Result<Option<TokenMetadata>, FetchError> {
    let uri = reader.token_uri(token_id).await?;
    if uri.starts_with("data:") {
        return Ok(decode(&uri).map(|m| m.with_gateway(gateway)));
    }
    if uri.starts_with("ipfs://") || uri.starts_with("http://") || uri.starts_with("https://") {
        let url = resolve_media_uri(&uri, gateway);
        let meta = fetch_metadata(http, &url).await?;
        return Ok(Some(meta.with_gateway(gateway)));
    }
    log::warn!("token {token_id}: unsupported uri scheme");
    Ok(None)
}
