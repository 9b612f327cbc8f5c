//! On-chain reads for the pet contract over plain JSON-RPC.
//!
//! Only two views are needed by the pages: `tokenURI(uint256)` for the
//! card/mint views and `balanceOf(address)` for "my pet". Calls are not
//! retried here; failures surface to the caller as [`ChainError`].

use crate::debug::{self, cat};
use crate::platform::{MaybeSend, MaybeSync};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::OnceLock;
use thiserror::Error;

/// `tokenURI(uint256)`
pub const TOKEN_URI_SELECTOR: [u8; 4] = [0xc8, 0x7b, 0x56, 0xdd];
/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

const WORD: usize = 32;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc transport: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rpc http {status}: {body}")]
    Status { status: u16, body: String },
    #[error("rpc {code} {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid rpc payload: {0}")]
    Payload(String),
    #[error("abi decode: {0}")]
    Abi(String),
    #[error("invalid address `{0}`")]
    Address(String),
}

/// Reads a token's self-description URI.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait TokenReader: MaybeSend + MaybeSync {
    async fn token_uri(&self, token_id: u64) -> Result<String, ChainError>;
}

static HTTP: OnceLock<reqwest::Client> = OnceLock::new();

fn http_client() -> &'static reqwest::Client {
    HTTP.get_or_init(reqwest::Client::new)
}

#[derive(Clone, Debug)]
pub struct ChainClient {
    rpc_url: String,
    contract: String,
    timeout_ms: u64,
}

impl ChainClient {
    pub fn new(rpc_url: impl Into<String>, contract: impl Into<String>, timeout_ms: u64) -> Result<Self, ChainError> {
        let contract = contract.into();
        address_word(&contract)?;
        Ok(Self {
            rpc_url: rpc_url.into(),
            contract,
            timeout_ms,
        })
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// `eth_call` against the contract at the latest block; returns the raw hex result.
    pub async fn eth_call(&self, data: &str) -> Result<String, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{ "to": self.contract, "data": data }, "latest"],
        });
        debug::log(cat::CHAIN, format!("eth_call {} {}", self.contract, &data[..data.len().min(10)]));

        let req = http_client().post(&self.rpc_url).json(&body);
        #[cfg(not(target_arch = "wasm32"))]
        let req = req.timeout(std::time::Duration::from_millis(self.timeout_ms));
        #[cfg(target_arch = "wasm32")]
        let _ = self.timeout_ms;

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ChainError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let v: Value = res.json().await?;
        rpc_result(&v)
    }

    pub async fn balance_of(&self, owner: &str) -> Result<u64, ChainError> {
        let data = encode_call(BALANCE_OF_SELECTOR, &address_word(owner)?);
        let out = self.eth_call(&data).await?;
        decode_abi_u64(&out)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl TokenReader for ChainClient {
    async fn token_uri(&self, token_id: u64) -> Result<String, ChainError> {
        let data = encode_call(TOKEN_URI_SELECTOR, &u256_word(token_id));
        let out = self.eth_call(&data).await?;
        decode_abi_string(&out)
    }
}

/// Pull `result` out of a JSON-RPC response, mapping `error` objects.
pub fn rpc_result(v: &Value) -> Result<String, ChainError> {
    if let Some(err) = v.get("error") {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("rpc error")
            .to_string();
        return Err(ChainError::Rpc { code, message });
    }
    v.get("result")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ChainError::Payload("no result".into()))
}

pub fn u256_word(n: u64) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    w[WORD - 8..].copy_from_slice(&n.to_be_bytes());
    w
}

pub fn address_word(addr: &str) -> Result<[u8; WORD], ChainError> {
    let raw = addr.strip_prefix("0x").unwrap_or(addr);
    let bytes = hex::decode(raw).map_err(|_| ChainError::Address(addr.to_string()))?;
    if bytes.len() != 20 {
        return Err(ChainError::Address(addr.to_string()));
    }
    let mut w = [0u8; WORD];
    w[WORD - 20..].copy_from_slice(&bytes);
    Ok(w)
}

pub fn encode_call(selector: [u8; 4], arg: &[u8; WORD]) -> String {
    format!("0x{}{}", hex::encode(selector), hex::encode(arg))
}

fn decode_hex(out: &str) -> Result<Vec<u8>, ChainError> {
    let raw = out.strip_prefix("0x").unwrap_or(out);
    hex::decode(raw).map_err(|e| ChainError::Abi(e.to_string()))
}

/// Read a 32-byte word as a `usize`, rejecting anything that does not fit.
fn word_usize(bytes: &[u8], at: usize) -> Result<usize, ChainError> {
    let word = at
        .checked_add(WORD)
        .and_then(|end| bytes.get(at..end))
        .ok_or_else(|| ChainError::Abi(format!("short word at {at}")))?;
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(ChainError::Abi(format!("word at {at} overflows")));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(tail)).map_err(|_| ChainError::Abi(format!("word at {at} overflows")))
}

pub fn decode_abi_u64(out: &str) -> Result<u64, ChainError> {
    let bytes = decode_hex(out)?;
    word_usize(&bytes, 0).map(|n| n as u64)
}

/// Decode a single ABI-encoded dynamic `string` return value.
pub fn decode_abi_string(out: &str) -> Result<String, ChainError> {
    let bytes = decode_hex(out)?;
    let offset = word_usize(&bytes, 0)?;
    let len = word_usize(&bytes, offset)?;
    let start = offset + WORD;
    let data = bytes
        .get(start..start.saturating_add(len))
        .ok_or_else(|| ChainError::Abi(format!("string of {len} bytes runs past end")))?;
    String::from_utf8(data.to_vec()).map_err(|e| ChainError::Abi(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abi_string(s: &str) -> String {
        let mut out = Vec::new();
        out.extend_from_slice(&u256_word(32));
        out.extend_from_slice(&u256_word(s.len() as u64));
        out.extend_from_slice(s.as_bytes());
        let pad = (WORD - s.len() % WORD) % WORD;
        out.extend(std::iter::repeat(0u8).take(pad));
        format!("0x{}", hex::encode(out))
    }

    #[test]
    fn encodes_token_uri_call() {
        let data = encode_call(TOKEN_URI_SELECTOR, &u256_word(7));
        assert!(data.starts_with("0xc87b56dd"));
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.ends_with("07"));
    }

    #[test]
    fn decodes_abi_string() {
        let uri = "data:application/json;base64,eyJuYW1lIjoicGV0In0=";
        assert_eq!(decode_abi_string(&abi_string(uri)).unwrap(), uri);
        assert_eq!(decode_abi_string(&abi_string("")).unwrap(), "");
    }

    #[test]
    fn truncated_abi_string_is_an_error() {
        let full = abi_string("hello world");
        let cut = &full[..full.len() - 64];
        assert!(matches!(decode_abi_string(cut), Err(ChainError::Abi(_))));
    }

    #[test]
    fn rejects_bad_addresses() {
        assert!(address_word("0x1234").is_err());
        assert!(address_word("0xzz00000000000000000000000000000000000000").is_err());
        let w = address_word("0x00000000000000000000000000000000000000aa").unwrap();
        assert_eq!(w[31], 0xaa);
    }

    #[test]
    fn maps_rpc_errors() {
        let err = rpc_result(&json!({ "error": { "code": -32000, "message": "execution reverted" } }));
        assert!(matches!(err, Err(ChainError::Rpc { code: -32000, .. })));
        assert_eq!(rpc_result(&json!({ "result": "0x01" })).unwrap(), "0x01");
        assert!(matches!(rpc_result(&json!({})), Err(ChainError::Payload(_))));
    }

    #[test]
    fn decodes_balance() {
        assert_eq!(decode_abi_u64(&format!("0x{}", hex::encode(u256_word(3)))).unwrap(), 3);
    }
}
