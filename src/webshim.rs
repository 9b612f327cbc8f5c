//! WASM-specific JavaScript bridge.
//!
//! Implements the host bridge and local storage over the real `window`.
//! Every global lookup goes through `Reflect` and is guarded, since host
//! builds differ in which SDK objects they inject and when.

#![cfg(target_arch = "wasm32")]

use crate::bridge::{
    poll_context, BridgeError, HostBridge, ReadyShape, CONTEXT_POLL_INTERVAL, CONTEXT_SHAPES,
    LEGACY_GLOBAL_ROOTS,
};
use crate::debug::{self, cat};
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::window;

/// Walk `path` from `window`, returning `None` at the first missing hop.
fn window_path(path: &[&str]) -> Option<JsValue> {
    let mut cur = JsValue::from(window()?);
    for seg in path {
        let next = Reflect::get(&cur, &JsValue::from_str(seg)).ok()?;
        if next.is_undefined() || next.is_null() {
            return None;
        }
        cur = next;
    }
    Some(cur)
}

/// Serialize a JS value to JSON. Cyclic or exotic values yield `None`.
fn js_to_json(v: &JsValue) -> Option<Value> {
    let text = js_sys::JSON::stringify(v).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

/// Current `location.search` (`"?fid=1"`), empty when unavailable.
pub fn page_query() -> String {
    window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default()
}

/// One pass over the context shapes; promises are awaited.
async fn find_context() -> Option<Value> {
    for path in CONTEXT_SHAPES {
        let Some(v) = window_path(path) else { continue };
        let v = match v.dyn_into::<Promise>() {
            Ok(p) => match JsFuture::from(p).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    debug::log(cat::CONTEXT, format!("{} rejected: {e:?}", path.join(".")));
                    continue;
                }
            },
            Err(v) => v,
        };
        if let Some(json) = js_to_json(&v).filter(Value::is_object) {
            debug::log(cat::CONTEXT, format!("context from {}", path.join(".")));
            return Some(json);
        }
    }
    None
}

/// The page's host bridge: whatever SDK the host injected into `window`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowBridge;

#[async_trait(?Send)]
impl HostBridge for WindowBridge {
    fn user_agent(&self) -> Option<String> {
        window()?.navigator().user_agent().ok()
    }

    fn embedded_hint(&self) -> bool {
        let Some(win) = window() else { return false };
        let framed = match win.parent() {
            Ok(Some(parent)) => !JsValue::from(parent).loose_eq(&JsValue::from(win.clone())),
            _ => false,
        };
        framed || window_path(&["ReactNativeWebView"]).is_some()
    }

    fn call_ready(&self, shape: &ReadyShape) -> Result<(), BridgeError> {
        let (last, parent_path) = shape
            .path
            .split_last()
            .ok_or_else(|| BridgeError::Missing(shape.label()))?;
        let parent = window_path(parent_path).ok_or_else(|| BridgeError::Missing(shape.label()))?;
        let f = Reflect::get(&parent, &JsValue::from_str(last))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| BridgeError::Missing(shape.label()))?;

        let out = f.call0(&parent).map_err(|e| BridgeError::Threw {
            shape: shape.label(),
            message: format!("{e:?}"),
        })?;
        if let Ok(promise) = out.dyn_into::<Promise>() {
            // Best effort: the host may reject if it is not listening yet.
            wasm_bindgen_futures::spawn_local(async move {
                let _ = JsFuture::from(promise).await;
            });
        }
        Ok(())
    }

    async fn context(&self) -> Option<Value> {
        // The SDK object may not be on `window` yet; keep looking until the
        // provider's context timeout wins the race.
        Some(poll_context(CONTEXT_POLL_INTERVAL, find_context).await)
    }

    fn globals(&self) -> Option<Value> {
        let mut snapshot = Map::new();
        for root in LEGACY_GLOBAL_ROOTS {
            if let Some(json) = window_path(&[*root]).as_ref().and_then(js_to_json) {
                snapshot.insert((*root).to_string(), json);
            }
        }
        (!snapshot.is_empty()).then_some(Value::Object(snapshot))
    }
}

/// `window.localStorage`; writes are dropped silently when storage is blocked.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStore;

fn local_storage() -> Option<web_sys::Storage> {
    window()?.local_storage().ok().flatten()
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        local_storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(ls) = local_storage() {
            let _ = ls.set_item(key, value);
        }
    }

    fn remove(&self, key: &str) {
        if let Some(ls) = local_storage() {
            let _ = ls.remove_item(key);
        }
    }
}
