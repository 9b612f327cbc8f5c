//! Minimal JS -> Rust surface for the page scripts.
//!
//! The page mounts the provider once on load, passing a callback that
//! receives every state change as a JSON string, and unmounts it on
//! navigation. Decoding and share helpers are exposed for the pet pages.
//!
//! # Example
//! ```javascript
//! petcast_mount((json) => render(JSON.parse(json)));
//! window.addEventListener("pagehide", () => petcast_unmount());
//! ```

#![cfg(target_arch = "wasm32")]

use crate::config::Config;
use crate::provider::{ContextProvider, Mount};
use crate::webshim::{self, LocalStore, WindowBridge};
use crate::{debug, fid, host, metadata, platform, share};
use std::cell::RefCell;
use std::sync::Arc;
use wasm_bindgen::prelude::*;

thread_local! {
    static MOUNT: RefCell<Option<Mount>> = const { RefCell::new(None) };
}

/// Mount the context provider for this page. A previous mount is torn down first.
#[wasm_bindgen]
pub fn petcast_mount(on_state: js_sys::Function) {
    platform::install_panic_hook();
    platform::init_logging(log::Level::Info);
    debug::init_from_url_and_storage_once();

    petcast_unmount();

    let provider = ContextProvider::new(
        Arc::new(WindowBridge),
        Arc::new(LocalStore),
        webshim::page_query(),
        Config::default().provider_options(),
    );
    let mount = provider.mount();
    let mut rx = mount.subscribe();
    MOUNT.with(|m| *m.borrow_mut() = Some(mount));

    platform::spawn(async move {
        loop {
            let json = serde_json::to_string(&*rx.borrow_and_update()).unwrap_or_default();
            let _ = on_state.call1(&JsValue::NULL, &JsValue::from_str(&json));
            // Sender goes away once the bootstrap ends or the mount is dropped.
            if rx.changed().await.is_err() {
                break;
            }
        }
    });
}

/// Tear down the current mount; readiness signaling stops immediately.
#[wasm_bindgen]
pub fn petcast_unmount() {
    MOUNT.with(|m| m.borrow_mut().take());
}

#[wasm_bindgen]
pub fn petcast_is_in_host_shell() -> bool {
    use crate::bridge::HostBridge;
    host::is_in_host_shell(WindowBridge.user_agent().as_deref())
}

/// Validate a FID candidate (string or number); `undefined` when invalid.
#[wasm_bindgen]
pub fn petcast_coerce_fid(value: JsValue) -> Option<f64> {
    let candidate = if let Some(s) = value.as_string() {
        serde_json::Value::String(s)
    } else if let Some(n) = value.as_f64() {
        serde_json::Number::from_f64(n).map(serde_json::Value::Number)?
    } else {
        return None;
    };
    fid::coerce(&candidate).map(|f| f.get() as f64)
}

/// Decode a token data URI into a JSON string; `undefined` when it does not decode.
#[wasm_bindgen]
pub fn petcast_decode_token_uri(uri: String) -> Option<String> {
    metadata::decode(&uri).and_then(|m| serde_json::to_string(&m).ok())
}

#[wasm_bindgen]
pub fn petcast_share_url(app_url: String, token_id: u32, name: Option<String>) -> String {
    share::share_pet_url(&app_url, token_id as u64, name.as_deref())
}
