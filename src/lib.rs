//! petcast - mini-app bootstrap for an NFT pet running inside a social client
//!
//! This library holds the host-facing core of the pet mini-app: working out
//! whether the page runs inside the host shell, who the viewer is (their
//! FID), telling the host the page is ready, and decoding the pets'
//! on-chain metadata.
//!
//! ## Architecture
//!
//! - **Web**: compiled to wasm (`dom-web`), the page calls into
//!   [`wasm_api`] and the host is reached through `window` ([`webshim`]).
//! - **Native**: the `petcast` CLI drives the same code with fixed inputs,
//!   useful for inspecting tokens and reproducing identity resolution.
//!
//! ## Usage
//!
//! For native builds:
//! ```bash
//! cargo build --features native
//! ```
//!
//! For web builds:
//! ```bash
//! wasm-pack build --target web --no-default-features --features dom-web
//! ```

// Core modules (available on all platforms)
pub mod bridge;
pub mod config;
pub mod fid;
pub mod host;
pub mod metadata;
pub mod provider;
pub mod ready;
pub mod share;
pub mod storage;

// Contract reads (same JSON-RPC path for native and web)
pub mod chain;

// Debug logging system (available on all platforms)
pub mod debug;

// Platform abstraction layer
pub mod platform;

// Browser-backed bridge and storage (wasm only)
#[cfg(target_arch = "wasm32")]
pub mod webshim;

// WASM-facing exports (JS -> Rust) are only built on wasm32.
#[cfg(target_arch = "wasm32")]
pub mod wasm_api;

// Re-export commonly used types
pub use bridge::{HostBridge, StaticBridge};
pub use config::Config;
pub use fid::{Fid, FidSource, ViewerIdentity};
pub use metadata::TokenMetadata;
pub use provider::{ContextProvider, MiniAppState, Mount};
pub use storage::{KeyValueStore, MemoryStore};
