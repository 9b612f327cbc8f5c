//! Platform abstraction (timers, task spawning, logging bootstrap).
//!
//! Native builds run on tokio; wasm builds run on the browser event loop
//! via `wasm_bindgen_futures::spawn_local` and `setTimeout`-backed sleeps.

#[cfg(target_arch = "wasm32")]
mod runtime_wasm;
#[cfg(target_arch = "wasm32")]
pub use runtime_wasm::{init_logging, install_panic_hook, sleep, spawn, Duration, Instant};

#[cfg(not(target_arch = "wasm32"))]
mod runtime_native;
#[cfg(not(target_arch = "wasm32"))]
pub use runtime_native::{init_logging, install_panic_hook, sleep, spawn, Duration, Instant};

/// `Send` on native, nothing on wasm (JS handles are `!Send`).
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSend: Send {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + ?Sized> MaybeSend for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSend {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSend for T {}

/// `Sync` on native, nothing on wasm.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSync: Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Sync + ?Sized> MaybeSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSync for T {}
