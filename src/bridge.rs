//! Host bridge boundary.
//!
//! The social client exposes its mini-app SDK on the page's global object,
//! but the exact shape drifts between client builds and it may attach after
//! the page has loaded. Everything the bootstrap needs from the host goes
//! through [`HostBridge`] so it can be driven by a real `window` (see
//! `webshim`) or by a [`StaticBridge`] in tests and on native.

use crate::platform::{self, Duration, MaybeSend, MaybeSync};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// A global path whose last segment is a callable `ready` action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadyShape {
    pub path: &'static [&'static str],
}

impl ReadyShape {
    pub fn label(&self) -> String {
        self.path.join(".")
    }
}

/// Known `ready` actions across host SDK generations, in call order.
pub const READY_SHAPES: &[ReadyShape] = &[
    ReadyShape { path: &["sdk", "actions", "ready"] },
    ReadyShape { path: &["farcaster", "actions", "ready"] },
    ReadyShape { path: &["miniapp", "sdk", "actions", "ready"] },
    ReadyShape { path: &["fc", "ready"] },
    ReadyShape { path: &["farcaster", "ready"] },
];

/// Global paths where the SDK context object (or a promise of it) lives.
pub const CONTEXT_SHAPES: &[&[&str]] = &[
    &["sdk", "context"],
    &["farcaster", "context"],
    &["miniapp", "sdk", "context"],
];

/// How often a bridge re-checks for a context that has not attached yet.
pub const CONTEXT_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Run `check` every `interval` until it finds a context.
///
/// Never gives up on its own; callers bound it (the provider races it
/// against its context timeout). The first check runs before any sleep.
pub async fn poll_context<F, Fut>(interval: Duration, mut check: F) -> Value
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<Value>>,
{
    let mut checks = 0u32;
    loop {
        checks += 1;
        if let Some(ctx) = check().await {
            if checks > 1 {
                log::debug!("host context attached after {checks} checks");
            }
            return ctx;
        }
        platform::sleep(interval).await;
    }
}

/// Global roots snapshotted for the legacy FID probes.
pub const LEGACY_GLOBAL_ROOTS: &[&str] = &[
    "farcaster",
    "fc",
    "warpcast",
    "__FARCASTER_CONTEXT__",
    "__MINIAPP_CONTEXT__",
    "farcasterFid",
];

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridge shape `{0}` is not present")]
    Missing(String),
    #[error("bridge call `{shape}` threw: {message}")]
    Threw { shape: String, message: String },
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait HostBridge: MaybeSend + MaybeSync {
    /// Runtime user agent, `None` outside a browser.
    fn user_agent(&self) -> Option<String>;

    /// Extra "we are framed by something" signal beyond the user agent.
    fn embedded_hint(&self) -> bool {
        false
    }

    /// Invoke one `ready` shape. Calling it repeatedly must be harmless.
    fn call_ready(&self, shape: &ReadyShape) -> Result<(), BridgeError>;

    /// The SDK context object once the host delivers it; `None` if it never does.
    ///
    /// Hosts may attach their SDK after first paint, so implementations keep
    /// waiting (see [`poll_context`]); the caller bounds the wait.
    async fn context(&self) -> Option<Value>;

    /// JSON snapshot of the legacy global roots that are present.
    fn globals(&self) -> Option<Value> {
        None
    }
}

/// A bridge backed by fixed values: native runs, CLI, and tests.
#[derive(Debug, Default)]
pub struct StaticBridge {
    pub user_agent: Option<String>,
    pub embedded: bool,
    pub context: Option<Value>,
    /// Delay before `context()` yields, to model a host that attaches late.
    pub context_delay: Option<Duration>,
    pub globals: Option<Value>,
    /// Shapes that accept `ready`; everything else reports `Missing`.
    pub ready_shapes: Vec<ReadyShape>,
    ready_calls: AtomicUsize,
}

impl StaticBridge {
    /// No host at all: plain browser tab or native process.
    pub fn absent() -> Self {
        Self::default()
    }

    /// A host that answers on the current SDK shape with `context`.
    pub fn host(user_agent: &str, context: Value) -> Self {
        Self {
            user_agent: Some(user_agent.to_string()),
            context: Some(context),
            ready_shapes: vec![READY_SHAPES[0]],
            ..Self::default()
        }
    }

    pub fn with_context_delay(mut self, delay: Duration) -> Self {
        self.context_delay = Some(delay);
        self
    }

    pub fn with_globals(mut self, globals: Value) -> Self {
        self.globals = Some(globals);
        self
    }

    /// Total `call_ready` invocations, accepted or not.
    pub fn ready_calls(&self) -> usize {
        self.ready_calls.load(Ordering::SeqCst)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl HostBridge for StaticBridge {
    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn embedded_hint(&self) -> bool {
        self.embedded
    }

    fn call_ready(&self, shape: &ReadyShape) -> Result<(), BridgeError> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        if self.ready_shapes.contains(shape) {
            Ok(())
        } else {
            Err(BridgeError::Missing(shape.label()))
        }
    }

    async fn context(&self) -> Option<Value> {
        if let Some(delay) = self.context_delay {
            platform::sleep(delay).await;
        }
        self.context.clone()
    }

    fn globals(&self) -> Option<Value> {
        self.globals.clone()
    }
}
