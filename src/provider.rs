//! Mini-app context provider.
//!
//! One [`Mount`] per page tree. Mounting spawns a single bootstrap that
//! detects the host shell, resolves the viewer, starts readiness signaling,
//! waits (bounded) for the host SDK context and resolves again with it.
//! UI code watches [`MiniAppState`] through the mount; dropping the mount
//! cancels everything it started.

use crate::bridge::HostBridge;
use crate::debug::{self, cat};
use crate::fid::{self, Fid, FidSource, FidSources, IdentityResolver, ViewerIdentity};
use crate::host;
use crate::platform::{self, Duration};
use crate::ready::{self, ReadyPolicy};
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Viewer profile as delivered by the host context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerUser {
    pub fid: Option<Fid>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
}

const USER_PATHS: &[&str] = &["/user", "/viewer", "/client/user", "/session/user"];

impl ViewerUser {
    /// Pull the first user-shaped object out of a host context.
    pub fn from_context(context: &Value) -> Option<ViewerUser> {
        let user = USER_PATHS
            .iter()
            .filter_map(|p| context.pointer(p))
            .find(|v| v.is_object())?;
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| user.pointer(k).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(ViewerUser {
            fid: user.get("fid").and_then(fid::coerce),
            username: text(&["/username"]),
            display_name: text(&["/displayName", "/display_name"]),
            pfp_url: text(&["/pfpUrl", "/pfp_url", "/pfp/url"]),
        })
    }
}

/// The host-facing half of the provider state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostContext {
    pub in_host_shell: bool,
    /// The host delivered its SDK context.
    pub ready: bool,
    pub user: Option<ViewerUser>,
}

/// What the rest of the UI sees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniAppState {
    pub loading: bool,
    pub in_mini: bool,
    pub fid: Option<Fid>,
    pub user: Option<ViewerUser>,
    pub source: FidSource,
    pub host_ready: bool,
}

impl Default for MiniAppState {
    fn default() -> Self {
        MiniAppState {
            loading: true,
            in_mini: false,
            fid: None,
            user: None,
            source: FidSource::None,
            host_ready: false,
        }
    }
}

impl MiniAppState {
    pub fn identity(&self) -> ViewerIdentity {
        ViewerIdentity {
            fid: self.fid,
            source: self.source,
        }
    }

    pub fn host_context(&self) -> HostContext {
        HostContext {
            in_host_shell: self.in_mini,
            ready: self.host_ready,
            user: self.user.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderOptions {
    pub ready: ReadyPolicy,
    /// Upper bound on waiting for the host SDK context.
    pub context_timeout: Duration,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        ProviderOptions {
            ready: ReadyPolicy::default(),
            context_timeout: Duration::from_secs(6),
        }
    }
}

pub struct ContextProvider<B: ?Sized, S: ?Sized> {
    bridge: Arc<B>,
    storage: Arc<S>,
    page_query: String,
    options: ProviderOptions,
}

impl<B, S> ContextProvider<B, S>
where
    B: HostBridge + ?Sized + 'static,
    S: KeyValueStore + ?Sized + 'static,
{
    /// `page_query` is the page's search string (or full URL).
    pub fn new(bridge: Arc<B>, storage: Arc<S>, page_query: impl Into<String>, options: ProviderOptions) -> Self {
        Self {
            bridge,
            storage,
            page_query: page_query.into(),
            options,
        }
    }

    /// Start an independent bootstrap for one page tree.
    pub fn mount(&self) -> Mount {
        let (tx, rx) = watch::channel(MiniAppState::default());
        let cancel = CancellationToken::new();
        let bootstrap = Bootstrap {
            bridge: self.bridge.clone(),
            storage: self.storage.clone(),
            page_query: self.page_query.clone(),
            options: self.options.clone(),
        };
        let token = cancel.clone();
        platform::spawn(async move {
            bootstrap.run(tx, token).await;
        });
        Mount { state: rx, cancel }
    }
}

struct Bootstrap<B: ?Sized, S: ?Sized> {
    bridge: Arc<B>,
    storage: Arc<S>,
    page_query: String,
    options: ProviderOptions,
}

impl<B, S> Bootstrap<B, S>
where
    B: HostBridge + ?Sized + 'static,
    S: KeyValueStore + ?Sized + 'static,
{
    async fn run(self, tx: watch::Sender<MiniAppState>, cancel: CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        let in_mini = host::is_in_host_shell(self.bridge.user_agent().as_deref())
            || self.bridge.embedded_hint();
        debug::log(cat::HOST, format!("in host shell: {in_mini}"));

        let first = {
            let resolver = IdentityResolver::new(&*self.storage);
            let globals = self.bridge.globals();
            resolver.resolve(&FidSources {
                query: Some(&self.page_query),
                host_context: None,
                globals: globals.as_ref(),
            })
        };
        tx.send_modify(|s| {
            s.in_mini = in_mini;
            s.fid = first.fid;
            s.source = first.source;
        });

        let signaler = ready::spawn_with_token(
            self.bridge.clone(),
            self.options.ready.clone(),
            cancel.child_token(),
        );

        // Outside a host shell nothing will attach later: take a context only
        // if one is already there.
        let wait = if in_mini {
            self.options.context_timeout
        } else {
            Duration::ZERO
        };
        let context = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            ctx = self.bridge.context() => ctx,
            _ = platform::sleep(wait) => {
                debug::log(cat::CONTEXT, format!("no host context after {wait:?}"));
                None
            }
        };

        match context {
            Some(ctx) => {
                let second = IdentityResolver::new(&*self.storage).resolve_with_context(first, &ctx);
                let user = ViewerUser::from_context(&ctx);
                debug::log(cat::CONTEXT, format!("context arrived, fid via {}", second.source));
                tx.send_modify(|s| {
                    s.fid = second.fid;
                    s.source = second.source;
                    s.user = user;
                    s.host_ready = true;
                    s.loading = false;
                });
            }
            None => tx.send_modify(|s| s.loading = false),
        }
        log::info!("mini-app bootstrap complete: {:?}", tx.borrow().identity());

        // Keep signaling for the rest of its window unless the mount goes away.
        if let Some(report) = signaler.join().await {
            log::debug!("ready signaler finished: {report:?}");
        }
    }
}

/// Live handle on one mounted page tree.
pub struct Mount {
    state: watch::Receiver<MiniAppState>,
    cancel: CancellationToken,
}

impl Mount {
    /// Current snapshot.
    pub fn state(&self) -> MiniAppState {
        self.state.borrow().clone()
    }

    /// A receiver for observing every state change.
    pub fn subscribe(&self) -> watch::Receiver<MiniAppState> {
        self.state.clone()
    }

    /// Wait until `loading` has flipped to false.
    pub async fn loaded(&mut self) -> MiniAppState {
        if let Ok(s) = self.state.wait_for(|s| !s.loading).await {
            return s.clone();
        }
        // bootstrap task ended without finishing
        self.state.borrow().clone()
    }

    /// Tear down: stops the bootstrap and readiness signaling immediately.
    pub fn unmount(self) {}

    pub fn is_unmounted(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
