//! Context provider tests - bootstrap sequence per mount

use async_trait::async_trait;
use petcast::bridge::{self, BridgeError, HostBridge, ReadyShape, StaticBridge, CONTEXT_POLL_INTERVAL, READY_SHAPES};
use petcast::provider::{ContextProvider, ProviderOptions};
use petcast::storage::{KeyValueStore, MemoryStore, FID_STORAGE_KEY};
use petcast::{Fid, FidSource};
use serde_json::json;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WARPCAST_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) Warpcast/1.0";

#[tokio::test(start_paused = true)]
async fn query_fid_without_host_bridge() {
    let storage = Arc::new(MemoryStore::new());
    let provider = ContextProvider::new(
        Arc::new(StaticBridge::absent()),
        storage.clone(),
        "?fid=123",
        ProviderOptions::default(),
    );

    let mut mount = provider.mount();
    assert!(mount.state().loading, "loading starts true");

    let state = mount.loaded().await;
    assert!(!state.loading);
    assert!(!state.in_mini);
    assert_eq!(state.fid, Fid::new(123));
    assert_eq!(state.source, FidSource::Query);
    assert!(!state.host_ready);
    assert_eq!(storage.get(FID_STORAGE_KEY).as_deref(), Some("123"));
}

#[tokio::test(start_paused = true)]
async fn late_host_context_fills_in_the_viewer() {
    let storage = Arc::new(MemoryStore::new());
    let bridge = StaticBridge::host(
        WARPCAST_UA,
        json!({ "user": { "fid": 55, "username": "mochi", "pfpUrl": "https://i/55.png" } }),
    )
    .with_context_delay(Duration::from_millis(800));
    let provider = ContextProvider::new(Arc::new(bridge), storage.clone(), "", ProviderOptions::default());

    let mut mount = provider.mount();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let early = mount.state();
    assert!(early.loading);
    assert!(early.in_mini);
    assert_eq!(early.fid, None, "first-pass absence is not final");

    let state = mount.loaded().await;
    assert_eq!(state.fid, Fid::new(55));
    assert_eq!(state.source, FidSource::HostContext);
    assert!(state.host_ready);
    let user = state.user.expect("user from context");
    assert_eq!(user.username.as_deref(), Some("mochi"));
    assert_eq!(storage.writes(), 1);
    assert_eq!(storage.get(FID_STORAGE_KEY).as_deref(), Some("55"));

    let host = state_host(&mount);
    assert!(host.in_host_shell && host.ready);
}

fn state_host(mount: &petcast::Mount) -> petcast::provider::HostContext {
    mount.state().host_context()
}

#[tokio::test(start_paused = true)]
async fn context_supersedes_query_on_second_pass() {
    let storage = Arc::new(MemoryStore::new());
    let bridge = StaticBridge::host(WARPCAST_UA, json!({ "user": { "fid": 9 } }))
        .with_context_delay(Duration::from_secs(1));
    let provider = ContextProvider::new(Arc::new(bridge), storage.clone(), "?fid=7", ProviderOptions::default());

    let mut mount = provider.mount();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(mount.state().fid, Fid::new(7));

    let state = mount.loaded().await;
    assert_eq!(state.fid, Fid::new(9));
    assert_eq!(storage.get(FID_STORAGE_KEY).as_deref(), Some("9"));
}

#[tokio::test(start_paused = true)]
async fn silent_host_times_out_to_cache() {
    let storage = Arc::new(MemoryStore::with(FID_STORAGE_KEY, "31"));
    let bridge = StaticBridge::host(WARPCAST_UA, json!({ "user": { "fid": 9 } }))
        .with_context_delay(Duration::from_secs(60));
    let options = ProviderOptions {
        context_timeout: Duration::from_secs(2),
        ..ProviderOptions::default()
    };
    let provider = ContextProvider::new(Arc::new(bridge), storage.clone(), "", options);

    let started = tokio::time::Instant::now();
    let mut mount = provider.mount();
    let state = mount.loaded().await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(state.fid, Fid::new(31));
    assert_eq!(state.source, FidSource::Cache);
    assert!(!state.host_ready);
    assert_eq!(storage.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn unmount_stops_readiness_signaling() {
    let bridge = Arc::new(StaticBridge::host(WARPCAST_UA, json!({})).with_context_delay(Duration::from_secs(60)));
    let provider = ContextProvider::new(
        bridge.clone(),
        Arc::new(MemoryStore::new()),
        "",
        ProviderOptions::default(),
    );

    let mount = provider.mount();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(bridge.ready_calls() >= READY_SHAPES.len());

    mount.unmount();
    let calls = bridge.ready_calls();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(bridge.ready_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn mounts_are_independent() {
    let storage = Arc::new(MemoryStore::new());
    let provider = ContextProvider::new(
        Arc::new(StaticBridge::absent()),
        storage.clone(),
        "?userFid=12",
        ProviderOptions::default(),
    );

    let first = provider.mount();
    let mut second = provider.mount();
    first.unmount();

    let state = second.loaded().await;
    assert_eq!(state.fid, Fid::new(12));
    assert!(!second.is_unmounted());
}

#[tokio::test(start_paused = true)]
async fn legacy_global_is_last_resort() {
    let bridge = StaticBridge::absent().with_globals(json!({ "fc": { "user": { "fid": "88" } } }));
    let provider = ContextProvider::new(
        Arc::new(bridge),
        Arc::new(MemoryStore::new()),
        "",
        ProviderOptions::default(),
    );
    let mut mount = provider.mount();
    let state = mount.loaded().await;
    assert_eq!(state.fid, Fid::new(88));
    assert_eq!(state.source, FidSource::LegacyGlobal);
}

/// A host whose SDK object shows up some time after the page loaded.
struct LateAttachBridge {
    sdk_context: Mutex<Option<Value>>,
}

impl LateAttachBridge {
    fn attach(&self, ctx: Value) {
        *self.sdk_context.lock().unwrap() = Some(ctx);
    }
}

#[async_trait]
impl HostBridge for LateAttachBridge {
    fn user_agent(&self) -> Option<String> {
        Some(WARPCAST_UA.to_string())
    }

    fn call_ready(&self, shape: &ReadyShape) -> Result<(), BridgeError> {
        Err(BridgeError::Missing(shape.label()))
    }

    async fn context(&self) -> Option<Value> {
        let found = bridge::poll_context(CONTEXT_POLL_INTERVAL, || {
            let current = self.sdk_context.lock().unwrap().clone();
            async move { current }
        })
        .await;
        Some(found)
    }
}

#[tokio::test(start_paused = true)]
async fn sdk_attaching_after_mount_still_resolves_viewer() {
    let storage = Arc::new(MemoryStore::new());
    let bridge = Arc::new(LateAttachBridge {
        sdk_context: Mutex::new(None),
    });
    let provider = ContextProvider::new(bridge.clone(), storage.clone(), "", ProviderOptions::default());

    let mut mount = provider.mount();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(mount.state().loading, "still waiting for the host");
    assert_eq!(mount.state().fid, None);

    bridge.attach(json!({ "user": { "fid": 21 } }));
    let started = tokio::time::Instant::now();
    let state = mount.loaded().await;
    assert!(started.elapsed() <= CONTEXT_POLL_INTERVAL);
    assert_eq!(state.fid, Fid::new(21));
    assert_eq!(state.source, FidSource::HostContext);
    assert!(state.host_ready);
    assert_eq!(storage.get(FID_STORAGE_KEY).as_deref(), Some("21"));
}

#[tokio::test(start_paused = true)]
async fn outside_host_shell_does_not_wait_for_context() {
    let mut bridge = StaticBridge::absent().with_context_delay(Duration::from_secs(2));
    bridge.context = Some(json!({ "user": { "fid": 5 } }));
    let provider = ContextProvider::new(
        Arc::new(bridge),
        Arc::new(MemoryStore::new()),
        "",
        ProviderOptions::default(),
    );

    let started = tokio::time::Instant::now();
    let mut mount = provider.mount();
    let state = mount.loaded().await;
    assert!(started.elapsed() < Duration::from_millis(10), "no context wait outside a host");
    assert!(!state.in_mini);
    assert!(!state.host_ready);
    assert_eq!(state.fid, None);
}
