//! Identity resolver tests - validation, priority order, cache fallback

use petcast::fid::{coerce, FidSources, IdentityResolver};
use petcast::storage::{KeyValueStore, MemoryStore, FID_STORAGE_KEY};
use petcast::{Fid, FidSource, ViewerIdentity};
use serde_json::{json, Value};

#[test]
fn coerce_yields_positive_integer_or_nothing() {
    for (input, expected) in [
        (json!("12.5"), None),
        (json!("-3"), None),
        (json!("0"), None),
        (json!("abc"), None),
        (Value::Null, None),
        (json!("42"), Fid::new(42)),
        (json!(42), Fid::new(42)),
    ] {
        assert_eq!(coerce(&input), expected, "coerce({input})");
    }
}

#[test]
fn query_wins_over_context_on_first_pass() {
    let store = MemoryStore::new();
    let resolver = IdentityResolver::new(&store);
    let ctx = json!({ "user": { "fid": 9 } });
    let id = resolver.resolve(&FidSources {
        query: Some("?fid=7"),
        host_context: Some(&ctx),
        globals: None,
    });
    assert_eq!(id.fid, Fid::new(7));
    assert_eq!(id.source, FidSource::Query);
}

#[test]
fn host_context_fid_is_remembered_once() {
    let store = MemoryStore::new();
    let resolver = IdentityResolver::new(&store);
    let ctx = json!({ "user": { "fid": 55 } });
    let sources = FidSources {
        query: Some(""),
        host_context: Some(&ctx),
        globals: None,
    };

    let first = resolver.resolve(&sources);
    let again = resolver.resolve(&sources);
    assert_eq!(first, again);
    assert_eq!(first.fid, Fid::new(55));
    assert_eq!(first.source, FidSource::HostContext);
    assert_eq!(store.get(FID_STORAGE_KEY).as_deref(), Some("55"));
    assert_eq!(store.writes(), 1);
}

#[test]
fn cached_value_is_the_fallback() {
    let store = MemoryStore::with(FID_STORAGE_KEY, "31");
    let resolver = IdentityResolver::new(&store);
    let id = resolver.resolve(&FidSources::default());
    assert_eq!(id, ViewerIdentity { fid: Fid::new(31), source: FidSource::Cache });
}

#[test]
fn live_source_overwrites_stale_cache() {
    let store = MemoryStore::with(FID_STORAGE_KEY, "31");
    let resolver = IdentityResolver::new(&store);
    let id = resolver.resolve(&FidSources {
        query: Some("https://pets.app/card?viewerFid=8"),
        ..Default::default()
    });
    assert_eq!(id.fid, Fid::new(8));
    assert_eq!(store.get(FID_STORAGE_KEY).as_deref(), Some("8"));
}

#[test]
fn adversarial_query_values_fall_back_to_cache() {
    let store = MemoryStore::with(FID_STORAGE_KEY, "31");
    let resolver = IdentityResolver::new(&store);
    for q in ["?fid=-1", "?fid=0", "?fid=1.5", "?fid=%3Cscript%3E", "?fid="] {
        let id = resolver.resolve(&FidSources { query: Some(q), ..Default::default() });
        assert_eq!(id.source, FidSource::Cache, "{q}");
    }
    assert_eq!(store.writes(), 0);
}
