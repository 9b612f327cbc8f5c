//! Viewer identity (FID) resolution.
//!
//! Sources are tried in a fixed priority order and the first valid value
//! wins: page query, host SDK context, the locally cached value, then the
//! legacy global objects older host builds inject. Every candidate goes
//! through [`coerce`], so malformed input simply reads as "no FID".

use crate::debug::{self, cat};
use crate::storage::{KeyValueStore, FID_STORAGE_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::num::NonZeroU64;

/// Largest integer a JS number represents exactly. Applies to every input form.
const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// A social-network account id. Always strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fid(NonZeroU64);

impl Fid {
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Fid)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a resolved FID came from. Kept for debugging only, never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FidSource {
    Query,
    HostContext,
    Cache,
    LegacyGlobal,
    #[default]
    None,
}

impl fmt::Display for FidSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FidSource::Query => "query",
            FidSource::HostContext => "host-context",
            FidSource::Cache => "cache",
            FidSource::LegacyGlobal => "legacy-global",
            FidSource::None => "none",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViewerIdentity {
    pub fid: Option<Fid>,
    pub source: FidSource,
}

impl ViewerIdentity {
    pub const NONE: ViewerIdentity = ViewerIdentity {
        fid: None,
        source: FidSource::None,
    };

    fn found(fid: Fid, source: FidSource) -> Self {
        ViewerIdentity {
            fid: Some(fid),
            source,
        }
    }
}

// --- Validation -------------------------------------------------------------

/// Validate a FID candidate: a string or number that is a finite integer > 0.
pub fn coerce(value: &Value) -> Option<Fid> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(raw) => from_int(raw),
            None => n.as_f64().and_then(from_float),
        },
        Value::String(s) => coerce_str(s),
        _ => None,
    }
}

/// String form of [`coerce`]. Surrounding whitespace is ignored.
pub fn coerce_str(raw: &str) -> Option<Fid> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<u64>() {
        return from_int(n);
    }
    s.parse::<f64>().ok().and_then(from_float)
}

fn from_int(n: u64) -> Option<Fid> {
    if n > MAX_SAFE_INTEGER {
        return None;
    }
    Fid::new(n)
}

fn from_float(n: f64) -> Option<Fid> {
    if !n.is_finite() || n.fract() != 0.0 || n <= 0.0 || n > MAX_SAFE_INTEGER as f64 {
        return None;
    }
    from_int(n as u64)
}

// --- Sources ----------------------------------------------------------------

/// Query keys accepted for the FID, in priority order.
pub const QUERY_KEYS: &[&str] = &["fid", "viewerFid", "userFid"];

/// First valid FID in a query string (`?fid=7`) or a full page URL.
pub fn fid_from_query(query: &str) -> Option<Fid> {
    let qs = query.split_once('?').map_or(query, |(_, rest)| rest);
    let qs = qs.split_once('#').map_or(qs, |(head, _)| head);
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(qs.as_bytes())
        .into_owned()
        .collect();
    QUERY_KEYS.iter().find_map(|key| {
        pairs
            .iter()
            .filter(|(k, _)| k == key)
            .find_map(|(_, v)| coerce_str(v))
    })
}

/// One known place a host integration may expose the viewer.
#[derive(Clone, Copy)]
pub struct FidProbe {
    /// JSON pointer into the probed object.
    pub path: &'static str,
    pub extract: fn(&Value) -> Option<Fid>,
}

fn fid_field(v: &Value) -> Option<Fid> {
    v.get("fid").and_then(coerce)
}

/// Shapes of the host SDK context object, in priority order.
pub const HOST_CONTEXT_PROBES: &[FidProbe] = &[
    FidProbe { path: "/user", extract: fid_field },
    FidProbe { path: "/viewer", extract: fid_field },
    FidProbe { path: "/client/user", extract: fid_field },
    FidProbe { path: "/session/user", extract: fid_field },
    FidProbe { path: "/session", extract: fid_field },
    FidProbe { path: "/viewerFid", extract: coerce },
    FidProbe { path: "/fid", extract: coerce },
];

/// Shapes older host builds left on the global object, in priority order.
pub const LEGACY_GLOBAL_PROBES: &[FidProbe] = &[
    FidProbe { path: "/farcaster/context/user", extract: fid_field },
    FidProbe { path: "/farcaster/user", extract: fid_field },
    FidProbe { path: "/fc/user", extract: fid_field },
    FidProbe { path: "/warpcast/user", extract: fid_field },
    FidProbe { path: "/__FARCASTER_CONTEXT__/user", extract: fid_field },
    FidProbe { path: "/__MINIAPP_CONTEXT__/user", extract: fid_field },
    FidProbe { path: "/farcasterFid", extract: coerce },
];

/// Run a probe table against `root`; the first shape yielding a valid FID wins.
pub fn probe(table: &[FidProbe], root: &Value) -> Option<Fid> {
    table.iter().find_map(|p| {
        let hit = root.pointer(p.path).and_then(p.extract);
        if let Some(fid) = hit {
            debug::log(cat::FID, format!("probe {} -> {fid}", p.path));
        }
        hit
    })
}

/// Everything the resolver may look at for one pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct FidSources<'a> {
    pub query: Option<&'a str>,
    pub host_context: Option<&'a Value>,
    pub globals: Option<&'a Value>,
}

// --- Resolver ---------------------------------------------------------------

pub struct IdentityResolver<'s, S: KeyValueStore + ?Sized> {
    storage: &'s S,
}

impl<'s, S: KeyValueStore + ?Sized> IdentityResolver<'s, S> {
    pub fn new(storage: &'s S) -> Self {
        Self { storage }
    }

    /// Resolve the viewer across every source. Never fails; absence is `ViewerIdentity::NONE`.
    pub fn resolve(&self, sources: &FidSources<'_>) -> ViewerIdentity {
        if let Some(fid) = sources.query.and_then(fid_from_query) {
            return self.live(fid, FidSource::Query);
        }
        if let Some(fid) = sources
            .host_context
            .and_then(|ctx| probe(HOST_CONTEXT_PROBES, ctx))
        {
            return self.live(fid, FidSource::HostContext);
        }
        if let Some(fid) = self.cached() {
            debug::log(cat::FID, format!("fid {fid} from cache"));
            return ViewerIdentity::found(fid, FidSource::Cache);
        }
        if let Some(fid) = sources
            .globals
            .and_then(|g| probe(LEGACY_GLOBAL_PROBES, g))
        {
            debug::log(cat::FID, format!("fid {fid} from legacy global"));
            return ViewerIdentity::found(fid, FidSource::LegacyGlobal);
        }
        debug::log(cat::FID, "no fid available");
        ViewerIdentity::NONE
    }

    /// Second pass once the host context has arrived: a context FID supersedes
    /// whatever the first pass found; otherwise the earlier result stands.
    pub fn resolve_with_context(&self, previous: ViewerIdentity, context: &Value) -> ViewerIdentity {
        match probe(HOST_CONTEXT_PROBES, context) {
            Some(fid) => self.live(fid, FidSource::HostContext),
            None => previous,
        }
    }

    /// Last FID written by [`remember_fid`](Self::remember_fid), if still valid.
    pub fn cached(&self) -> Option<Fid> {
        self.storage.get(FID_STORAGE_KEY).as_deref().and_then(coerce_str)
    }

    /// Persist `fid` as the fallback for later loads. Skips the write when
    /// the cache already holds the same value.
    pub fn remember_fid(&self, fid: Fid) {
        if self.cached() == Some(fid) {
            return;
        }
        log::debug!("caching fid {fid}");
        self.storage.set(FID_STORAGE_KEY, &fid.to_string());
    }

    fn live(&self, fid: Fid, source: FidSource) -> ViewerIdentity {
        debug::log(cat::FID, format!("fid {fid} from {source}"));
        self.remember_fid(fid);
        ViewerIdentity::found(fid, source)
    }
}
