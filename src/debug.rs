//! Filterable debug logging for the mini-app bootstrap.
//!
//! Categories: HOST, FID, READY, CONTEXT, META, CHAIN, SHARE
//! Enable via: ?pcdebug=all or localStorage.setItem('petcast.debug','fid,ready')
//! Lines go through the `log` facade at info level once their category is on.

use std::sync::atomic::{AtomicU32, Ordering};

pub mod cat {
    pub const HOST: u32 = 1 << 0;
    pub const FID: u32 = 1 << 1;
    pub const READY: u32 = 1 << 2;
    pub const CONTEXT: u32 = 1 << 3;
    pub const META: u32 = 1 << 4;
    pub const CHAIN: u32 = 1 << 5;
    pub const SHARE: u32 = 1 << 6;
    pub const ALL: u32 = 0xffff_ffff;
}

/// localStorage key holding a comma-separated category list.
pub const STORAGE_KEY: &str = "petcast.debug";

static MASK: AtomicU32 = AtomicU32::new(0);

#[inline]
pub fn mask() -> u32 {
    MASK.load(Ordering::Relaxed)
}

#[inline]
pub fn set(mask: u32) {
    MASK.store(mask, Ordering::Relaxed)
}

#[inline]
pub fn enable(bits: u32) {
    MASK.fetch_or(bits, Ordering::Relaxed);
}

#[inline]
pub fn disable(bits: u32) {
    MASK.fetch_and(!bits, Ordering::Relaxed);
}

#[inline]
pub fn is(cat: u32) -> bool {
    (MASK.load(Ordering::Relaxed) & cat) != 0
}

#[inline]
pub fn cat_name(cat: u32) -> &'static str {
    match cat {
        c if c == cat::HOST => "host",
        c if c == cat::FID => "fid",
        c if c == cat::READY => "ready",
        c if c == cat::CONTEXT => "context",
        c if c == cat::META => "meta",
        c if c == cat::CHAIN => "chain",
        c if c == cat::SHARE => "share",
        _ => "misc",
    }
}

/// Parse a category list (`"fid,ready"`, `"all"`, `"none"`) into a mask.
pub fn parse_list(list: &str) -> u32 {
    let mut m: u32 = 0;
    for tok in list.split(',').map(|s| s.trim().to_ascii_lowercase()) {
        match tok.as_str() {
            "" => {}
            "none" => m = 0,
            "all" => m = cat::ALL,
            "host" => m |= cat::HOST,
            "fid" => m |= cat::FID,
            "ready" => m |= cat::READY,
            "context" => m |= cat::CONTEXT,
            "meta" => m |= cat::META,
            "chain" => m |= cat::CHAIN,
            "share" => m |= cat::SHARE,
            _ => {}
        }
    }
    m
}

#[inline]
pub fn set_from_list(list: &str) {
    set(parse_list(list));
}

/// Pull `pcdebug` (or `pcdbg`) out of a raw query string, if present.
pub fn list_from_query(query: &str) -> Option<String> {
    let qs = query.split_once('?').map_or(query, |(_, rest)| rest);
    url::form_urlencoded::parse(qs.as_bytes())
        .find(|(k, _)| k.eq_ignore_ascii_case("pcdebug") || k.eq_ignore_ascii_case("pcdbg"))
        .map(|(_, v)| v.into_owned())
}

#[cfg(target_arch = "wasm32")]
pub fn init_from_url_and_storage_once() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let Some(win) = web_sys::window() else { return };
        if let Ok(search) = win.location().search() {
            if let Some(list) = list_from_query(&search) {
                set_from_list(&list);
            }
        }
        if let Ok(Some(storage)) = win.local_storage() {
            if let Ok(Some(v)) = storage.get_item(STORAGE_KEY) {
                enable(parse_list(&v));
            }
        }
        log(cat::HOST, "debug init (wasm) complete");
    });
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_from_url_and_storage_once() {
    if let Ok(list) = std::env::var("PETCAST_DEBUG") {
        set_from_list(&list);
    }
}

#[inline]
pub fn log(cat: u32, msg: impl AsRef<str>) {
    if !is(cat) {
        return;
    }
    log::info!("[petcast][{}] {}", cat_name(cat), msg.as_ref());
}
