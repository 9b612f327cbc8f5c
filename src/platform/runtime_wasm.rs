use std::future::Future;
use std::sync::Once;

pub type Duration = std::time::Duration;

/// Monotonic page clock in milliseconds (`performance.now()`, `Date.now()` as fallback).
fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or_else(js_sys::Date::now, |perf| perf.now())
}

#[derive(Clone, Copy, Debug)]
pub struct Instant(f64);

impl Instant {
    pub fn now() -> Self {
        Self(now_ms())
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64((now_ms() - self.0).max(0.0) / 1000.0)
    }
}

pub async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await;
}

/// Spawn a detached task on the browser microtask queue.
pub fn spawn<F>(fut: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(fut);
}

static LOGGER_INIT: Once = Once::new();
static PANIC_HOOK: Once = Once::new();

/// Route `log` records to the browser console. Later calls only move the level.
pub fn init_logging(level: log::Level) {
    LOGGER_INIT.call_once(|| wasm_logger::init(wasm_logger::Config::new(level)));
    log::set_max_level(level.to_level_filter());
}

pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    });
}
