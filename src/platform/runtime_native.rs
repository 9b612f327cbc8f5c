use std::future::Future;
use std::time::Duration as StdDuration;

pub type Duration = StdDuration;

// tokio's Instant so paused-clock tests drive elapsed time too.
pub type Instant = tokio::time::Instant;

pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Spawn a detached task on the ambient tokio runtime.
pub fn spawn<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(fut);
}

#[cfg(feature = "native")]
pub fn init_logging(level: log::Level) {
    let env = env_logger::Env::default().default_filter_or(level.as_str());
    let _ = env_logger::Builder::from_env(env).try_init();
}

#[cfg(not(feature = "native"))]
pub fn init_logging(level: log::Level) {
    log::set_max_level(level.to_level_filter());
}

pub fn install_panic_hook() {}
