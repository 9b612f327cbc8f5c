//! Readiness signaling.
//!
//! The host keeps its splash screen up until the page calls `ready`. The
//! bridge can attach at any moment after load and there is no event for it,
//! so the signaler polls: every tick it calls every known `ready` shape,
//! until the attempt budget or the time window runs out. Calling `ready`
//! more than once is harmless, so success does not end the loop early.

use crate::bridge::{HostBridge, READY_SHAPES};
use crate::debug::{self, cat};
use crate::platform::{self, Duration, Instant};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadyPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for ReadyPolicy {
    fn default() -> Self {
        ReadyPolicy {
            interval: Duration::from_millis(150),
            max_attempts: 40,
            window: Duration::from_secs(6),
        }
    }
}

/// How a signaler run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadyReport {
    /// Ticks performed (each tick tries every shape).
    pub attempts: u32,
    /// Individual shape calls that returned without error.
    pub accepted: u32,
    pub cancelled: bool,
}

/// Call every known `ready` shape once. Returns how many accepted.
pub fn signal_once<B: HostBridge + ?Sized>(bridge: &B) -> u32 {
    let mut accepted = 0;
    for shape in READY_SHAPES {
        match bridge.call_ready(shape) {
            Ok(()) => accepted += 1,
            Err(e) => log::trace!("ready via {} skipped: {e}", shape.label()),
        }
    }
    accepted
}

/// Drive the polling loop to completion or cancellation.
pub async fn run<B: HostBridge + ?Sized>(
    bridge: &B,
    policy: &ReadyPolicy,
    cancel: &CancellationToken,
) -> ReadyReport {
    let started = Instant::now();
    let mut report = ReadyReport::default();

    loop {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        if report.attempts >= policy.max_attempts || started.elapsed() >= policy.window {
            break;
        }

        report.attempts += 1;
        report.accepted += signal_once(bridge);

        tokio::select! {
            _ = cancel.cancelled() => {
                report.cancelled = true;
                break;
            }
            _ = platform::sleep(policy.interval) => {}
        }
    }

    debug::log(
        cat::READY,
        format!(
            "signaler done: attempts={} accepted={} cancelled={}",
            report.attempts, report.accepted, report.cancelled
        ),
    );
    report
}

/// Owns a running signaler. Dropping the handle cancels it.
pub struct ReadyHandle {
    cancel: CancellationToken,
    done: Option<oneshot::Receiver<ReadyReport>>,
}

impl ReadyHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the signaler to stop and return its report.
    pub async fn join(mut self) -> Option<ReadyReport> {
        let done = self.done.take()?;
        done.await.ok()
    }
}

impl Drop for ReadyHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start signaling in the background with its own cancellation token.
pub fn spawn<B>(bridge: Arc<B>, policy: ReadyPolicy) -> ReadyHandle
where
    B: HostBridge + ?Sized + 'static,
{
    spawn_with_token(bridge, policy, CancellationToken::new())
}

/// Like [`spawn`], but cancelled through `cancel` (typically a child of the
/// owning mount's token).
pub fn spawn_with_token<B>(bridge: Arc<B>, policy: ReadyPolicy, cancel: CancellationToken) -> ReadyHandle
where
    B: HostBridge + ?Sized + 'static,
{
    let (tx, rx) = oneshot::channel();
    let token = cancel.clone();
    platform::spawn(async move {
        let report = run(&*bridge, &policy, &token).await;
        let _ = tx.send(report);
    });
    ReadyHandle {
        cancel,
        done: Some(rx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::StaticBridge;

    #[test]
    fn signal_once_tries_every_shape() {
        let bridge = StaticBridge::host("Warpcast/1.0", serde_json::json!({}));
        assert_eq!(signal_once(&bridge), 1);
        assert_eq!(bridge.ready_calls(), READY_SHAPES.len());

        let absent = StaticBridge::absent();
        assert_eq!(signal_once(&absent), 0);
        assert_eq!(absent.ready_calls(), READY_SHAPES.len());
    }

    #[test]
    fn default_policy_fits_the_window() {
        let p = ReadyPolicy::default();
        assert_eq!(p.interval * p.max_attempts, p.window);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_at_attempt_budget() {
        let bridge = StaticBridge::absent();
        let policy = ReadyPolicy {
            interval: Duration::from_millis(100),
            max_attempts: 3,
            window: Duration::from_secs(60),
        };
        let report = run(&bridge, &policy, &CancellationToken::new()).await;
        assert_eq!(report.attempts, 3);
        assert!(!report.cancelled);
        assert_eq!(bridge.ready_calls(), 3 * READY_SHAPES.len());
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_run_never_calls() {
        let bridge = StaticBridge::absent();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = run(&bridge, &ReadyPolicy::default(), &cancel).await;
        assert_eq!(report, ReadyReport { attempts: 0, accepted: 0, cancelled: true });
        assert_eq!(bridge.ready_calls(), 0);
    }
}
