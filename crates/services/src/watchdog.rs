//! Inactivity watchdog.
//!
//! Two independent timers run on the Tokio runtime: a one-shot deadline that
//! flips the watchdog to idle and invokes the idle callback, and a one-second
//! ticker that only feeds the `elapsed_seconds` readout. They write disjoint
//! fields, so their relative ordering does not matter.
//!
//! Arming, resetting and activity notifications spawn tasks, so they must be
//! called from within a Tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// Invoked when the deadline elapses without activity.
pub type IdleCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct State {
    idle: bool,
    elapsed_seconds: u64,
    /// Bumped on every arm/disarm; a deadline only fires for its own cycle.
    cycle: u64,
    on_idle: Option<IdleCallback>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, cycle: u64) {
        let callback = {
            let mut state = self.lock();
            if state.cycle != cycle || state.idle {
                return;
            }
            state.idle = true;
            state.on_idle.clone()
        };
        tracing::debug!(cycle, "watchdog deadline elapsed");
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// Fires a callback once a quiet period elapses without activity.
pub struct ActivityWatchdog {
    shared: Arc<Shared>,
    timeout: Duration,
    enabled: bool,
    deadline: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl Default for ActivityWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityWatchdog {
    /// A disabled watchdog with nothing armed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            timeout: Duration::ZERO,
            enabled: false,
            deadline: None,
            ticker: None,
        }
    }

    /// Update timeout, callback and enablement.
    ///
    /// The callback slot is always replaced, without re-arming. A change of
    /// timeout or enablement re-arms through `reset`; disabling clears any
    /// pending deadline. The elapsed ticker is left alone either way.
    pub fn configure(&mut self, timeout: Duration, on_idle: IdleCallback, enabled: bool) {
        self.shared.lock().on_idle = Some(on_idle);

        let changed = timeout != self.timeout || enabled != self.enabled;
        self.timeout = timeout;
        self.enabled = enabled;

        if !enabled {
            self.disarm();
        } else if changed {
            self.reset();
        }
    }

    /// Record user activity. Re-arms the deadline only while not idle; once
    /// idle, only `reset` clears it.
    pub fn notify_activity(&mut self) {
        if !self.enabled || self.is_idle() {
            return;
        }
        self.arm_deadline();
    }

    /// Clear idle, zero the elapsed counter and arm a fresh deadline.
    ///
    /// The elapsed ticker restarts from zero even while disabled; only the
    /// deadline depends on enablement.
    pub fn reset(&mut self) {
        {
            let mut state = self.shared.lock();
            state.idle = false;
            state.elapsed_seconds = 0;
        }
        self.restart_ticker();
        if self.enabled {
            self.arm_deadline();
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.shared.lock().idle
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u64 {
        self.shared.lock().elapsed_seconds
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True while a deadline is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.enabled
            && self
                .deadline
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn arm_deadline(&mut self) {
        if let Some(handle) = self.deadline.take() {
            handle.abort();
        }
        let cycle = {
            let mut state = self.shared.lock();
            state.cycle = state.cycle.wrapping_add(1);
            state.cycle
        };
        let shared = Arc::clone(&self.shared);
        let timeout = self.timeout;
        self.deadline = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            shared.fire(cycle);
        }));
    }

    fn restart_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        let shared = Arc::clone(&self.shared);
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut state = shared.lock();
                state.elapsed_seconds = state.elapsed_seconds.saturating_add(1);
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.deadline.take() {
            handle.abort();
        }
        let mut state = self.shared.lock();
        state.cycle = state.cycle.wrapping_add(1);
    }
}

impl Drop for ActivityWatchdog {
    fn drop(&mut self) {
        self.disarm();
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ActivityWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityWatchdog")
            .field("timeout", &self.timeout)
            .field("enabled", &self.enabled)
            .field("idle", &self.is_idle())
            .field("elapsed_seconds", &self.elapsed_seconds())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, IdleCallback) {
        let fired = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&fired);
        let callback: IdleCallback = Arc::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        (fired, callback)
    }

    async fn settle(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_quiet_period() {
        let (fired, callback) = counter();
        let mut watchdog = ActivityWatchdog::new();
        watchdog.configure(Duration::from_secs(5), callback, true);

        settle(Duration::from_millis(4_900)).await;
        assert!(!watchdog.is_idle());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        settle(Duration::from_millis(200)).await;
        assert!(watchdog.is_idle());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        settle(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_pushes_deadline_back() {
        let (fired, callback) = counter();
        let mut watchdog = ActivityWatchdog::new();
        watchdog.configure(Duration::from_secs(5), callback, true);

        settle(Duration::from_secs(4)).await;
        watchdog.notify_activity();
        settle(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        settle(Duration::from_millis(1_100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn activity_does_not_clear_idle_but_reset_does() {
        let (fired, callback) = counter();
        let mut watchdog = ActivityWatchdog::new();
        watchdog.configure(Duration::from_secs(2), callback, true);

        settle(Duration::from_millis(2_100)).await;
        assert!(watchdog.is_idle());

        watchdog.notify_activity();
        settle(Duration::from_secs(5)).await;
        assert!(watchdog.is_idle());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        watchdog.reset();
        assert!(!watchdog.is_idle());
        settle(Duration::from_millis(2_100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_clears_pending_deadline() {
        let (fired, callback) = counter();
        let mut watchdog = ActivityWatchdog::new();
        watchdog.configure(Duration::from_secs(2), Arc::clone(&callback), true);
        assert!(watchdog.is_armed());

        watchdog.configure(Duration::from_secs(2), callback, false);
        assert!(!watchdog.is_armed());
        settle(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_callback_is_invoked_without_rearming() {
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();
        let mut watchdog = ActivityWatchdog::new();
        watchdog.configure(Duration::from_secs(3), first_cb, true);

        settle(Duration::from_secs(2)).await;
        watchdog.configure(Duration::from_secs(3), second_cb, true);

        // Same timeout and enablement: the original deadline still stands.
        settle(Duration::from_millis(1_100)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_counts_seconds_and_reset_zeroes_it() {
        let (_fired, callback) = counter();
        let mut watchdog = ActivityWatchdog::new();
        watchdog.configure(Duration::from_secs(60), callback, true);

        settle(Duration::from_millis(3_500)).await;
        assert_eq!(watchdog.elapsed_seconds(), 3);

        watchdog.notify_activity();
        assert_eq!(watchdog.elapsed_seconds(), 3);

        watchdog.reset();
        assert_eq!(watchdog.elapsed_seconds(), 0);
        settle(Duration::from_secs(1)).await;
        assert_eq!(watchdog.elapsed_seconds(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_keeps_counting_while_disabled() {
        let (fired, callback) = counter();
        let mut watchdog = ActivityWatchdog::new();
        watchdog.configure(Duration::from_secs(60), Arc::clone(&callback), true);

        settle(Duration::from_millis(2_500)).await;
        watchdog.configure(Duration::from_secs(60), Arc::clone(&callback), false);
        settle(Duration::from_secs(3)).await;
        assert_eq!(watchdog.elapsed_seconds(), 5);

        watchdog.reset();
        assert_eq!(watchdog.elapsed_seconds(), 0);
        assert!(!watchdog.is_armed());
        settle(Duration::from_millis(4_200)).await;
        assert_eq!(watchdog.elapsed_seconds(), 4);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
