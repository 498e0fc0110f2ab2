//! Idle timeout by composition: each stream carries one, the way the
//! connection carries its own.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::time;

struct IdleShared {
    epoch: Instant,
    /// Timeout in milliseconds; zero disables expiry.
    timeout_millis: AtomicU64,
    /// Milliseconds since `epoch` of the last recorded activity.
    last_activity_millis: AtomicU64,
    stopped: AtomicBool,
    checker_spawned: AtomicBool,
    /// Wakes the checker early when the timeout changes or the timer stops.
    notify: Notify,
    on_expired: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl IdleShared {
    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    async fn run(self: Arc<Self>) {
        loop {
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }
            let timeout_millis = self.timeout_millis.load(Ordering::SeqCst);
            if timeout_millis == 0 {
                self.notify.notified().await;
                continue;
            }
            let idle_for = self
                .now_millis()
                .saturating_sub(self.last_activity_millis.load(Ordering::SeqCst));
            if idle_for < timeout_millis {
                let remaining = Duration::from_millis(timeout_millis - idle_for);
                let _ = time::timeout(remaining, self.notify.notified()).await;
                continue;
            }
            let on_expired = self.on_expired.lock().unwrap().clone();
            if let Some(on_expired) = on_expired {
                on_expired();
            }
            // Re-arm with a full period: an expiry the application vetoed
            // must not fire again immediately.
            self.last_activity_millis
                .store(self.now_millis(), Ordering::SeqCst);
        }
    }
}

/// One idle timer.
///
/// The checker task is spawned lazily on the first enabling `set_timeout`
/// and lives until `stop`. Expiry does not tear anything down by itself:
/// it calls the hook, which owns the policy, and re-arms.
pub(crate) struct IdleTimeout {
    scheduler: Handle,
    shared: Arc<IdleShared>,
}

impl IdleTimeout {
    pub fn new(scheduler: Handle) -> IdleTimeout {
        IdleTimeout {
            scheduler,
            shared: Arc::new(IdleShared {
                epoch: Instant::now(),
                timeout_millis: AtomicU64::new(0),
                last_activity_millis: AtomicU64::new(0),
                stopped: AtomicBool::new(false),
                checker_spawned: AtomicBool::new(false),
                notify: Notify::new(),
                on_expired: Mutex::new(None),
            }),
        }
    }

    /// Install the expiry hook; must happen before the first `set_timeout`.
    pub fn set_on_expired(&self, on_expired: Arc<dyn Fn() + Send + Sync>) {
        *self.shared.on_expired.lock().unwrap() = Some(on_expired);
    }

    /// Zero disables the timer (the checker stays parked).
    pub fn set_timeout(&self, timeout: Duration) {
        let millis = timeout.as_millis() as u64;
        self.not_idle();
        self.shared.timeout_millis.store(millis, Ordering::SeqCst);
        if millis != 0 && !self.shared.checker_spawned.swap(true, Ordering::SeqCst) {
            let shared = self.shared.clone();
            self.scheduler.spawn(shared.run());
        }
        self.shared.notify.notify_one();
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.shared.timeout_millis.load(Ordering::SeqCst))
    }

    /// Record activity, deferring expiry by a full period.
    pub fn not_idle(&self) {
        self.shared
            .last_activity_millis
            .store(self.shared.now_millis(), Ordering::SeqCst);
    }

    /// Shut the checker down. Idempotent.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.notify.notify_one();
    }
}
