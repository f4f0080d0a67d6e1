use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Cooperative stop signal shared by async tasks and capture threads.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    flag:   Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.flag.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }

    pub async fn wait(&self) {
        let notified = self.notify.notified();
        if self.is_set() {
            return;
        }
        notified.await;
    }

    /// Blocking counterpart of `sleep` for capture-side threads.
    pub fn park(&self, delay: Duration) -> bool {
        let step  = Duration::from_millis(100);
        let until = Instant::now() + delay;

        while !self.is_set() {
            let now = Instant::now();
            if now >= until {
                return true;
            }
            thread::sleep(step.min(until - now));
        }

        false
    }

    /// Sleep for `delay`, returning false if shutdown was signalled first.
    pub async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => !self.is_set(),
            _ = self.wait()               => false,
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;
    use super::Shutdown;

    #[tokio::test]
    async fn sleep_is_interrupted() {
        let shutdown = Shutdown::new();
        let waiter   = shutdown.clone();

        let task = tokio::spawn(async move {
            waiter.sleep(Duration::from_secs(3600)).await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.signal();

        assert_eq!(task.await.ok(), Some(false));
        assert!(shutdown.is_set());
        assert!(!shutdown.sleep(Duration::from_millis(1)).await);
    }

    #[test]
    fn park_returns_early_on_shutdown() {
        let shutdown = Shutdown::new();
        assert!(shutdown.park(Duration::from_millis(5)));

        let waiter = shutdown.clone();
        let handle = std::thread::spawn(move || waiter.park(Duration::from_secs(3600)));
        shutdown.signal();
        assert_eq!(handle.join().ok(), Some(false));
    }
}
