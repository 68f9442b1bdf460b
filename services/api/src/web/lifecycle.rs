//! services/api/src/web/lifecycle.rs
//!
//! Scoped lifetimes for page sessions. Every task a page starts (timers, fetches)
//! runs against the page's `CancellationToken`; the token is cancelled when the
//! `PageLifetime` is dropped, whichever way the page ends.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

pub struct PageLifetime {
    token: CancellationToken,
    _guard: DropGuard,
}

impl PageLifetime {
    pub fn new() -> Self {
        let token = CancellationToken::new();
        let guard = token.clone().drop_guard();
        Self {
            token,
            _guard: guard,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_ended(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Ends the page early. Dropping the lifetime has the same effect.
    pub fn end(&self) {
        self.token.cancel();
    }

    /// Spawns `task`, aborting it as soon as the page ends.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                output = task => Some(output),
            }
        })
    }
}

impl Default for PageLifetime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn dropping_the_lifetime_stops_its_tasks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let lifetime = PageLifetime::new();
        let counter = ticks.clone();
        let handle = lifetime.spawn(async move {
            while counter.fetch_add(1, Ordering::SeqCst) < usize::MAX - 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(lifetime);
        assert_eq!(handle.await.unwrap(), None::<()>);
        let after_drop = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn finished_tasks_report_their_output() {
        let lifetime = PageLifetime::new();
        let handle = lifetime.spawn(async { 7 });
        assert_eq!(handle.await.unwrap(), Some(7));
        assert!(!lifetime.is_ended());
        lifetime.end();
        assert!(lifetime.is_ended());
    }
}
