//! Retry runs: staleness detection for overlapping attempt sequences.
//!
//! Each orchestrator owns a `RunTracker`. `begin()` mints a run with a fresh
//! id and cancellation token and cancels whatever run was current before.
//! State mutations go through [`Run::commit`], which only executes while the
//! run is still current, under the same lock `begin()` takes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    current: AtomicU64,
    active: Mutex<CancellationToken>,
    root: CancellationToken,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker whose runs are all cancelled when `root` is.
    pub fn with_root(root: CancellationToken) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                current: AtomicU64::new(0),
                active: Mutex::new(CancellationToken::new()),
                root,
            }),
        }
    }

    /// Starts a new run, superseding the current one.
    pub fn begin(&self) -> Run {
        let mut active = self.lock();
        active.cancel();
        let token = self.inner.root.child_token();
        *active = token.clone();
        let id = self.inner.current.fetch_add(1, Ordering::SeqCst) + 1;
        Run {
            id,
            token,
            tracker: self.clone(),
        }
    }

    /// Cancels the current run without starting a new one.
    pub fn cancel(&self) {
        let active = self.lock();
        active.cancel();
        self.inner.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn current(&self) -> u64 {
        self.inner.current.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, CancellationToken> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One attempt sequence. Compared by id against the tracker's counter.
#[derive(Debug)]
pub struct Run {
    id: u64,
    token: CancellationToken,
    tracker: RunTracker,
}

impl Run {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_current(&self) -> bool {
        !self.token.is_cancelled() && self.tracker.current() == self.id
    }

    /// Runs `f` only if this run is still current; `None` means it was discarded.
    pub fn commit<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let _guard = self.tracker.lock();
        self.is_current().then(f)
    }
}
