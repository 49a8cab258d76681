//! Cancellable one-shot timer backed by a worker thread.
//!
//! # Architecture
//!
//! ```text
//! schedule(delay) ──► deadline ──(condvar wait_timeout)──► worker ──► action()
//! cancel()        ──► deadline = None
//! drop            ──► shutdown + notify + join
//! ```
//!
//! The action runs on the worker thread with no timer lock held, so it may
//! schedule or cancel the timer again.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::error;

#[derive(Debug, Default)]
struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct TimerShared {
    state: Mutex<TimerState>,
    signal: Condvar,
}

impl TimerShared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/// Runs an action once after a delay, unless cancelled first.
///
/// At most one deadline is armed at a time. Dropping the timer cancels the
/// pending deadline and joins the worker; an action that is already running
/// completes first.
pub struct FlushTimer {
    shared: Arc<TimerShared>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FlushTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushTimer")
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl FlushTimer {
    /// Spawns the worker thread. `action` runs on every expired deadline.
    pub fn new<F>(action: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new(TimerShared::default());
        let thread_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("history-flush-timer".into())
            .spawn(move || Self::run(thread_shared, action))
            .map_err(|err| error!("Failed to spawn flush timer thread: {:?}", err))
            .ok();

        Self { shared, worker }
    }

    /// Arms the timer. Keeps an earlier deadline if one is already armed.
    pub fn schedule(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        let mut state = self.shared.lock();
        if state.shutdown {
            return;
        }
        match state.deadline {
            Some(current) if current <= deadline => {}
            _ => {
                state.deadline = Some(deadline);
                self.shared.signal.notify_one();
            }
        }
    }

    /// Disarms the timer. Does not interrupt a running action.
    pub fn cancel(&self) {
        let mut state = self.shared.lock();
        state.deadline = None;
        self.shared.signal.notify_one();
    }

    /// Returns true if a deadline is armed.
    pub fn is_armed(&self) -> bool {
        self.shared.lock().deadline.is_some()
    }

    fn run<F: Fn()>(shared: Arc<TimerShared>, action: F) {
        let mut state = shared.lock();
        loop {
            if state.shutdown {
                break;
            }
            match state.deadline {
                None => {
                    state = shared
                        .signal
                        .wait(state)
                        .unwrap_or_else(|err| err.into_inner());
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now < deadline {
                        state = shared
                            .signal
                            .wait_timeout(state, deadline - now)
                            .unwrap_or_else(|err| err.into_inner())
                            .0;
                        continue;
                    }
                    state.deadline = None;
                    drop(state);
                    action();
                    state = shared.lock();
                }
            }
        }
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.shutdown = true;
            state.deadline = None;
            self.shared.signal.notify_one();
        }

        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
